//! 索引校验 - id 唯一性、id 编码、文件归属和锚点可达性

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use searchdata::{decode_search_id, search_id};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::loader::{LoadedDir, SearchDir};

#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("Cannot build base URL from {0}")]
    InvalidBase(PathBuf),
}

pub type Result<T> = std::result::Result<T, ValidateError>;

/// 校验问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    /// 同一分区内 id 重复
    DuplicateId {
        section: String,
        id: String,
        file: String,
        first_file: String,
    },
    /// id 与名字编码不一致
    IdMismatch {
        file: String,
        id: String,
        name: String,
        expected: String,
    },
    /// 条目没有任何锚点
    EmptyEntry { file: String, id: String },
    /// 条目首字符不属于所在文件
    MisplacedEntry {
        file: String,
        id: String,
        expected_file: Option<String>,
    },
    /// 锚点指向的页面不存在
    MissingPage { file: String, id: String, href: String },
    /// 页面存在但没有对应片段
    MissingFragment { file: String, id: String, href: String },
    /// 分区信息列出的文件不存在
    MissingFile { path: String },
}

impl Issue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateId { .. } => "duplicate_id",
            Self::IdMismatch { .. } => "id_mismatch",
            Self::EmptyEntry { .. } => "empty_entry",
            Self::MisplacedEntry { .. } => "misplaced_entry",
            Self::MissingPage { .. } => "missing_page",
            Self::MissingFragment { .. } => "missing_fragment",
            Self::MissingFile { .. } => "missing_file",
        }
    }

    /// 单行描述
    pub fn describe(&self) -> String {
        match self {
            Self::DuplicateId { section, id, file, first_file } => {
                format!("{}: duplicate id '{}' in section {} (first in {})", file, id, section, first_file)
            }
            Self::IdMismatch { file, id, name, expected } => {
                format!("{}: id '{}' for '{}' should be '{}'", file, id, name, expected)
            }
            Self::EmptyEntry { file, id } => format!("{}: entry '{}' has no anchors", file, id),
            Self::MisplacedEntry { file, id, expected_file } => match expected_file {
                Some(expected) => format!("{}: entry '{}' belongs in {}", file, id, expected),
                None => format!("{}: entry '{}' has no file in its section", file, id),
            },
            Self::MissingPage { file, id, href } => {
                format!("{}: '{}' links to missing page {}", file, id, href)
            }
            Self::MissingFragment { file, id, href } => {
                format!("{}: '{}' links to missing anchor {}", file, id, href)
            }
            Self::MissingFile { path } => format!("listed search file missing: {}", path),
        }
    }
}

/// 校验报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub files_checked: usize,
    pub entries_checked: usize,
    pub anchors_checked: usize,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// 按类型计数
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.kind()).or_insert(0) += 1;
        }
        counts
    }
}

/// 从 HTML 中收集 `id="..."` 和 `name="..."` 属性值
pub fn collect_html_anchors(html: &str) -> HashSet<String> {
    let mut anchors = HashSet::new();
    for attr in ["id=\"", "name=\"", "id='", "name='"] {
        let quote = if attr.ends_with('"') { '"' } else { '\'' };
        let mut rest = html;
        while let Some(pos) = rest.find(attr) {
            // 排除 data-id= 之类的属性
            let boundary = rest[..pos]
                .chars()
                .last()
                .map_or(true, |c| c.is_whitespace());
            rest = &rest[pos + attr.len()..];
            if let Some(end) = rest.find(quote) {
                if boundary {
                    anchors.insert(rest[..end].to_string());
                }
                rest = &rest[end..];
            }
        }
    }
    anchors
}

/// 索引校验器
pub struct Validator {
    search_path: PathBuf,
    check_fragments: bool,
}

impl Validator {
    pub fn new(dir: &SearchDir) -> Self {
        Self {
            search_path: dir.search_path().to_path_buf(),
            check_fragments: false,
        }
    }

    pub fn with_fragments(mut self, check: bool) -> Self {
        self.check_fragments = check;
        self
    }

    pub fn validate(&self, loaded: &LoadedDir) -> Result<ValidationReport> {
        let base = Url::from_directory_path(&self.search_path)
            .map_err(|_| ValidateError::InvalidBase(self.search_path.clone()))?;

        let mut report = ValidationReport {
            files_checked: loaded.files.len(),
            ..Default::default()
        };

        for path in &loaded.missing {
            report.issues.push(Issue::MissingFile {
                path: path.display().to_string(),
            });
        }

        self.check_entries(loaded, &mut report);
        self.check_anchors(loaded, &base, &mut report);

        tracing::info!(
            "Validated {} entries, {} anchors: {} issues",
            report.entries_checked,
            report.anchors_checked,
            report.issues.len()
        );
        Ok(report)
    }

    fn check_entries(&self, loaded: &LoadedDir, report: &mut ValidationReport) {
        // (section, id) -> 首次出现的文件
        let mut seen: HashMap<(String, String), String> = HashMap::new();

        for file in &loaded.files {
            let file_name = file.file_name();
            let section = loaded
                .sections
                .as_ref()
                .and_then(|index| index.get(&file.section));
            let file_char = section.and_then(|s| s.chars.chars().nth(file.char_index));

            for entry in &file.data.entries {
                report.entries_checked += 1;

                let key = (file.section.clone(), entry.id.clone());
                match seen.get(&key) {
                    Some(first) => report.issues.push(Issue::DuplicateId {
                        section: file.section.clone(),
                        id: entry.id.clone(),
                        file: file_name.clone(),
                        first_file: first.clone(),
                    }),
                    None => {
                        seen.insert(key, file_name.clone());
                    }
                }

                let expected = search_id(&entry.name);
                if expected != entry.id {
                    report.issues.push(Issue::IdMismatch {
                        file: file_name.clone(),
                        id: entry.id.clone(),
                        name: entry.name.clone(),
                        expected,
                    });
                }

                if entry.anchors.is_empty() {
                    report.issues.push(Issue::EmptyEntry {
                        file: file_name.clone(),
                        id: entry.id.clone(),
                    });
                }

                if let (Some(section), Some(file_char)) = (section, file_char) {
                    let first = decode_search_id(&entry.id).and_then(|n| n.chars().next());
                    if let Some(first) = first {
                        if first != file_char {
                            report.issues.push(Issue::MisplacedEntry {
                                file: file_name.clone(),
                                id: entry.id.clone(),
                                expected_file: section
                                    .char_index(first)
                                    .map(|idx| section.file_name(idx)),
                            });
                        }
                    }
                }
            }
        }
    }

    fn check_anchors(&self, loaded: &LoadedDir, base: &Url, report: &mut ValidationReport) {
        // 先解析全部锚点, 站外链接不检查
        let mut resolved = Vec::new();
        for file in &loaded.files {
            let file_name = file.file_name();
            for entry in &file.data.entries {
                for anchor in &entry.anchors {
                    report.anchors_checked += 1;
                    let target = match base.join(&anchor.href) {
                        Ok(url) if url.scheme() == "file" => url,
                        Ok(_) => continue,
                        Err(_) => {
                            report.issues.push(Issue::MissingPage {
                                file: file_name.clone(),
                                id: entry.id.clone(),
                                href: anchor.href.clone(),
                            });
                            continue;
                        }
                    };
                    let fragment = target.fragment().map(str::to_string);
                    if let Ok(page) = target.to_file_path() {
                        resolved.push((file_name.clone(), entry.id.clone(), anchor.href.clone(), page, fragment));
                    }
                }
            }
        }

        // 每个页面只读一次, 并行
        let pages: HashSet<&PathBuf> = resolved.iter().map(|(_, _, _, page, _)| page).collect();
        let check_fragments = self.check_fragments;
        let page_cache: HashMap<&PathBuf, Option<HashSet<String>>> = pages
            .into_par_iter()
            .map(|page| (page, read_page(page, check_fragments)))
            .collect();

        for (file, id, href, page, fragment) in &resolved {
            match page_cache.get(page) {
                Some(Some(anchors)) => {
                    if let Some(fragment) = fragment {
                        if check_fragments && !anchors.contains(fragment) {
                            report.issues.push(Issue::MissingFragment {
                                file: file.clone(),
                                id: id.clone(),
                                href: href.clone(),
                            });
                        }
                    }
                }
                _ => report.issues.push(Issue::MissingPage {
                    file: file.clone(),
                    id: id.clone(),
                    href: href.clone(),
                }),
            }
        }
    }
}

/// 页面不存在返回 None; 不检查片段时只判断存在性
fn read_page(page: &Path, with_anchors: bool) -> Option<HashSet<String>> {
    if !page.is_file() {
        return None;
    }
    if !with_anchors {
        return Some(HashSet::new());
    }
    match std::fs::read_to_string(page) {
        Ok(html) => Some(collect_html_anchors(&html)),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", page.display(), e);
            None
        }
    }
}
