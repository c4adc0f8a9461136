//! 搜索目录加载 - 读取 `search/` 下的分区文件并解析

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use searchdata::{parse_search_data, ParseError, SearchData, SectionIndex};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::task::JoinSet;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("Not a Doxygen search directory: {0}")]
    NotASearchDir(PathBuf),
    #[error("Load task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, LoadError>;

const SECTION_INDEX_FILE: &str = "searchdata.js";

/// 内容哈希 (SHA256 十六进制)
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// 拆分分区文件名: `all_2.js` -> ("all", 2)
pub fn split_section_file(file_name: &str) -> Option<(&str, usize)> {
    let stem = file_name.strip_suffix(".js")?;
    let (section, hex) = stem.rsplit_once('_')?;
    if section.is_empty() || !section.chars().all(|c| c.is_ascii_lowercase()) {
        return None;
    }
    if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some((section, usize::from_str_radix(hex, 16).ok()?))
}

/// 已解析的分区文件
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub section: String,
    pub char_index: usize,
    pub content_hash: String,
    pub data: SearchData,
}

impl LoadedFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// 一次加载的结果
#[derive(Debug, Clone, Default)]
pub struct LoadedDir {
    /// `searchdata.js` 存在时的分区信息
    pub sections: Option<SectionIndex>,
    pub files: Vec<LoadedFile>,
    /// 分区信息列出但磁盘上不存在的文件
    pub missing: Vec<PathBuf>,
}

impl LoadedDir {
    pub fn entry_count(&self) -> usize {
        self.files.iter().map(|f| f.data.entries.len()).sum()
    }

    /// 某个分区的文件
    pub fn section_files<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a LoadedFile> + 'a {
        self.files.iter().filter(move |f| f.section == section)
    }
}

/// Doxygen 搜索目录
#[derive(Debug, Clone)]
pub struct SearchDir {
    html_root: PathBuf,
    search_path: PathBuf,
}

impl SearchDir {
    /// 打开搜索目录
    ///
    /// 可以传 HTML 根目录 (包含 `search/`) 或 `search/` 本身
    pub fn open(path: &Path) -> Result<Self> {
        let path = path.canonicalize().map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let nested = path.join("search");
        if nested.is_dir() {
            return Ok(Self {
                html_root: path,
                search_path: nested,
            });
        }

        if path.is_dir() {
            let html_root = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| path.clone());
            return Ok(Self {
                html_root,
                search_path: path,
            });
        }

        Err(LoadError::NotASearchDir(path))
    }

    /// 生成文档的 HTML 根目录, 锚点相对它解析
    pub fn html_root(&self) -> &Path {
        &self.html_root
    }

    pub fn search_path(&self) -> &Path {
        &self.search_path
    }

    /// 读取并解析全部分区文件
    pub async fn load(&self) -> Result<LoadedDir> {
        let index_path = self.search_path.join(SECTION_INDEX_FILE);
        let sections = if tokio::fs::try_exists(&index_path).await.unwrap_or(false) {
            let src = read(&index_path).await?;
            let index = SectionIndex::parse(&src).map_err(|source| LoadError::Parse {
                path: index_path.clone(),
                source,
            })?;
            Some(index)
        } else {
            tracing::debug!("No {} in {}", SECTION_INDEX_FILE, self.search_path.display());
            None
        };

        let (candidates, missing) = match &sections {
            Some(index) => self.listed_files(index).await,
            None => (self.discover_files().await?, Vec::new()),
        };

        for path in &missing {
            tracing::warn!("Listed search file missing: {}", path.display());
        }

        if candidates.is_empty() && sections.is_none() {
            return Err(LoadError::NotASearchDir(self.search_path.clone()));
        }

        // 并发读取
        let mut tasks = JoinSet::new();
        for (section, char_index, path) in candidates {
            tasks.spawn(async move {
                let text = read(&path).await;
                (section, char_index, path, text)
            });
        }

        let mut raw = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (section, char_index, path, text) = joined?;
            raw.push((section, char_index, path, text?));
        }

        // 解析是 CPU 密集的, 交给 rayon
        let mut files = raw
            .into_par_iter()
            .map(|(section, char_index, path, text)| {
                let data = parse_search_data(&text).map_err(|source| LoadError::Parse {
                    path: path.clone(),
                    source,
                })?;
                Ok(LoadedFile {
                    content_hash: content_hash(&text),
                    path,
                    section,
                    char_index,
                    data,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        files.sort_by(|a, b| (&a.section, a.char_index).cmp(&(&b.section, b.char_index)));

        tracing::info!(
            "Loaded {} search files from {}",
            files.len(),
            self.search_path.display()
        );

        Ok(LoadedDir {
            sections,
            files,
            missing,
        })
    }

    /// 分区信息列出的文件, 拆成 (存在, 缺失)
    async fn listed_files(&self, index: &SectionIndex) -> (Vec<(String, usize, PathBuf)>, Vec<PathBuf>) {
        let mut present = Vec::new();
        let mut missing = Vec::new();

        for section in &index.sections {
            for (idx, (_, name)) in section.files().into_iter().enumerate() {
                let path = self.search_path.join(name);
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    present.push((section.name.clone(), idx, path));
                } else {
                    missing.push(path);
                }
            }
        }

        (present, missing)
    }

    /// 没有 `searchdata.js` 时按文件名扫描
    async fn discover_files(&self) -> Result<Vec<(String, usize, PathBuf)>> {
        let io_err = |source| LoadError::Io {
            path: self.search_path.clone(),
            source,
        };

        let mut found = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.search_path).await.map_err(io_err)?;
        while let Some(entry) = dir.next_entry().await.map_err(io_err)? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some((section, idx)) = split_section_file(&name) {
                found.push((section.to_string(), idx, entry.path()));
            }
        }
        Ok(found)
    }
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const ALL_2: &str = "var searchData=\n[\n  ['coulomb',['Coulomb',['../namespaceCoulomb.html',1,'']]]\n];\n";

    #[test]
    fn test_split_section_file() {
        assert_eq!(split_section_file("all_2.js"), Some(("all", 2)));
        assert_eq!(split_section_file("functions_1a.js"), Some(("functions", 26)));
        assert_eq!(split_section_file("searchdata.js"), None);
        assert_eq!(split_section_file("search.js"), None);
        assert_eq!(split_section_file("all_2.html"), None);
        assert_eq!(split_section_file("_2.js"), None);
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = content_hash("abc");
        assert_eq!(a.len(), 64);
        assert_eq!(a, content_hash("abc"));
        assert_ne!(a, content_hash("abd"));
    }

    #[test]
    fn test_open_accepts_html_root() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("search")).unwrap();

        let search = SearchDir::open(dir.path()).unwrap();
        assert!(search.search_path().ends_with("search"));
        assert_eq!(search.html_root(), dir.path().canonicalize().unwrap());

        let direct = SearchDir::open(&dir.path().join("search")).unwrap();
        assert_eq!(direct.html_root(), search.html_root());
    }

    #[test]
    fn test_open_missing_path() {
        let err = SearchDir::open(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[tokio::test]
    async fn test_load_without_section_index() {
        let dir = tempdir().unwrap();
        let search = dir.path().join("search");
        fs::create_dir_all(&search).unwrap();
        fs::write(search.join("all_2.js"), ALL_2).unwrap();
        fs::write(search.join("search.js"), "function x() {}").unwrap();

        let loaded = SearchDir::open(dir.path()).unwrap().load().await.unwrap();
        assert!(loaded.sections.is_none());
        assert_eq!(loaded.files.len(), 1);
        assert_eq!(loaded.files[0].section, "all");
        assert_eq!(loaded.files[0].char_index, 2);
        assert_eq!(loaded.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_load_reports_missing_listed_files() {
        let dir = tempdir().unwrap();
        let search = dir.path().join("search");
        fs::create_dir_all(&search).unwrap();
        fs::write(
            search.join("searchdata.js"),
            "var indexSectionsWithContent = { 0: \"abc\" };\nvar indexSectionNames = { 0: \"all\" };\n",
        )
        .unwrap();
        fs::write(search.join("all_2.js"), ALL_2).unwrap();

        let loaded = SearchDir::open(dir.path()).unwrap().load().await.unwrap();
        assert_eq!(loaded.files.len(), 1);
        assert_eq!(loaded.missing.len(), 2);
        assert!(loaded.sections.is_some());
    }

    #[tokio::test]
    async fn test_load_parse_error_names_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("all_0.js"), "var searchData = [ ['a' ").unwrap();

        let err = SearchDir::open(dir.path()).unwrap().load().await.unwrap_err();
        match err {
            LoadError::Parse { path, .. } => assert!(path.ends_with("all_0.js")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_load_empty_dir_is_not_search_dir() {
        let dir = tempdir().unwrap();
        let err = SearchDir::open(dir.path()).unwrap().load().await.unwrap_err();
        assert!(matches!(err, LoadError::NotASearchDir(_)));
    }
}
