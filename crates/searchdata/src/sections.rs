//! `searchdata.js` - 搜索分区元数据
//!
//! 每个分区 (all, classes, functions...) 按名字首字符拆成多个文件,
//! 文件序号是首字符在 `indexSectionsWithContent` 字符串中的位置 (十六进制)

use serde::Serialize;

use crate::parser::{parse_assignments, JsValue, ParseError, Result};

/// 搜索分区
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub number: u32,
    /// 文件名前缀, 如 `all`
    pub name: String,
    /// 显示名, 如 `All`
    pub label: String,
    /// 有内容的首字符, 顺序决定文件序号
    pub chars: String,
}

impl Section {
    /// 第 idx 个首字符对应的文件名
    pub fn file_name(&self, idx: usize) -> String {
        format!("{}_{:x}.js", self.name, idx)
    }

    /// 全部分区文件, 附带对应首字符
    pub fn files(&self) -> Vec<(char, String)> {
        self.chars
            .chars()
            .enumerate()
            .map(|(idx, c)| (c, self.file_name(idx)))
            .collect()
    }

    /// 首字符在分区中的序号
    pub fn char_index(&self, c: char) -> Option<usize> {
        let lower = c.to_lowercase().next().unwrap_or(c);
        self.chars.chars().position(|x| x == lower)
    }

    /// 查询词应该去哪个文件找
    pub fn file_for_query(&self, query: &str) -> Option<String> {
        let first = query.chars().next()?;
        self.char_index(first).map(|idx| self.file_name(idx))
    }

    /// 从文件名解析首字符序号: `all_2.js` -> 2
    pub fn index_from_file_name(&self, file_name: &str) -> Option<usize> {
        let stem = file_name.strip_suffix(".js")?;
        let hex = stem.strip_prefix(&self.name)?.strip_prefix('_')?;
        usize::from_str_radix(hex, 16).ok()
    }
}

/// `searchdata.js` 的全部分区
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionIndex {
    pub sections: Vec<Section>,
}

fn string_map(value: &JsValue) -> Vec<(u32, String)> {
    value
        .as_object()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|(k, v)| Some((k.parse().ok()?, v.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

impl SectionIndex {
    pub fn parse(src: &str) -> Result<Self> {
        let assignments = parse_assignments(src)?;
        let find = |name: &str| {
            assignments
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| string_map(v))
        };

        let contents = find("indexSectionsWithContent")
            .ok_or_else(|| ParseError::MissingVariable("indexSectionsWithContent".to_string()))?;
        let names = find("indexSectionNames")
            .ok_or_else(|| ParseError::MissingVariable("indexSectionNames".to_string()))?;
        let labels = find("indexSectionLabels").unwrap_or_default();

        let mut sections: Vec<Section> = contents
            .into_iter()
            .filter_map(|(number, chars)| {
                let name = names.iter().find(|(n, _)| *n == number)?.1.clone();
                let label = labels
                    .iter()
                    .find(|(n, _)| *n == number)
                    .map(|(_, l)| l.clone())
                    .unwrap_or_else(|| name.clone());
                Some(Section {
                    number,
                    name,
                    label,
                    chars,
                })
            })
            .collect();
        sections.sort_by_key(|s| s.number);

        Ok(Self { sections })
    }

    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}
