//! 内存前缀索引 - 与 Doxygen 搜索框相同的匹配规则

use std::collections::BTreeMap;

use searchdata::{search_id, SearchEntry};

use crate::loader::LoadedDir;

/// 按分区组织的搜索索引
///
/// 分区内以搜索 id 排序, 前缀查询走 BTreeMap 的有序区间
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    sections: BTreeMap<String, BTreeMap<String, Vec<SearchEntry>>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_loaded(loaded: &LoadedDir) -> Self {
        let mut index = Self::new();
        for file in &loaded.files {
            for entry in &file.data.entries {
                index.insert(&file.section, entry.clone());
            }
        }
        index
    }

    pub fn insert(&mut self, section: &str, entry: SearchEntry) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .entry(entry.id.clone())
            .or_default()
            .push(entry);
    }

    /// 条目总数
    pub fn len(&self) -> usize {
        self.sections
            .values()
            .flat_map(|ids| ids.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sections(&self) -> Vec<&str> {
        self.sections.keys().map(String::as_str).collect()
    }

    /// 前缀搜索
    ///
    /// 查询词去掉首尾空格后按搜索 id 规则编码, 结果按 id 排序; 空查询不返回结果
    pub fn search(&self, section: &str, query: &str, limit: usize) -> Vec<&SearchEntry> {
        let prefix = search_id(query.trim_matches(' '));
        if prefix.is_empty() {
            return Vec::new();
        }

        let ids = match self.sections.get(section) {
            Some(ids) => ids,
            None => return Vec::new(),
        };

        ids.range(prefix.clone()..)
            .take_while(|(id, _)| id.starts_with(&prefix))
            .flat_map(|(_, entries)| entries.iter())
            .take(limit)
            .collect()
    }

    /// 精确查找名字, 大小写完全一致的优先
    pub fn lookup(&self, section: &str, name: &str) -> Option<&SearchEntry> {
        let name = name.trim_matches(' ');
        let entries = self.sections.get(section)?.get(&search_id(name))?;
        entries
            .iter()
            .find(|e| e.name == name)
            .or_else(|| entries.first())
    }

    /// 锚点落在指定 compound 页面上的条目
    pub fn by_compound(&self, section: &str, compound: &str) -> Vec<&SearchEntry> {
        self.entries(section)
            .filter(|e| e.anchors.iter().any(|a| a.compound() == compound))
            .collect()
    }

    /// 分区内全部条目, 按 id 排序
    pub fn entries<'a>(&'a self, section: &str) -> impl Iterator<Item = &'a SearchEntry> + 'a {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|ids| ids.values())
            .flat_map(|entries| entries.iter())
    }
}
