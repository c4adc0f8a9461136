//! 存储层 - 协调 SQLite 目录和内存前缀索引

use std::collections::{HashMap, HashSet};
use std::path::Path;

use searchdata::SearchEntry;
use serde::Serialize;
use thiserror::Error;

use crate::db::Database;
use crate::index::SearchIndex;
use crate::loader::{LoadError, LoadedDir, SearchDir};

/// 存储层错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Site not indexed: {0}")]
    SiteNotIndexed(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// 一次导入的结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub site_id: i64,
    pub files: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub entries: usize,
}

/// 站点显示名: 生成目录通常叫 `html`, 此时取上一级目录名
pub fn site_name(html_root: &Path) -> String {
    let name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().to_string());
    match name(html_root) {
        Some(n) if n == "html" => html_root
            .parent()
            .and_then(name)
            .unwrap_or(n),
        Some(n) => n,
        None => "unknown".to_string(),
    }
}

/// 存储层 - 管理 Database + 每个站点的 SearchIndex
pub struct Store {
    db: Database,
    /// site_id -> 内存索引, 按需从数据库构建
    indexes: HashMap<i64, SearchIndex>,
}

impl Store {
    /// 打开或创建 Store
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            db: Database::open(db_path)?,
            indexes: HashMap::new(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Database::open_in_memory()?,
            indexes: HashMap::new(),
        })
    }

    /// 加载并导入搜索目录
    pub async fn import(&mut self, dir: &SearchDir) -> Result<ImportSummary> {
        let loaded = dir.load().await?;
        self.import_loaded(dir, &loaded)
    }

    /// 导入已加载的搜索目录, 未变化的文件跳过
    pub fn import_loaded(&mut self, dir: &SearchDir, loaded: &LoadedDir) -> Result<ImportSummary> {
        let root = dir.html_root().to_string_lossy().to_string();
        let site_id = self.db.get_or_create_site(&site_name(dir.html_root()), &root)?;

        let mut summary = ImportSummary {
            site_id,
            files: loaded.files.len(),
            ..Default::default()
        };

        let mut seen = HashSet::new();
        for file in &loaded.files {
            let path = file.path.to_string_lossy().to_string();
            let imported = self.db.import_source(
                site_id,
                &path,
                &file.section,
                file.char_index,
                &file.content_hash,
                &file.data.entries,
            )?;
            seen.insert(path);

            match imported {
                Some((_, count)) => {
                    tracing::debug!("Imported {} entries from {}", count, file.path.display());
                    summary.changed += 1;
                    summary.entries += count;
                }
                None => summary.unchanged += 1,
            }
        }

        // 删除已从磁盘消失的文件
        for source in self.db.get_sources_by_site(site_id)? {
            if !seen.contains(&source.path) {
                tracing::info!("Removing stale search file {}", source.path);
                self.db.delete_source(source.id)?;
                summary.removed += 1;
            }
        }

        self.db.update_site_indexed_time(site_id)?;
        self.indexes.remove(&site_id);

        tracing::info!(
            "Imported site {}: {} changed, {} unchanged, {} removed",
            root,
            summary.changed,
            summary.unchanged,
            summary.removed
        );
        Ok(summary)
    }

    /// 按 HTML 根目录找站点 id
    pub fn site_id(&self, html_root: &Path) -> Result<i64> {
        let root = html_root.to_string_lossy().to_string();
        self.db
            .get_site_by_path(&root)?
            .map(|site| site.id)
            .ok_or(StoreError::SiteNotIndexed(root))
    }

    /// 确保站点的内存索引已构建
    pub fn ensure_index(&mut self, site_id: i64) -> Result<&SearchIndex> {
        if !self.indexes.contains_key(&site_id) {
            let mut index = SearchIndex::new();
            let sections: HashSet<String> = self
                .db
                .get_sources_by_site(site_id)?
                .into_iter()
                .map(|s| s.section)
                .collect();
            for section in sections {
                for entry in self.db.load_entries(site_id, &section)? {
                    index.insert(&section, entry);
                }
            }
            tracing::debug!("Built in-memory index for site {} ({} entries)", site_id, index.len());
            self.indexes.insert(site_id, index);
        }
        self.indexes
            .get(&site_id)
            .ok_or_else(|| StoreError::SiteNotIndexed(site_id.to_string()))
    }

    /// 前缀搜索
    pub fn search(
        &mut self,
        site_id: i64,
        section: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchEntry>> {
        let index = self.ensure_index(site_id)?;
        Ok(index
            .search(section, query, limit)
            .into_iter()
            .cloned()
            .collect())
    }

    /// 精确查找
    pub fn lookup(&mut self, site_id: i64, section: &str, name: &str) -> Result<Option<SearchEntry>> {
        let index = self.ensure_index(site_id)?;
        Ok(index.lookup(section, name).cloned())
    }

    /// 获取底层数据库引用
    pub fn db(&self) -> &Database {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const ALL_2: &str = r#"var searchData=
[
  ['calc_5fvexfa',['calc_vexFa',['../classHF_1_1HartreeFock.html#a09d8',1,'HF::HartreeFock']]],
  ['cg',['cg',['../namespaceAngular.html#a335c',1,'Angular']]]
];
"#;

    const ALL_3: &str = r#"var searchData=
[
  ['dirac',['Dirac',['../namespaceDirac.html',1,'']]]
];
"#;

    fn site() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let search = dir.path().join("html").join("search");
        fs::create_dir_all(&search).unwrap();
        fs::write(search.join("all_2.js"), ALL_2).unwrap();
        fs::write(search.join("all_3.js"), ALL_3).unwrap();
        dir
    }

    #[test]
    fn test_site_name() {
        assert_eq!(site_name(Path::new("/work/ampsci/docs/html")), "docs");
        assert_eq!(site_name(Path::new("/work/manual")), "manual");
        assert_eq!(site_name(Path::new("/")), "unknown");
    }

    #[tokio::test]
    async fn test_import_and_search() {
        let dir = site();
        let search_dir = SearchDir::open(&dir.path().join("html")).unwrap();

        let mut store = Store::open(&dir.path().join("catalog.db")).unwrap();
        let summary = store.import(&search_dir).await.unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.changed, 2);
        assert_eq!(summary.entries, 3);

        let site_id = store.site_id(search_dir.html_root()).unwrap();
        assert_eq!(site_id, summary.site_id);

        let found = store.search(site_id, "all", "calc_", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "calc_vexFa");

        let dirac = store.lookup(site_id, "all", "Dirac").unwrap().unwrap();
        assert_eq!(dirac.anchors[0].href, "../namespaceDirac.html");
    }

    #[tokio::test]
    async fn test_reimport_skips_unchanged_and_removes_stale() {
        let dir = site();
        let search_dir = SearchDir::open(&dir.path().join("html")).unwrap();
        let mut store = Store::open_in_memory().unwrap();

        store.import(&search_dir).await.unwrap();
        let site_id = store.site_id(search_dir.html_root()).unwrap();
        assert_eq!(store.search(site_id, "all", "d", 10).unwrap().len(), 1);

        fs::remove_file(dir.path().join("html/search/all_3.js")).unwrap();
        let summary = store.import(&search_dir).await.unwrap();
        assert_eq!(summary.changed, 0);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.removed, 1);

        // 导入后内存索引失效重建
        assert!(store.search(site_id, "all", "d", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_import_is_retried() {
        let dir = site();
        let search_dir = SearchDir::open(&dir.path().join("html")).unwrap();
        let mut store = Store::open_in_memory().unwrap();

        store.import(&search_dir).await.unwrap();
        let site_id = store.site_id(search_dir.html_root()).unwrap();

        store
            .db()
            .conn()
            .execute_batch(
                "CREATE TRIGGER block_anchors BEFORE INSERT ON anchors
                 BEGIN SELECT RAISE(ABORT, 'blocked'); END;",
            )
            .unwrap();
        fs::write(
            dir.path().join("html/search/all_2.js"),
            "var searchData=\n[\n  ['ck',['Ck',['../namespaceAngular.html#a77',1,'Angular']]]\n];\n",
        )
        .unwrap();

        let err = store.import(&search_dir).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));

        store.db().conn().execute_batch("DROP TRIGGER block_anchors;").unwrap();
        let summary = store.import(&search_dir).await.unwrap();
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.unchanged, 1);

        assert_eq!(store.search(site_id, "all", "ck", 10).unwrap().len(), 1);
        assert!(store.search(site_id, "all", "cg", 10).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_site() {
        let store = Store::open_in_memory().unwrap();
        let err = store.site_id(Path::new("/nowhere")).unwrap_err();
        assert!(matches!(err, StoreError::SiteNotIndexed(_)));
    }
}
