//! Source (搜索文件) CRUD 操作

use rusqlite::{params, Result as SqliteResult};
use searchdata::SearchEntry;
use super::types::SourceRecord;
use super::Database;

impl Database {
    /// 插入或更新搜索文件, 返回 (id, 内容是否变化)
    pub fn upsert_source(
        &self,
        site_id: i64,
        path: &str,
        section: &str,
        char_index: usize,
        content_hash: &str,
    ) -> SqliteResult<(i64, bool)> {
        if let Some(existing) = self.get_source_by_path(path)? {
            if existing.content_hash == content_hash && existing.site_id == site_id {
                return Ok((existing.id, false));
            }
            self.conn.execute(
                r#"
                UPDATE sources
                SET site_id = ?, section = ?, char_index = ?, content_hash = ?, loaded_at = datetime('now')
                WHERE id = ?
                "#,
                params![site_id, section, char_index as i64, content_hash, existing.id],
            )?;
            return Ok((existing.id, true));
        }

        self.conn.execute(
            r#"
            INSERT INTO sources (site_id, path, section, char_index, content_hash, loaded_at)
            VALUES (?, ?, ?, ?, ?, datetime('now'))
            "#,
            params![site_id, path, section, char_index as i64, content_hash],
        )?;
        Ok((self.conn.last_insert_rowid(), true))
    }

    /// 导入一个搜索文件: 哈希与条目在同一事务内写入
    ///
    /// 内容未变化时返回 None; 否则返回 (id, 条目数)
    pub fn import_source(
        &self,
        site_id: i64,
        path: &str,
        section: &str,
        char_index: usize,
        content_hash: &str,
        entries: &[SearchEntry],
    ) -> SqliteResult<Option<(i64, usize)>> {
        let tx = self.conn.unchecked_transaction()?;
        let (source_id, changed) = self.upsert_source(site_id, path, section, char_index, content_hash)?;
        if !changed {
            return Ok(None);
        }
        let count = self.write_entries(source_id, section, entries)?;
        tx.commit()?;
        Ok(Some((source_id, count)))
    }

    /// 按路径获取搜索文件
    pub fn get_source_by_path(&self, path: &str) -> SqliteResult<Option<SourceRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, site_id, path, section, char_index, content_hash, loaded_at
            FROM sources WHERE path = ?
            "#,
        )?;
        match stmt.query_row([path], Self::row_to_source) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 获取站点的所有搜索文件
    pub fn get_sources_by_site(&self, site_id: i64) -> SqliteResult<Vec<SourceRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, site_id, path, section, char_index, content_hash, loaded_at
            FROM sources WHERE site_id = ? ORDER BY section, char_index
            "#,
        )?;
        let rows = stmt.query_map([site_id], Self::row_to_source)?;
        rows.collect()
    }

    /// 删除不再存在的搜索文件
    pub fn delete_source(&self, source_id: i64) -> SqliteResult<()> {
        self.conn.execute("DELETE FROM sources WHERE id = ?", [source_id])?;
        Ok(())
    }

    fn row_to_source(row: &rusqlite::Row) -> rusqlite::Result<SourceRecord> {
        Ok(SourceRecord {
            id: row.get(0)?,
            site_id: row.get(1)?,
            path: row.get(2)?,
            section: row.get(3)?,
            char_index: row.get::<_, i64>(4)? as usize,
            content_hash: row.get(5)?,
            loaded_at: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use searchdata::{Anchor, LinkTarget, SearchEntry};

    #[test]
    fn test_upsert_source_tracks_changes() {
        let db = Database::open_in_memory().unwrap();
        let site_id = db.get_or_create_site("docs", "/docs").unwrap();

        let (id, changed) = db.upsert_source(site_id, "/docs/search/all_2.js", "all", 2, "h1").unwrap();
        assert!(changed);

        // 相同哈希视为未变化
        let (same_id, changed) = db.upsert_source(site_id, "/docs/search/all_2.js", "all", 2, "h1").unwrap();
        assert_eq!(id, same_id);
        assert!(!changed);

        let (same_id, changed) = db.upsert_source(site_id, "/docs/search/all_2.js", "all", 2, "h2").unwrap();
        assert_eq!(id, same_id);
        assert!(changed);

        let sources = db.get_sources_by_site(site_id).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].content_hash, "h2");
        assert_eq!(sources[0].char_index, 2);

        db.delete_source(id).unwrap();
        assert!(db.get_source_by_path("/docs/search/all_2.js").unwrap().is_none());
    }

    #[test]
    fn test_import_source_skips_unchanged_hash() {
        let db = Database::open_in_memory().unwrap();
        let site_id = db.get_or_create_site("docs", "/docs").unwrap();
        let entries = vec![SearchEntry::new(
            "cg",
            "cg",
            vec![Anchor::new("../namespaceAngular.html#a33", LinkTarget::Parent, "Angular")],
        )];

        let (id, count) = db
            .import_source(site_id, "/docs/search/all_2.js", "all", 2, "h1", &entries)
            .unwrap()
            .unwrap();
        assert_eq!(count, 1);
        assert!(db
            .import_source(site_id, "/docs/search/all_2.js", "all", 2, "h1", &entries)
            .unwrap()
            .is_none());
        assert_eq!(db.load_entries(site_id, "all").unwrap().len(), 1);
        assert_eq!(db.get_source_by_path("/docs/search/all_2.js").unwrap().unwrap().id, id);
    }
}
