//! Site CRUD 操作

use rusqlite::{params, Result as SqliteResult};
use super::types::SiteRecord;
use super::Database;

impl Database {
    /// 获取或创建站点
    pub fn get_or_create_site(&self, name: &str, root_path: &str) -> SqliteResult<i64> {
        let mut stmt = self.conn.prepare("SELECT id FROM sites WHERE root_path = ?")?;
        let result: Option<i64> = stmt.query_row([root_path], |row| row.get(0)).ok();

        if let Some(id) = result {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO sites (name, root_path) VALUES (?, ?)",
            params![name, root_path],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// 更新站点索引时间
    pub fn update_site_indexed_time(&self, site_id: i64) -> SqliteResult<()> {
        self.conn.execute(
            "UPDATE sites SET last_indexed_at = datetime('now') WHERE id = ?",
            [site_id],
        )?;
        Ok(())
    }

    /// 获取所有站点
    pub fn get_all_sites(&self) -> SqliteResult<Vec<SiteRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, root_path, last_indexed_at FROM sites ORDER BY name",
        )?;
        let rows = stmt.query_map([], Self::row_to_site)?;
        rows.collect()
    }

    /// 按路径获取站点
    pub fn get_site_by_path(&self, root_path: &str) -> SqliteResult<Option<SiteRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, root_path, last_indexed_at FROM sites WHERE root_path = ?",
        )?;
        let result = stmt.query_row([root_path], Self::row_to_site);

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 删除站点及其全部数据
    pub fn delete_site(&self, site_id: i64) -> SqliteResult<()> {
        self.conn.execute("DELETE FROM sites WHERE id = ?", [site_id])?;
        Ok(())
    }

    fn row_to_site(row: &rusqlite::Row) -> rusqlite::Result<SiteRecord> {
        Ok(SiteRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            root_path: row.get(2)?,
            last_indexed_at: row.get(3)?,
        })
    }
}
