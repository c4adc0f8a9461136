//! 数据库模块 - 管理站点、搜索文件、条目和锚点

mod types;
mod site;
mod source;
mod entry;

pub use types::*;

use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;

/// 数据库管理
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    fn init_schema(&self) -> SqliteResult<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS sites (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                root_path TEXT NOT NULL UNIQUE,
                last_indexed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY,
                site_id INTEGER NOT NULL,
                path TEXT NOT NULL UNIQUE,
                section TEXT NOT NULL,
                char_index INTEGER NOT NULL,
                content_hash TEXT NOT NULL,
                loaded_at TEXT,
                FOREIGN KEY (site_id) REFERENCES sites(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY,
                source_id INTEGER NOT NULL,
                section TEXT NOT NULL,
                search_id TEXT NOT NULL,
                name TEXT NOT NULL,
                FOREIGN KEY (source_id) REFERENCES sources(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS anchors (
                id INTEGER PRIMARY KEY,
                entry_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                href TEXT NOT NULL,
                link_target INTEGER NOT NULL,
                scope TEXT NOT NULL,
                kind TEXT NOT NULL,
                compound TEXT NOT NULL,
                FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_sources_site ON sources(site_id);
            CREATE INDEX IF NOT EXISTS idx_entries_search_id ON entries(section, search_id);
            CREATE INDEX IF NOT EXISTS idx_entries_source ON entries(source_id);
            CREATE INDEX IF NOT EXISTS idx_anchors_entry ON anchors(entry_id);
            CREATE INDEX IF NOT EXISTS idx_anchors_compound ON anchors(compound);
            "#,
        )?;
        Ok(())
    }
}
