//! Entry 与 Anchor 操作

use rusqlite::{params, Result as SqliteResult};
use searchdata::{Anchor, LinkTarget, SearchEntry};
use std::collections::HashMap;
use super::types::{EntryRecord, SiteStats};
use super::Database;

impl Database {
    /// 替换搜索文件的全部条目 (单事务)
    pub fn replace_entries(
        &self,
        source_id: i64,
        section: &str,
        entries: &[SearchEntry],
    ) -> SqliteResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let count = self.write_entries(source_id, section, entries)?;
        tx.commit()?;
        Ok(count)
    }

    /// 写入条目, 由调用方负责事务
    pub(super) fn write_entries(
        &self,
        source_id: i64,
        section: &str,
        entries: &[SearchEntry],
    ) -> SqliteResult<usize> {
        self.conn.execute("DELETE FROM entries WHERE source_id = ?", [source_id])?;

        {
            let mut insert_entry = self.conn.prepare(
                "INSERT INTO entries (source_id, section, search_id, name) VALUES (?, ?, ?, ?)",
            )?;
            let mut insert_anchor = self.conn.prepare(
                r#"
                INSERT INTO anchors (entry_id, position, href, link_target, scope, kind, compound)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for entry in entries {
                let entry_id = insert_entry.insert(params![source_id, section, &entry.id, &entry.name])?;
                for (position, anchor) in entry.anchors.iter().enumerate() {
                    insert_anchor.execute(params![
                        entry_id,
                        position as i64,
                        &anchor.href,
                        anchor.target.flag(),
                        &anchor.scope,
                        anchor.kind().as_str(),
                        anchor.compound(),
                    ])?;
                }
            }
        }

        Ok(entries.len())
    }

    /// 按搜索 id 前缀查询条目
    pub fn search_entries(
        &self,
        site_id: Option<i64>,
        section: &str,
        id_prefix: &str,
        limit: usize,
    ) -> SqliteResult<Vec<EntryRecord>> {
        let mut query = String::from(
            r#"
            SELECT e.id, e.source_id, e.section, e.search_id, e.name
            FROM entries e
            JOIN sources s ON e.source_id = s.id
            WHERE e.section = ? AND substr(e.search_id, 1, length(?)) = ?
            "#,
        );

        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(section.to_string()),
            Box::new(id_prefix.to_string()),
            Box::new(id_prefix.to_string()),
        ];

        if let Some(sid) = site_id {
            query.push_str(" AND s.site_id = ?");
            params_vec.push(Box::new(sid));
        }

        query.push_str(" ORDER BY e.search_id, e.id LIMIT ?");
        params_vec.push(Box::new(limit as i64));

        let mut stmt = self.conn.prepare(&query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), |row| {
            Ok(EntryRecord {
                id: row.get(0)?,
                source_id: row.get(1)?,
                section: row.get(2)?,
                search_id: row.get(3)?,
                name: row.get(4)?,
            })
        })?;
        rows.collect()
    }

    /// 获取条目的锚点, 按原顺序
    pub fn get_entry_anchors(&self, entry_id: i64) -> SqliteResult<Vec<Anchor>> {
        let mut stmt = self.conn.prepare(
            "SELECT href, link_target, scope FROM anchors WHERE entry_id = ? ORDER BY position",
        )?;
        let rows = stmt.query_map([entry_id], |row| {
            let flag: i64 = row.get(1)?;
            Ok(Anchor {
                href: row.get(0)?,
                target: LinkTarget::from_flag(flag).unwrap_or(LinkTarget::Parent),
                scope: row.get(2)?,
            })
        })?;
        rows.collect()
    }

    /// 读取站点某分区的全部条目, 用于重建内存索引
    pub fn load_entries(&self, site_id: i64, section: &str) -> SqliteResult<Vec<SearchEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT e.id, e.search_id, e.name, a.href, a.link_target, a.scope
            FROM entries e
            JOIN sources s ON e.source_id = s.id
            LEFT JOIN anchors a ON a.entry_id = e.id
            WHERE s.site_id = ? AND e.section = ?
            ORDER BY e.search_id, e.id, a.position
            "#,
        )?;
        let rows = stmt.query_map(params![site_id, section], |row| {
            let href: Option<String> = row.get(3)?;
            let anchor = match href {
                Some(href) => {
                    let flag: i64 = row.get(4)?;
                    Some(Anchor {
                        href,
                        target: LinkTarget::from_flag(flag).unwrap_or(LinkTarget::Parent),
                        scope: row.get(5)?,
                    })
                }
                None => None,
            };
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?, anchor))
        })?;

        let mut entries: Vec<SearchEntry> = Vec::new();
        let mut last_id = None;
        for row in rows {
            let (entry_id, search_id, name, anchor) = row?;
            if last_id != Some(entry_id) {
                entries.push(SearchEntry::new(search_id, name, Vec::new()));
                last_id = Some(entry_id);
            }
            if let (Some(anchor), Some(entry)) = (anchor, entries.last_mut()) {
                entry.anchors.push(anchor);
            }
        }
        Ok(entries)
    }

    /// 获取站点统计信息
    pub fn site_stats(&self, site_id: i64) -> SqliteResult<SiteStats> {
        let total_sources: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sources WHERE site_id = ?",
            [site_id],
            |row| row.get(0),
        )?;

        let mut entries_by_section = HashMap::new();
        let mut stmt = self.conn.prepare(
            r#"
            SELECT e.section, COUNT(*)
            FROM entries e
            JOIN sources s ON e.source_id = s.id
            WHERE s.site_id = ?
            GROUP BY e.section
            "#,
        )?;
        let rows = stmt.query_map([site_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (section, count) = row?;
            entries_by_section.insert(section, count);
        }

        let mut anchors_by_kind = HashMap::new();
        let mut stmt = self.conn.prepare(
            r#"
            SELECT a.kind, COUNT(*)
            FROM anchors a
            JOIN entries e ON a.entry_id = e.id
            JOIN sources s ON e.source_id = s.id
            WHERE s.site_id = ?
            GROUP BY a.kind
            "#,
        )?;
        let rows = stmt.query_map([site_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (kind, count) = row?;
            anchors_by_kind.insert(kind, count);
        }

        Ok(SiteStats {
            total_sources,
            total_entries: entries_by_section.values().sum(),
            total_anchors: anchors_by_kind.values().sum(),
            entries_by_section,
            anchors_by_kind,
        })
    }
}
