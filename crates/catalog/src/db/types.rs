//! 数据库类型定义

use serde::Serialize;
use std::collections::HashMap;

/// 站点记录 (一份生成的 HTML 文档)
#[derive(Debug, Clone, Serialize)]
pub struct SiteRecord {
    pub id: i64,
    pub name: String,
    pub root_path: String,
    pub last_indexed_at: Option<String>,
}

/// 搜索文件记录
#[derive(Debug, Clone, Serialize)]
pub struct SourceRecord {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub section: String,
    pub char_index: usize,
    pub content_hash: String,
    pub loaded_at: Option<String>,
}

/// 条目记录
#[derive(Debug, Clone, Serialize)]
pub struct EntryRecord {
    pub id: i64,
    pub source_id: i64,
    pub section: String,
    pub search_id: String,
    pub name: String,
}

/// 站点统计信息
#[derive(Debug, Serialize)]
pub struct SiteStats {
    pub total_sources: i64,
    pub total_entries: i64,
    pub total_anchors: i64,
    pub entries_by_section: HashMap<String, i64>,
    pub anchors_by_kind: HashMap<String, i64>,
}
