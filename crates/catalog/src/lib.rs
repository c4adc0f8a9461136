//! catalog - Doxygen 搜索索引的加载、查询、持久化与校验

pub mod config;
mod db;
mod index;
mod loader;
mod store;
mod validate;

pub use config::{get_db_path, CatalogConfig};
pub use db::{Database, EntryRecord, SiteRecord, SiteStats, SourceRecord};
pub use index::SearchIndex;
pub use loader::{content_hash, split_section_file, LoadError, LoadedDir, LoadedFile, SearchDir};
pub use store::{site_name, ImportSummary, Store, StoreError};
pub use validate::{collect_html_anchors, Issue, ValidateError, ValidationReport, Validator};
