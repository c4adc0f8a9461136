//! 目录配置

use std::path::PathBuf;

/// 默认数据库路径
pub fn get_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".doxsearch")
        .join("catalog.db")
}

/// 目录配置
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub db_path: PathBuf,
    pub max_results: usize,
    /// 搜索分区
    pub section: String,
    /// 校验时检查页面内的锚点片段
    pub check_fragments: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: get_db_path(),
            max_results: 20,
            section: "all".to_string(),
            check_fragments: false,
        }
    }
}

impl CatalogConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    #[doc(hidden)]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("DOXSEARCH_DB") {
            if !v.is_empty() {
                config.db_path = PathBuf::from(v);
            }
        }

        if let Some(v) = lookup("DOXSEARCH_MAX_RESULTS") {
            if let Ok(m) = v.parse::<usize>() {
                if m > 0 {
                    config.max_results = m;
                }
            }
        }

        if let Some(v) = lookup("DOXSEARCH_SECTION") {
            if !v.is_empty() {
                config.section = v;
            }
        }

        if let Some(v) = lookup("DOXSEARCH_CHECK_FRAGMENTS") {
            config.check_fragments = matches!(v.as_str(), "1" | "true" | "yes");
        }

        config
    }
}
