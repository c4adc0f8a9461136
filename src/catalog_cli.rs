//! catalog subcommand - index, search and check Doxygen search data

use catalog::{CatalogConfig, SearchDir, SearchIndex, Store, Validator};
use clap::Subcommand;
use searchdata::{write_search_data, SearchData, SearchEntry};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// Import a search directory into the catalog
    Index {
        /// HTML root or its search/ directory
        path: String,
    },
    /// Prefix search, same matching as the search box
    Search {
        /// Query
        query: String,
        /// Restrict to one indexed site (HTML root)
        #[arg(short, long)]
        site: Option<String>,
        /// Search section (all, classes, functions...)
        #[arg(long)]
        section: Option<String>,
        /// Max results
        #[arg(short, long)]
        limit: Option<usize>,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
    /// Show every documented location of a name
    Show {
        /// Symbol name
        name: String,
        /// HTML root of an indexed site
        #[arg(short, long)]
        site: String,
        /// Search section
        #[arg(long)]
        section: Option<String>,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
    /// List indexed sites
    Sites,
    /// Show site status
    Status {
        /// HTML root or its search/ directory
        path: String,
    },
    /// Check index invariants without touching the catalog
    Check {
        /// HTML root or its search/ directory
        path: String,
        /// Also check anchor fragments inside pages
        #[arg(short, long)]
        fragments: bool,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
    /// Export a section as JSON or as a single search data file
    Export {
        /// HTML root or its search/ directory
        path: String,
        /// Output format (json, js)
        #[arg(short = 'F', long, default_value = "json")]
        format: String,
        /// Search section
        #[arg(long)]
        section: Option<String>,
        /// Output file
        #[arg(short, long)]
        output: Option<String>,
    },
}

pub async fn run(cmd: CatalogCommands) -> anyhow::Result<()> {
    let config = CatalogConfig::from_env();
    match cmd {
        CatalogCommands::Index { path } => cmd_index(&config, &path).await,
        CatalogCommands::Search { query, site, section, limit, json } => {
            let section = section.unwrap_or_else(|| config.section.clone());
            let limit = limit.unwrap_or(config.max_results);
            cmd_search(&config, &query, site.as_deref(), &section, limit, json)
        }
        CatalogCommands::Show { name, site, section, json } => {
            let section = section.unwrap_or_else(|| config.section.clone());
            cmd_show(&config, &name, &site, &section, json)
        }
        CatalogCommands::Sites => cmd_sites(&config),
        CatalogCommands::Status { path } => cmd_status(&config, &path),
        CatalogCommands::Check { path, fragments, json } => {
            cmd_check(&path, fragments || config.check_fragments, json).await
        }
        CatalogCommands::Export { path, format, section, output } => {
            let section = section.unwrap_or_else(|| config.section.clone());
            cmd_export(&path, &format, &section, output.as_deref()).await
        }
    }
}

fn open_store(config: &CatalogConfig) -> anyhow::Result<Store> {
    Ok(Store::open(&config.db_path)?)
}

/// 站点参数统一解析成 HTML 根目录
fn site_root(path: &str) -> anyhow::Result<PathBuf> {
    Ok(SearchDir::open(Path::new(path))?.html_root().to_path_buf())
}

async fn cmd_index(config: &CatalogConfig, path: &str) -> anyhow::Result<()> {
    let dir = SearchDir::open(Path::new(path))?;
    println!("Site: {}", dir.html_root().display());
    println!("Search data: {}", dir.search_path().display());
    println!("Catalog: {}", config.db_path.display());
    println!();

    let mut store = open_store(config)?;
    let summary = store.import(&dir).await?;

    println!("Files: {}", summary.files);
    println!("  changed:   {}", summary.changed);
    println!("  unchanged: {}", summary.unchanged);
    println!("  removed:   {}", summary.removed);
    println!("Entries imported: {}", summary.entries);

    Ok(())
}

#[derive(serde::Serialize)]
struct EntryItem {
    site: String,
    name: String,
    id: String,
    locations: Vec<LocationItem>,
}

#[derive(serde::Serialize)]
struct LocationItem {
    qualified_name: String,
    href: String,
    kind: String,
    file: String,
}

fn entry_item(site_root: &Path, entry: &SearchEntry) -> EntryItem {
    let search_path = site_root.join("search");
    let locations = entry
        .qualified_names()
        .into_iter()
        .zip(&entry.anchors)
        .map(|(qualified_name, anchor)| LocationItem {
            qualified_name,
            href: anchor.href.clone(),
            kind: anchor.kind().as_str().to_string(),
            file: normalize(&search_path.join(anchor.page())).display().to_string(),
        })
        .collect();

    EntryItem {
        site: site_root.display().to_string(),
        name: entry.name.clone(),
        id: entry.id.clone(),
        locations,
    }
}

/// 去掉 `..` 段, 不访问文件系统
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn print_entries(items: &[EntryItem]) {
    for item in items {
        println!("{}", item.name);
        for loc in &item.locations {
            println!("    {:<9} {}", loc.kind, loc.qualified_name);
            println!("              {}", loc.href);
        }
    }
}

fn cmd_search(
    config: &CatalogConfig,
    query: &str,
    site: Option<&str>,
    section: &str,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let mut store = open_store(config)?;

    let sites = match site {
        Some(path) => {
            let root = site_root(path)?;
            vec![(store.site_id(&root)?, root)]
        }
        None => store
            .db()
            .get_all_sites()?
            .into_iter()
            .map(|s| (s.id, PathBuf::from(s.root_path)))
            .collect(),
    };

    if sites.is_empty() {
        println!("No indexed sites. Run: doxsearch catalog index <path>");
        return Ok(());
    }

    let mut items = Vec::new();
    for (site_id, root) in &sites {
        let remaining = limit.saturating_sub(items.len());
        if remaining == 0 {
            break;
        }
        for entry in store.search(*site_id, section, query, remaining)? {
            items.push(entry_item(root, &entry));
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("No matches for '{}' in section {}", query, section);
    } else {
        println!("{} match(es) for '{}':\n", items.len(), query);
        print_entries(&items);
    }

    Ok(())
}

fn cmd_show(config: &CatalogConfig, name: &str, site: &str, section: &str, json: bool) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    let root = site_root(site)?;
    let site_id = store.site_id(&root)?;

    let entry = match store.lookup(site_id, section, name)? {
        Some(entry) => entry,
        None => {
            println!("Not found: {}", name);
            return Ok(());
        }
    };

    let item = entry_item(&root, &entry);
    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        print_entries(std::slice::from_ref(&item));
        println!();
        for loc in &item.locations {
            println!("  {}", loc.file);
        }
    }

    Ok(())
}

fn cmd_sites(config: &CatalogConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let sites = store.db().get_all_sites()?;

    if sites.is_empty() {
        println!("No indexed sites");
        return Ok(());
    }

    println!("Indexed sites:\n");
    for site in sites {
        let stats = store.db().site_stats(site.id)?;
        println!("  {} ({} entries)", site.name, stats.total_entries);
        println!("    {}", site.root_path);
        if let Some(ref time) = site.last_indexed_at {
            println!("    Indexed at: {}", time);
        }
    }

    Ok(())
}

fn cmd_status(config: &CatalogConfig, path: &str) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let root = site_root(path)?;

    let site = match store.db().get_site_by_path(&root.to_string_lossy())? {
        Some(site) => site,
        None => {
            println!("Site not indexed: {}", root.display());
            return Ok(());
        }
    };

    let stats = store.db().site_stats(site.id)?;
    println!("Site: {}", site.name);
    println!("Path: {}", site.root_path);
    if let Some(ref time) = site.last_indexed_at {
        println!("Indexed at: {}", time);
    }
    println!();
    println!("Search files: {}", stats.total_sources);
    println!("Entries: {}", stats.total_entries);

    let mut sections: Vec<_> = stats.entries_by_section.iter().collect();
    sections.sort();
    for (section, count) in sections {
        println!("  {}: {}", section, count);
    }

    println!("Anchors: {}", stats.total_anchors);
    let mut kinds: Vec<_> = stats.anchors_by_kind.iter().collect();
    kinds.sort();
    for (kind, count) in kinds {
        println!("  {}: {}", kind, count);
    }

    Ok(())
}

async fn cmd_check(path: &str, fragments: bool, json: bool) -> anyhow::Result<()> {
    let dir = SearchDir::open(Path::new(path))?;
    let loaded = dir.load().await?;
    let report = Validator::new(&dir).with_fragments(fragments).validate(&loaded)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Checked {} files, {} entries, {} anchors", report.files_checked, report.entries_checked, report.anchors_checked);
        if !fragments {
            println!("(fragments not checked, use --fragments)");
        }
        println!();
        for issue in &report.issues {
            println!("  {}", issue.describe());
        }
        if report.is_clean() {
            println!("No issues found");
        } else {
            println!();
            for (kind, count) in report.counts() {
                println!("  {}: {}", kind, count);
            }
        }
    }

    if !report.is_clean() {
        anyhow::bail!("{} issue(s) found", report.issues.len());
    }
    Ok(())
}

async fn cmd_export(path: &str, format: &str, section: &str, output: Option<&str>) -> anyhow::Result<()> {
    let dir = SearchDir::open(Path::new(path))?;
    let loaded = dir.load().await?;
    let index = SearchIndex::from_loaded(&loaded);
    let entries: Vec<SearchEntry> = index.entries(section).cloned().collect();

    if entries.is_empty() {
        anyhow::bail!("Section {} has no entries", section);
    }

    let text = match format {
        "json" => serde_json::to_string_pretty(&entries)?,
        "js" => write_search_data(&SearchData {
            variable: "searchData".to_string(),
            entries,
        }),
        _ => anyhow::bail!("Unsupported format: {}", format),
    };

    match output {
        Some(file) => {
            std::fs::write(file, text)?;
            println!("Saved to: {}", file);
        }
        None => println!("{}", text),
    }

    Ok(())
}
