//! scope subcommand - compound hierarchy of a documented site

use catalog::{CatalogConfig, SearchDir, SearchIndex};
use clap::Subcommand;
use scope::{MermaidGenerator, ScopeTree};
use searchdata::SearchEntry;
use std::path::Path;

#[derive(Subcommand)]
pub enum ScopeCommands {
    /// Print the namespace/class tree
    Tree {
        /// HTML root or its search/ directory
        path: String,
        /// Max depth
        #[arg(short, long, default_value = "3")]
        depth: usize,
        /// Search section
        #[arg(long)]
        section: Option<String>,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
    /// Generate Mermaid diagram
    Diagram {
        /// HTML root or its search/ directory
        path: String,
        /// Max nodes
        #[arg(long, default_value = "100")]
        max_nodes: usize,
        /// Search section
        #[arg(long)]
        section: Option<String>,
        /// Output file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List members documented more than once in the same compound
    Overloads {
        /// HTML root or its search/ directory
        path: String,
        /// Search section
        #[arg(long)]
        section: Option<String>,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(cmd: ScopeCommands) -> anyhow::Result<()> {
    let config = CatalogConfig::from_env();
    match cmd {
        ScopeCommands::Tree { path, depth, section, json } => {
            let section = section.unwrap_or(config.section);
            cmd_tree(&path, depth, &section, json).await
        }
        ScopeCommands::Diagram { path, max_nodes, section, output } => {
            let section = section.unwrap_or(config.section);
            cmd_diagram(&path, &section, max_nodes, output.as_deref()).await
        }
        ScopeCommands::Overloads { path, section, json } => {
            let section = section.unwrap_or(config.section);
            cmd_overloads(&path, &section, json).await
        }
    }
}

async fn build_tree(path: &str, section: &str) -> anyhow::Result<ScopeTree> {
    let dir = SearchDir::open(Path::new(path))?;
    let loaded = dir.load().await?;
    let index = SearchIndex::from_loaded(&loaded);
    let entries: Vec<SearchEntry> = index.entries(section).cloned().collect();
    if entries.is_empty() {
        anyhow::bail!("Section {} has no entries in {}", section, dir.search_path().display());
    }
    Ok(ScopeTree::build(&entries))
}

#[derive(serde::Serialize)]
struct TreeItem<'a> {
    depth: usize,
    name: &'a str,
    kind: Option<&'static str>,
    page: Option<&'a str>,
    members: usize,
}

async fn cmd_tree(path: &str, depth: usize, section: &str, json: bool) -> anyhow::Result<()> {
    let tree = build_tree(path, section).await?;
    let walked = tree.walk(depth);

    if json {
        let items: Vec<TreeItem> = walked
            .iter()
            .map(|(d, node)| TreeItem {
                depth: *d,
                name: &node.name,
                kind: node.kind.map(|k| k.as_str()),
                page: node.page.as_deref(),
                members: node.member_count(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    for (d, node) in &walked {
        let indent = "  ".repeat(*d);
        let kind = node.kind.map(|k| k.as_str()).unwrap_or("scope");
        match node.member_count() {
            0 => println!("{}{} [{}]", indent, node.short_name(), kind),
            n => println!("{}{} [{}] ({} members)", indent, node.short_name(), kind, n),
        }
    }

    let stats = tree.stats();
    println!();
    for (kind, count) in &stats.compounds_by_kind {
        println!("  {}: {}", kind, count);
    }
    if stats.implicit_compounds > 0 {
        println!("  implicit: {}", stats.implicit_compounds);
    }
    println!("  members: {}", stats.members);

    Ok(())
}

async fn cmd_diagram(path: &str, section: &str, max_nodes: usize, output: Option<&str>) -> anyhow::Result<()> {
    let tree = build_tree(path, section).await?;
    let mermaid = MermaidGenerator::new()
        .with_max_nodes(max_nodes)
        .generate_scope_diagram(&tree);

    match output {
        Some(file) => {
            std::fs::write(file, format!("```mermaid\n{}\n```\n", mermaid))?;
            println!("Saved to: {}", file);
        }
        None => println!("{}", mermaid),
    }

    Ok(())
}

async fn cmd_overloads(path: &str, section: &str, json: bool) -> anyhow::Result<()> {
    let tree = build_tree(path, section).await?;
    let overloads = tree.overloaded();

    if json {
        println!("{}", serde_json::to_string_pretty(&overloads)?);
        return Ok(());
    }

    if overloads.is_empty() {
        println!("No overloaded members");
        return Ok(());
    }

    println!("Overloaded members: {}\n", overloads.len());
    for o in &overloads {
        println!("  {}::{} ({})", o.compound, o.member, o.count);
        if let Some(members) = tree.members(&o.compound) {
            for m in members.get(&o.member).into_iter().flatten() {
                println!("      {}", m.signature);
            }
        }
    }

    Ok(())
}
