//! doxsearch - Doxygen search index toolkit

mod catalog_cli;
mod scope_cli;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "doxsearch")]
#[command(about = "Doxygen search index toolkit", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index, search and check search data
    #[command(subcommand)]
    Catalog(catalog_cli::CatalogCommands),
    /// Scope overview of documented symbols
    #[command(subcommand)]
    Scope(scope_cli::ScopeCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Catalog(cmd) => catalog_cli::run(cmd).await?,
        Commands::Scope(cmd) => scope_cli::run(cmd).await?,
    }

    Ok(())
}
