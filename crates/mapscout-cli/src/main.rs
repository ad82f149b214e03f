mod search;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mapscout-cli")]
#[command(about = "Run map listing searches from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search one locality for businesses of one category and print JSON
    Search {
        /// Locality (city, neighbourhood) to search in
        #[arg(long)]
        locality: String,
        /// Business category, e.g. "pizzeria"
        #[arg(long)]
        category: String,
        /// Maximum number of distinct businesses to return
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
        /// Show the browser window regardless of `MAPSCOUT_HEADLESS`
        #[arg(long)]
        headed: bool,
        /// YAML locator profile; overrides `MAPSCOUT_LOCATORS_PATH`
        #[arg(long, env = "MAPSCOUT_LOCATORS_PATH")]
        locators: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = mapscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Search {
            locality,
            category,
            limit,
            pretty,
            headed,
            locators,
        } => {
            let args = search::SearchArgs {
                locality,
                category,
                limit,
                pretty,
                headed,
                locators,
            };
            search::run_search_command(&config, args).await?;
        }
    }

    Ok(())
}
