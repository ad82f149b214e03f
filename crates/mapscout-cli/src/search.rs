//! `search` command: one scrape, JSON on stdout, logs on stderr.

use std::path::PathBuf;

use mapscout_core::{AppConfig, BusinessRecord, SearchQuery};
use mapscout_scraper::{
    run_search, ChromiumLauncher, LaunchOptions, LocatorProfile, SearchReport, SearchSettings,
};
use serde::Serialize;

#[derive(Debug)]
pub(crate) struct SearchArgs {
    pub locality: String,
    pub category: String,
    pub limit: usize,
    pub pretty: bool,
    pub headed: bool,
    pub locators: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchOutput<'a> {
    pub items: &'a [BusinessRecord],
    pub report: &'a SearchReport,
}

/// Builds the query from CLI arguments, rejecting blank text.
pub(crate) fn build_query(args: &SearchArgs) -> anyhow::Result<SearchQuery> {
    let locality = args.locality.trim();
    let category = args.category.trim();
    if locality.is_empty() {
        anyhow::bail!("--locality must not be blank");
    }
    if category.is_empty() {
        anyhow::bail!("--category must not be blank");
    }
    Ok(SearchQuery {
        locality: locality.to_string(),
        category: category.to_string(),
        limit: args.limit,
    })
}

pub(crate) fn render(output: &SearchOutput<'_>, pretty: bool) -> anyhow::Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(output)?
    } else {
        serde_json::to_string(output)?
    };
    Ok(json)
}

/// Runs one search and prints `{ items, report }` to stdout.
///
/// # Errors
///
/// Returns an error for blank arguments, an unreadable locator profile, or a
/// fatal scraper failure.
pub(crate) async fn run_search_command(config: &AppConfig, args: SearchArgs) -> anyhow::Result<()> {
    let query = build_query(&args)?;
    let profile = LocatorProfile::load_or_default(args.locators.as_deref())?;

    let mut options = LaunchOptions::from_app_config(config);
    if args.headed {
        options.headless = false;
    }
    let launcher = ChromiumLauncher::new(options);
    let settings = SearchSettings::from_app_config(config);

    let outcome = run_search(&launcher, &profile, &settings, &query).await?;
    tracing::info!(
        returned = outcome.records.len(),
        requested = query.limit,
        "search complete"
    );

    let output = SearchOutput {
        items: &outcome.records,
        report: &outcome.report,
    };
    println!("{}", render(&output, args.pretty)?);
    Ok(())
}
