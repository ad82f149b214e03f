//! One end-to-end search: open the map, run the query, discover listings,
//! build records and deduplicate them.

use std::time::Duration;

use mapscout_core::{AppConfig, BusinessRecord, SearchQuery};
use serde::Serialize;

use crate::dedup::{MergeOutcome, ResultSet};
use crate::detail::{build_record, DetailOutcome, DetailTiming};
use crate::discovery::{discover_listings, DiscoveryConfig, Termination};
use crate::driver::{PageDriver, SessionLauncher, WaitOutcome};
use crate::error::ScraperError;
use crate::profile::LocatorProfile;

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub maps_url: String,
    /// Visited before the map so the session looks like an ordinary browse.
    pub warmup_url: Option<String>,
    pub query_template: String,
    pub navigation_timeout: Duration,
    pub listings_timeout: Duration,
    pub search_settle: Duration,
    pub detail: DetailTiming,
    pub discovery: DiscoveryConfig,
}

impl SearchSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            maps_url: config.maps_url.clone(),
            warmup_url: config.warmup_url.clone(),
            query_template: config.query_template.clone(),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            listings_timeout: Duration::from_secs(config.listings_timeout_secs),
            search_settle: Duration::from_millis(config.search_settle_ms),
            detail: DetailTiming {
                ready_timeout: Duration::from_secs(config.detail_timeout_secs),
                settle: Duration::from_millis(config.detail_settle_ms),
            },
            discovery: DiscoveryConfig {
                iteration_budget: config.iteration_budget,
                stability_threshold: config.stability_threshold,
                overfetch_factor: config.overfetch_factor,
                scroll_delta_px: config.scroll_delta_px,
                scroll_steps: config.scroll_steps,
                scroll_settle: Duration::from_millis(config.scroll_settle_ms),
            },
        }
    }
}

/// Counters describing how a search went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    /// `None` when discovery never ran (limit of zero).
    pub termination: Option<String>,
    pub discovery_iterations: u32,
    pub handles_discovered: usize,
    pub listings_visited: usize,
    pub records_built: usize,
    pub records_skipped: usize,
    pub duplicates_merged: usize,
    pub duplicates_dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub records: Vec<BusinessRecord>,
    pub report: SearchReport,
}

/// Launches a session, runs the search, and always closes the session.
///
/// A limit of zero returns an empty outcome without launching anything.
///
/// # Errors
///
/// Returns [`ScraperError`] when the browser cannot launch or a fatal step
/// fails (see [`search_with_driver`]).
pub async fn run_search(
    launcher: &dyn SessionLauncher,
    profile: &LocatorProfile,
    settings: &SearchSettings,
    query: &SearchQuery,
) -> Result<SearchOutcome, ScraperError> {
    if query.limit == 0 {
        return Ok(SearchOutcome::default());
    }

    let session = launcher.launch().await?;
    let result = search_with_driver(session.driver(), profile, settings, query).await;
    session.close().await;
    result
}

/// Runs a search on an already-open page.
///
/// # Errors
///
/// - [`ScraperError::NavigationTimeout`] / [`ScraperError::Navigation`] if the
///   map page does not load.
/// - [`ScraperError::SearchInput`] if the query cannot be entered.
/// - [`ScraperError::ListingsTimeout`] if no listing appears.
/// - [`ScraperError::Engine`] if the browser connection is lost.
pub async fn search_with_driver(
    driver: &dyn PageDriver,
    profile: &LocatorProfile,
    settings: &SearchSettings,
    query: &SearchQuery,
) -> Result<SearchOutcome, ScraperError> {
    if query.limit == 0 {
        return Ok(SearchOutcome::default());
    }
    let term = query.search_term(&settings.query_template);
    tracing::info!(
        locality = %query.locality,
        category = %query.category,
        limit = query.limit,
        %term,
        "starting search"
    );

    if let Some(url) = &settings.warmup_url {
        match driver.navigate(url, settings.navigation_timeout).await {
            Ok(()) => tokio::time::sleep(settings.search_settle).await,
            Err(err) if err.is_fatal() => return Err(ScraperError::Engine(err)),
            Err(err) => tracing::warn!(%url, error = %err, "warmup navigation failed"),
        }
    }

    driver
        .navigate(&settings.maps_url, settings.navigation_timeout)
        .await
        .map_err(|err| ScraperError::from_navigation(&settings.maps_url, err))?;
    tokio::time::sleep(settings.search_settle).await;

    submit_query(driver, profile, &term).await?;
    wait_for_listings(driver, profile, settings.listings_timeout).await?;

    if let Err(err) = driver.hover(&profile.listing.nth(0)).await {
        if err.is_fatal() {
            return Err(ScraperError::Engine(err));
        }
        tracing::debug!(error = %err, "could not hover first listing");
    }

    let target_count = settings.discovery.target_count(query.limit);
    let discovery = discover_listings(driver, profile, &settings.discovery, target_count).await?;

    let mut report = SearchReport {
        termination: Some(discovery.termination.to_string()),
        discovery_iterations: discovery.iterations,
        handles_discovered: discovery.handles.len(),
        ..SearchReport::default()
    };
    let mut results = ResultSet::new(query.limit);

    for handle in discovery.handles {
        if results.is_full() {
            break;
        }
        report.listings_visited += 1;
        match build_record(driver, handle, profile, settings.detail, &query.locality).await? {
            DetailOutcome::Record(record) => {
                report.records_built += 1;
                match results.offer(record) {
                    MergeOutcome::ScheduleFilled => report.duplicates_merged += 1,
                    MergeOutcome::Duplicate => report.duplicates_dropped += 1,
                    MergeOutcome::Inserted | MergeOutcome::Rejected | MergeOutcome::Full => {}
                }
            }
            DetailOutcome::Skipped(reason) => {
                report.records_skipped += 1;
                tracing::debug!(%reason, "listing skipped");
            }
        }
    }

    if discovery.termination != Termination::LimitReached && results.len() < query.limit {
        tracing::info!(
            found = results.len(),
            limit = query.limit,
            "fewer distinct businesses than requested"
        );
    }
    tracing::info!(
        termination = report.termination.as_deref().unwrap_or("none"),
        handles = report.handles_discovered,
        visited = report.listings_visited,
        built = report.records_built,
        skipped = report.records_skipped,
        merged = report.duplicates_merged,
        dropped = report.duplicates_dropped,
        returned = results.len(),
        "search finished"
    );

    Ok(SearchOutcome {
        records: results.into_records(),
        report,
    })
}

async fn submit_query(
    driver: &dyn PageDriver,
    profile: &LocatorProfile,
    term: &str,
) -> Result<(), ScraperError> {
    let classify = |err: crate::error::DriverError| {
        if err.is_fatal() {
            ScraperError::Engine(err)
        } else {
            ScraperError::SearchInput(err)
        }
    };
    driver
        .fill_input(&profile.search_input, term)
        .await
        .map_err(classify)?;
    driver.press_key("Enter").await.map_err(classify)
}

async fn wait_for_listings(
    driver: &dyn PageDriver,
    profile: &LocatorProfile,
    timeout: Duration,
) -> Result<(), ScraperError> {
    match driver.wait_for_selector(&profile.listing, timeout).await {
        Ok(WaitOutcome::Ready) => Ok(()),
        Ok(WaitOutcome::TimedOut) => Err(ScraperError::ListingsTimeout {
            timeout_secs: timeout.as_secs(),
        }),
        Err(err) => Err(ScraperError::Engine(err)),
    }
}

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;
