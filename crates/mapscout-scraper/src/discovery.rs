//! Listing discovery: scroll the results pane until enough listings have
//! materialized, the pane stops growing, or the iteration budget runs out.

use std::fmt;
use std::time::Duration;

use crate::driver::{Locator, PageDriver};
use crate::error::ScraperError;
use crate::profile::LocatorProfile;

/// Discovery tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
    pub iteration_budget: u32,
    /// Consecutive non-growing iterations that end discovery.
    pub stability_threshold: u32,
    pub overfetch_factor: u32,
    pub scroll_delta_px: u32,
    pub scroll_steps: u32,
    pub scroll_settle: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            iteration_budget: 20,
            stability_threshold: 3,
            overfetch_factor: 2,
            scroll_delta_px: 5000,
            scroll_steps: 1,
            scroll_settle: Duration::from_secs(1),
        }
    }
}

impl DiscoveryConfig {
    /// Listings to aim for: `limit` times the overfetch factor, so that
    /// duplicates and skipped listings still leave `limit` distinct records.
    #[must_use]
    pub fn target_count(&self, limit: usize) -> usize {
        limit.saturating_mul(self.overfetch_factor as usize)
    }
}

/// Why discovery stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// At least `target_count` listings are present.
    LimitReached,
    /// The pane reported that it has no more results.
    Converged,
    /// Growth stalled or the iteration budget ran out.
    Exhausted,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Termination::LimitReached => "limit_reached",
            Termination::Converged => "converged",
            Termination::Exhausted => "exhausted",
        })
    }
}

/// Counters for one discovery run. Pure: feed it raw counts, it decides when
/// to stop.
#[derive(Debug, Clone)]
pub struct DiscoveryState {
    target_count: usize,
    iteration_budget: u32,
    stability_threshold: u32,
    iteration: u32,
    observed_count: usize,
    previous_observed_count: usize,
    stable_iterations: u32,
    last_raw_count: usize,
}

impl DiscoveryState {
    #[must_use]
    pub fn new(target_count: usize, config: &DiscoveryConfig) -> Self {
        Self {
            target_count,
            iteration_budget: config.iteration_budget,
            stability_threshold: config.stability_threshold,
            iteration: 0,
            observed_count: 0,
            previous_observed_count: 0,
            stable_iterations: 0,
            last_raw_count: 0,
        }
    }

    /// Records one scroll/settle/count cycle and returns the terminal state
    /// if one was reached.
    ///
    /// `observed_count` never decreases even if the pane virtualizes and the
    /// raw count drops. Checks run in order: limit, end-of-list marker,
    /// stability, budget.
    pub fn observe(&mut self, raw_count: usize, end_of_list: bool) -> Option<Termination> {
        self.iteration += 1;
        self.last_raw_count = raw_count;
        self.observed_count = self.observed_count.max(raw_count);

        if self.observed_count >= self.target_count {
            return Some(Termination::LimitReached);
        }
        if end_of_list {
            return Some(Termination::Converged);
        }
        if self.observed_count == self.previous_observed_count {
            self.stable_iterations += 1;
            if self.stable_iterations >= self.stability_threshold {
                return Some(Termination::Exhausted);
            }
        } else {
            self.stable_iterations = 0;
            self.previous_observed_count = self.observed_count;
        }
        if self.iteration >= self.iteration_budget {
            return Some(Termination::Exhausted);
        }
        None
    }

    #[must_use]
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    #[must_use]
    pub fn observed_count(&self) -> usize {
        self.observed_count
    }

    #[must_use]
    pub fn stable_iterations(&self) -> u32 {
        self.stable_iterations
    }

    /// Number of handles to hand out: what is materialized now, capped at the
    /// target.
    fn handle_count(&self) -> usize {
        self.last_raw_count.min(self.target_count)
    }
}

/// Addresses one listing's container, by position in the listing pane.
///
/// Handles are consumed by value: each is activated at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct ListingHandle {
    pub ordinal: usize,
    pub locator: Locator,
}

impl ListingHandle {
    #[must_use]
    pub fn new(listing: &Locator, ordinal: usize) -> Self {
        Self {
            ordinal,
            locator: listing.nth(ordinal).parent(),
        }
    }
}

#[derive(Debug)]
pub struct Discovery {
    pub termination: Termination,
    pub iterations: u32,
    pub observed_count: usize,
    pub handles: Vec<ListingHandle>,
}

/// Scrolls the listing pane until a terminal state, then returns handles in
/// document order.
///
/// Scroll and count failures are logged and the iteration still counts
/// against the budget, so this always terminates. A failed count repeats the
/// previous count.
///
/// # Errors
///
/// Returns [`ScraperError::Engine`] only if the browser connection is lost.
pub async fn discover_listings(
    driver: &dyn PageDriver,
    profile: &LocatorProfile,
    config: &DiscoveryConfig,
    target_count: usize,
) -> Result<Discovery, ScraperError> {
    let mut state = DiscoveryState::new(target_count, config);
    let delta = f64::from(config.scroll_delta_px);

    let termination = loop {
        for _ in 0..config.scroll_steps {
            if let Err(err) = driver.scroll_by(0.0, delta).await {
                if err.is_fatal() {
                    return Err(ScraperError::Engine(err));
                }
                tracing::warn!(error = %err, "scroll failed");
            }
        }
        tokio::time::sleep(config.scroll_settle).await;

        let raw_count = match driver.count(&profile.listing).await {
            Ok(n) => n,
            Err(err) if err.is_fatal() => return Err(ScraperError::Engine(err)),
            Err(err) => {
                tracing::warn!(error = %err, "listing count failed; keeping last count");
                state.last_raw_count
            }
        };
        let end_of_list = match &profile.end_of_list {
            Some(marker) => match driver.count(marker).await {
                Ok(n) => n > 0,
                Err(err) if err.is_fatal() => return Err(ScraperError::Engine(err)),
                Err(_) => false,
            },
            None => false,
        };

        let outcome = state.observe(raw_count, end_of_list);
        tracing::debug!(
            iteration = state.iteration(),
            raw_count,
            observed = state.observed_count(),
            stable = state.stable_iterations(),
            "discovery iteration"
        );
        if let Some(termination) = outcome {
            break termination;
        }
    };

    let handles = (0..state.handle_count())
        .map(|ordinal| ListingHandle::new(&profile.listing, ordinal))
        .collect::<Vec<_>>();

    tracing::info!(
        %termination,
        iterations = state.iteration(),
        observed = state.observed_count(),
        handles = handles.len(),
        target_count,
        "listing discovery finished"
    );

    Ok(Discovery {
        termination,
        iterations: state.iteration(),
        observed_count: state.observed_count(),
        handles,
    })
}
