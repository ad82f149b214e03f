use std::fmt;
use std::time::Duration;

use mapscout_core::BusinessRecord;

use crate::discovery::ListingHandle;
use crate::driver::{PageDriver, WaitOutcome};
use crate::error::ScraperError;
use crate::extract::extract_record;
use crate::profile::LocatorProfile;

/// Why a listing produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Clicking the listing failed.
    ActivationFailed,
    /// The detail view did not render within the timeout.
    NotReady,
    /// The detail view rendered without a usable name.
    EmptyName,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::ActivationFailed => "activation_failed",
            SkipReason::NotReady => "not_ready",
            SkipReason::EmptyName => "empty_name",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    Record(BusinessRecord),
    Skipped(SkipReason),
}

/// Timing for a single detail view.
#[derive(Debug, Clone, Copy)]
pub struct DetailTiming {
    pub ready_timeout: Duration,
    /// Pause after the view is ready so lazily rendered sections appear.
    pub settle: Duration,
}

/// Opens one listing's detail view and extracts a record from it.
///
/// The handle is consumed. Per-listing failures become
/// [`DetailOutcome::Skipped`]; only a lost browser connection is an error.
///
/// # Errors
///
/// Returns [`ScraperError::Engine`] when the rendering engine is gone.
pub async fn build_record(
    driver: &dyn PageDriver,
    handle: ListingHandle,
    profile: &LocatorProfile,
    timing: DetailTiming,
    municipality: &str,
) -> Result<DetailOutcome, ScraperError> {
    let ListingHandle { ordinal, locator } = handle;

    if let Err(err) = driver.click(&locator).await {
        if err.is_fatal() {
            return Err(ScraperError::Engine(err));
        }
        tracing::warn!(ordinal, error = %err, "listing activation failed");
        return Ok(DetailOutcome::Skipped(SkipReason::ActivationFailed));
    }

    match driver
        .wait_for_selector(&profile.detail_ready, timing.ready_timeout)
        .await
    {
        Ok(WaitOutcome::Ready) => {}
        Ok(WaitOutcome::TimedOut) => {
            tracing::warn!(
                ordinal,
                timeout_ms = u64::try_from(timing.ready_timeout.as_millis()).unwrap_or(u64::MAX),
                "detail view not ready"
            );
            return Ok(DetailOutcome::Skipped(SkipReason::NotReady));
        }
        Err(err) if err.is_fatal() => return Err(ScraperError::Engine(err)),
        Err(err) => {
            tracing::warn!(ordinal, error = %err, "detail readiness check failed");
            return Ok(DetailOutcome::Skipped(SkipReason::NotReady));
        }
    }
    tokio::time::sleep(timing.settle).await;

    let record = extract_record(driver, &profile.fields, municipality).await?;
    if record.name_key().is_empty() {
        tracing::warn!(ordinal, "detail view has no name");
        return Ok(DetailOutcome::Skipped(SkipReason::EmptyName));
    }

    tracing::debug!(ordinal, name = record.name_key(), "record built");
    Ok(DetailOutcome::Record(record))
}
