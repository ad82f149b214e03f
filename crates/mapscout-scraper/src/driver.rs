//! The seam between the scraping logic and the rendering engine.
//!
//! Everything above this module speaks in [`Locator`]s and [`PageDriver`]
//! calls; only [`crate::chromium`] knows about CDP.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DriverError, ScraperError};

/// Interval between polls in the default [`PageDriver::wait_for_selector`].
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An XPath expression addressing zero or more elements in the live page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    #[must_use]
    pub fn new(xpath: impl Into<String>) -> Self {
        Self(xpath.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `index`-th (zero-based) element matched by this locator, in
    /// document order.
    #[must_use]
    pub fn nth(&self, index: usize) -> Self {
        Self(format!("({})[{}]", self.0, index + 1))
    }

    /// The parent element of whatever this locator matches.
    #[must_use]
    pub fn parent(&self) -> Self {
        Self(format!("{}/..", self.0))
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Result of waiting for an element; running out of time is an expected
/// outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
}

/// Operations the scraper needs from a live page.
///
/// Implementations own a single tab. Calls are issued sequentially by one
/// search; `Sync` is only required so the driver can sit behind `&dyn`.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Loads `url` and waits for the document to finish loading.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Focuses the first match, clears it, and types `text`.
    async fn fill_input(&self, locator: &Locator, text: &str) -> Result<(), DriverError>;

    /// Presses and releases a named key (`"Enter"`, `"Escape"`, `"Tab"`).
    async fn press_key(&self, key: &str) -> Result<(), DriverError>;

    /// Number of elements currently matched.
    async fn count(&self, locator: &Locator) -> Result<usize, DriverError>;

    /// Mouse-wheel scroll at the current pointer position.
    async fn scroll_by(&self, delta_x: f64, delta_y: f64) -> Result<(), DriverError>;

    async fn click(&self, locator: &Locator) -> Result<(), DriverError>;

    async fn hover(&self, locator: &Locator) -> Result<(), DriverError>;

    /// Rendered text of the first match.
    async fn read_text(&self, locator: &Locator) -> Result<String, DriverError>;

    /// Rendered text of every match, in document order.
    async fn read_all_texts(&self, locator: &Locator) -> Result<Vec<String>, DriverError>;

    /// Polls [`PageDriver::count`] until something matches or `timeout`
    /// elapses. Count failures other than a lost connection are treated as
    /// "not there yet".
    async fn wait_for_selector(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<WaitOutcome, DriverError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.count(locator).await {
                Ok(n) if n > 0 => return Ok(WaitOutcome::Ready),
                Ok(_) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => tracing::trace!(%locator, error = %err, "wait poll failed"),
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }
}

/// A launched engine instance with one page open.
#[async_trait]
pub trait BrowserSession: Send {
    fn driver(&self) -> &dyn PageDriver;

    /// Shuts the engine down. Errors are logged, never returned: a search
    /// result must not be lost because teardown failed.
    async fn close(self: Box<Self>);
}

/// Creates one [`BrowserSession`] per search.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScraperError>;
}
