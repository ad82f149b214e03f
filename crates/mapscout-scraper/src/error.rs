use thiserror::Error;

/// Failure of a single rendering-engine call.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no element matches {locator}")]
    NotFound { locator: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("unsupported key \"{0}\"")]
    UnsupportedKey(String),

    #[error("page script failed: {0}")]
    Script(String),

    #[error("browser connection lost: {0}")]
    Disconnected(String),
}

impl DriverError {
    /// Returns `true` when the engine itself is gone and no further call on
    /// the session can succeed.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Disconnected(_))
    }
}

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        use chromiumoxide::error::CdpError;

        match err {
            CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
                DriverError::Disconnected(err.to_string())
            }
            CdpError::Timeout => DriverError::Timeout {
                operation: "cdp request".to_string(),
                timeout_ms: 0,
            },
            other => DriverError::Script(other.to_string()),
        }
    }
}

/// Errors that abort a whole search. Everything non-fatal (unresolved fields,
/// skipped records, stalled discovery) is absorbed before it reaches this type.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} timed out after {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: DriverError,
    },

    #[error("search box unavailable: {0}")]
    SearchInput(#[source] DriverError),

    #[error("no listings appeared within {timeout_secs}s")]
    ListingsTimeout { timeout_secs: u64 },

    #[error("rendering engine failure: {0}")]
    Engine(#[source] DriverError),
}

impl ScraperError {
    /// Wraps a driver error from a step whose failure ends the search.
    pub(crate) fn from_navigation(url: &str, err: DriverError) -> Self {
        match err {
            DriverError::Timeout { timeout_ms, .. } => ScraperError::NavigationTimeout {
                url: url.to_string(),
                timeout_secs: timeout_ms / 1000,
            },
            DriverError::Disconnected(_) => ScraperError::Engine(err),
            other => ScraperError::Navigation {
                url: url.to_string(),
                source: other,
            },
        }
    }
}
