use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// A latitude/longitude pair used to pin the browser's reported location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub maps_url: String,
    pub warmup_url: Option<String>,
    pub query_template: String,
    pub locale: String,
    pub timezone: String,
    pub geolocation: Option<GeoPoint>,
    pub navigation_timeout_secs: u64,
    pub listings_timeout_secs: u64,
    pub detail_timeout_secs: u64,
    pub search_settle_ms: u64,
    pub scroll_settle_ms: u64,
    pub detail_settle_ms: u64,
    pub scroll_delta_px: u32,
    pub scroll_steps: u32,
    pub iteration_budget: u32,
    pub stability_threshold: u32,
    pub overfetch_factor: u32,
    pub max_limit: u32,
    pub locators_path: Option<PathBuf>,
}
