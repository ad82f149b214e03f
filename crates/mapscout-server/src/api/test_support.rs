//! Fake launchers for router tests. No browser is started.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mapscout_scraper::{
    BrowserSession, DetailTiming, DiscoveryConfig, DriverError, Field, Locator, LocatorProfile,
    PageDriver, ScraperError, SearchSettings, SessionLauncher,
};

use super::AppState;

pub(crate) const TEST_MAX_LIMIT: usize = 5;

pub(crate) fn test_settings() -> SearchSettings {
    SearchSettings {
        maps_url: "https://www.google.com/maps".to_string(),
        warmup_url: None,
        query_template: "{category} en {locality}".to_string(),
        navigation_timeout: Duration::from_secs(1),
        listings_timeout: Duration::from_secs(1),
        search_settle: Duration::ZERO,
        detail: DetailTiming {
            ready_timeout: Duration::from_millis(10),
            settle: Duration::ZERO,
        },
        discovery: DiscoveryConfig {
            iteration_budget: 3,
            scroll_settle: Duration::ZERO,
            ..DiscoveryConfig::default()
        },
    }
}

fn state_with(launcher: Arc<dyn SessionLauncher>) -> AppState {
    AppState {
        launcher,
        profile: Arc::new(LocatorProfile::google_maps()),
        settings: Arc::new(test_settings()),
        max_limit: TEST_MAX_LIMIT,
    }
}

/// A launcher that always fails; also counts launch attempts.
#[derive(Default)]
pub(crate) struct FailingLauncher {
    pub launches: AtomicUsize,
}

#[async_trait]
impl SessionLauncher for FailingLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScraperError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Err(ScraperError::Launch("chrome executable not found".to_string()))
    }
}

pub(crate) fn failing_state() -> AppState {
    state_with(Arc::new(FailingLauncher::default()))
}

pub(crate) fn failing_state_with(launcher: Arc<FailingLauncher>) -> AppState {
    state_with(launcher)
}

pub(crate) fn empty_state() -> AppState {
    state_with(Arc::new(StaticLauncher::new(&[])))
}

/// Serves the same static page to every session: one listing per business
/// name, and a detail view that always shows the first name.
pub(crate) struct StaticLauncher {
    page: Arc<StaticPage>,
}

impl StaticLauncher {
    pub(crate) fn new(names: &[&str]) -> Self {
        let profile = LocatorProfile::google_maps();
        let mut elements = HashMap::new();
        elements.insert(profile.search_input.to_string(), vec![String::new()]);
        if let Some(first) = names.first() {
            let name_locator = profile
                .field(Field::Name)
                .map(|spec| spec.strategies[0].locator.to_string())
                .unwrap_or_default();
            elements.insert(profile.detail_ready.to_string(), vec![(*first).to_string()]);
            elements.insert(name_locator, vec![(*first).to_string()]);
        }
        Self {
            page: Arc::new(StaticPage {
                listing: profile.listing,
                listings: names.len(),
                elements,
            }),
        }
    }
}

#[async_trait]
impl SessionLauncher for StaticLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScraperError> {
        Ok(Box::new(StaticSession {
            page: Arc::clone(&self.page),
        }))
    }
}

pub(crate) fn static_state(names: &[&str]) -> AppState {
    state_with(Arc::new(StaticLauncher::new(names)))
}

struct StaticSession {
    page: Arc<StaticPage>,
}

#[async_trait]
impl BrowserSession for StaticSession {
    fn driver(&self) -> &dyn PageDriver {
        self.page.as_ref()
    }

    async fn close(self: Box<Self>) {}
}

struct StaticPage {
    listing: Locator,
    listings: usize,
    elements: HashMap<String, Vec<String>>,
}

impl StaticPage {
    fn matches(&self, locator: &Locator) -> usize {
        if *locator == self.listing {
            return self.listings;
        }
        self.elements.get(locator.as_str()).map_or(0, Vec::len)
    }
}

#[async_trait]
impl PageDriver for StaticPage {
    async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn fill_input(&self, _locator: &Locator, _text: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn press_key(&self, _key: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError> {
        Ok(self.matches(locator))
    }

    async fn scroll_by(&self, _delta_x: f64, _delta_y: f64) -> Result<(), DriverError> {
        Ok(())
    }

    async fn click(&self, _locator: &Locator) -> Result<(), DriverError> {
        Ok(())
    }

    async fn hover(&self, _locator: &Locator) -> Result<(), DriverError> {
        Ok(())
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, DriverError> {
        self.elements
            .get(locator.as_str())
            .and_then(|texts| texts.first().cloned())
            .ok_or_else(|| DriverError::NotFound {
                locator: locator.to_string(),
            })
    }

    async fn read_all_texts(&self, locator: &Locator) -> Result<Vec<String>, DriverError> {
        Ok(self
            .elements
            .get(locator.as_str())
            .cloned()
            .unwrap_or_default())
    }
}
