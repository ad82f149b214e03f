//! Scripted in-memory [`PageDriver`] for unit tests.
//!
//! The page is a map from locator string to element texts. Clicking a
//! registered listing handle swaps in that listing's detail view; clicking a
//! registered reveal toggle adds hidden elements. Listing counts follow a
//! script that advances once per scroll.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::driver::{Locator, PageDriver, WaitOutcome};
use crate::error::DriverError;

type Elements = HashMap<String, Vec<String>>;

#[derive(Default)]
struct State {
    elements: Elements,
    reveals: HashMap<String, (String, Vec<String>)>,
    details: HashMap<String, Elements>,
    listing: Option<String>,
    initial_listings: usize,
    listing_script: Vec<usize>,
    end_marker: Option<(String, usize)>,
    failing_clicks: HashSet<String>,
    failing_reads: HashMap<String, usize>,
    failing_navigations: HashSet<String>,
    disconnected: bool,

    scrolls: usize,
    clicks: Vec<String>,
    hovers: Vec<String>,
    navigations: Vec<String>,
    typed: Vec<(String, String)>,
    keys: Vec<String>,
}

impl State {
    fn listing_count(&self) -> usize {
        if self.scrolls == 0 || self.listing_script.is_empty() {
            return self.initial_listings;
        }
        let index = (self.scrolls - 1).min(self.listing_script.len() - 1);
        self.listing_script[index]
    }

    /// `Script` error for reads of a locator registered as failing once
    /// enough scrolls have happened.
    fn check_read(&self, locator: &Locator) -> Result<(), DriverError> {
        match self.failing_reads.get(locator.as_str()) {
            Some(&after) if self.scrolls >= after => Err(DriverError::Script(format!(
                "evaluation failed for {locator}"
            ))),
            _ => Ok(()),
        }
    }

    fn count(&self, locator: &str) -> usize {
        if self.listing.as_deref() == Some(locator) {
            return self.listing_count();
        }
        if let Some((marker, after)) = &self.end_marker {
            if marker == locator {
                return usize::from(self.scrolls >= *after);
            }
        }
        self.elements.get(locator).map_or(0, Vec::len)
    }
}

fn elements(entries: &[(&str, &[&str])]) -> Elements {
    entries
        .iter()
        .map(|(locator, texts)| {
            (
                (*locator).to_string(),
                texts.iter().map(|t| (*t).to_string()).collect(),
            )
        })
        .collect()
}

#[derive(Default)]
pub(crate) struct FakePage {
    state: Mutex<State>,
}

impl FakePage {
    pub(crate) fn with_elements(entries: &[(&str, &[&str])]) -> Self {
        Self {
            state: Mutex::new(State {
                elements: elements(entries),
                ..State::default()
            }),
        }
    }

    fn edit(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.lock());
        self
    }

    /// Clicking `toggle` makes `texts` appear under `locator`.
    pub(crate) fn with_reveal(self, toggle: &str, locator: &str, texts: &[&str]) -> Self {
        let hidden = (
            locator.to_string(),
            texts.iter().map(|t| (*t).to_string()).collect(),
        );
        self.edit(|s| {
            s.reveals.insert(toggle.to_string(), hidden);
        })
    }

    /// `locator` matches `initial` elements before any scroll, then
    /// `after_scrolls[i]` after scroll `i + 1` (the last value repeats).
    pub(crate) fn with_listings(self, locator: &str, initial: usize, after_scrolls: &[usize]) -> Self {
        self.edit(|s| {
            s.listing = Some(locator.to_string());
            s.initial_listings = initial;
            s.listing_script = after_scrolls.to_vec();
        })
    }

    /// `locator` matches one element once `after` scrolls have happened.
    pub(crate) fn with_end_marker(self, locator: &str, after: usize) -> Self {
        self.edit(|s| s.end_marker = Some((locator.to_string(), after)))
    }

    /// Clicking `handle` replaces the page with `entries`.
    pub(crate) fn with_detail(self, handle: &Locator, entries: &[(&str, &[&str])]) -> Self {
        let view = elements(entries);
        self.edit(|s| {
            s.details.insert(handle.to_string(), view);
        })
    }

    pub(crate) fn with_failing_click(self, locator: &Locator) -> Self {
        self.edit(|s| {
            s.failing_clicks.insert(locator.to_string());
        })
    }

    /// Counts and reads of `locator` fail with a non-fatal script error once
    /// `after_scrolls` scrolls have happened (0: always).
    pub(crate) fn with_failing_reads(self, locator: &str, after_scrolls: usize) -> Self {
        self.edit(|s| {
            s.failing_reads.insert(locator.to_string(), after_scrolls);
        })
    }

    pub(crate) fn with_failing_navigation(self, url: &str) -> Self {
        self.edit(|s| {
            s.failing_navigations.insert(url.to_string());
        })
    }

    pub(crate) fn disconnected(self) -> Self {
        self.edit(|s| s.disconnected = true)
    }

    pub(crate) fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    pub(crate) fn hovers(&self) -> Vec<String> {
        self.lock().hovers.clone()
    }

    pub(crate) fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub(crate) fn typed(&self) -> Vec<(String, String)> {
        self.lock().typed.clone()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.lock().keys.clone()
    }

    pub(crate) fn scrolls(&self) -> usize {
        self.lock().scrolls
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake page state poisoned")
    }

    fn live(&self) -> Result<MutexGuard<'_, State>, DriverError> {
        let state = self.lock();
        if state.disconnected {
            return Err(DriverError::Disconnected("fake page closed".to_string()));
        }
        Ok(state)
    }
}

fn not_found(locator: &Locator) -> DriverError {
    DriverError::NotFound {
        locator: locator.to_string(),
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        let mut state = self.live()?;
        state.navigations.push(url.to_string());
        if state.failing_navigations.contains(url) {
            return Err(DriverError::Timeout {
                operation: format!("navigate to {url}"),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
        Ok(())
    }

    async fn fill_input(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let mut state = self.live()?;
        if state.count(locator.as_str()) == 0 {
            return Err(not_found(locator));
        }
        state.typed.push((locator.to_string(), text.to_string()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        self.live()?.keys.push(key.to_string());
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError> {
        let state = self.live()?;
        state.check_read(locator)?;
        Ok(state.count(locator.as_str()))
    }

    async fn scroll_by(&self, _delta_x: f64, _delta_y: f64) -> Result<(), DriverError> {
        self.live()?.scrolls += 1;
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        let mut state = self.live()?;
        let key = locator.to_string();
        state.clicks.push(key.clone());

        if state.failing_clicks.contains(&key) {
            return Err(not_found(locator));
        }
        if let Some(view) = state.details.get(&key).cloned() {
            state.elements = view;
            return Ok(());
        }
        if let Some((hidden, texts)) = state.reveals.get(&key).cloned() {
            state.elements.insert(hidden, texts);
            return Ok(());
        }
        if state.count(&key) == 0 {
            return Err(not_found(locator));
        }
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> Result<(), DriverError> {
        self.live()?.hovers.push(locator.to_string());
        Ok(())
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, DriverError> {
        let state = self.live()?;
        state.check_read(locator)?;
        state
            .elements
            .get(locator.as_str())
            .and_then(|texts| texts.first().cloned())
            .ok_or_else(|| not_found(locator))
    }

    async fn read_all_texts(&self, locator: &Locator) -> Result<Vec<String>, DriverError> {
        let state = self.live()?;
        state.check_read(locator)?;
        Ok(state
            .elements
            .get(locator.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn wait_for_selector(
        &self,
        locator: &Locator,
        _timeout: Duration,
    ) -> Result<WaitOutcome, DriverError> {
        if self.live()?.count(locator.as_str()) > 0 {
            Ok(WaitOutcome::Ready)
        } else {
            Ok(WaitOutcome::TimedOut)
        }
    }
}
