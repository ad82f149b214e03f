pub mod chromium;
pub mod dedup;
pub mod detail;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod extract;
pub mod parse;
pub mod profile;
pub mod search;

#[cfg(test)]
mod fake;

pub use chromium::{ChromiumLauncher, LaunchOptions};
pub use dedup::{MergeOutcome, ResultSet};
pub use detail::{build_record, DetailOutcome, DetailTiming, SkipReason};
pub use discovery::{discover_listings, Discovery, DiscoveryConfig, ListingHandle, Termination};
pub use driver::{BrowserSession, Locator, PageDriver, SessionLauncher, WaitOutcome};
pub use error::{DriverError, ScraperError};
pub use extract::{extract_field, extract_record, FieldValue};
pub use profile::{Field, FieldSpec, LocatorProfile, LocatorProfileError, LocatorStrategy, PostProcess};
pub use search::{run_search, search_with_driver, SearchOutcome, SearchReport, SearchSettings};
