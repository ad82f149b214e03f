use serde::{Deserialize, Serialize};

/// One search request: what to look for, where, and how many distinct
/// businesses to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub locality: String,
    pub category: String,
    pub limit: usize,
}

impl SearchQuery {
    /// Renders the text typed into the map's search box.
    ///
    /// `template` carries `{category}` and `{locality}` placeholders, e.g.
    /// `"{category} en {locality}"`.
    #[must_use]
    pub fn search_term(&self, template: &str) -> String {
        template
            .replace("{category}", self.category.trim())
            .replace("{locality}", self.locality.trim())
    }
}

/// Shopping/pickup/delivery availability advertised on a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFlags {
    pub shopping: bool,
    pub pickup: bool,
    pub delivery: bool,
}

/// A business extracted from one listing's detail view.
///
/// `name` is the natural key used for deduplication and is never empty once a
/// record leaves the scraper. Every other field defaults to empty/zero when the
/// detail view does not expose it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub name: String,
    pub address: String,
    pub website: String,
    pub phone_number: String,
    /// Weekly opening hours, or the live status line when no table is shown.
    pub schedule: String,
    pub review_count: u64,
    pub review_average: f64,
    pub service_flags: ServiceFlags,
    pub category: String,
    /// Short editorial description shown under the title.
    pub intro: String,
    pub municipality: String,
}

impl BusinessRecord {
    /// Deduplication key: the name with surrounding whitespace removed.
    #[must_use]
    pub fn name_key(&self) -> &str {
        self.name.trim()
    }

    #[must_use]
    pub fn has_schedule(&self) -> bool {
        !self.schedule.trim().is_empty()
    }
}
