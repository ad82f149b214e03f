//! Locator profiles: which elements to look for and how to read them.
//!
//! The built-in profile targets the Google Maps web UI. Because that markup
//! changes without notice, a profile can also be loaded from YAML and swapped
//! in without rebuilding.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::Locator;

#[derive(Debug, Error)]
pub enum LocatorProfileError {
    #[error("failed to read locator profile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse locator profile: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid locator profile: {0}")]
    Invalid(String),
}

/// Record fields a profile can populate. `municipality` is not listed: it
/// comes from the request, not the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Address,
    Website,
    PhoneNumber,
    Schedule,
    ReviewCount,
    ReviewAverage,
    ServiceFlags,
    Category,
    Intro,
}

impl Field {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Address => "address",
            Field::Website => "website",
            Field::PhoneNumber => "phone_number",
            Field::Schedule => "schedule",
            Field::ReviewCount => "review_count",
            Field::ReviewAverage => "review_average",
            Field::ServiceFlags => "service_flags",
            Field::Category => "category",
            Field::Intro => "intro",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, Field::ReviewCount | Field::ReviewAverage)
    }
}

/// How raw element text becomes a field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostProcess {
    /// First matched element's text, trimmed, whitespace runs folded to one
    /// space.
    Identity,
    /// First numeric substring; integer for counts, decimal for averages.
    NumericParse,
    /// Split on bullet separators and classify each token as a service flag.
    CompositeSplit,
    /// Every matched element's text, normalized and joined.
    FirstMatchJoin {
        #[serde(default = "default_separator")]
        separator: String,
    },
}

fn default_separator() -> String {
    "; ".to_string()
}

/// One candidate locator. A strategy "resolves" when it matches at least one
/// element with non-blank text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorStrategy {
    pub locator: Locator,
    /// Overrides the rule's join separator for this strategy only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

impl LocatorStrategy {
    #[must_use]
    pub fn new(locator: &str) -> Self {
        Self {
            locator: Locator::new(locator),
            separator: None,
        }
    }

    #[must_use]
    pub fn joined_by(locator: &str, separator: &str) -> Self {
        Self {
            locator: Locator::new(locator),
            separator: Some(separator.to_string()),
        }
    }
}

/// Ordered locator strategies plus the rule applied to whichever resolves
/// first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: Field,
    pub strategies: Vec<LocatorStrategy>,
    pub rule: PostProcess,
    /// Toggle clicked once when the first strategy comes up empty, e.g. the
    /// collapsed opening-hours table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal: Option<Locator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorProfile {
    /// Free-text search box on the map page.
    pub search_input: Locator,
    /// Anchor of each result in the listing pane. Handles address the
    /// anchor's parent container.
    pub listing: Locator,
    /// Element whose presence means a detail view has rendered.
    pub detail_ready: Locator,
    /// "End of list" marker shown once the pane has nothing more to load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_of_list: Option<Locator>,
    pub fields: Vec<FieldSpec>,
}

impl LocatorProfile {
    /// Parses and validates a YAML profile.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorProfileError::Parse`] for malformed YAML and
    /// [`LocatorProfileError::Invalid`] when the profile is unusable.
    pub fn from_yaml(yaml: &str) -> Result<Self, LocatorProfileError> {
        let profile: LocatorProfile = serde_yaml::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Reads a YAML profile from disk.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorProfileError::Io`] if the file cannot be read, plus
    /// everything [`LocatorProfile::from_yaml`] can return.
    pub fn load(path: &Path) -> Result<Self, LocatorProfileError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| LocatorProfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Loads `path` when given, otherwise the built-in Google Maps profile.
    ///
    /// # Errors
    ///
    /// See [`LocatorProfile::load`].
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, LocatorProfileError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::google_maps()),
        }
    }

    /// # Errors
    ///
    /// Returns [`LocatorProfileError::Invalid`] naming the first problem found.
    pub fn validate(&self) -> Result<(), LocatorProfileError> {
        let invalid = |msg: String| Err(LocatorProfileError::Invalid(msg));

        for (name, locator) in [
            ("search_input", &self.search_input),
            ("listing", &self.listing),
            ("detail_ready", &self.detail_ready),
        ] {
            if locator.is_blank() {
                return invalid(format!("{name} locator is empty"));
            }
        }
        if self.end_of_list.as_ref().is_some_and(Locator::is_blank) {
            return invalid("end_of_list locator is empty".to_string());
        }

        let mut seen = HashSet::new();
        for spec in &self.fields {
            let field = spec.field.as_str();
            if !seen.insert(spec.field) {
                return invalid(format!("field {field} is defined more than once"));
            }
            if spec.strategies.is_empty() {
                return invalid(format!("field {field} has no locator strategies"));
            }
            if spec.strategies.iter().any(|s| s.locator.is_blank()) {
                return invalid(format!("field {field} has an empty locator"));
            }
            match (&spec.rule, spec.field) {
                (PostProcess::NumericParse, f) if !f.is_numeric() => {
                    return invalid(format!("numeric_parse cannot populate {field}"));
                }
                (PostProcess::CompositeSplit, f) if f != Field::ServiceFlags => {
                    return invalid(format!("composite_split cannot populate {field}"));
                }
                (rule, Field::ServiceFlags) if *rule != PostProcess::CompositeSplit => {
                    return invalid("service_flags requires composite_split".to_string());
                }
                _ => {}
            }
        }
        if !seen.contains(&Field::Name) {
            return invalid("profile must define the name field".to_string());
        }
        Ok(())
    }

    /// Field spec for `field`, if the profile defines one.
    #[must_use]
    pub fn field(&self, field: Field) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.field == field)
    }

    /// Locators for the Google Maps web UI as rendered for a desktop viewport.
    #[must_use]
    pub fn google_maps() -> Self {
        let identity = |field: Field, strategies: Vec<LocatorStrategy>| FieldSpec {
            field,
            strategies,
            rule: PostProcess::Identity,
            reveal: None,
        };

        Self {
            search_input: Locator::new(r#"//input[@id="searchboxinput"]"#),
            listing: Locator::new(r#"//a[contains(@href, "https://www.google.com/maps/place")]"#),
            detail_ready: Locator::new(r#"//div[@class="TIHn2 "]//h1[@class="DUwDvf lfPIob"]"#),
            end_of_list: Some(Locator::new(r#"//span[@class="HlvSq"]"#)),
            fields: vec![
                identity(
                    Field::Name,
                    vec![
                        LocatorStrategy::new(r#"//div[@class="TIHn2 "]//h1[@class="DUwDvf lfPIob"]"#),
                        LocatorStrategy::new(r#"//h1[contains(@class, "DUwDvf")]"#),
                    ],
                ),
                identity(
                    Field::Address,
                    vec![LocatorStrategy::new(
                        r#"//button[@data-item-id="address"]//div[contains(@class, "fontBodyMedium")]"#,
                    )],
                ),
                identity(
                    Field::Website,
                    vec![LocatorStrategy::new(
                        r#"//a[@data-item-id="authority"]//div[contains(@class, "fontBodyMedium")]"#,
                    )],
                ),
                identity(
                    Field::PhoneNumber,
                    vec![LocatorStrategy::new(
                        r#"//button[contains(@data-item-id, "phone:tel:")]//div[contains(@class, "fontBodyMedium")]"#,
                    )],
                ),
                FieldSpec {
                    field: Field::Schedule,
                    strategies: vec![
                        LocatorStrategy::joined_by(r#"//table[contains(@class, "eK4R0e")]//tr"#, "; "),
                        LocatorStrategy::joined_by(
                            r#"//div[contains(@class, "OMl5r")]//span[contains(@class, "ZDu9vd")]//span"#,
                            " ",
                        ),
                        LocatorStrategy::new(
                            r#"//button[contains(@data-item-id, "oh")]//div[contains(@class, "fontBodyMedium")]"#,
                        ),
                    ],
                    rule: PostProcess::FirstMatchJoin {
                        separator: default_separator(),
                    },
                    reveal: Some(Locator::new(r#"//div[contains(@class, "OMl5r")]"#)),
                },
                FieldSpec {
                    field: Field::ReviewCount,
                    strategies: vec![
                        LocatorStrategy::new(
                            r#"//div[contains(@class, "F7nice")]//span[contains(@aria-label, "review") or contains(@aria-label, "reseña")]"#,
                        ),
                        LocatorStrategy::new(r#"//div[contains(@class, "F7nice")]/span[2]"#),
                    ],
                    rule: PostProcess::NumericParse,
                    reveal: None,
                },
                FieldSpec {
                    field: Field::ReviewAverage,
                    strategies: vec![LocatorStrategy::new(
                        r#"//div[contains(@class, "F7nice")]//span[@aria-hidden="true"]"#,
                    )],
                    rule: PostProcess::NumericParse,
                    reveal: None,
                },
                FieldSpec {
                    field: Field::ServiceFlags,
                    strategies: vec![
                        LocatorStrategy::new(r#"//div[@class="LTs0Rc"]"#),
                        LocatorStrategy::new(r#"//div[contains(@class, "E0DTEd")]"#),
                    ],
                    rule: PostProcess::CompositeSplit,
                    reveal: None,
                },
                identity(
                    Field::Category,
                    vec![LocatorStrategy::new(r#"//button[contains(@jsaction, "category")]"#)],
                ),
                identity(
                    Field::Intro,
                    vec![LocatorStrategy::new(r#"//div[contains(@class, "PYvSYb")]"#)],
                ),
            ],
        }
    }
}
