//! Field extraction: walk a field's locator strategies in order and post-process
//! the first one that yields text.

use mapscout_core::{BusinessRecord, ServiceFlags};

use crate::driver::{Locator, PageDriver};
use crate::error::{DriverError, ScraperError};
use crate::parse::{classify_services, collapse_whitespace, join_texts, parse_average, parse_count};
use crate::profile::{Field, FieldSpec, PostProcess};

/// A post-processed field value. `Unresolved` means no strategy matched
/// (or the matched text did not parse); the record keeps its default.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Count(u64),
    Average(f64),
    Flags(ServiceFlags),
    Unresolved,
}

/// Texts from the first strategy that matched something non-blank, plus the
/// separator that strategy asked for.
struct Resolved {
    texts: Vec<String>,
    separator: Option<String>,
}

/// Resolves one field.
///
/// Non-fatal driver errors on a strategy are logged and the next strategy is
/// tried. A lost connection aborts the search.
///
/// # Errors
///
/// Returns [`ScraperError::Engine`] only when the rendering engine is gone.
pub async fn extract_field(
    driver: &dyn PageDriver,
    spec: &FieldSpec,
) -> Result<FieldValue, ScraperError> {
    let Some(resolved) = resolve(driver, spec).await? else {
        tracing::debug!(field = spec.field.as_str(), "no strategy matched");
        return Ok(FieldValue::Unresolved);
    };
    Ok(post_process(spec, &resolved))
}

/// Runs every spec against the current detail view and assembles a record.
/// `municipality` is stamped verbatim.
///
/// # Errors
///
/// Returns [`ScraperError::Engine`] when the rendering engine is gone.
pub async fn extract_record(
    driver: &dyn PageDriver,
    specs: &[FieldSpec],
    municipality: &str,
) -> Result<BusinessRecord, ScraperError> {
    let mut record = BusinessRecord {
        municipality: municipality.to_string(),
        ..BusinessRecord::default()
    };
    for spec in specs {
        let value = extract_field(driver, spec).await?;
        assign(&mut record, spec.field, value);
    }
    Ok(record)
}

async fn resolve(
    driver: &dyn PageDriver,
    spec: &FieldSpec,
) -> Result<Option<Resolved>, ScraperError> {
    for (index, strategy) in spec.strategies.iter().enumerate() {
        let mut texts = query(driver, &strategy.locator, &spec.rule).await?;

        if texts.is_empty() && index == 0 {
            if let Some(toggle) = &spec.reveal {
                if reveal(driver, toggle).await? {
                    texts = query(driver, &strategy.locator, &spec.rule).await?;
                }
            }
        }

        if !texts.is_empty() {
            tracing::debug!(
                field = spec.field.as_str(),
                strategy = index,
                matches = texts.len(),
                "field resolved"
            );
            return Ok(Some(Resolved {
                texts,
                separator: strategy.separator.clone(),
            }));
        }
    }
    Ok(None)
}

/// Non-blank texts for `locator`. Rules that only use the first match read a
/// single element.
async fn query(
    driver: &dyn PageDriver,
    locator: &Locator,
    rule: &PostProcess,
) -> Result<Vec<String>, ScraperError> {
    let result = match rule {
        PostProcess::Identity | PostProcess::NumericParse => {
            driver.read_text(locator).await.map(|text| vec![text])
        }
        PostProcess::CompositeSplit | PostProcess::FirstMatchJoin { .. } => {
            driver.read_all_texts(locator).await
        }
    };

    match result {
        Ok(texts) => Ok(texts
            .into_iter()
            .filter(|text| !text.trim().is_empty())
            .collect()),
        Err(DriverError::NotFound { .. }) => Ok(Vec::new()),
        Err(err) if err.is_fatal() => Err(ScraperError::Engine(err)),
        Err(err) => {
            tracing::debug!(%locator, error = %err, "locator query failed");
            Ok(Vec::new())
        }
    }
}

/// Clicks `toggle` once if present. Returns whether a click happened.
async fn reveal(driver: &dyn PageDriver, toggle: &Locator) -> Result<bool, ScraperError> {
    let present = match driver.count(toggle).await {
        Ok(n) => n > 0,
        Err(err) if err.is_fatal() => return Err(ScraperError::Engine(err)),
        Err(_) => false,
    };
    if !present {
        return Ok(false);
    }
    match driver.click(toggle).await {
        Ok(()) => Ok(true),
        Err(err) if err.is_fatal() => Err(ScraperError::Engine(err)),
        Err(err) => {
            tracing::debug!(%toggle, error = %err, "reveal toggle click failed");
            Ok(false)
        }
    }
}

fn post_process(spec: &FieldSpec, resolved: &Resolved) -> FieldValue {
    let first = resolved.texts.first().map_or("", String::as_str);
    match &spec.rule {
        PostProcess::Identity => text_value(collapse_whitespace(first)),
        PostProcess::NumericParse => match spec.field {
            Field::ReviewAverage => parse_average(first).map_or(FieldValue::Unresolved, FieldValue::Average),
            _ => parse_count(first).map_or(FieldValue::Unresolved, FieldValue::Count),
        },
        PostProcess::CompositeSplit => FieldValue::Flags(classify_services(&resolved.texts)),
        PostProcess::FirstMatchJoin { separator } => {
            let separator = resolved.separator.as_deref().unwrap_or(separator);
            text_value(join_texts(&resolved.texts, separator))
        }
    }
}

fn text_value(text: String) -> FieldValue {
    if text.is_empty() {
        FieldValue::Unresolved
    } else {
        FieldValue::Text(text)
    }
}

/// Writes `value` into the record slot for `field`. Mismatched shapes (text
/// for a numeric field and so on) are parsed where possible, otherwise
/// ignored.
fn assign(record: &mut BusinessRecord, field: Field, value: FieldValue) {
    let text = match value {
        FieldValue::Unresolved => return,
        FieldValue::Count(n) => {
            match field {
                Field::ReviewCount => record.review_count = n,
                #[allow(clippy::cast_precision_loss)]
                Field::ReviewAverage => record.review_average = n as f64,
                _ => {}
            }
            return;
        }
        FieldValue::Average(avg) => {
            if field == Field::ReviewAverage {
                record.review_average = avg;
            }
            return;
        }
        FieldValue::Flags(flags) => {
            if field == Field::ServiceFlags {
                record.service_flags = flags;
            }
            return;
        }
        FieldValue::Text(text) => text,
    };

    match field {
        Field::Name => record.name = text,
        Field::Address => record.address = text,
        Field::Website => record.website = text,
        Field::PhoneNumber => record.phone_number = text,
        Field::Schedule => record.schedule = text,
        Field::Category => record.category = text,
        Field::Intro => record.intro = text,
        Field::ReviewCount => record.review_count = parse_count(&text).unwrap_or_default(),
        Field::ReviewAverage => record.review_average = parse_average(&text).unwrap_or_default(),
        Field::ServiceFlags => record.service_flags = classify_services(&[text]),
    }
}
