use axum::{extract::State, Extension, Json};
use mapscout_core::{BusinessRecord, SearchQuery};
use mapscout_scraper::{run_search, ScraperError};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, AppState, ResponseMeta};

/// Request body. Field aliases accept the names older clients send.
#[derive(Debug, Deserialize)]
pub(super) struct SearchRequest {
    #[serde(alias = "municipality")]
    pub locality: String,
    #[serde(alias = "especiality", alias = "specialty")]
    pub category: String,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct SearchResponse {
    pub items: Vec<BusinessRecordView>,
    pub meta: ResponseMeta,
}

/// Flat JSON shape of one business.
#[derive(Debug, Serialize, PartialEq)]
pub(super) struct BusinessRecordView {
    pub name: String,
    pub address: String,
    pub website: String,
    pub phone_number: String,
    pub schedule: String,
    pub review_count: u64,
    pub review_average: f64,
    pub shopping: bool,
    pub pickup: bool,
    pub delivery: bool,
    pub category: String,
    pub intro: String,
    pub municipality: String,
}

impl From<BusinessRecord> for BusinessRecordView {
    fn from(record: BusinessRecord) -> Self {
        Self {
            name: record.name,
            address: record.address,
            website: record.website,
            phone_number: record.phone_number,
            schedule: record.schedule,
            review_count: record.review_count,
            review_average: record.review_average,
            shopping: record.service_flags.shopping,
            pickup: record.service_flags.pickup,
            delivery: record.service_flags.delivery,
            category: record.category,
            intro: record.intro,
            municipality: record.municipality,
        }
    }
}

/// Clamps a requested limit into `0..=max_limit`. Non-positive limits yield
/// zero, which short-circuits the search.
pub(super) fn effective_limit(requested: i64, max_limit: usize) -> usize {
    usize::try_from(requested).map_or(0, |limit| limit.min(max_limit))
}

fn validate(request_id: &str, body: &SearchRequest) -> Result<(), ApiError> {
    for (field, value) in [("locality", &body.locality), ("category", &body.category)] {
        if value.trim().is_empty() {
            return Err(ApiError::new(
                request_id,
                "validation_error",
                format!("{field} must not be blank"),
            ));
        }
    }
    Ok(())
}

fn map_scraper_error(request_id: String, error: &ScraperError) -> ApiError {
    tracing::error!(error = %error, "search failed");
    ApiError::new(request_id, "upstream_error", error.to_string())
}

pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let limit = effective_limit(body.limit, state.max_limit);
    if limit == 0 {
        return Ok(Json(SearchResponse {
            items: Vec::new(),
            meta: ResponseMeta::new(req_id.0),
        }));
    }
    validate(&req_id.0, &body)?;
    if body.limit > i64::try_from(state.max_limit).unwrap_or(i64::MAX) {
        tracing::debug!(requested = body.limit, max = state.max_limit, "limit clamped");
    }

    let query = SearchQuery {
        locality: body.locality.trim().to_string(),
        category: body.category.trim().to_string(),
        limit,
    };
    let outcome = run_search(
        state.launcher.as_ref(),
        &state.profile,
        &state.settings,
        &query,
    )
    .await
    .map_err(|e| map_scraper_error(req_id.0.clone(), &e))?;

    Ok(Json(SearchResponse {
        items: outcome
            .records
            .into_iter()
            .map(BusinessRecordView::from)
            .collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
