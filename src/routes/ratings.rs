use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    cache::{sweeper::run_sweep, CacheStats},
    error::{AppError, AppResult},
    models::{MediaKind, ScoreResult, TitleQuery},
};

use super::AppState;

/// Upper bound on titles per batch request
const MAX_BATCH_SIZE: usize = 50;

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub rating: Option<ScoreResult>,
    /// False renders as "unavailable" on the client
    pub available: bool,
}

impl From<Option<ScoreResult>> for RatingResponse {
    fn from(rating: Option<ScoreResult>) -> Self {
        Self {
            available: rating.is_some(),
            rating,
        }
    }
}

/// Raw query string of the single-title lookup
///
/// Everything arrives as text so that an empty `year=` or `kind=` means "not given"
/// instead of a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct RatingParams {
    pub title: Option<String>,
    pub year: Option<String>,
    pub imdb_id: Option<String>,
    pub kind: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RatingParams {
    pub fn into_query(self) -> AppResult<TitleQuery> {
        let title = present(self.title)
            .ok_or_else(|| AppError::InvalidInput("title cannot be empty".to_string()))?;

        let year = present(self.year)
            .map(|year| {
                year.parse::<i32>()
                    .map_err(|_| AppError::InvalidInput(format!("invalid year {:?}", year)))
            })
            .transpose()?;

        let kind = present(self.kind)
            .map(|kind| kind.parse::<MediaKind>().map_err(AppError::InvalidInput))
            .transpose()?
            .unwrap_or_default();

        let mut query = TitleQuery::new(title, year).with_kind(kind);
        query.imdb_id = present(self.imdb_id);
        Ok(query)
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub titles: Vec<TitleQuery>,
}

/// Handler for single-title rating lookup
///
/// A title with no rating is a normal `200` with `available: false`.
pub async fn get_rating(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RatingParams>,
) -> AppResult<Json<RatingResponse>> {
    let query = params.into_query()?;
    let rating = state.resolver.resolve(&query).await;
    Ok(Json(rating.into()))
}

/// Handler for batch rating lookup; results keep the request order
pub async fn get_ratings_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> AppResult<Json<Vec<RatingResponse>>> {
    if request.titles.len() > MAX_BATCH_SIZE {
        return Err(AppError::InvalidInput(format!(
            "at most {} titles per batch",
            MAX_BATCH_SIZE
        )));
    }

    let results = state.resolver.resolve_many(request.titles).await;
    Ok(Json(results.into_iter().map(RatingResponse::from).collect()))
}

pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.resolver.cache().stats().await)
}

pub async fn sweep_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    let removed = run_sweep(state.resolver.cache()).await;
    Json(json!({ "removed": removed }))
}
