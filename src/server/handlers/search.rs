use crate::{
    error::{RelayError, Result},
    metrics,
    relay::DEFAULT_LIMIT,
    server::state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::time::Instant;
use tracing::error;

/// Query parameters for `GET /api/search`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    /// Kept as text so a bad value yields a JSON 400 instead of a rejection body
    limit: Option<String>,
}

impl SearchParams {
    fn limit(&self) -> Result<usize> {
        match self.limit.as_deref().map(str::trim) {
            None | Some("") => Ok(DEFAULT_LIMIT),
            Some(raw) => raw
                .parse()
                .map_err(|_| RelayError::InvalidInput("Invalid limit".to_string())),
        }
    }
}

/// Search upstream videos, served from cache when fresh
pub async fn search_videos(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response> {
    let start = Instant::now();

    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    let result = if query.is_empty() {
        Err(RelayError::InvalidInput("Query required".to_string()))
    } else {
        match params.limit() {
            Ok(limit) => state.search.search(query, limit).await,
            Err(e) => Err(e),
        }
    };

    metrics::record_duration("search", start);
    match result {
        Ok(videos) => {
            metrics::record_request("search", 200);
            Ok(Json(videos.as_slice()).into_response())
        }
        Err(e) => {
            if let RelayError::SearchFailed(details) = &e {
                error!("Search error: {}", details);
                metrics::record_request("search", 500);
            } else {
                metrics::record_request("search", 400);
            }
            Err(e)
        }
    }
}
