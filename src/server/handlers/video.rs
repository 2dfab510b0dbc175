use crate::{
    error::{RelayError, Result},
    metrics,
    models::StreamInfo,
    server::state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
};
use std::time::Instant;
use tracing::error;

/// Resolve playback info and the best audio-only stream for a video
pub async fn video_info(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StreamInfo>> {
    let start = Instant::now();
    let result = state.streams.get_stream_info(&id).await;
    metrics::record_duration("video", start);

    match result {
        Ok(info) => {
            metrics::record_request("video", 200);
            Ok(Json(info))
        }
        Err(e) => {
            if let RelayError::StreamInfoFailed(details) = &e {
                error!("Video info error for {}: {}", id, details);
            }
            metrics::record_request("video", 500);
            Err(e)
        }
    }
}
