//! Per-video stream resolution.
//!
//! Never cached: upstream stream URLs are signed and expire, so every call
//! re-resolves.

use crate::{
    error::{RelayError, Result},
    metrics,
    models::{StreamFormat, StreamInfo, UNKNOWN_ARTIST},
    upstream::{RawVideoInfo, StreamResolver, UpstreamError},
};
use std::sync::Arc;
use tracing::{info, warn};

/// Pick the best audio-only format: highest bitrate, then highest sample rate.
pub fn select_audio_format(formats: &[StreamFormat]) -> Option<&StreamFormat> {
    formats
        .iter()
        .filter(|f| f.is_audio_only())
        .max_by_key(|f| (f.audio_bitrate.unwrap_or(0), f.audio_sample_rate.unwrap_or(0)))
}

/// Assemble the client-facing payload from a resolver record.
fn build_stream_info(id: &str, raw: RawVideoInfo) -> std::result::Result<StreamInfo, UpstreamError> {
    let duration_seconds = raw.length_seconds.trim().parse::<u64>().map_err(|_| {
        UpstreamError::Malformed(format!("invalid length '{}'", raw.length_seconds))
    })?;

    // Thumbnails are ordered smallest to largest
    let thumbnail_url = raw
        .thumbnails
        .last()
        .cloned()
        .ok_or_else(|| UpstreamError::Malformed("no thumbnails".to_string()))?;

    let stream_url = select_audio_format(&raw.formats)
        .map(|f| f.url.clone())
        .ok_or_else(|| UpstreamError::NoAudioFormat(id.to_string()))?;

    let available_formats = raw.formats.into_iter().filter(|f| f.has_audio).collect();

    Ok(StreamInfo {
        id: id.to_string(),
        title: raw.title,
        duration_seconds,
        thumbnail_url,
        artist: raw.author.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        stream_url,
        available_formats,
    })
}

/// Stream info relay. Holds no state beyond the resolver.
#[derive(Clone)]
pub struct StreamRelay {
    resolver: Arc<dyn StreamResolver>,
}

impl StreamRelay {
    pub fn new(resolver: Arc<dyn StreamResolver>) -> Self {
        Self { resolver }
    }

    /// Resolve `id` and select its best audio-only stream.
    ///
    /// # Errors
    /// [`RelayError::StreamInfoFailed`] on any resolver failure or when the
    /// response cannot be assembled. No retry.
    pub async fn get_stream_info(&self, id: &str) -> Result<StreamInfo> {
        info!("Resolving stream info for: {}", id);

        let result = self.resolver.resolve(id).await;

        result.and_then(|raw| build_stream_info(id, raw)).map_err(|e| {
            warn!("Stream resolution failed for {}: {}", id, e);
            metrics::record_upstream_error("stream");
            RelayError::StreamInfoFailed(e.to_string())
        })
    }
}
