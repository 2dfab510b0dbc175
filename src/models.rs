use serde::{Deserialize, Serialize};

/// Artist name used when the upstream record carries no author.
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Duration marker used when the upstream record carries no duration at all.
pub const ZERO_DURATION: &str = "0:00";

/// A search result as returned to clients. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedVideo {
    pub id: String,
    pub title: String,
    /// Human-readable, e.g. "3:35"
    pub duration: String,
    #[serde(rename = "thumbnail", skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub artist: String,
    #[serde(rename = "views", skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
}

/// A single downloadable/streamable variant of a video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFormat {
    /// itag or yt-dlp format id
    pub itag: Option<String>,
    pub url: String,
    pub mime_type: Option<String>,
    pub container: Option<String>,
    pub codecs: Option<String>,
    pub has_audio: bool,
    pub has_video: bool,
    /// Average audio bitrate in kbps
    pub audio_bitrate: Option<u32>,
    pub audio_quality: Option<String>,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u8>,
    pub content_length: Option<u64>,
}

impl StreamFormat {
    /// Audio track present, no video track.
    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }
}

/// Resolved playback information for one video. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub id: String,
    pub title: String,
    #[serde(rename = "duration")]
    pub duration_seconds: u64,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    pub artist: String,
    pub stream_url: String,
    #[serde(rename = "formats")]
    pub available_formats: Vec<StreamFormat>,
}

/// Liveness payload for `GET /api/health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub server: &'static str,
    /// ISO-8601 UTC
    pub timestamp: String,
    pub cache_size: usize,
}
