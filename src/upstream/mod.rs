//! External video providers the relay fronts.
//!
//! The relay only talks to the [`SearchBackend`] and [`StreamResolver`]
//! traits; concrete providers translate their own wire formats into the raw
//! records below.

pub mod invidious;
pub mod ytdlp;

use crate::models::StreamFormat;
use async_trait::async_trait;
use thiserror::Error;

pub use invidious::InvidiousClient;
pub use ytdlp::YtDlp;

/// Failure talking to an upstream provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("upstream process failed: {0}")]
    Process(String),

    #[error("malformed upstream response: {0}")]
    Malformed(String),

    #[error("no audio-only format available for {0}")]
    NoAudioFormat(String),
}

/// A search hit as the backend reports it, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawVideo {
    pub id: String,
    pub title: String,
    /// Preformatted duration such as "3:35"
    pub timestamp: Option<String>,
    /// Secondary textual duration, used when `timestamp` is missing
    pub duration: Option<String>,
    pub thumbnail: Option<String>,
    pub author: Option<String>,
    pub views: Option<u64>,
    pub upload_date: Option<String>,
}

/// Video metadata and formats as the resolver reports them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawVideoInfo {
    pub title: String,
    /// Length in seconds, as text
    pub length_seconds: String,
    /// Ordered smallest to largest
    pub thumbnails: Vec<String>,
    pub author: Option<String>,
    pub formats: Vec<StreamFormat>,
}

/// Text search over the upstream catalogue.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Fetch one page of results for `query`, in upstream rank order.
    async fn search(&self, query: &str) -> Result<Vec<RawVideo>, UpstreamError>;
}

/// Per-video metadata and format resolution.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn resolve(&self, id: &str) -> Result<RawVideoInfo, UpstreamError>;
}

/// Format a length in seconds as "m:ss" or "h:mm:ss".
pub(crate) fn format_timestamp(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
