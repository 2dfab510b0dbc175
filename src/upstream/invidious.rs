//! Invidious-compatible HTTP API provider.
//!
//! Uses `GET /api/v1/search` for search and `GET /api/v1/videos/{id}` for
//! stream resolution. Any instance exposing the same JSON shapes works.

use super::{RawVideo, RawVideoInfo, SearchBackend, StreamResolver, UpstreamError, format_timestamp};
use crate::models::StreamFormat;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Invidious reports some numeric fields as strings and others as numbers.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
enum NumOrString {
    Num(u64),
    Text(String),
}

impl NumOrString {
    fn as_u64(&self) -> Option<u64> {
        match self {
            NumOrString::Num(n) => Some(*n),
            NumOrString::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Thumbnail {
    url: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    quality: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    #[serde(rename = "type")]
    kind: Option<String>,
    video_id: Option<String>,
    title: Option<String>,
    author: Option<String>,
    length_seconds: Option<NumOrString>,
    view_count: Option<NumOrString>,
    published_text: Option<String>,
    #[serde(default)]
    video_thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResponse {
    title: String,
    author: Option<String>,
    length_seconds: NumOrString,
    #[serde(default)]
    video_thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    adaptive_formats: Vec<AdaptiveFormat>,
    #[serde(default)]
    format_streams: Vec<MuxedFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdaptiveFormat {
    url: String,
    itag: Option<NumOrString>,
    #[serde(rename = "type")]
    mime: Option<String>,
    /// bits per second
    bitrate: Option<NumOrString>,
    clen: Option<NumOrString>,
    container: Option<String>,
    audio_quality: Option<String>,
    audio_sample_rate: Option<NumOrString>,
    audio_channels: Option<NumOrString>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MuxedFormat {
    url: String,
    itag: Option<NumOrString>,
    #[serde(rename = "type")]
    mime: Option<String>,
    container: Option<String>,
}

/// Split `audio/webm; codecs="opus"` into `("audio/webm", Some("opus"))`.
fn split_mime(raw: &str) -> (String, Option<String>) {
    let mut parts = raw.splitn(2, ';');
    let mime = parts.next().unwrap_or_default().trim().to_string();
    let codecs = parts.next().and_then(|rest| {
        rest.trim()
            .strip_prefix("codecs=")
            .map(|c| c.trim_matches('"').to_string())
    });
    (mime, codecs)
}

fn itag_text(itag: &Option<NumOrString>) -> Option<String> {
    itag.as_ref().map(|v| match v {
        NumOrString::Num(n) => n.to_string(),
        NumOrString::Text(s) => s.clone(),
    })
}

impl From<AdaptiveFormat> for StreamFormat {
    fn from(f: AdaptiveFormat) -> Self {
        let (mime_type, codecs) = f
            .mime
            .as_deref()
            .map(split_mime)
            .map_or((None, None), |(m, c)| (Some(m), c));
        let is_audio = mime_type.as_deref().is_some_and(|m| m.starts_with("audio/"));
        let is_video = mime_type.as_deref().is_some_and(|m| m.starts_with("video/"));

        StreamFormat {
            itag: itag_text(&f.itag),
            url: f.url,
            mime_type,
            container: f.container,
            codecs,
            has_audio: is_audio,
            has_video: is_video,
            audio_bitrate: if is_audio {
                f.bitrate
                    .and_then(|b| b.as_u64())
                    .map(|bps| u32::try_from(bps / 1000).unwrap_or(u32::MAX))
            } else {
                None
            },
            audio_quality: f.audio_quality,
            audio_sample_rate: f
                .audio_sample_rate
                .and_then(|r| r.as_u64())
                .and_then(|r| u32::try_from(r).ok()),
            audio_channels: f
                .audio_channels
                .and_then(|c| c.as_u64())
                .and_then(|c| u8::try_from(c).ok()),
            content_length: f.clen.and_then(|c| c.as_u64()),
        }
    }
}

impl From<MuxedFormat> for StreamFormat {
    fn from(f: MuxedFormat) -> Self {
        let (mime_type, codecs) = f
            .mime
            .as_deref()
            .map(split_mime)
            .map_or((None, None), |(m, c)| (Some(m), c));

        // Legacy progressive streams always carry both tracks
        StreamFormat {
            itag: itag_text(&f.itag),
            url: f.url,
            mime_type,
            container: f.container,
            codecs,
            has_audio: true,
            has_video: true,
            ..Default::default()
        }
    }
}

/// HTTP client for an Invidious-compatible API.
#[derive(Clone, Debug)]
pub struct InvidiousClient {
    http: Client,
    base: Url,
}

impl InvidiousClient {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// `timeout` applies per request; `None` keeps reqwest's default.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, UpstreamError> {
        let base = Url::parse(base_url)
            .map_err(|e| UpstreamError::Malformed(format!("invalid base URL {base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(UpstreamError::Malformed(format!(
                "base URL cannot carry a path: {base_url}"
            )));
        }

        let mut builder = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base,
        })
    }

    /// Build `{base}/api/v1/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Malformed("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, UpstreamError> {
        debug!("Invidious request: {}", url);
        let response = self.http.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| UpstreamError::Malformed(e.to_string()))
    }

    /// Resolve a possibly relative thumbnail URL against the instance base.
    fn absolute(&self, raw: &str) -> String {
        self.base
            .join(raw)
            .map(String::from)
            .unwrap_or_else(|_| raw.to_string())
    }

    fn pick_search_thumbnail(&self, thumbs: &[Thumbnail]) -> Option<String> {
        thumbs
            .iter()
            .find(|t| t.quality.as_deref() == Some("high"))
            .or_else(|| thumbs.first())
            .map(|t| self.absolute(&t.url))
    }
}

#[async_trait]
impl SearchBackend for InvidiousClient {
    async fn search(&self, query: &str) -> Result<Vec<RawVideo>, UpstreamError> {
        let url = self.endpoint(&["search"])?;
        let items: Vec<SearchItem> = self
            .get_json(url, &[("q", query), ("page", "1"), ("type", "video")])
            .await?;

        let videos = items
            .into_iter()
            .filter(|item| item.kind.as_deref().is_none_or(|k| k == "video"))
            .filter_map(|item| {
                let id = item.video_id?;
                Some(RawVideo {
                    thumbnail: self.pick_search_thumbnail(&item.video_thumbnails),
                    id,
                    title: item.title.unwrap_or_default(),
                    timestamp: item
                        .length_seconds
                        .and_then(|l| l.as_u64())
                        .map(format_timestamp),
                    duration: None,
                    author: item.author.filter(|a| !a.is_empty()),
                    views: item.view_count.and_then(|v| v.as_u64()),
                    upload_date: item.published_text,
                })
            })
            .collect();

        Ok(videos)
    }
}

#[async_trait]
impl StreamResolver for InvidiousClient {
    async fn resolve(&self, id: &str) -> Result<RawVideoInfo, UpstreamError> {
        let url = self.endpoint(&["videos", id])?;
        let video: VideoResponse = self.get_json(url, &[]).await?;

        // Invidious lists thumbnails largest first
        let mut thumbs = video.video_thumbnails;
        thumbs.sort_by_key(|t| t.width.unwrap_or(0));
        let thumbnails = thumbs.iter().map(|t| self.absolute(&t.url)).collect();

        let length_seconds = match video.length_seconds {
            NumOrString::Num(n) => n.to_string(),
            NumOrString::Text(s) => s,
        };

        let formats = video
            .adaptive_formats
            .into_iter()
            .map(StreamFormat::from)
            .chain(video.format_streams.into_iter().map(StreamFormat::from))
            .collect();

        Ok(RawVideoInfo {
            title: video.title,
            length_seconds,
            thumbnails,
            author: video.author,
            formats,
        })
    }
}
