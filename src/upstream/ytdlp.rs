//! yt-dlp subprocess provider.
//!
//! Search runs `yt-dlp --flat-playlist --dump-single-json ytsearchN:<query>`;
//! resolution runs `yt-dlp --dump-single-json --no-playlist <watch url>`.
//! Only the fields the relay needs are deserialized, all optional because
//! older videos may lack metadata.

use super::{RawVideo, RawVideoInfo, SearchBackend, StreamResolver, UpstreamError, format_timestamp};
use crate::models::StreamFormat;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use url::Url;

const WATCH_URL: &str = "https://www.youtube.com/watch";

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SearchPlaylist {
    entries: Option<Vec<FlatEntry>>,
}

#[derive(Debug, Deserialize)]
struct FlatEntry {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    duration_string: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    view_count: Option<u64>,
    upload_date: Option<String>,
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    title: Option<String>,
    duration: Option<f64>,
    channel: Option<String>,
    uploader: Option<String>,
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    formats: Vec<FormatInfo>,
}

#[derive(Debug, Deserialize)]
struct FormatInfo {
    format_id: Option<String>,
    url: Option<String>,
    ext: Option<String>,
    acodec: Option<String>,
    vcodec: Option<String>,
    abr: Option<f64>,
    asr: Option<u32>,
    audio_channels: Option<u8>,
    format_note: Option<String>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
}

/// `"none"` is yt-dlp's marker for an absent track.
fn real_codec(codec: Option<String>) -> Option<String> {
    codec.filter(|c| !c.is_empty() && c != "none")
}

impl FormatInfo {
    fn into_stream_format(self) -> Option<StreamFormat> {
        let url = self.url?;
        let acodec = real_codec(self.acodec);
        let vcodec = real_codec(self.vcodec);
        let has_audio = acodec.is_some();
        let has_video = vcodec.is_some();

        let mime_type = self.ext.as_deref().map(|ext| {
            let kind = if has_video { "video" } else { "audio" };
            format!("{kind}/{ext}")
        });
        let codecs = match (&vcodec, &acodec) {
            (Some(v), Some(a)) => Some(format!("{v}, {a}")),
            (Some(v), None) => Some(v.clone()),
            (None, Some(a)) => Some(a.clone()),
            (None, None) => None,
        };

        Some(StreamFormat {
            itag: self.format_id,
            url,
            mime_type,
            container: self.ext,
            codecs,
            has_audio,
            has_video,
            audio_bitrate: self.abr.filter(|_| has_audio).map(|abr| abr.round() as u32),
            audio_quality: self.format_note.filter(|_| has_audio),
            audio_sample_rate: self.asr,
            audio_channels: self.audio_channels,
            content_length: self.filesize.or(self.filesize_approx),
        })
    }
}

/// Runs the yt-dlp executable for search and resolution.
#[derive(Clone, Debug)]
pub struct YtDlp {
    program: PathBuf,
    page_size: usize,
    timeout: Option<Duration>,
}

impl YtDlp {
    /// `page_size` is how many results one search requests.
    pub fn new(program: impl Into<PathBuf>, page_size: usize, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            page_size: page_size.max(1),
            timeout,
        }
    }

    /// Run yt-dlp with `args` and parse its stdout as JSON.
    async fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, UpstreamError> {
        debug!("Running {} {:?}", self.program.display(), args);

        let mut command = Command::new(&self.program);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);
        let child = command.output();

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child).await.map_err(|_| {
                UpstreamError::Process(format!("yt-dlp timed out after {}s", limit.as_secs()))
            })?,
            None => child.await,
        }
        .map_err(|e| {
            UpstreamError::Process(format!("failed to run {}: {}", self.program.display(), e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UpstreamError::Process(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| UpstreamError::Malformed(e.to_string()))
    }
}

fn parse_search(playlist: SearchPlaylist) -> Result<Vec<RawVideo>, UpstreamError> {
    let entries = playlist
        .entries
        .ok_or_else(|| UpstreamError::Malformed("search result has no entries".into()))?;

    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let id = entry.id?;
            Some(RawVideo {
                id,
                title: entry.title.unwrap_or_default(),
                timestamp: entry.duration_string,
                duration: entry
                    .duration
                    .filter(|d| *d >= 0.0)
                    .map(|d| format_timestamp(d.round() as u64)),
                // Last listed thumbnail is the best one
                thumbnail: entry.thumbnails.into_iter().next_back().map(|t| t.url),
                author: entry.channel.or(entry.uploader),
                views: entry.view_count,
                upload_date: entry.upload_date,
            })
        })
        .collect())
}

fn parse_video(info: VideoInfo) -> Result<RawVideoInfo, UpstreamError> {
    let duration = info
        .duration
        .ok_or_else(|| UpstreamError::Malformed("video has no duration".into()))?;

    Ok(RawVideoInfo {
        title: info.title.unwrap_or_default(),
        length_seconds: (duration.max(0.0).round() as u64).to_string(),
        thumbnails: info.thumbnails.into_iter().map(|t| t.url).collect(),
        author: info.channel.or(info.uploader),
        formats: info
            .formats
            .into_iter()
            .filter_map(FormatInfo::into_stream_format)
            .collect(),
    })
}

#[async_trait]
impl SearchBackend for YtDlp {
    async fn search(&self, query: &str) -> Result<Vec<RawVideo>, UpstreamError> {
        let target = format!("ytsearch{}:{}", self.page_size, query);
        let playlist: SearchPlaylist = self
            .run_json(&[
                "--flat-playlist",
                "--dump-single-json",
                "--no-warnings",
                "--",
                target.as_str(),
            ])
            .await?;
        parse_search(playlist)
    }
}

#[async_trait]
impl StreamResolver for YtDlp {
    async fn resolve(&self, id: &str) -> Result<RawVideoInfo, UpstreamError> {
        let watch = Url::parse_with_params(WATCH_URL, &[("v", id)])
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;
        let info: VideoInfo = self
            .run_json(&[
                "--dump-single-json",
                "--no-playlist",
                "--no-warnings",
                "--",
                watch.as_str(),
            ])
            .await?;
        parse_video(info)
    }
}
