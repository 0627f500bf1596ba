//! yt-dlp client
//!
//! Every call runs one yt-dlp process under the configured timeout. Failed
//! runs are retried with exponential backoff (`base`, `2 * base`, ...).

use crate::config::ResolverConfig;
use crate::error::{ResolverError, Result};
use crate::runner::{CommandRunner, ProcessRunner};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Metadata of one video as yt-dlp reports it
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub url: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration_sec: Option<f64>,
}

#[derive(Clone)]
pub struct YtDlp {
    program: String,
    timeout: Duration,
    retries: u32,
    base_delay: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl YtDlp {
    pub fn new(config: &ResolverConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner))
    }

    pub fn with_runner(config: &ResolverConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: config.ytdlp_path.clone(),
            timeout: config.timeout,
            retries: config.retries,
            base_delay: config.retry_base_delay,
            runner,
        }
    }

    /// Metadata for a single video (`-J --no-playlist`)
    pub async fn single(&self, url: &str) -> Result<MediaInfo> {
        let meta = self.json(&["-J", "--no-playlist", "--", url]).await?;
        media_info(&meta, Some(url)).ok_or_else(|| ResolverError::NoMedia(url.to_string()))
    }

    /// Entries of a playlist (`-J`), skipping unusable ones
    pub async fn playlist(&self, url: &str) -> Result<Vec<MediaInfo>> {
        let meta = self.json(&["-J", "--", url]).await?;
        Ok(entries(&meta))
    }

    /// First `count` search hits for `query`
    pub async fn search(&self, query: &str, count: usize) -> Result<Vec<MediaInfo>> {
        let target = format!("ytsearch{}:{}", count.max(1), query);
        let meta = self.json(&["-J", "--flat-playlist", "--skip-download", "--", &target]).await?;
        Ok(entries(&meta))
    }

    /// Direct media URL of the best audio format (`-g`)
    pub async fn direct_url(&self, url: &str) -> Result<String> {
        self.with_retry(|| async move {
            let stdout = self.run_once(&["-f", "bestaudio/best", "-g", "--", url]).await?;
            stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .last()
                .map(str::to_string)
                .ok_or_else(|| ResolverError::NoMedia(url.to_string()))
        })
        .await
    }

    /// Run yt-dlp and parse its stdout as JSON
    pub async fn json(&self, args: &[&str]) -> Result<Value> {
        self.with_retry(|| async move {
            let stdout = self.run_once(args).await?;
            Ok(serde_json::from_str(&stdout)?)
        })
        .await
    }

    async fn run_once(&self, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
        debug!(program = %self.program, ?args, "running yt-dlp");
        let out = self.runner.run(&self.program, &args, self.timeout).await?;
        if !out.success {
            return Err(ResolverError::Failed {
                code: out.code,
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(out.stdout)
    }

    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retries && e.is_retryable() => {
                    let delay = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
                    warn!(attempt = attempt + 1, ?delay, error = %e, "yt-dlp failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Read one video's metadata; `fallback_url` stands in for a missing URL
pub fn media_info(meta: &Value, fallback_url: Option<&str>) -> Option<MediaInfo> {
    let url = entry_url(meta).or_else(|| fallback_url.map(str::to_string))?;
    let title = ["title", "fulltitle"]
        .iter()
        .find_map(|field| meta.get(*field).and_then(Value::as_str))
        .filter(|t| !t.trim().is_empty())
        .map_or_else(|| url.clone(), str::to_string);
    let thumbnail = meta
        .get("thumbnails")
        .and_then(Value::as_array)
        .and_then(|thumbs| thumbs.iter().rev().find_map(|t| t.get("url").and_then(Value::as_str)))
        .or_else(|| meta.get("thumbnail").and_then(Value::as_str))
        .map(str::to_string)
        .or_else(|| guess_thumbnail(&url));
    let duration_sec = meta
        .get("duration")
        .and_then(Value::as_f64)
        .filter(|d| d.is_finite() && *d > 0.0);

    Some(MediaInfo {
        url,
        title,
        thumbnail,
        duration_sec,
    })
}

/// Usable entries of a playlist or search result
pub fn entries(meta: &Value) -> Vec<MediaInfo> {
    meta.get("entries")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|entry| entry.is_object())
                .filter_map(|entry| media_info(entry, None))
                .collect()
        })
        .unwrap_or_default()
}

fn entry_url(entry: &Value) -> Option<String> {
    if let Some(url) = entry.get("webpage_url").and_then(Value::as_str) {
        return Some(url.to_string());
    }
    if let Some(url) = entry.get("url").and_then(Value::as_str) {
        if url.starts_with("http") {
            return Some(url.to_string());
        }
    }
    entry
        .get("id")
        .and_then(Value::as_str)
        .map(|id| format!("https://www.youtube.com/watch?v={}", id))
}

/// YouTube's standard thumbnail for watch URLs
pub fn guess_thumbnail(url: &str) -> Option<String> {
    crate::query::youtube_video_id(url).map(|id| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id))
}
