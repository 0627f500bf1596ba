//! Stream preparation
//!
//! Turns a resolved track into a direct media URL and describes the ffmpeg
//! pipeline that transcodes it to 48 kHz stereo Opus.

use crate::cache::TtlCache;
use crate::config::ResolverConfig;
use crate::ytdlp::YtDlp;
use async_trait::async_trait;
use discodj_core::{AudioFilter, AudioResource, DjError, ResourceFactory, Track};
use tracing::debug;

pub struct StreamResourceFactory {
    ytdlp: YtDlp,
    direct_urls: TtlCache<String, String>,
}

impl StreamResourceFactory {
    pub fn new(config: &ResolverConfig, ytdlp: YtDlp) -> Self {
        Self {
            ytdlp,
            direct_urls: TtlCache::new(config.cache_capacity, config.stream_url_ttl),
        }
    }

    /// Forget a cached URL, e.g. after the sink failed to open it
    pub fn invalidate(&self, page_url: &str) {
        self.direct_urls.remove(&page_url.to_string());
    }
}

#[async_trait]
impl ResourceFactory for StreamResourceFactory {
    async fn make_resource(
        &self,
        track: &Track,
        seek_offset_sec: f64,
        filter: Option<AudioFilter>,
    ) -> discodj_core::Result<AudioResource> {
        let page_url = track
            .url
            .as_deref()
            .ok_or_else(|| DjError::resolution(format!("{} has no url", track.title)))?;

        let input = match self.direct_urls.get(&page_url.to_string()) {
            Some(url) => url,
            None => {
                let url = self.ytdlp.direct_url(page_url).await?;
                self.direct_urls.insert(page_url.to_string(), url.clone());
                url
            }
        };
        debug!(title = %track.title, seek_offset_sec, ?filter, "prepared stream");

        Ok(AudioResource {
            input,
            seek_offset_sec: seek_offset_sec.max(0.0),
            filter,
            track: track.clone(),
        })
    }
}

/// ffmpeg arguments that transcode `resource` to Ogg Opus on stdout
pub fn ffmpeg_args(resource: &AudioResource) -> Vec<String> {
    let mut args: Vec<String> = Vec::with_capacity(24);
    let seek = resource.seek_offset_sec.floor();
    if seek > 0.0 {
        args.extend(["-ss".to_string(), format!("{}", seek as u64)]);
    }
    args.extend(
        [
            "-reconnect",
            "1",
            "-reconnect_streamed",
            "1",
            "-reconnect_delay_max",
            "5",
            "-i",
        ]
        .map(String::from),
    );
    args.push(resource.input.clone());
    args.push("-vn".to_string());
    if let Some(filter) = resource.filter {
        args.extend(["-af".to_string(), filter.ffmpeg_filter().to_string()]);
    }
    args.extend(
        [
            "-ac", "2", "-ar", "48000", "-c:a", "libopus", "-b:a", "160k", "-f", "ogg", "pipe:1",
        ]
        .map(String::from),
    );
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use discodj_core::{Requester, TrackSource};

    fn resource(seek: f64, filter: Option<AudioFilter>) -> AudioResource {
        let track = Track::new(
            "https://youtu.be/a",
            "A",
            &Requester::new("1", "u"),
            TrackSource::YouTube,
        );
        AudioResource {
            input: "https://cdn.example/a.webm".into(),
            seek_offset_sec: seek,
            filter,
            track,
        }
    }

    #[test]
    fn plain_stream_has_no_seek_or_filter() {
        let args = ffmpeg_args(&resource(0.0, None));
        assert_eq!(args[0], "-reconnect");
        assert!(!args.contains(&"-ss".to_string()));
        assert!(!args.contains(&"-af".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn seek_is_floored_and_filter_applied() {
        let args = ffmpeg_args(&resource(42.9, Some(AudioFilter::Nightcore)));
        assert_eq!(&args[..2], ["-ss", "42"]);
        let af = args.iter().position(|a| a == "-af").unwrap();
        assert_eq!(args[af + 1], AudioFilter::Nightcore.ffmpeg_filter());
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(input < af);
    }
}
