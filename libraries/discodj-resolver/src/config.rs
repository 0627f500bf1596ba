use discodj_core::Requester;
use std::time::Duration;

/// Resolver settings
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// yt-dlp executable, looked up on `PATH` when not absolute
    pub ytdlp_path: String,
    /// Time limit for one yt-dlp run; the process is killed past it
    pub timeout: Duration,
    /// Extra attempts after a failed run
    pub retries: u32,
    /// First retry delay, doubled on every further attempt
    pub retry_base_delay: Duration,
    /// Single-video metadata lifetime
    pub metadata_ttl: Duration,
    /// Expanded playlist lifetime
    pub playlist_ttl: Duration,
    /// Direct stream URL lifetime
    pub stream_url_ttl: Duration,
    /// Entries per cache
    pub cache_capacity: usize,
    /// Spotify oEmbed endpoint
    pub spotify_oembed_url: String,
    /// Requester recorded on autoplay picks
    pub autoplay_requester: Requester,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            timeout: Duration::from_secs(30),
            retries: 1,
            retry_base_delay: Duration::from_millis(500),
            metadata_ttl: Duration::from_secs(10 * 60),
            playlist_ttl: Duration::from_secs(5 * 60),
            stream_url_ttl: Duration::from_secs(10 * 60),
            cache_capacity: 512,
            spotify_oembed_url: "https://open.spotify.com/oembed".to_string(),
            autoplay_requester: Requester::new("0", "autoplay"),
        }
    }
}
