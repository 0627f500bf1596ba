//! Query classification
//!
//! Decides what a user's input refers to before anything is spawned.

use url::Url;

/// Kind of Spotify link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotifyKind {
    Track,
    Album,
    Playlist,
}

/// What a query refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A single YouTube video
    YouTubeVideo(String),
    /// A YouTube link carrying a `list=` parameter
    YouTubePlaylist(String),
    Spotify { url: String, kind: SpotifyKind },
    SoundCloud(String),
    /// Any other http(s) link, handed to yt-dlp as is
    OtherUrl(String),
    /// Free text, searched on YouTube
    Search(String),
}

impl Query {
    /// Classify trimmed user input
    pub fn classify(input: &str) -> Self {
        let input = input.trim();
        let Some(url) = parse_http(input) else {
            return Self::Search(input.to_string());
        };
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        if is_youtube_host(host) {
            let has_list = url.query_pairs().any(|(k, v)| k == "list" && !v.is_empty());
            if has_list {
                return Self::YouTubePlaylist(input.to_string());
            }
            return Self::YouTubeVideo(input.to_string());
        }

        if host == "open.spotify.com" {
            let kind = url
                .path_segments()
                .into_iter()
                .flatten()
                .filter(|segment| !segment.starts_with("intl-"))
                .find_map(|segment| match segment {
                    "track" => Some(SpotifyKind::Track),
                    "album" => Some(SpotifyKind::Album),
                    "playlist" => Some(SpotifyKind::Playlist),
                    _ => None,
                });
            if let Some(kind) = kind {
                return Self::Spotify {
                    url: input.to_string(),
                    kind,
                };
            }
        }

        if host == "soundcloud.com" || host.ends_with(".soundcloud.com") {
            return Self::SoundCloud(input.to_string());
        }

        Self::OtherUrl(input.to_string())
    }

    pub fn is_url(&self) -> bool {
        !matches!(self, Self::Search(_))
    }
}

fn parse_http(input: &str) -> Option<Url> {
    let url = Url::parse(input).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn is_youtube_host(host: &str) -> bool {
    matches!(host, "youtube.com" | "m.youtube.com" | "music.youtube.com" | "youtu.be")
}

/// Video id of a YouTube watch, short or shorts link
pub fn youtube_video_id(input: &str) -> Option<String> {
    let url = parse_http(input)?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if !is_youtube_host(host) {
        return None;
    }

    let id = if host == "youtu.be" {
        url.path_segments()?.next().map(str::to_string)
    } else {
        let mut segments = url.path_segments()?;
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            Some("shorts" | "embed" | "live") => segments.next().map(str::to_string),
            _ => None,
        }
    };
    id.filter(|id| !id.is_empty())
}
