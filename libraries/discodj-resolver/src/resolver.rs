//! [`Resolver`] backed by yt-dlp and Spotify oEmbed

use crate::cache::TtlCache;
use crate::config::ResolverConfig;
use crate::error::{ResolverError, Result};
use crate::query::{youtube_video_id, Query, SpotifyKind};
use crate::spotify::SpotifyOEmbed;
use crate::ytdlp::{MediaInfo, YtDlp};
use async_trait::async_trait;
use discodj_core::{Requester, Resolver, Track, TrackSource};
use tracing::{debug, info, instrument};

const RELATED_CANDIDATES: usize = 5;

pub struct YtDlpResolver {
    ytdlp: YtDlp,
    spotify: SpotifyOEmbed,
    metadata: TtlCache<String, MediaInfo>,
    playlists: TtlCache<String, Vec<MediaInfo>>,
    autoplay_requester: Requester,
}

impl YtDlpResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        Self::with_ytdlp(config, YtDlp::new(config))
    }

    /// Use a preconfigured yt-dlp client (tests inject a scripted runner)
    pub fn with_ytdlp(config: &ResolverConfig, ytdlp: YtDlp) -> Result<Self> {
        Ok(Self {
            ytdlp,
            spotify: SpotifyOEmbed::new(config.spotify_oembed_url.clone(), config.timeout)?,
            metadata: TtlCache::new(config.cache_capacity, config.metadata_ttl),
            playlists: TtlCache::new(config.cache_capacity, config.playlist_ttl),
            autoplay_requester: config.autoplay_requester.clone(),
        })
    }

    async fn single(&self, url: &str) -> Result<MediaInfo> {
        if let Some(info) = self.metadata.get(&url.to_string()) {
            debug!(url, "metadata cache hit");
            return Ok(info);
        }
        let info = self.ytdlp.single(url).await?;
        self.metadata.insert(url.to_string(), info.clone());
        Ok(info)
    }

    async fn playlist(&self, url: &str) -> Result<Vec<MediaInfo>> {
        if let Some(items) = self.playlists.get(&url.to_string()) {
            debug!(url, count = items.len(), "playlist cache hit");
            return Ok(items);
        }
        let items = self.ytdlp.playlist(url).await?;
        self.playlists.insert(url.to_string(), items.clone());
        Ok(items)
    }

    async fn spotify(&self, url: &str, kind: SpotifyKind, requester: &Requester) -> Result<Track> {
        let embed = self.spotify.lookup(url).await?;
        debug!(?kind, title = %embed.title, "spotify link becomes a placeholder");
        Ok(
            Track::placeholder(embed.title.clone(), embed.title, requester, TrackSource::Spotify)
                .with_thumbnail(embed.thumbnail_url),
        )
    }

    async fn resolve_query(&self, query: &Query, requester: &Requester) -> Result<Vec<Track>> {
        let tracks = match query {
            Query::YouTubeVideo(url) | Query::OtherUrl(url) => {
                vec![to_track(self.single(url).await?, requester, TrackSource::YouTube)]
            }
            Query::SoundCloud(url) => {
                vec![to_track(self.single(url).await?, requester, TrackSource::SoundCloud)]
            }
            Query::YouTubePlaylist(url) => self
                .playlist(url)
                .await?
                .into_iter()
                .map(|info| to_track(info, requester, TrackSource::YouTube))
                .collect(),
            Query::Spotify { url, kind } => vec![self.spotify(url, *kind, requester).await?],
            Query::Search(text) => self
                .ytdlp
                .search(text, 1)
                .await?
                .into_iter()
                .take(1)
                .map(|info| to_track(info, requester, TrackSource::YouTube))
                .collect(),
        };
        Ok(tracks)
    }
}

#[async_trait]
impl Resolver for YtDlpResolver {
    #[instrument(skip(self, requester), fields(requester = %requester.tag))]
    async fn resolve(&self, query: &str, requester: &Requester) -> discodj_core::Result<Vec<Track>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let classified = Query::classify(query);
        let tracks = self.resolve_query(&classified, requester).await?;
        info!(count = tracks.len(), "resolved query");
        Ok(tracks)
    }

    async fn resolve_one(&self, url: &str) -> discodj_core::Result<Option<Track>> {
        let classified = Query::classify(url);
        if !classified.is_url() {
            return Err(ResolverError::InvalidUrl(url.to_string()).into());
        }
        let source = match classified {
            Query::SoundCloud(_) => TrackSource::SoundCloud,
            Query::Spotify { .. } => return Ok(None),
            _ => TrackSource::YouTube,
        };
        match self.single(url).await {
            Ok(info) => Ok(Some(to_track(info, &self.autoplay_requester, source))),
            Err(ResolverError::NoMedia(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, seed), fields(seed = %seed.title))]
    async fn find_related(&self, seed: &Track) -> discodj_core::Result<Option<Track>> {
        let seed_id = seed.url.as_deref().and_then(youtube_video_id);
        let candidates = self.ytdlp.search(&seed.title, RELATED_CANDIDATES).await?;
        let pick = candidates.into_iter().find(|info| {
            seed.url.as_deref() != Some(info.url.as_str())
                && (seed_id.is_none() || youtube_video_id(&info.url) != seed_id)
        });
        Ok(pick.map(|info| to_track(info, &self.autoplay_requester, TrackSource::YouTube)))
    }
}

fn to_track(info: MediaInfo, requester: &Requester, source: TrackSource) -> Track {
    Track::new(info.url, info.title, requester, source)
        .with_duration(info.duration_sec)
        .with_thumbnail(info.thumbnail)
}
