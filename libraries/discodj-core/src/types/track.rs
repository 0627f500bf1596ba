/// Track domain type
use super::ids::TrackKey;
use serde::{Deserialize, Serialize};

/// Provider a track was requested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    /// Natively playable (YouTube and anything yt-dlp understands)
    #[default]
    #[serde(alias = "yt")]
    YouTube,
    /// Spotify link, played through a YouTube search
    #[serde(alias = "sp")]
    Spotify,
    /// SoundCloud link
    #[serde(alias = "sc")]
    SoundCloud,
}

/// Who asked for a track
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requester {
    pub id: String,
    pub tag: String,
}

impl Requester {
    pub fn new(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
        }
    }
}

/// A playable item with metadata
///
/// A track without a `url` but with a `lazy_query` is a placeholder: it is
/// resolved right before playback and filled in place exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(default)]
    pub key: TrackKey,

    #[serde(default)]
    pub url: Option<String>,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,

    #[serde(default)]
    pub requested_by_id: String,

    #[serde(default)]
    pub requested_by_tag: String,

    #[serde(default)]
    pub source: TrackSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lazy_query: Option<String>,
}

impl Track {
    /// Create a resolved track
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        requester: &Requester,
        source: TrackSource,
    ) -> Self {
        Self {
            key: TrackKey::generate(),
            url: Some(url.into()),
            title: title.into(),
            thumbnail: None,
            duration_sec: None,
            requested_by_id: requester.id.clone(),
            requested_by_tag: requester.tag.clone(),
            source,
            lazy_query: None,
        }
    }

    /// Create a placeholder that is searched for at playback time
    pub fn placeholder(
        query: impl Into<String>,
        title: impl Into<String>,
        requester: &Requester,
        source: TrackSource,
    ) -> Self {
        Self {
            key: TrackKey::generate(),
            url: None,
            title: title.into(),
            thumbnail: None,
            duration_sec: None,
            requested_by_id: requester.id.clone(),
            requested_by_tag: requester.tag.clone(),
            source,
            lazy_query: Some(query.into()),
        }
    }

    #[must_use]
    pub fn with_duration(mut self, duration_sec: Option<f64>) -> Self {
        self.duration_sec = duration_sec.filter(|d| d.is_finite() && *d > 0.0);
        self
    }

    #[must_use]
    pub fn with_thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    /// Whether this track still needs resolving before it can play
    pub fn is_placeholder(&self) -> bool {
        self.url.is_none() && self.lazy_query.as_deref().is_some_and(|q| !q.trim().is_empty())
    }

    /// Declared duration, if known and positive
    pub fn known_duration(&self) -> Option<f64> {
        self.duration_sec.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Fill a placeholder from a resolved track
    ///
    /// Only url, title, thumbnail and duration are copied; identity, requester
    /// and source stay. Returns `false` if this track was not a placeholder.
    pub fn resolve_placeholder(&mut self, resolved: &Track) -> bool {
        if !self.is_placeholder() || resolved.url.is_none() {
            return false;
        }
        self.url.clone_from(&resolved.url);
        self.title.clone_from(&resolved.title);
        self.thumbnail.clone_from(&resolved.thumbnail);
        self.duration_sec = resolved.known_duration();
        self.lazy_query = None;
        true
    }
}
