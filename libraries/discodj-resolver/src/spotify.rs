//! Spotify oEmbed lookups
//!
//! Spotify links are never streamed. Their public oEmbed title becomes a
//! search query that is resolved right before playback.

use crate::error::{ResolverError, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Subset of the oEmbed response we use
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OEmbed {
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Client for Spotify's oEmbed endpoint
#[derive(Debug, Clone)]
pub struct SpotifyOEmbed {
    client: reqwest::Client,
    endpoint: String,
}

impl SpotifyOEmbed {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Title and artwork for a Spotify link
    pub async fn lookup(&self, link: &str) -> Result<OEmbed> {
        debug!(link, "fetching spotify oembed");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", link)])
            .send()
            .await?
            .error_for_status()?;

        let body: OEmbed = response.json().await?;
        if body.title.trim().is_empty() {
            return Err(ResolverError::NoMedia(link.to_string()));
        }
        Ok(body)
    }
}
