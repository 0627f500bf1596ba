/// Console configuration
use crate::error::{ConsoleError, Result};
use discodj_core::Requester;
use discodj_playback::PlaybackConfig;
use discodj_resolver::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "discodj.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub playback: PlaybackSettings,

    #[serde(default)]
    pub resolver: ResolverSettings,

    #[serde(default)]
    pub console: SessionSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverSettings {
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_metadata_ttl_secs")]
    pub metadata_ttl_secs: u64,

    #[serde(default = "default_stream_url_ttl_secs")]
    pub stream_url_ttl_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

/// Who and where the console pretends to be
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionSettings {
    #[serde(default = "default_room_id")]
    pub room_id: String,

    #[serde(default = "default_surface_id")]
    pub surface_id: String,

    /// Voice channel the console user sits in; empty means none
    #[serde(default = "default_voice_channel")]
    pub voice_channel: String,

    #[serde(default = "default_user_tag")]
    pub user_tag: String,

    /// Whether the console user holds the DJ role
    #[serde(default = "default_is_dj")]
    pub is_dj: bool,
}

impl ConsoleConfig {
    /// Load configuration from file and environment
    ///
    /// `path` must exist when given; otherwise `discodj.toml` in the working
    /// directory is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load) with the environment replaced by `env`
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConsoleError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // DISCODJ_PLAYBACK__PAGE_SIZE=5 sets playback.page_size
        settings = settings.add_source(
            config::Environment::with_prefix("DISCODJ")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(ConsoleError::Config("storage.data_dir must not be empty".to_string()));
        }
        if self.playback.refresh_interval_secs == 0 {
            return Err(ConsoleError::Config(
                "playback.refresh_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.playback.page_size == 0 {
            return Err(ConsoleError::Config("playback.page_size must be at least 1".to_string()));
        }
        if self.playback.max_consecutive_failures == 0 {
            return Err(ConsoleError::Config(
                "playback.max_consecutive_failures must be at least 1".to_string(),
            ));
        }
        if self.resolver.ytdlp_path.trim().is_empty() {
            return Err(ConsoleError::Config("resolver.ytdlp_path must not be empty".to_string()));
        }
        if self.resolver.timeout_secs == 0 {
            return Err(ConsoleError::Config("resolver.timeout_secs must be at least 1".to_string()));
        }
        if self.console.room_id.trim().is_empty() {
            return Err(ConsoleError::Config("console.room_id must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            history_size: self.playback.history_limit,
            page_size: self.playback.page_size,
            refresh_interval: Duration::from_secs(self.playback.refresh_interval_secs),
            max_consecutive_failures: self.playback.max_consecutive_failures,
            resolve_timeout: Duration::from_secs(self.playback.resolve_timeout_secs),
            ..PlaybackConfig::default()
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        let defaults = ResolverConfig::default();
        ResolverConfig {
            ytdlp_path: self.resolver.ytdlp_path.clone(),
            timeout: Duration::from_secs(self.resolver.timeout_secs),
            retries: self.resolver.retries,
            metadata_ttl: Duration::from_secs(self.resolver.metadata_ttl_secs),
            stream_url_ttl: Duration::from_secs(self.resolver.stream_url_ttl_secs),
            cache_capacity: self.resolver.cache_capacity,
            autoplay_requester: Requester::new("0", "autoplay"),
            ..defaults
        }
    }
}

impl SessionSettings {
    pub fn voice_channel(&self) -> Option<&str> {
        Some(self.voice_channel.trim()).filter(|c| !c.is_empty())
    }
}

// Default values
impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            max_consecutive_failures: default_max_consecutive_failures(),
            resolve_timeout_secs: default_resolve_timeout_secs(),
            page_size: default_page_size(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            metadata_ttl_secs: default_metadata_ttl_secs(),
            stream_url_ttl_secs: default_stream_url_ttl_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            room_id: default_room_id(),
            surface_id: default_surface_id(),
            voice_channel: default_voice_channel(),
            user_tag: default_user_tag(),
            is_dj: default_is_dj(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_refresh_interval_secs() -> u64 {
    5
}

fn default_max_consecutive_failures() -> u32 {
    5
}

fn default_resolve_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> usize {
    10
}

fn default_history_limit() -> usize {
    50
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    1
}

fn default_metadata_ttl_secs() -> u64 {
    600
}

fn default_stream_url_ttl_secs() -> u64 {
    600
}

fn default_cache_capacity() -> usize {
    512
}

fn default_room_id() -> String {
    "console".to_string()
}

fn default_surface_id() -> String {
    "terminal".to_string()
}

fn default_voice_channel() -> String {
    "lounge".to_string()
}

fn default_user_tag() -> String {
    "console".to_string()
}

fn default_is_dj() -> bool {
    true
}
