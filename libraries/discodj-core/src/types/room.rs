/// Room settings, persisted snapshot and player status
use super::ids::ResourceId;
use super::track::Track;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of history entries kept in a persisted snapshot
pub const PERSISTED_HISTORY_LIMIT: usize = 20;

/// Highest volume percentage a room accepts
pub const MAX_VOLUME: u16 = 200;

/// Loop mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Finished tracks are dropped
    #[default]
    Off,
    /// The finished track plays again
    One,
    /// Finished tracks go to the back of the queue
    All,
}

impl LoopMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopMode::Off => "off",
            LoopMode::One => "one",
            LoopMode::All => "all",
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoopMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(LoopMode::Off),
            "one" => Ok(LoopMode::One),
            "all" => Ok(LoopMode::All),
            other => Err(format!("unknown loop mode '{}' (expected off, one or all)", other)),
        }
    }
}

/// Audio effect applied by the transcode pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFilter {
    BassBoost,
    Nightcore,
    Vaporwave,
    #[serde(rename = "8d")]
    EightD,
}

impl AudioFilter {
    pub const ALL: [AudioFilter; 4] = [
        AudioFilter::BassBoost,
        AudioFilter::Nightcore,
        AudioFilter::Vaporwave,
        AudioFilter::EightD,
    ];

    pub fn key(self) -> &'static str {
        match self {
            AudioFilter::BassBoost => "bassboost",
            AudioFilter::Nightcore => "nightcore",
            AudioFilter::Vaporwave => "vaporwave",
            AudioFilter::EightD => "8d",
        }
    }

    /// Parse a filter key, `None` for unknown keys
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// ffmpeg `-af` expression for this effect (48 kHz output)
    pub fn ffmpeg_filter(self) -> &'static str {
        match self {
            AudioFilter::BassBoost => "bass=g=10",
            AudioFilter::Nightcore => "asetrate=48000*1.25,aresample=48000",
            AudioFilter::Vaporwave => "asetrate=48000*0.8,aresample=48000",
            AudioFilter::EightD => "apulsator=hz=0.08",
        }
    }
}

/// Persisted per-room settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    /// Volume percentage, 0-200
    pub volume: u16,
    #[serde(rename = "loop")]
    pub loop_mode: LoopMode,
    pub autoplay: bool,
    pub dj_only: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            volume: 100,
            loop_mode: LoopMode::Off,
            autoplay: true,
            dj_only: false,
        }
    }
}

impl RoomSettings {
    /// Volume as a gain ratio for the sink (1.0 = 100%)
    pub fn volume_ratio(&self) -> f32 {
        f32::from(self.volume.min(MAX_VOLUME)) / 100.0
    }
}

/// What gets written to disk for a room
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub queue: Vec<Track>,
    pub history: Vec<Track>,
    #[serde(flatten)]
    pub settings: RoomSettings,
}

impl RoomSnapshot {
    /// Keep only the most recent persisted history entries
    #[must_use]
    pub fn truncated(mut self) -> Self {
        if self.history.len() > PERSISTED_HISTORY_LIMIT {
            let excess = self.history.len() - PERSISTED_HISTORY_LIMIT;
            self.history.drain(..excess);
        }
        self
    }
}

/// Status of a room's audio sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerStatus {
    /// Nothing loaded
    #[default]
    Idle,
    Playing,
    /// Paused on request
    Paused,
    /// Paused because nobody is listening
    AutoPaused,
}

impl PlayerStatus {
    pub fn is_paused(self) -> bool {
        matches!(self, PlayerStatus::Paused | PlayerStatus::AutoPaused)
    }
}

/// Status transition reported by a sink for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkEvent {
    pub resource: ResourceId,
    pub status: PlayerStatus,
}
