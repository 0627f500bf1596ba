/// Display payload pushed to the panel surface
use super::ids::{MessageId, SurfaceId};
use serde::{Deserialize, Serialize};

/// Where the live panel message is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelRef {
    pub surface: SurfaceId,
    /// `None` until the first push created the message
    pub message: Option<MessageId>,
}

impl PanelRef {
    pub fn new(surface: SurfaceId) -> Self {
        Self {
            surface,
            message: None,
        }
    }

    /// The posted message, once there is one
    pub fn message_ref(&self) -> Option<MessageRef> {
        self.message.clone().map(|message| MessageRef {
            surface: self.surface.clone(),
            message,
        })
    }
}

/// Reference to one posted message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub surface: SurfaceId,
    pub message: MessageId,
}

/// Now-playing block of the panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingView {
    pub title: String,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub requested_by: String,
    /// Formatted duration, "Unknown" when not known
    pub duration: String,
    /// "1:02 / 3:30" plus the slot bar, only when the duration is known
    pub progress: Option<String>,
}

/// One line of the up-next listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpNextEntry {
    /// 1-based queue position
    pub position: usize,
    pub title: String,
    pub duration: Option<String>,
    /// Time until this entry starts, formatted
    pub eta: String,
}

/// Button shown under the panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelControl {
    pub id: String,
    pub label: String,
    pub enabled: bool,
}

/// Complete rendered panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelPayload {
    pub heading: String,
    pub now_playing: Option<NowPlayingView>,
    pub up_next: Vec<UpNextEntry>,
    /// 0-based page shown
    pub page: usize,
    pub page_count: usize,
    pub footer: String,
    pub controls: Vec<PanelControl>,
}
