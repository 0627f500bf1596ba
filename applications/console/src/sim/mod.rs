//! Stand-ins for the chat platform
//!
//! The console has no gateway, voice server or message channel. These
//! collaborators play those parts in-process so the playback core runs
//! unmodified.

mod sink;
mod surface;
mod voice;

pub use sink::{SimSink, UNKNOWN_LENGTH};
pub use surface::{render_text, TerminalSurface};
pub use voice::{SimConnection, SimVoice};

use discodj_core::Presence;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Presence that only logs
#[derive(Default)]
pub struct LogPresence {
    current: Mutex<Option<String>>,
}

impl LogPresence {
    pub fn current(&self) -> Option<String> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Presence for LogPresence {
    fn set_playing(&self, title: &str) -> discodj_core::Result<()> {
        info!(title, "presence: listening");
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(title.to_string());
        Ok(())
    }

    fn clear(&self) -> discodj_core::Result<()> {
        info!("presence cleared");
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
