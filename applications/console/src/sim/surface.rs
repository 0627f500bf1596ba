//! Terminal display surface

use async_trait::async_trait;
use discodj_core::types::{MessageId, MessageRef, PanelPayload, SurfaceId};
use discodj_core::DisplaySurface;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Draws panels and notices as text
///
/// Every posted message gets an id; a message counts as existing until
/// [`delete`](Self::delete) removes it.
pub struct TerminalSurface {
    echo: bool,
    messages: Mutex<HashSet<MessageId>>,
    last: Mutex<Option<PanelPayload>>,
    notices: Mutex<Vec<String>>,
    next_message: AtomicU64,
}

impl TerminalSurface {
    /// `echo` prints everything to stdout
    pub fn new(echo: bool) -> Self {
        Self {
            echo,
            messages: Mutex::new(HashSet::new()),
            last: Mutex::new(None),
            notices: Mutex::new(Vec::new()),
            next_message: AtomicU64::new(0),
        }
    }

    pub fn last_panel(&self) -> Option<PanelPayload> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Remove a message, as a user deleting the panel would
    pub fn delete(&self, message: &MessageId) -> bool {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(message)
    }

    fn show(&self, message: &MessageId, payload: &PanelPayload) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(payload.clone());
        if self.echo {
            println!("[{}]\n{}", message, render_text(payload));
        }
    }
}

#[async_trait]
impl DisplaySurface for TerminalSurface {
    async fn fetch_channel(&self, _surface: &SurfaceId) -> discodj_core::Result<bool> {
        Ok(true)
    }

    async fn send(&self, surface: &SurfaceId, payload: &PanelPayload) -> discodj_core::Result<MessageRef> {
        let n = self.next_message.fetch_add(1, Ordering::SeqCst) + 1;
        let message = MessageId::new(format!("panel-{}", n));
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(message.clone());
        self.show(&message, payload);
        Ok(MessageRef {
            surface: surface.clone(),
            message,
        })
    }

    async fn edit(&self, message: &MessageRef, payload: &PanelPayload) -> discodj_core::Result<()> {
        self.show(&message.message, payload);
        Ok(())
    }

    async fn fetch_message(&self, message: &MessageRef) -> discodj_core::Result<Option<MessageRef>> {
        let exists = self
            .messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&message.message);
        Ok(exists.then(|| message.clone()))
    }

    async fn delete_message(&self, message: &MessageRef) -> discodj_core::Result<()> {
        self.delete(&message.message);
        Ok(())
    }

    async fn notify(&self, surface: &SurfaceId, text: &str) -> discodj_core::Result<()> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        if self.echo {
            println!("({}) {}", surface, text);
        }
        Ok(())
    }
}

/// Plain-text rendering of a panel
pub fn render_text(payload: &PanelPayload) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", payload.heading);
    match &payload.now_playing {
        Some(now) => {
            let _ = writeln!(out, "Now: {} [{}] requested by {}", now.title, now.duration, now.requested_by);
            if let Some(progress) = &now.progress {
                let _ = writeln!(out, "     {}", progress);
            }
        }
        None => {
            let _ = writeln!(out, "Now: nothing");
        }
    }
    if payload.up_next.is_empty() {
        let _ = writeln!(out, "Up next: empty");
    } else {
        let _ = writeln!(out, "Up next (page {}/{}):", payload.page + 1, payload.page_count.max(1));
        for entry in &payload.up_next {
            let duration = entry.duration.as_deref().unwrap_or("?");
            let _ = writeln!(out, "  {}. {} [{}] in {}", entry.position, entry.title, duration, entry.eta);
        }
    }
    let controls: Vec<String> = payload
        .controls
        .iter()
        .map(|c| {
            if c.enabled {
                format!("[{}: {}]", c.id, c.label)
            } else {
                format!("({}: {})", c.id, c.label)
            }
        })
        .collect();
    let _ = writeln!(out, "{}", controls.join(" "));
    out.push_str(&payload.footer);
    out
}
