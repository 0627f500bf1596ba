//! Panel synchronisation
//!
//! Pushes rendered panels to the display surface with three guarantees:
//! identical content is not re-sent unless forced, at most one push per room
//! is in flight (later pushes wait their turn in FIFO order), and a push that
//! was overtaken by a newer one while waiting is dropped. A panel message that
//! disappeared is re-created and its new reference recorded.

use discodj_core::types::{MessageRef, PanelPayload, PanelRef, SurfaceId};
use discodj_core::{DisplaySurface, DjError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

/// Per-room panel bookkeeping
#[derive(Debug, Default)]
pub struct PanelSlot {
    /// Held for the duration of one push
    push_lock: AsyncMutex<()>,
    /// Bumped every time a push is scheduled
    edit_version: AtomicU64,
    panel_ref: Mutex<Option<PanelRef>>,
    last_hash: Mutex<Option<u64>>,
}

impl PanelSlot {
    pub fn panel_ref(&self) -> Option<PanelRef> {
        self.panel_ref
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Point the panel at `surface`
    ///
    /// Re-attaching to the surface the panel already lives on keeps the
    /// message so it is edited in place.
    pub fn attach(&self, surface: SurfaceId) {
        let mut panel_ref = self.panel_ref.lock().unwrap_or_else(PoisonError::into_inner);
        if panel_ref.as_ref().map(|r| &r.surface) != Some(&surface) {
            *panel_ref = Some(PanelRef::new(surface));
        }
        self.forget_hash();
    }

    /// Forget the panel; pending pushes become no-ops
    pub fn detach(&self) {
        *self.panel_ref.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.forget_hash();
        self.edit_version.fetch_add(1, Ordering::SeqCst);
    }

    pub fn edit_version(&self) -> u64 {
        self.edit_version.load(Ordering::SeqCst)
    }

    fn forget_hash(&self) {
        *self.last_hash.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Record a freshly created message, unless the panel moved meanwhile
    fn record(&self, created: &MessageRef) {
        let mut panel_ref = self.panel_ref.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = panel_ref.as_mut() {
            if current.surface == created.surface {
                current.message = Some(created.message.clone());
            }
        }
    }
}

/// A push waiting to run
#[derive(Debug)]
pub struct PendingPush {
    slot: Arc<PanelSlot>,
    payload: PanelPayload,
    version: u64,
}

impl PendingPush {
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// What happened to a push
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Existing message updated
    Edited(MessageRef),
    /// New message posted
    Created(MessageRef),
    /// A newer push was scheduled while this one waited
    Superseded,
    /// No panel attached, or the surface is gone
    Detached,
}

pub struct PanelSync {
    surface: Arc<dyn DisplaySurface>,
}

impl PanelSync {
    pub fn new(surface: Arc<dyn DisplaySurface>) -> Self {
        Self { surface }
    }

    /// Claim the next edit version for `payload`
    ///
    /// Returns `None` when no panel is attached, or when `hash` matches the
    /// last scheduled push and `force` is off.
    pub fn schedule(
        &self,
        slot: &Arc<PanelSlot>,
        payload: PanelPayload,
        hash: u64,
        force: bool,
    ) -> Option<PendingPush> {
        slot.panel_ref()?;
        {
            let mut last = slot.last_hash.lock().unwrap_or_else(PoisonError::into_inner);
            if !force && *last == Some(hash) {
                debug!(hash, "panel unchanged, push suppressed");
                return None;
            }
            *last = Some(hash);
        }
        let version = slot.edit_version.fetch_add(1, Ordering::SeqCst) + 1;
        Some(PendingPush {
            slot: Arc::clone(slot),
            payload,
            version,
        })
    }

    /// Run a scheduled push once the previous one for its room settled
    pub async fn push(&self, pending: PendingPush) -> Result<PushOutcome, DjError> {
        let PendingPush {
            slot,
            payload,
            version,
        } = pending;
        let _turn = slot.push_lock.lock().await;

        if slot.edit_version() != version {
            debug!(version, current = slot.edit_version(), "panel push superseded");
            return Ok(PushOutcome::Superseded);
        }
        let Some(panel_ref) = slot.panel_ref() else {
            return Ok(PushOutcome::Detached);
        };

        if let Some(message) = panel_ref.message {
            let existing = MessageRef {
                surface: panel_ref.surface.clone(),
                message,
            };
            match self.surface.fetch_message(&existing).await {
                Ok(Some(found)) => match self.surface.edit(&found, &payload).await {
                    Ok(()) => return Ok(PushOutcome::Edited(found)),
                    Err(e) => debug!(error = %e, "panel edit failed, re-posting"),
                },
                Ok(None) => debug!(message = %existing.message, "panel message gone, re-posting"),
                Err(e) => debug!(error = %e, "panel lookup failed, re-posting"),
            }
        }

        if !self.surface.fetch_channel(&panel_ref.surface).await? {
            info!(surface = %panel_ref.surface, "panel surface unavailable");
            return Ok(PushOutcome::Detached);
        }
        let created = self.surface.send(&panel_ref.surface, &payload).await?;
        slot.record(&created);
        Ok(PushOutcome::Created(created))
    }
}
