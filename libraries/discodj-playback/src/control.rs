//! Control events
//!
//! The chat layer turns slash commands and panel buttons into
//! [`ControlEvent`]s; [`dispatch`] applies them to a room and produces the
//! text to reply with.

use crate::controller::PlaybackController;
use crate::error::{PlaybackError, Result};
use crate::panel::{
    format_time, CONTROL_PAGE_NEXT, CONTROL_PAGE_PREV, CONTROL_PREVIOUS, CONTROL_SKIP,
    CONTROL_STOP, CONTROL_TOGGLE,
};
use crate::types::EnqueuePosition;
use discodj_core::types::{MessageId, SurfaceId};
use discodj_core::{AudioFilter, LoopMode, Requester, RoomId, VoiceContext};
use tracing::debug;

/// Who sent an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub tag: String,
    /// Holds the DJ role
    pub is_dj: bool,
    /// Voice channel the actor is in
    pub voice: VoiceContext,
}

impl Actor {
    pub fn requester(&self) -> Requester {
        Requester::new(self.id.clone(), self.tag.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    Join,
    Play {
        query: String,
        position: EnqueuePosition,
    },
    /// Show or refresh the panel
    ShowQueue,
    Skip,
    Previous,
    Stop,
    Leave,
    Pause,
    Resume,
    TogglePause,
    Volume(i64),
    /// Raw timestamp as typed (`83`, `1:23`, `1:02:03`)
    Seek(String),
    Shuffle,
    Loop(LoopMode),
    Autoplay(bool),
    DjOnly(bool),
    /// Filter key, or `None` to clear
    Filter(Option<String>),
    /// 1-based queue position
    Jump(usize),
    /// 1-based queue position
    Remove(usize),
    /// 1-based queue positions
    Move { from: usize, to: usize },
    Clear,
    PageNext,
    PagePrev,
}

impl ControlEvent {
    /// Map a panel button id to its event
    pub fn from_control_id(id: &str) -> Option<Self> {
        match id {
            CONTROL_PREVIOUS => Some(Self::Previous),
            CONTROL_TOGGLE => Some(Self::TogglePause),
            CONTROL_SKIP => Some(Self::Skip),
            CONTROL_STOP => Some(Self::Stop),
            CONTROL_PAGE_PREV => Some(Self::PagePrev),
            CONTROL_PAGE_NEXT => Some(Self::PageNext),
            _ => None,
        }
    }

    /// Whether the event changes playback or settings
    ///
    /// Only these are restricted in DJ-only rooms.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::ShowQueue | Self::PageNext | Self::PagePrev | Self::Join)
    }
}

/// Parse `83`, `1:23` or `1:02:03` into seconds
///
/// Minutes and seconds after the first field must be below 60.
pub fn parse_timestamp(input: &str) -> Result<f64> {
    let invalid = || PlaybackError::InvalidTimestamp(format!("'{}' (use seconds, m:ss or h:mm:ss)", input.trim()));

    let fields: Vec<&str> = input.trim().split(':').collect();
    if fields.is_empty() || fields.len() > 3 {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    for (i, field) in fields.iter().enumerate() {
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value: u64 = field.parse().map_err(|_| invalid())?;
        if i > 0 && value >= 60 {
            return Err(invalid());
        }
        total = total
            .checked_mul(60)
            .and_then(|t| t.checked_add(value))
            .ok_or_else(invalid)?;
    }
    Ok(total as f64)
}

fn to_index(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| PlaybackError::InvalidRequest("queue positions start at 1".into()))
}

/// Apply `event` to `room` on behalf of `actor`
///
/// `surface` is where the event came from; the panel is attached there when
/// playback is requested.
pub async fn dispatch(
    controller: &PlaybackController,
    room: &RoomId,
    surface: &SurfaceId,
    actor: &Actor,
    event: ControlEvent,
) -> Result<String> {
    if event.is_mutating() && !actor.is_dj {
        let settings = controller.settings(room).await;
        if settings.dj_only || matches!(event, ControlEvent::DjOnly(_)) {
            debug!(room = %room, actor = %actor.tag, ?event, "rejected non-DJ event");
            return Err(PlaybackError::Forbidden);
        }
    }

    match event {
        ControlEvent::Join => match controller.ensure_connected(room, &actor.voice).await? {
            Some(_) => Ok("Joined your voice channel.".into()),
            None => Err(PlaybackError::NotInVoice),
        },
        ControlEvent::Play { query, position } => {
            let query = query.trim();
            if query.is_empty() {
                return Err(PlaybackError::InvalidRequest("nothing to play".into()));
            }
            let outcome = controller
                .play(
                    room,
                    &actor.voice,
                    Some(surface.clone()),
                    query,
                    &actor.requester(),
                    position,
                )
                .await?;
            let more = match outcome.added {
                1 => String::new(),
                n => format!(" (+{} more)", n - 1),
            };
            let verb = if outcome.started { "Playing" } else { "Queued" };
            Ok(format!("{}: {}{}", verb, outcome.first_title, more))
        }
        ControlEvent::ShowQueue => {
            controller.show_panel(room, surface.clone()).await?;
            Ok("Player panel updated.".into())
        }
        ControlEvent::Skip => {
            let skipped = controller.skip(room).await?;
            Ok(format!("Skipped {}.", skipped.title))
        }
        ControlEvent::Previous => {
            controller.previous(room).await?;
            Ok("Previous track.".into())
        }
        ControlEvent::Stop => {
            controller.stop(room).await?;
            Ok("Stopped and cleared the queue.".into())
        }
        ControlEvent::Leave => {
            controller.leave(room).await?;
            Ok("Left the channel.".into())
        }
        ControlEvent::Pause => Ok(if controller.pause(room).await? {
            "Paused.".into()
        } else {
            "Already paused.".into()
        }),
        ControlEvent::Resume => Ok(if controller.resume(room).await? {
            "Resumed.".into()
        } else {
            "Not paused.".into()
        }),
        ControlEvent::TogglePause => Ok(if controller.toggle_pause(room).await? {
            "Paused.".into()
        } else {
            "Resumed.".into()
        }),
        ControlEvent::Volume(percent) => {
            let volume = controller.set_volume(room, percent).await?;
            Ok(format!("Volume set to {}%.", volume))
        }
        ControlEvent::Seek(raw) => {
            let target = parse_timestamp(&raw)?;
            controller.seek(room, target).await?;
            Ok(format!("Seeking to {}.", format_time(target)))
        }
        ControlEvent::Shuffle => {
            let count = controller.shuffle(room).await?;
            Ok(format!("Shuffled {} tracks.", count))
        }
        ControlEvent::Loop(mode) => {
            let mode = controller.set_loop(room, mode).await?;
            Ok(format!("Loop mode: {}.", mode))
        }
        ControlEvent::Autoplay(enabled) => {
            let enabled = controller.set_autoplay(room, enabled).await?;
            Ok(format!("Autoplay {}.", if enabled { "on" } else { "off" }))
        }
        ControlEvent::DjOnly(enabled) => {
            let enabled = controller.set_dj_only(room, enabled).await?;
            Ok(format!("DJ-only mode {}.", if enabled { "on" } else { "off" }))
        }
        ControlEvent::Filter(key) => {
            let filter = match key.as_deref().map(str::trim) {
                None | Some("" | "off" | "none") => None,
                Some(key) => Some(
                    AudioFilter::from_key(key)
                        .ok_or_else(|| PlaybackError::UnknownFilter(key.to_string()))?,
                ),
            };
            controller.apply_filter(room, filter).await?;
            Ok(match filter {
                Some(filter) => format!("Filter set to {}.", filter.key()),
                None => "Filter cleared.".into(),
            })
        }
        ControlEvent::Jump(position) => {
            controller.jump(room, to_index(position)?).await?;
            Ok(format!("Jumped to #{}.", position))
        }
        ControlEvent::Remove(position) => {
            let removed = controller.remove(room, to_index(position)?).await?;
            Ok(format!("Removed {}.", removed.title))
        }
        ControlEvent::Move { from, to } => {
            controller.move_track(room, to_index(from)?, to_index(to)?).await?;
            Ok(format!("Moved #{} to #{}.", from, to))
        }
        ControlEvent::Clear => {
            let dropped = controller.clear_queue(room).await?;
            Ok(format!("Cleared {} tracks.", dropped))
        }
        ControlEvent::PageNext => {
            let page = controller.turn_page(room, 1).await?;
            Ok(format!("Page {}.", page + 1))
        }
        ControlEvent::PagePrev => {
            let page = controller.turn_page(room, -1).await?;
            Ok(format!("Page {}.", page + 1))
        }
    }
}

/// Handle a panel button press
///
/// Presses on anything but the room's live panel message are ignored and
/// yield `Ok(None)`.
pub async fn dispatch_button(
    controller: &PlaybackController,
    room: &RoomId,
    message: &MessageId,
    control_id: &str,
    actor: &Actor,
) -> Result<Option<String>> {
    let Some(panel) = controller.panel_ref(room) else {
        return Ok(None);
    };
    if panel.message.as_ref() != Some(message) {
        debug!(room = %room, message = %message, "button on stale panel ignored");
        return Ok(None);
    }
    let Some(event) = ControlEvent::from_control_id(control_id) else {
        return Ok(None);
    };
    dispatch(controller, room, &panel.surface, actor, event)
        .await
        .map(Some)
}
