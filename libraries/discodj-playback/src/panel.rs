//! Panel rendering
//!
//! Pure projection of a room into the payload drawn on the chat surface.
//! Nothing in here fails; missing data renders as "Unknown" or is left out.

use crate::room::RoomState;
use crate::timing::Progress;
use discodj_core::types::{NowPlayingView, PanelControl, PanelPayload, UpNextEntry};
use discodj_core::PlayerStatus;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const CONTROL_PREVIOUS: &str = "music:prev";
pub const CONTROL_TOGGLE: &str = "music:toggle";
pub const CONTROL_SKIP: &str = "music:skip";
pub const CONTROL_STOP: &str = "music:stop";
pub const CONTROL_PAGE_PREV: &str = "music:page_prev";
pub const CONTROL_PAGE_NEXT: &str = "music:page_next";

const SLOT_KNOB: char = '🔘';
const SLOT_TRACK: char = '▬';

/// Page and bar geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    pub page_size: usize,
    pub progress_slots: usize,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            page_size: 10,
            progress_slots: 10,
        }
    }
}

/// `m:ss`, or `h:mm:ss` from one hour up; non-finite or negative is `0:00`
pub fn format_time(sec: f64) -> String {
    if !sec.is_finite() || sec < 0.0 {
        return "0:00".to_string();
    }
    let total = sec.floor() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Index of the knob on a bar with `slots` positions
///
/// `None` when the total is unknown, zero or not finite.
pub fn progress_slot(elapsed: f64, total: Option<f64>, slots: usize) -> Option<usize> {
    let total = total.filter(|t| t.is_finite() && *t > 0.0)?;
    let raw = (elapsed / total * slots as f64).round();
    if raw.is_nan() {
        return Some(0);
    }
    Some(raw.clamp(0.0, slots as f64) as usize)
}

/// `1:23 / 3:45` over a slot bar; `None` when the total is unknown
pub fn progress_bar(progress: Progress, slots: usize) -> Option<String> {
    let knob = progress_slot(progress.elapsed, progress.total, slots)?;
    let total = progress.total?;
    let bar: String = (0..slots)
        .map(|i| if i == knob { SLOT_KNOB } else { SLOT_TRACK })
        .collect();
    Some(format!(
        "{} / {}\n{}",
        format_time(progress.elapsed),
        format_time(total),
        bar
    ))
}

/// Content hash used to skip redundant pushes
///
/// Covers the current track identity, whole seconds of elapsed and total,
/// sink status and queue length.
pub fn panel_hash(room: &RoomState, progress: Option<Progress>) -> u64 {
    let mut hasher = DefaultHasher::new();
    room.now_playing().map(|t| t.key).hash(&mut hasher);
    if let Some(progress) = progress {
        (progress.elapsed.floor() as i64).hash(&mut hasher);
        progress.total.map(|t| t.floor() as i64).hash(&mut hasher);
    }
    room.status.hash(&mut hasher);
    room.queue.len().hash(&mut hasher);
    hasher.finish()
}

/// Build the panel for `room`
pub fn render(room: &RoomState, progress: Option<Progress>, layout: PanelLayout) -> PanelPayload {
    let page_size = layout.page_size.max(1);
    let page_count = room.page_count(page_size);
    let page = room.clamped_page(page_size);

    let now_playing = room.now_playing().map(|track| NowPlayingView {
        title: track.title.clone(),
        url: track.url.clone(),
        thumbnail: track.thumbnail.clone(),
        requested_by: track.requested_by_tag.clone(),
        duration: track
            .known_duration()
            .map_or_else(|| "Unknown".to_string(), format_time),
        progress: progress.and_then(|p| progress_bar(p, layout.progress_slots)),
    });

    // Remaining time of the current track; unknown counts as zero
    let mut eta = progress
        .and_then(|p| p.total.map(|total| (total - p.elapsed).max(0.0)))
        .unwrap_or(0.0);
    let first = page * page_size;
    let mut up_next = Vec::new();
    for (index, track) in room.queue.iter().enumerate().take(first + page_size) {
        if index >= first {
            up_next.push(UpNextEntry {
                position: index + 1,
                title: track.title.clone(),
                duration: track.known_duration().map(format_time),
                eta: format_time(eta),
            });
        }
        eta += track.known_duration().unwrap_or(0.0);
    }

    let heading = if now_playing.is_some() {
        "Now Playing"
    } else {
        "Nothing playing"
    };

    PanelPayload {
        heading: heading.to_string(),
        now_playing,
        up_next,
        page,
        page_count,
        footer: footer(room),
        controls: controls(room, page, page_count),
    }
}

fn footer(room: &RoomState) -> String {
    let settings = &room.settings;
    let mut footer = format!(
        "Volume {}% | Loop {} | Autoplay {}",
        settings.volume,
        settings.loop_mode,
        if settings.autoplay { "on" } else { "off" }
    );
    if let Some(filter) = room.filter {
        footer.push_str(&format!(" | Filter {}", filter.key()));
    }
    if settings.dj_only {
        footer.push_str(" | DJ only");
    }
    footer
}

fn controls(room: &RoomState, page: usize, page_count: usize) -> Vec<PanelControl> {
    let playing = room.now_playing().is_some();
    let paused = room.status.is_paused();
    let control = |id: &str, label: &str, enabled: bool| PanelControl {
        id: id.to_string(),
        label: label.to_string(),
        enabled,
    };

    let mut controls = vec![
        control(CONTROL_PREVIOUS, "Prev", !room.history.is_empty() || playing),
        control(CONTROL_TOGGLE, if paused { "Resume" } else { "Pause" }, playing),
        control(CONTROL_SKIP, "Skip", playing),
        control(CONTROL_STOP, "Stop", playing || !room.queue.is_empty()),
    ];
    if page_count > 1 {
        controls.push(control(CONTROL_PAGE_PREV, "Prev page", page > 0));
        controls.push(control(CONTROL_PAGE_NEXT, "Next page", page + 1 < page_count));
    }
    controls
}

/// Whether a status shows as playing on the panel
pub fn is_live(status: PlayerStatus) -> bool {
    status == PlayerStatus::Playing
}

#[cfg(test)]
mod tests {
    use super::*;
    use discodj_core::types::ResourceId;
    use discodj_core::{Requester, RoomId, Track, TrackSource};

    fn track(title: &str, duration: Option<f64>) -> Track {
        Track::new(
            format!("https://youtu.be/{}", title),
            title,
            &Requester::new("1", "tester"),
            TrackSource::YouTube,
        )
        .with_duration(duration)
    }

    fn playing_room(current: Option<f64>, queued: &[Option<f64>]) -> RoomState {
        let mut room = RoomState::new(RoomId::new("guild"), 50);
        room.begin(track("now", current), ResourceId(1), 0, 0.0);
        for (i, duration) in queued.iter().enumerate() {
            room.queue.push_back(track(&format!("q{i}"), *duration));
        }
        room
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(83.9), "1:23");
        assert_eq!(format_time(3723.0), "1:02:03");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(-1.0), "0:00");
    }

    #[test]
    fn slot_rounds_and_clamps() {
        assert_eq!(progress_slot(0.0, Some(100.0), 10), Some(0));
        assert_eq!(progress_slot(44.0, Some(100.0), 10), Some(4));
        assert_eq!(progress_slot(45.0, Some(100.0), 10), Some(5));
        assert_eq!(progress_slot(500.0, Some(100.0), 10), Some(10));
        assert_eq!(progress_slot(-5.0, Some(100.0), 10), Some(0));
        assert_eq!(progress_slot(5.0, None, 10), None);
        assert_eq!(progress_slot(5.0, Some(0.0), 10), None);
    }

    #[test]
    fn bar_only_with_known_total() {
        let bar = progress_bar(Progress { elapsed: 30.0, total: Some(60.0) }, 4).unwrap();
        assert_eq!(bar, "0:30 / 1:00\n▬▬🔘▬");
        assert!(progress_bar(Progress { elapsed: 30.0, total: None }, 4).is_none());
    }

    #[test]
    fn eta_sums_tracks_strictly_before() {
        let room = playing_room(Some(100.0), &[Some(60.0), None, Some(30.0)]);
        let progress = room.progress(40_000, None);
        let payload = render(&room, progress, PanelLayout::default());

        let etas: Vec<&str> = payload.up_next.iter().map(|e| e.eta.as_str()).collect();
        // 60s left of the current track, the unknown one adds nothing
        assert_eq!(etas, vec!["1:00", "2:00", "2:00"]);
        assert_eq!(payload.up_next[0].position, 1);
        assert_eq!(payload.up_next[1].duration, None);
        assert_eq!(payload.up_next[2].duration.as_deref(), Some("0:30"));
    }

    #[test]
    fn unknown_current_duration_counts_as_zero() {
        let room = playing_room(None, &[Some(60.0), Some(60.0)]);
        let payload = render(&room, room.progress(10_000, None), PanelLayout::default());
        let now = payload.now_playing.unwrap();
        assert_eq!(now.duration, "Unknown");
        assert!(now.progress.is_none());
        assert_eq!(payload.up_next[0].eta, "0:00");
        assert_eq!(payload.up_next[1].eta, "1:00");
    }

    #[test]
    fn pagination_and_page_controls() {
        let queued: Vec<Option<f64>> = vec![Some(10.0); 25];
        let mut room = playing_room(Some(100.0), &queued);
        let layout = PanelLayout::default();

        let first = render(&room, None, layout);
        assert_eq!(first.page_count, 3);
        assert_eq!(first.up_next.len(), 10);
        let ids: Vec<&str> = first.controls.iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&CONTROL_PAGE_NEXT));
        assert!(!first.controls.iter().find(|c| c.id == CONTROL_PAGE_PREV).unwrap().enabled);

        room.page = 2;
        let last = render(&room, None, layout);
        assert_eq!(last.up_next.len(), 5);
        assert_eq!(last.up_next[0].position, 21);
        // 100s current (no progress, so zero) + 20 tracks of 10s
        assert_eq!(last.up_next[0].eta, "3:20");
        assert!(!last.controls.iter().find(|c| c.id == CONTROL_PAGE_NEXT).unwrap().enabled);
    }

    #[test]
    fn single_page_has_no_page_controls() {
        let room = playing_room(Some(100.0), &[Some(10.0)]);
        let payload = render(&room, None, PanelLayout::default());
        assert_eq!(payload.controls.len(), 4);
    }

    #[test]
    fn toggle_follows_pause_state() {
        let mut room = playing_room(Some(100.0), &[]);
        let label = |room: &RoomState| {
            render(room, None, PanelLayout::default())
                .controls
                .into_iter()
                .find(|c| c.id == CONTROL_TOGGLE)
                .unwrap()
                .label
        };
        assert_eq!(label(&room), "Pause");
        room.status = PlayerStatus::AutoPaused;
        assert_eq!(label(&room), "Resume");
    }

    #[test]
    fn idle_panel() {
        let room = RoomState::new(RoomId::new("guild"), 50);
        let payload = render(&room, None, PanelLayout::default());
        assert_eq!(payload.heading, "Nothing playing");
        assert!(payload.now_playing.is_none());
        assert!(payload.up_next.is_empty());
        assert_eq!(payload.page_count, 1);
        assert!(payload.controls.iter().all(|c| !c.enabled));
    }

    #[test]
    fn hash_ignores_sub_second_changes() {
        let room = playing_room(Some(100.0), &[None]);
        let a = panel_hash(&room, room.progress(10_100, None));
        let b = panel_hash(&room, room.progress(10_900, None));
        let c = panel_hash(&room, room.progress(11_000, None));
        assert_eq!(a, b);
        assert_ne!(b, c);
    }
}
