//! Control events routed through `dispatch` and panel buttons

mod common;

use common::{titles, tracks, Harness};
use discodj_core::types::MessageId;
use discodj_core::{LoopMode, VoiceContext};
use discodj_playback::{dispatch, dispatch_button, Actor, ControlEvent, EnqueuePosition, PlaybackError};

fn listener(is_dj: bool) -> Actor {
    Actor {
        id: "200".into(),
        tag: "guest#0200".into(),
        is_dj,
        voice: VoiceContext::in_channel("voice-1"),
    }
}

async fn send(h: &Harness, actor: &Actor, event: ControlEvent) -> discodj_playback::Result<String> {
    dispatch(&h.controller, &h.room, &h.surface_id(), actor, event).await
}

#[tokio::test]
async fn play_event_replies_with_outcome() {
    let h = Harness::new();
    h.resolver.answer("mix", tracks(&["one", "two", "three"]));

    let reply = send(
        &h,
        &listener(false),
        ControlEvent::Play {
            query: "mix".into(),
            position: EnqueuePosition::End,
        },
    )
    .await
    .unwrap();
    assert_eq!(reply, "Playing: one (+2 more)");

    let reply = send(
        &h,
        &listener(false),
        ControlEvent::Play {
            query: "   ".into(),
            position: EnqueuePosition::End,
        },
    )
    .await;
    assert!(matches!(reply, Err(PlaybackError::InvalidRequest(_))));
}

#[tokio::test]
async fn dj_only_blocks_mutations_from_non_djs() {
    let h = Harness::new();
    h.start_with(&["a", "b"]).await;
    h.controller.set_dj_only(&h.room, true).await.unwrap();

    for event in [
        ControlEvent::Skip,
        ControlEvent::Stop,
        ControlEvent::Volume(10),
        ControlEvent::Loop(LoopMode::All),
        ControlEvent::Clear,
    ] {
        assert!(
            matches!(send(&h, &listener(false), event.clone()).await, Err(PlaybackError::Forbidden)),
            "{event:?} was allowed"
        );
    }

    // Read-only events stay open
    assert!(send(&h, &listener(false), ControlEvent::ShowQueue).await.is_ok());

    let room = h.controller.info(&h.room).await.unwrap();
    assert_eq!(titles(&room.queue), vec!["b"]);
    assert_eq!(room.settings.loop_mode, LoopMode::Off);

    assert_eq!(send(&h, &listener(true), ControlEvent::Skip).await.unwrap(), "Skipped a.");
}

#[tokio::test]
async fn only_djs_toggle_dj_only() {
    let h = Harness::new();
    assert!(matches!(
        send(&h, &listener(false), ControlEvent::DjOnly(true)).await,
        Err(PlaybackError::Forbidden)
    ));
    assert_eq!(
        send(&h, &listener(true), ControlEvent::DjOnly(true)).await.unwrap(),
        "DJ-only mode on."
    );
    assert!(h.controller.settings(&h.room).await.dj_only);
}

#[tokio::test]
async fn seek_and_filter_inputs_are_validated() {
    let h = Harness::new();
    h.start_with(&["a"]).await;
    let dj = listener(true);

    assert!(matches!(
        send(&h, &dj, ControlEvent::Seek("1:75".into())).await,
        Err(PlaybackError::InvalidTimestamp(_))
    ));
    assert_eq!(
        send(&h, &dj, ControlEvent::Seek("1:05".into())).await.unwrap(),
        "Seeking to 1:05."
    );

    assert!(matches!(
        send(&h, &dj, ControlEvent::Filter(Some("chipmunk".into()))).await,
        Err(PlaybackError::UnknownFilter(_))
    ));
    assert_eq!(
        send(&h, &dj, ControlEvent::Filter(Some("8d".into()))).await.unwrap(),
        "Filter set to 8d."
    );
    assert_eq!(
        send(&h, &dj, ControlEvent::Filter(Some("off".into()))).await.unwrap(),
        "Filter cleared."
    );
}

#[tokio::test]
async fn queue_positions_are_one_based() {
    let h = Harness::new();
    h.controller
        .enqueue(&h.room, tracks(&["a", "b", "c"]), EnqueuePosition::End)
        .await
        .unwrap();
    let dj = listener(true);

    assert!(matches!(
        send(&h, &dj, ControlEvent::Remove(0)).await,
        Err(PlaybackError::InvalidRequest(_))
    ));
    assert_eq!(send(&h, &dj, ControlEvent::Remove(2)).await.unwrap(), "Removed b.");
    assert_eq!(
        send(&h, &dj, ControlEvent::Move { from: 2, to: 1 }).await.unwrap(),
        "Moved #2 to #1."
    );
    let room = h.controller.info(&h.room).await.unwrap();
    assert_eq!(titles(&room.queue), vec!["c", "a"]);
}

#[tokio::test]
async fn join_needs_a_voice_channel() {
    let h = Harness::new();
    let mut outsider = listener(false);
    outsider.voice = VoiceContext::default();

    assert!(matches!(
        send(&h, &outsider, ControlEvent::Join).await,
        Err(PlaybackError::NotInVoice)
    ));
    assert!(send(&h, &listener(false), ControlEvent::Join).await.is_ok());
    assert!(h.controller.info(&h.room).await.unwrap().connected);
}

#[tokio::test]
async fn buttons_on_live_panel_are_handled() {
    let h = Harness::new();
    h.start_with(&["a", "b"]).await;
    let panel = h.controller.panel_ref(&h.room).unwrap();
    let message = panel.message.unwrap();

    let reply = dispatch_button(&h.controller, &h.room, &message, "music:toggle", &listener(false))
        .await
        .unwrap();
    assert_eq!(reply.as_deref(), Some("Paused."));

    let reply = dispatch_button(&h.controller, &h.room, &message, "music:bogus", &listener(false))
        .await
        .unwrap();
    assert!(reply.is_none());
}

#[tokio::test]
async fn buttons_on_stale_panels_are_ignored() {
    let h = Harness::new();
    h.start_with(&["a", "b"]).await;

    let reply = dispatch_button(
        &h.controller,
        &h.room,
        &MessageId::new("some-old-message"),
        "music:skip",
        &listener(true),
    )
    .await
    .unwrap();
    assert!(reply.is_none());

    let room = h.controller.info(&h.room).await.unwrap();
    assert_eq!(room.now_playing.unwrap().title, "a");
}
