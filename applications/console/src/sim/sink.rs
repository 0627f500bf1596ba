//! Timer-driven audio sink
//!
//! Nothing is decoded. A track "plays" for its declared length on a tokio
//! timer and then reports itself idle, which is all the playback core needs
//! to see from a real voice player.

use discodj_core::types::{ResourceId, SinkEvent};
use discodj_core::{AudioResource, AudioSink, PlayerStatus, StatusListener};
use discodj_resolver::ffmpeg_args;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Length assumed for tracks that do not declare one
pub const UNKNOWN_LENGTH: Duration = Duration::from_secs(180);

struct Current {
    id: ResourceId,
    title: String,
    /// Time left when the last timer was armed
    remaining: Duration,
    /// Played before the last resume
    played: Duration,
    /// Set while playing
    resumed_at: Option<Instant>,
    timer: Option<JoinHandle<()>>,
}

impl Current {
    fn played_now(&self) -> Duration {
        self.played + self.resumed_at.map_or(Duration::ZERO, |at| at.elapsed())
    }
}

#[derive(Default)]
struct Inner {
    current: Option<Current>,
    listener: Option<StatusListener>,
    volume: f32,
}

#[derive(Default)]
pub struct SimSink {
    inner: Arc<Mutex<Inner>>,
}

impl SimSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// End the current track as if it ran out
    pub fn finish_now(&self) -> bool {
        finish(&self.inner, None)
    }

    pub fn volume(&self) -> f32 {
        self.lock().volume
    }

    /// Title of the resource being played or paused
    pub fn current_title(&self) -> Option<String> {
        self.lock().current.as_ref().map(|c| c.title.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(&self, id: ResourceId, after: Duration) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            finish(&inner, Some(id));
        })
    }
}

/// Clear the current resource (only `expected`, if given) and report it idle
fn finish(inner: &Mutex<Inner>, expected: Option<ResourceId>) -> bool {
    let (event, listener) = {
        let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
        let matches = guard
            .current
            .as_ref()
            .is_some_and(|c| expected.map_or(true, |id| c.id == id));
        if !matches {
            return false;
        }
        let Some(current) = guard.current.take() else {
            return false;
        };
        if let Some(timer) = current.timer {
            // From inside the timer task this only lands at its next await
            timer.abort();
        }
        debug!(resource = %current.id, title = %current.title, "resource ran out");
        (
            SinkEvent {
                resource: current.id,
                status: PlayerStatus::Idle,
            },
            guard.listener.clone(),
        )
    };
    if let Some(listener) = listener {
        listener(event);
    }
    true
}

impl AudioSink for SimSink {
    fn play(&self, id: ResourceId, resource: AudioResource) -> discodj_core::Result<()> {
        let length = resource
            .track
            .known_duration()
            .map_or(UNKNOWN_LENGTH, Duration::from_secs_f64);
        let remaining = length.saturating_sub(Duration::from_secs_f64(resource.seek_offset_sec.max(0.0)));
        debug!(resource = %id, args = ?ffmpeg_args(&resource), "transcode pipeline");

        // Only running out is reported; the controller marks starts itself
        let timer = self.arm(id, remaining);
        let mut inner = self.lock();
        if let Some(old) = inner.current.take().and_then(|c| c.timer) {
            old.abort();
        }
        inner.current = Some(Current {
            id,
            title: resource.track.title.clone(),
            remaining,
            played: Duration::ZERO,
            resumed_at: Some(Instant::now()),
            timer: Some(timer),
        });
        Ok(())
    }

    fn pause(&self) -> bool {
        let mut inner = self.lock();
        let Some(current) = inner.current.as_mut() else {
            return false;
        };
        let Some(resumed_at) = current.resumed_at.take() else {
            return false;
        };
        let ran = resumed_at.elapsed();
        current.played += ran;
        current.remaining = current.remaining.saturating_sub(ran);
        if let Some(timer) = current.timer.take() {
            timer.abort();
        }
        true
    }

    fn resume(&self) -> bool {
        let (id, remaining) = {
            let mut inner = self.lock();
            let Some(current) = inner.current.as_mut() else {
                return false;
            };
            if current.resumed_at.is_some() {
                return false;
            }
            current.resumed_at = Some(Instant::now());
            (current.id, current.remaining)
        };
        let timer = self.arm(id, remaining);
        let mut inner = self.lock();
        match inner.current.as_mut() {
            Some(current) if current.id == id => current.timer = Some(timer),
            _ => timer.abort(),
        }
        true
    }

    fn stop(&self) {
        let mut inner = self.lock();
        if let Some(timer) = inner.current.take().and_then(|c| c.timer) {
            timer.abort();
        }
    }

    fn set_volume(&self, ratio: f32) {
        self.lock().volume = ratio;
    }

    fn playback_duration_ms(&self) -> Option<f64> {
        self.lock()
            .current
            .as_ref()
            .map(|c| c.played_now().as_secs_f64() * 1000.0)
    }

    fn set_listener(&self, listener: Option<StatusListener>) {
        self.lock().listener = listener;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discodj_core::{Requester, Track, TrackSource};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn resource(duration: f64, seek: f64) -> AudioResource {
        let track = Track::new("https://youtu.be/a", "A", &Requester::new("1", "u"), TrackSource::YouTube)
            .with_duration(Some(duration));
        AudioResource {
            input: "https://cdn.example/a".into(),
            seek_offset_sec: seek,
            filter: None,
            track,
        }
    }

    fn counting_listener(sink: &SimSink) -> Arc<AtomicUsize> {
        let idles = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&idles);
        sink.set_listener(Some(Arc::new(move |event: SinkEvent| {
            if event.status == PlayerStatus::Idle {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        })));
        idles
    }

    #[tokio::test(start_paused = true)]
    async fn runs_out_after_remaining_length() {
        let sink = SimSink::new();
        let idles = counting_listener(&sink);
        sink.play(ResourceId(1), resource(10.0, 4.0)).unwrap();

        tokio::time::sleep(Duration::from_millis(5_900)).await;
        assert_eq!(idles.load(Ordering::SeqCst), 0);
        assert!((sink.playback_duration_ms().unwrap() - 5_900.0).abs() < 1.0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(idles.load(Ordering::SeqCst), 1);
        assert!(sink.current_title().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_holds_the_timer() {
        let sink = SimSink::new();
        let idles = counting_listener(&sink);
        sink.play(ResourceId(1), resource(10.0, 0.0)).unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(sink.pause());
        assert!(!sink.pause());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(idles.load(Ordering::SeqCst), 0);
        assert!((sink.playback_duration_ms().unwrap() - 3_000.0).abs() < 1.0);

        assert!(sink.resume());
        tokio::time::sleep(Duration::from_millis(7_100)).await;
        assert_eq!(idles.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_silent() {
        let sink = SimSink::new();
        let idles = counting_listener(&sink);
        sink.play(ResourceId(1), resource(5.0, 0.0)).unwrap();
        sink.stop();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(idles.load(Ordering::SeqCst), 0);
        assert!(!sink.finish_now());
    }
}
