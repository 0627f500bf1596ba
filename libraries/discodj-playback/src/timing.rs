//! Elapsed-time tracking
//!
//! Pause, resume and seek all move the reference point, so elapsed time is
//! derived from a small amount of state plus `now`. When the sink reports how
//! much it actually played, that signal wins over wall-clock arithmetic.
//!
//! Clamping to the track duration happens when reading ([`Timing::progress`]),
//! never when writing.

/// Timing state of the current track
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timing {
    /// Wall clock when the current playback reference began
    started_at_ms: u64,
    /// Offset added on top of the measured time, e.g. from a seek
    seek_base_sec: f64,
    /// Wall clock when the current pause began
    paused_at_ms: Option<u64>,
    /// Total of all finished pauses since the track started
    pause_hold_ms: u64,
}

/// Elapsed and total seconds of the current track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub elapsed: f64,
    /// Declared duration; `None` when unknown
    pub total: Option<f64>,
}

impl Timing {
    /// Reference point for a fresh start (or a restart after seek)
    pub fn on_track_start(&mut self, now_ms: u64, seek_base_sec: f64) {
        self.started_at_ms = now_ms;
        self.seek_base_sec = if seek_base_sec.is_finite() {
            seek_base_sec.max(0.0)
        } else {
            0.0
        };
        self.paused_at_ms = None;
        self.pause_hold_ms = 0;
    }

    /// Idempotent: a second pause keeps the first pause start
    pub fn on_pause(&mut self, now_ms: u64) {
        if self.paused_at_ms.is_none() {
            self.paused_at_ms = Some(now_ms);
        }
    }

    /// No-op when not paused
    pub fn on_resume(&mut self, now_ms: u64) {
        if let Some(paused_at) = self.paused_at_ms.take() {
            self.pause_hold_ms += now_ms.saturating_sub(paused_at);
        }
    }

    /// Reset the reference point entirely
    pub fn on_seek(&mut self, now_ms: u64, position_sec: f64) {
        self.on_track_start(now_ms, position_sec);
    }

    /// Forget everything (track ended or playback stopped)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at_ms.is_some()
    }

    pub fn seek_base_sec(&self) -> f64 {
        self.seek_base_sec
    }

    /// Seconds played of the current track
    ///
    /// `hardware_ms` is the sink's own count of milliseconds played; it is
    /// used whenever it is finite and non-negative.
    pub fn elapsed_seconds(&self, now_ms: u64, hardware_ms: Option<f64>) -> f64 {
        if let Some(played) = hardware_ms.filter(|ms| ms.is_finite() && *ms >= 0.0) {
            return played / 1000.0 + self.seek_base_sec;
        }

        let current_pause = self
            .paused_at_ms
            .map_or(0, |paused_at| now_ms.saturating_sub(paused_at));
        let effective_ms = now_ms as i128
            - self.started_at_ms as i128
            - (self.pause_hold_ms as i128 + current_pause as i128);
        (self.seek_base_sec + effective_ms as f64 / 1000.0).max(0.0)
    }

    /// Elapsed/total pair with elapsed clamped into the known duration
    pub fn progress(&self, now_ms: u64, hardware_ms: Option<f64>, duration_sec: Option<f64>) -> Progress {
        let total = duration_sec.filter(|d| d.is_finite() && *d > 0.0);
        let mut elapsed = self.elapsed_seconds(now_ms, hardware_ms);
        if let Some(total) = total {
            elapsed = elapsed.min(total);
        }
        Progress { elapsed, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn pause_is_excluded_from_elapsed() {
        let mut timing = Timing::default();
        timing.on_track_start(0, 0.0);
        timing.on_pause(5_000);
        timing.on_resume(8_000);
        assert!((timing.elapsed_seconds(10_000, None) - 7.0).abs() < EPS);
    }

    #[test]
    fn elapsed_is_frozen_while_paused() {
        let mut timing = Timing::default();
        timing.on_track_start(1_000, 0.0);
        timing.on_pause(4_000);
        assert!((timing.elapsed_seconds(4_000, None) - 3.0).abs() < EPS);
        assert!((timing.elapsed_seconds(60_000, None) - 3.0).abs() < EPS);
    }

    #[test]
    fn double_pause_keeps_first_start() {
        let mut timing = Timing::default();
        timing.on_track_start(0, 0.0);
        timing.on_pause(2_000);
        timing.on_pause(3_000);
        timing.on_resume(4_000);
        assert!((timing.elapsed_seconds(5_000, None) - 3.0).abs() < EPS);
    }

    #[test]
    fn resume_without_pause_is_noop() {
        let mut timing = Timing::default();
        timing.on_track_start(0, 0.0);
        timing.on_resume(2_000);
        assert!((timing.elapsed_seconds(2_000, None) - 2.0).abs() < EPS);
    }

    #[test]
    fn seek_resets_reference() {
        let mut timing = Timing::default();
        timing.on_track_start(0, 0.0);
        timing.on_pause(1_000);
        timing.on_seek(9_000, 42.0);
        assert!(!timing.is_paused());
        assert!((timing.elapsed_seconds(9_000, None) - 42.0).abs() < EPS);
        assert!((timing.elapsed_seconds(10_500, None) - 43.5).abs() < EPS);
    }

    #[test]
    fn hardware_signal_wins_when_valid() {
        let mut timing = Timing::default();
        timing.on_track_start(0, 30.0);
        assert!((timing.elapsed_seconds(100_000, Some(2_500.0)) - 32.5).abs() < EPS);
        assert!((timing.elapsed_seconds(1_000, Some(f64::NAN)) - 31.0).abs() < EPS);
        assert!((timing.elapsed_seconds(1_000, Some(-5.0)) - 31.0).abs() < EPS);
        assert!((timing.elapsed_seconds(1_000, Some(f64::INFINITY)) - 31.0).abs() < EPS);
    }

    #[test]
    fn clock_going_backwards_never_goes_negative() {
        let mut timing = Timing::default();
        timing.on_track_start(10_000, 0.0);
        assert_eq!(timing.elapsed_seconds(5_000, None), 0.0);
    }

    #[test]
    fn progress_clamps_to_known_total() {
        let mut timing = Timing::default();
        timing.on_track_start(0, 0.0);
        let progress = timing.progress(500_000, None, Some(180.0));
        assert_eq!(progress.elapsed, 180.0);
        assert_eq!(progress.total, Some(180.0));

        let unknown = timing.progress(500_000, None, None);
        assert_eq!(unknown.total, None);
        assert_eq!(unknown.elapsed, 500.0);

        let zero = timing.progress(500_000, None, Some(0.0));
        assert_eq!(zero.total, None);
    }
}
