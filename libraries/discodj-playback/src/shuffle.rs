//! Queue randomization

use discodj_core::Track;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

/// Pure random shuffle using Fisher-Yates
///
/// Each track has equal probability of appearing at any position.
pub fn shuffle_tracks(tracks: &mut [Track]) {
    shuffle_tracks_with(tracks, &mut thread_rng());
}

/// Same as [`shuffle_tracks`] with a caller-supplied generator
pub fn shuffle_tracks_with<R: Rng + ?Sized>(tracks: &mut [Track], rng: &mut R) {
    tracks.shuffle(rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use discodj_core::{Requester, TrackSource};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tracks(n: usize) -> Vec<Track> {
        let requester = Requester::new("1", "tester");
        (0..n)
            .map(|i| Track::new(format!("https://youtu.be/{i}"), format!("Track {i}"), &requester, TrackSource::YouTube))
            .collect()
    }

    #[test]
    fn shuffle_keeps_every_track() {
        let mut list = tracks(20);
        let mut before: Vec<_> = list.iter().map(|t| t.key).collect();
        shuffle_tracks(&mut list);
        let mut after: Vec<_> = list.iter().map(|t| t.key).collect();
        before.sort_by_key(ToString::to_string);
        after.sort_by_key(ToString::to_string);
        assert_eq!(before, after);
    }

    #[test]
    fn seeded_shuffle_changes_order() {
        let mut list = tracks(20);
        let before: Vec<_> = list.iter().map(|t| t.key).collect();
        shuffle_tracks_with(&mut list, &mut StdRng::seed_from_u64(7));
        let after: Vec<_> = list.iter().map(|t| t.key).collect();
        assert_ne!(before, after);
    }

    #[test]
    fn single_track_is_untouched() {
        let mut list = tracks(1);
        let key = list[0].key;
        shuffle_tracks(&mut list);
        assert_eq!(list[0].key, key);
    }
}
