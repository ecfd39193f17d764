use crate::ring_buffer::RingBuffer;
use crate::sample::Sample;

use std::collections::HashMap;

pub const MIN_WINDOW: usize = 2;
pub const MAX_WINDOW: usize = 60;
pub const DEFAULT_WINDOW: usize = 3;

#[derive(Debug, Clone)]
pub struct TrackEntry {
    pub history: RingBuffer<Sample>,
    pub last_seen: f64,
}

/// Owns one motion-history buffer per track id. Buffers are created lazily on
/// the first observation and only go away through `evict_stale`/`remove`.
#[derive(Debug, Clone)]
pub struct TrackHistory {
    window: usize,
    tracks: HashMap<u64, TrackEntry>,
}

impl Default for TrackHistory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl TrackHistory {
    /// Windows outside `MIN_WINDOW..=MAX_WINDOW` are clamped.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.clamp(MIN_WINDOW, MAX_WINDOW),
            tracks: HashMap::new(),
        }
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    fn entry(&mut self, track_id: u64) -> &mut TrackEntry {
        let window = self.window;

        self.tracks.entry(track_id).or_insert_with(|| TrackEntry {
            history: RingBuffer::with_capacity(window),
            last_seen: f64::NEG_INFINITY,
        })
    }

    /// Buffers reached only through here are never marked as seen, so the
    /// next staleness sweep drops them unless `observe` is called.
    #[inline]
    pub fn get_or_create(&mut self, track_id: u64) -> &mut RingBuffer<Sample> {
        &mut self.entry(track_id).history
    }

    /// Appends a sample to the track's buffer and marks it as seen at `sample.t`.
    pub fn observe(&mut self, track_id: u64, sample: Sample) -> &RingBuffer<Sample> {
        let entry = self.entry(track_id);
        entry.history.push(sample);
        entry.last_seen = sample.t;

        &entry.history
    }

    #[inline]
    pub fn get(&self, track_id: u64) -> Option<&RingBuffer<Sample>> {
        self.tracks.get(&track_id).map(|e| &e.history)
    }

    #[inline]
    pub fn last_seen(&self, track_id: u64) -> Option<f64> {
        self.tracks.get(&track_id).map(|e| e.last_seen)
    }

    #[inline]
    pub fn remove(&mut self, track_id: u64) -> Option<TrackEntry> {
        self.tracks.remove(&track_id)
    }

    /// Drops every track not observed within `max_age` seconds of `now`.
    /// Returns how many were dropped.
    pub fn evict_stale(&mut self, now: f64, max_age: f64) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(|_, e| now - e.last_seen <= max_age);

        before - self.tracks.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.tracks.clear()
    }

    #[inline]
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.tracks.keys().copied()
    }
}
