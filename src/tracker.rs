use crate::config::{EvictionConfig, SpeedConfig};
use crate::estimator::SpeedEstimator;
use crate::frame::Frame;
use crate::projector::GroundProjector;
use crate::recorder::{BatchRecorder, SpeedRecord};
use crate::sample::Sample;
use crate::sink::{RecordSink, SqliteSink};
use crate::track_history::TrackHistory;

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One pipeline session: per-track histories, the ground projector, the
/// estimator and the per-frame batch writer.
pub struct SpeedTracker {
    history: TrackHistory,
    projector: GroundProjector,
    estimator: SpeedEstimator,
    recorder: BatchRecorder,
    sink: Option<Box<dyn RecordSink + Send>>,
    eviction: EvictionConfig,
    frames: u64,
    failed_flushes: u64,
}

impl SpeedTracker {
    /// Opens the SQLite store named by `storage_path`. If it cannot be opened
    /// the tracker still estimates but persists nothing.
    pub fn open(config: SpeedConfig) -> Self {
        let config = config.sanitize();

        let sink: Option<Box<dyn RecordSink + Send>> = match &config.storage_path {
            Some(path) => match SqliteSink::open(path) {
                Ok(sink) => {
                    info!("Opened speed store {:?}", path);
                    Some(Box::new(sink))
                }
                Err(err) => {
                    warn!(
                        "Could not open speed store {:?}: {}; speeds will not be persisted",
                        path, err
                    );
                    None
                }
            },
            None => {
                info!("No storage path configured; speeds will not be persisted");
                None
            }
        };

        Self::build(config, sink)
    }

    pub fn with_sink(config: SpeedConfig, sink: Box<dyn RecordSink + Send>) -> Self {
        Self::build(config.sanitize(), Some(sink))
    }

    pub fn without_sink(config: SpeedConfig) -> Self {
        Self::build(config.sanitize(), None)
    }

    fn build(config: SpeedConfig, sink: Option<Box<dyn RecordSink + Send>>) -> Self {
        let homography = config.resolve_homography();

        if homography.is_valid() {
            info!("Projecting detections with homography {}", homography);
        }

        Self {
            history: TrackHistory::new(config.window_size),
            projector: GroundProjector::new(homography),
            estimator: SpeedEstimator::new(config.scale_factor),
            recorder: BatchRecorder::new(),
            sink,
            eviction: config.eviction,
            frames: 0,
            failed_flushes: 0,
        }
    }

    /// Feeds one frame through projection, history, estimation and the batch
    /// writer. Returns the frame's positive speed records, persisted or not.
    pub fn process_frame(&mut self, frame: &Frame) -> Vec<SpeedRecord> {
        let ts = frame.timestamp;

        self.recorder.begin_frame();

        for det in frame.iter() {
            let (cx, cy) = det.center();
            let (x, y) = self.projector.project(cx, cy);

            let history = self.history.observe(det.track_id, Sample::new(x, y, ts));
            let speed = self.estimator.estimate(history);

            self.recorder.record(ts, det.track_id, speed);
        }

        let records = self.recorder.records().to_vec();

        match self.sink.as_deref_mut() {
            Some(sink) => match self.recorder.flush(sink) {
                Ok(0) => {}
                Ok(n) => debug!("Committed {} speed records at {:.3}", n, ts),
                Err(err) => {
                    self.failed_flushes += 1;

                    if self.failed_flushes == 1 {
                        warn!("Dropped speed batch at {:.3}: {}", ts, err);
                    } else {
                        debug!(
                            "Dropped speed batch at {:.3}: {} ({} so far)",
                            ts, err, self.failed_flushes
                        );
                    }
                }
            },
            None => self.recorder.begin_frame(),
        }

        self.frames += 1;
        self.sweep(ts);

        records
    }

    fn sweep(&mut self, now: f64) {
        let max_age = match self.eviction.max_age_secs {
            Some(age) => age,
            None => return,
        };

        if self.frames % self.eviction.sweep_every.max(1) != 0 {
            return;
        }

        let evicted = self.history.evict_stale(now, max_age);
        if evicted > 0 {
            debug!(
                "Evicted {} stale tracks, {} remain",
                evicted,
                self.history.len()
            );
        }
    }

    /// Current estimate for a known track.
    pub fn speed_of(&self, track_id: u64) -> Option<f64> {
        self.history
            .get(track_id)
            .map(|h| self.estimator.estimate(h))
    }

    #[inline]
    pub fn is_persisting(&self) -> bool {
        self.sink.is_some()
    }

    #[inline]
    pub fn track_count(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[inline]
    pub fn failed_flushes(&self) -> u64 {
        self.failed_flushes
    }

    #[inline]
    pub fn history(&self) -> &TrackHistory {
        &self.history
    }

    #[inline]
    pub fn estimator(&self) -> &SpeedEstimator {
        &self.estimator
    }

    #[inline]
    pub fn projector(&self) -> &GroundProjector {
        &self.projector
    }

    /// Allows the homography to be replaced between frames.
    #[inline]
    pub fn projector_mut(&mut self) -> &mut GroundProjector {
        &mut self.projector
    }
}

/// A `SpeedTracker` behind a single lock, for hosts that deliver frames from
/// more than one thread. Clones share the same session.
#[derive(Clone)]
pub struct SharedTracker {
    inner: Arc<Mutex<SpeedTracker>>,
}

impl SharedTracker {
    pub fn new(tracker: SpeedTracker) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
        }
    }

    pub fn process_frame(&self, frame: &Frame) -> Vec<SpeedRecord> {
        self.inner.lock().process_frame(frame)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SpeedTracker) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }
}
