use crate::error::Error;
use crate::sink::RecordSink;

use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SpeedRecord {
    pub timestamp: f64,
    pub track_id: u64,
    pub speed: f64,
}

/// Collects the speed records of one frame and commits them to a sink as a
/// single unit of work.
#[derive(Debug, Default)]
pub struct BatchRecorder {
    batch: Vec<SpeedRecord>,
}

impl BatchRecorder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn begin_frame(&mut self) {
        self.batch.clear();
    }

    /// Only positive speeds are kept; zero means "no estimate".
    pub fn record(&mut self, timestamp: f64, track_id: u64, speed: f64) -> bool {
        if speed.is_nan() || speed <= 0.0 {
            return false;
        }

        self.batch.push(SpeedRecord {
            timestamp,
            track_id,
            speed,
        });

        true
    }

    #[inline]
    pub fn records(&self) -> &[SpeedRecord] {
        &self.batch
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Hands the batch to `sink` and clears it, whether or not the sink
    /// accepted it. Empty batches never reach the sink.
    pub fn flush<S: RecordSink + ?Sized>(&mut self, sink: &mut S) -> Result<usize, Error> {
        if self.batch.is_empty() {
            return Ok(0);
        }

        let count = self.batch.len();
        let res = sink.write_batch(&self.batch);
        self.batch.clear();

        res.map(|_| count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    struct RejectingSink {
        calls: usize,
    }

    impl RecordSink for RejectingSink {
        fn write_batch(&mut self, _records: &[SpeedRecord]) -> Result<(), Error> {
            self.calls += 1;
            Err(Error::MalformedRecord("rejected".to_string()))
        }
    }

    #[test]
    fn drops_non_positive_speeds() {
        let mut rec = BatchRecorder::new();
        rec.begin_frame();

        assert!(rec.record(1.0, 1, 5.0));
        assert!(!rec.record(1.0, 2, 0.0));
        assert!(!rec.record(1.0, 3, -2.0));
        assert!(!rec.record(1.0, 4, f64::NAN));

        assert_eq!(rec.len(), 1);
        assert!(rec.records().iter().all(|r| r.speed > 0.0));
    }

    #[test]
    fn flushes_one_batch_per_frame() {
        let mut sink = MemorySink::new();
        let mut rec = BatchRecorder::new();

        rec.begin_frame();
        rec.record(0.5, 0xA, 5.0);
        rec.record(0.5, 0xB, 0.0);
        assert_eq!(rec.flush(&mut sink).unwrap(), 1);
        assert!(rec.is_empty());

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            vec![SpeedRecord {
                timestamp: 0.5,
                track_id: 0xA,
                speed: 5.0
            }]
        );
    }

    #[test]
    fn empty_batch_skips_sink() {
        let mut sink = RejectingSink { calls: 0 };
        let mut rec = BatchRecorder::new();

        rec.begin_frame();
        rec.record(0.0, 1, 0.0);

        assert_eq!(rec.flush(&mut sink).unwrap(), 0);
        assert_eq!(sink.calls, 0);
    }

    #[test]
    fn rejected_batch_is_cleared() {
        let mut sink = RejectingSink { calls: 0 };
        let mut rec = BatchRecorder::new();

        rec.begin_frame();
        rec.record(0.0, 1, 3.0);

        assert!(rec.flush(&mut sink).is_err());
        assert_eq!(sink.calls, 1);
        assert!(rec.is_empty());
    }

    #[test]
    fn begin_frame_discards_leftovers() {
        let mut rec = BatchRecorder::new();
        rec.record(0.0, 1, 3.0);
        rec.begin_frame();

        assert!(rec.is_empty());
    }
}
