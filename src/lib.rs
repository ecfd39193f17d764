pub mod config;
pub mod detection;
pub mod error;
pub mod estimator;
pub mod frame;
pub mod math;
pub mod projector;
pub mod recorder;
pub mod replay;
pub mod ring_buffer;
pub mod sink;
pub mod track_history;
pub mod tracker;

mod sample;

pub use config::SpeedConfig;
pub use detection::Detection;
pub use error::Error;
pub use estimator::SpeedEstimator;
pub use frame::Frame;
pub use projector::{GroundProjector, Homography};
pub use recorder::{BatchRecorder, SpeedRecord};
pub use ring_buffer::RingBuffer;
pub use sample::Sample;
pub use sink::{MemorySink, RecordSink, SqliteSink};
pub use track_history::TrackHistory;
pub use tracker::{SharedTracker, SpeedTracker};
