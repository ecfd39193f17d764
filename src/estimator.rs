use crate::error::Error;
use crate::math;
use crate::ring_buffer::RingBuffer;
use crate::sample::Sample;

use nalgebra as na;

pub const DEFAULT_SCALE_FACTOR: f64 = 20.0;

/// Least-squares speed over a track's history window.
///
/// The velocity is the slope of the best-fit line through the window for each
/// axis, so single-frame jitter is spread across the whole window. With two
/// samples it is exactly the finite-difference speed.
#[derive(Debug, Clone, Copy)]
pub struct SpeedEstimator {
    scale_factor: f64,
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE_FACTOR)
    }
}

impl SpeedEstimator {
    /// `scale_factor` is raw units per physical unit (e.g. pixels per meter)
    /// and must be strictly positive.
    #[inline]
    pub fn new(scale_factor: f64) -> Self {
        Self { scale_factor }
    }

    #[inline]
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Fitted `(vx, vy)` in raw units per second.
    pub fn velocity(&self, history: &RingBuffer<Sample>) -> Option<(f64, f64)> {
        math::linear_trend(history.iter().map(|s| (s.t, s.x, s.y)))
    }

    /// Physical speed of the newest observation, `0` when it cannot be
    /// estimated yet.
    pub fn estimate(&self, history: &RingBuffer<Sample>) -> f64 {
        match self.velocity(history) {
            Some((vx, vy)) => vx.hypot(vy) / self.scale_factor,
            None => 0.0,
        }
    }
}

/// Two-point speed between consecutive samples.
pub fn instant_speed(prev: &Sample, curr: &Sample, scale_factor: f64) -> f64 {
    let dt = curr.t - prev.t;

    if dt <= 0.0 {
        return 0.0;
    }

    na::distance(&prev.point(), &curr.point()) / scale_factor / dt
}

/// Successive two-point speeds, each smoothed by the trailing mean of up to
/// `window` values.
pub fn rolling_speed(
    points: &[(f64, f64)],
    timestamps: &[f64],
    scale_factor: f64,
    window: usize,
) -> Result<Vec<f64>, Error> {
    if points.len() != timestamps.len() {
        return Err(Error::LengthMismatch {
            points: points.len(),
            timestamps: timestamps.len(),
        });
    }

    let samples: Vec<Sample> = points
        .iter()
        .zip(timestamps)
        .map(|(&(x, y), &t)| Sample::new(x, y, t))
        .collect();

    let speeds: Vec<f64> = samples
        .windows(2)
        .map(|w| instant_speed(&w[0], &w[1], scale_factor))
        .collect();

    if window <= 1 {
        return Ok(speeds);
    }

    Ok((0..speeds.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let span = &speeds[start..=i];
            span.iter().sum::<f64>() / span.len() as f64
        })
        .collect())
}

#[inline]
pub fn mps_to_kmh(speed: f64) -> f64 {
    speed * 3.6
}
