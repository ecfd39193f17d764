use nalgebra as na;

/// A position in working coordinates (post-projection when a homography is
/// set) observed at time `t`, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub t: f64,
}

impl Sample {
    #[inline]
    pub fn new(x: f64, y: f64, t: f64) -> Self {
        Self { x, y, t }
    }

    #[inline(always)]
    pub fn point(&self) -> na::Point2<f64> {
        na::Point2::new(self.x, self.y)
    }
}
