use serde_derive::{Deserialize, Serialize};

/// Tracked detection as delivered by the upstream tracker. The box is in
/// left-top-width-height format, image pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    #[serde(rename = "id")]
    pub track_id: u64,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Detection {
    #[inline]
    pub fn new(track_id: u64, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            track_id,
            left,
            top,
            width,
            height,
        }
    }

    /// Builds a detection from left-top-right-bottom corners.
    #[inline]
    pub fn from_ltrb(track_id: u64, left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::new(track_id, left, top, right - left, bottom - top)
    }

    #[inline(always)]
    pub fn cx(&self) -> f64 {
        self.left + self.width / 2.
    }

    #[inline(always)]
    pub fn cy(&self) -> f64 {
        self.top + self.height / 2.
    }

    #[inline(always)]
    pub fn center(&self) -> (f64, f64) {
        (self.cx(), self.cy())
    }

    #[inline(always)]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[inline(always)]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}
