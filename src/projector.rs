use crate::error::Error;
use crate::math;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Row-major 3x3 projective transform from the image plane to the ground
/// plane. An invalid homography is a pass-through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: na::Matrix3<f64>,
    valid: bool,
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

impl Homography {
    #[inline]
    pub fn identity() -> Self {
        Self {
            matrix: na::Matrix3::identity(),
            valid: false,
        }
    }

    #[inline]
    pub fn from_coefficients(coefficients: [f64; 9]) -> Self {
        Self {
            matrix: na::Matrix3::from_row_slice(&coefficients),
            valid: true,
        }
    }

    /// Fits the image-to-ground transform from at least four point pairs.
    pub fn from_correspondences(image: &[(f64, f64)], world: &[(f64, f64)]) -> Result<Self, Error> {
        if image.len() != world.len() {
            return Err(Error::DegenerateCalibration(format!(
                "{} image points vs {} world points",
                image.len(),
                world.len()
            )));
        }

        if image.len() < 4 {
            return Err(Error::DegenerateCalibration(format!(
                "at least 4 point pairs required, got {}",
                image.len()
            )));
        }

        let src: Vec<_> = image.iter().map(|&(x, y)| na::Point2::new(x, y)).collect();
        let dst: Vec<_> = world.iter().map(|&(x, y)| na::Point2::new(x, y)).collect();

        let matrix = math::homography_ls(&src, &dst).ok_or_else(|| {
            Error::DegenerateCalibration("points are collinear or repeated".to_string())
        })?;

        Ok(Self {
            matrix,
            valid: true,
        })
    }

    /// Reads the `H` entry of a calibration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = CalibrationFile::load(path)?;
        Ok(file.homography())
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    pub fn matrix(&self) -> &na::Matrix3<f64> {
        &self.matrix
    }

    pub fn coefficients(&self) -> [f64; 9] {
        let m = &self.matrix;

        [
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
            m[(2, 0)],
            m[(2, 1)],
            m[(2, 2)],
        ]
    }

    /// Maps `(x, y)` through the transform. Returns the input unchanged when
    /// the homography is invalid or the point lands on the line at infinity.
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        if !self.valid {
            return (x, y);
        }

        let p = self.matrix * na::Vector3::new(x, y, 1.0);

        if p.z == 0.0 {
            return (x, y);
        }

        (p.x / p.z, p.y / p.z)
    }
}

impl FromStr for Homography {
    type Err = Error;

    /// Nine numbers separated by commas, semicolons or whitespace. Tokens
    /// past the ninth are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.len() < 9 {
            return Err(Error::InvalidHomography(format!(
                "expected 9 coefficients, found {}",
                tokens.len()
            )));
        }

        let mut coefficients = [0.0; 9];

        for (slot, token) in coefficients.iter_mut().zip(tokens.into_iter().take(9)) {
            *slot = match token.parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    return Err(Error::InvalidHomography(format!(
                        "`{}` is not a finite number",
                        token
                    )))
                }
            };
        }

        Ok(Self::from_coefficients(coefficients))
    }
}

impl fmt::Display for Homography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            return Ok(());
        }

        for (i, c) in self.coefficients().iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{:.6}", c)?;
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum MatrixRepr {
    Rows([[f64; 3]; 3]),
    Flat([f64; 9]),
}

impl MatrixRepr {
    fn coefficients(&self) -> [f64; 9] {
        match self {
            MatrixRepr::Flat(c) => *c,
            MatrixRepr::Rows(r) => [
                r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
            ],
        }
    }
}

/// On-disk calibration: the clicked image points, their surveyed ground
/// coordinates and the fitted matrix.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CalibrationFile {
    #[serde(default)]
    pub image_points: Vec<[f64; 2]>,
    #[serde(default)]
    pub world_points: Vec<[f64; 2]>,
    #[serde(rename = "H")]
    pub h: MatrixRepr,
}

impl CalibrationFile {
    pub fn new(image: &[(f64, f64)], world: &[(f64, f64)]) -> Result<Self, Error> {
        let homography = Homography::from_correspondences(image, world)?;
        let c = homography.coefficients();

        Ok(Self {
            image_points: image.iter().map(|&(x, y)| [x, y]).collect(),
            world_points: world.iter().map(|&(x, y)| [x, y]).collect(),
            h: MatrixRepr::Rows([[c[0], c[1], c[2]], [c[3], c[4], c[5]], [c[6], c[7], c[8]]]),
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    #[inline]
    pub fn homography(&self) -> Homography {
        Homography::from_coefficients(self.h.coefficients())
    }
}

/// Holds the active homography. Replacement is all-or-nothing: a rejected
/// update leaves the previous transform in effect.
#[derive(Debug, Clone, Default)]
pub struct GroundProjector {
    homography: Homography,
}

impl GroundProjector {
    #[inline]
    pub fn new(homography: Homography) -> Self {
        Self { homography }
    }

    pub fn set_homography(&mut self, s: &str) -> Result<(), Error> {
        self.homography = s.parse()?;
        Ok(())
    }

    #[inline]
    pub fn set_matrix(&mut self, homography: Homography) {
        self.homography = homography;
    }

    #[inline]
    pub fn clear(&mut self) {
        self.homography = Homography::identity();
    }

    #[inline]
    pub fn homography(&self) -> &Homography {
        &self.homography
    }

    #[inline]
    pub fn project(&self, x: f64, y: f64) -> (f64, f64) {
        self.homography.apply(x, y)
    }
}
