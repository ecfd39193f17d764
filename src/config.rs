use crate::error::Error;
use crate::estimator::DEFAULT_SCALE_FACTOR;
use crate::projector::Homography;
use crate::track_history::{DEFAULT_WINDOW, MAX_WINDOW, MIN_WINDOW};

use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_STORAGE_PATH: &str = "vehicles.db";
pub const DEFAULT_MAX_AGE_SECS: f64 = 30.0;
pub const DEFAULT_SWEEP_EVERY: u64 = 300;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpeedConfig {
    /// Raw coordinate units per physical distance unit (pixels per meter).
    pub scale_factor: f64,
    pub window_size: usize,
    /// Nine coefficients, row-major, separated by `,` `;` or whitespace.
    pub homography: Option<String>,
    /// Calibration JSON; used when `homography` is unset or malformed.
    pub homography_file: Option<PathBuf>,
    /// SQLite database. `None` estimates without persisting.
    pub storage_path: Option<PathBuf>,
    pub eviction: EvictionConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct EvictionConfig {
    /// Tracks unseen for longer than this are dropped. `None` keeps them forever.
    pub max_age_secs: Option<f64>,
    /// Sweep cadence, in frames.
    pub sweep_every: u64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            max_age_secs: Some(DEFAULT_MAX_AGE_SECS),
            sweep_every: DEFAULT_SWEEP_EVERY,
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            window_size: DEFAULT_WINDOW,
            homography: None,
            homography_file: None,
            storage_path: Some(PathBuf::from(DEFAULT_STORAGE_PATH)),
            eviction: EvictionConfig::default(),
        }
    }
}

impl SpeedConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: SpeedConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Replaces out-of-range values with safe defaults, warning once for each.
    pub fn sanitize(mut self) -> Self {
        if !(self.scale_factor.is_finite() && self.scale_factor > 0.0) {
            warn!(
                "scale_factor {} is not positive, using {}",
                self.scale_factor, DEFAULT_SCALE_FACTOR
            );
            self.scale_factor = DEFAULT_SCALE_FACTOR;
        }

        if self.window_size < MIN_WINDOW {
            warn!(
                "window_size {} is below {}, clamping",
                self.window_size, MIN_WINDOW
            );
            self.window_size = MIN_WINDOW;
        } else if self.window_size > MAX_WINDOW {
            warn!(
                "window_size {} is above {}, clamping",
                self.window_size, MAX_WINDOW
            );
            self.window_size = MAX_WINDOW;
        }

        if let Some(age) = self.eviction.max_age_secs {
            if !(age.is_finite() && age >= 0.0) {
                warn!(
                    "eviction.max_age_secs {} is invalid, using {}",
                    age, DEFAULT_MAX_AGE_SECS
                );
                self.eviction.max_age_secs = Some(DEFAULT_MAX_AGE_SECS);
            }
        }

        if self.eviction.sweep_every == 0 {
            warn!("eviction.sweep_every is 0, sweeping every frame");
            self.eviction.sweep_every = 1;
        }

        self
    }

    /// The configured homography string, then the calibration file, then
    /// identity. A malformed string falls through to the file.
    pub fn resolve_homography(&self) -> Homography {
        if let Some(s) = &self.homography {
            match s.parse() {
                Ok(h) => return h,
                Err(err) => warn!("{}, ignoring homography string", err),
            }
        }

        if let Some(path) = &self.homography_file {
            return match Homography::from_json_file(path) {
                Ok(h) => h,
                Err(err) => {
                    warn!(
                        "could not read homography from {:?}: {}, projection disabled",
                        path, err
                    );
                    Homography::identity()
                }
            };
        }

        Homography::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: SpeedConfig = toml::from_str("").unwrap();

        assert_eq!(config, SpeedConfig::default());
        assert_eq!(config.scale_factor, 20.0);
        assert_eq!(config.window_size, 3);
        assert_eq!(config.storage_path, Some(PathBuf::from("vehicles.db")));
        assert!(!config.resolve_homography().is_valid());
    }

    #[test]
    fn parses_all_keys() {
        let config: SpeedConfig = toml::from_str(
            r#"
            scale_factor = 12.5
            window_size = 8
            homography = "1,0,0,0,1,0,0,0,1"
            storage_path = "/tmp/speeds.db"

            [eviction]
            max_age_secs = 4.0
            sweep_every = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.scale_factor, 12.5);
        assert_eq!(config.window_size, 8);
        assert_eq!(config.storage_path, Some(PathBuf::from("/tmp/speeds.db")));
        assert_eq!(config.eviction.max_age_secs, Some(4.0));
        assert_eq!(config.eviction.sweep_every, 25);
        assert!(config.resolve_homography().is_valid());
    }

    #[test]
    fn sanitize_falls_back_to_safe_values() {
        let config = SpeedConfig {
            scale_factor: -1.0,
            window_size: 0,
            eviction: EvictionConfig {
                max_age_secs: Some(f64::NAN),
                sweep_every: 0,
            },
            ..Default::default()
        }
        .sanitize();

        assert_eq!(config.scale_factor, DEFAULT_SCALE_FACTOR);
        assert_eq!(config.window_size, MIN_WINDOW);
        assert_eq!(config.eviction.max_age_secs, Some(DEFAULT_MAX_AGE_SECS));
        assert_eq!(config.eviction.sweep_every, 1);
    }

    #[test]
    fn sanitize_keeps_valid_values() {
        let config = SpeedConfig {
            scale_factor: 0.5,
            window_size: 10,
            ..Default::default()
        };

        assert_eq!(config.clone().sanitize(), config);
    }

    #[test]
    fn malformed_homography_resolves_to_identity() {
        let config = SpeedConfig {
            homography: Some("1,2,abc".to_string()),
            ..Default::default()
        };

        let h = config.resolve_homography();
        assert!(!h.is_valid());
        assert_eq!(h.apply(3.0, 4.0), (3.0, 4.0));
    }

    #[test]
    fn huge_window_is_clamped() {
        let config: SpeedConfig = toml::from_str("window_size = 9223372036854775807").unwrap();

        assert_eq!(config.sanitize().window_size, MAX_WINDOW);
    }

    #[test]
    fn malformed_homography_falls_back_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        std::fs::write(&path, r#"{"H": [[2,0,0],[0,2,0],[0,0,1]]}"#).unwrap();

        let config = SpeedConfig {
            homography: Some("1,2,abc".to_string()),
            homography_file: Some(path),
            ..Default::default()
        };

        let h = config.resolve_homography();
        assert!(h.is_valid());
        assert_eq!(h.apply(1.0, 3.0), (2.0, 6.0));
    }

    #[test]
    fn homography_file_is_used_when_string_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        std::fs::write(&path, r#"{"H": [[2,0,0],[0,2,0],[0,0,1]]}"#).unwrap();

        let config = SpeedConfig {
            homography_file: Some(path),
            ..Default::default()
        };
        assert_eq!(config.resolve_homography().apply(1.0, 3.0), (2.0, 6.0));

        let missing = SpeedConfig {
            homography_file: Some(dir.path().join("nope.json")),
            ..Default::default()
        };
        assert!(!missing.resolve_homography().is_valid());
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speedtrack.toml");
        std::fs::write(&path, "window_size = 5\n").unwrap();

        assert_eq!(SpeedConfig::load(&path).unwrap().window_size, 5);
        assert!(matches!(
            SpeedConfig::load(dir.path().join("missing.toml")),
            Err(Error::IoError(_))
        ));
    }
}
