use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid homography: {0}")]
    InvalidHomography(String),

    #[error("Degenerate calibration: {0}")]
    DegenerateCalibration(String),

    #[error("Length mismatch: {points} points vs {timestamps} timestamps")]
    LengthMismatch { points: usize, timestamps: usize },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Sqlite Error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Toml Error: {0}")]
    TomlError(#[from] toml::de::Error),
}
