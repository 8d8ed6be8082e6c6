// THEORY:
// The engine itself never fails: a report is always produced, and "no data" is
// carried as `Option` or as an explicit confidence. Errors only exist at the
// edges of the crate, where outside data is turned into engine inputs (config
// files, request documents, encoded tiles, hand-built samples) or where the
// async façade talks to external sources and worker threads.

use thiserror::Error;

/// Everything that can go wrong while preparing inputs for an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid sample at ({lat}, {lng}): {reason}")]
    InvalidSample { lat: f64, lng: f64, reason: String },

    #[error("tile {z}/{x}/{y} is outside the tile matrix")]
    InvalidTile { z: u8, x: u32, y: u32 },

    #[error("failed to decode tile image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to parse request: {0}")]
    RequestParse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("external data source failed: {0}")]
    Source(String),

    #[error("analysis worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
