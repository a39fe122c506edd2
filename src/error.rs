//! Error taxonomy for the ridership pipeline.
//!
//! Structural failures (no source, undecodable bytes, unusable header) stop a
//! load. Content noise inside an otherwise valid file never reaches this type:
//! bad rows are dropped and bad cells count as zero.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no readable ridership source found (tried: {})", display_paths(.tried))]
    SourceNotFound { tried: Vec<PathBuf> },

    #[error("could not decode source bytes (attempted encodings: {})", display_encodings(.attempted))]
    Encoding { attempted: Vec<&'static str> },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unknown station: {0}")]
    UnknownStation(String),

    #[error("no ridership table loaded")]
    NotLoaded,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

fn display_encodings(names: &[&'static str]) -> String {
    names.join(", ")
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "<none>".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
