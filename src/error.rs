use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Source image is missing or cannot be decoded
#[derive(Error, Debug)]
pub enum ImageUnreadable {
    #[error("image not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to open image {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Detector or recognizer could not run on the given raster
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("invalid input shape: {0}")]
    InvalidShape(String),
    #[error("model run failed: {0}")]
    Model(String),
    #[error("unexpected model output: {0}")]
    Output(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegionError {
    #[error("degenerate region {width}x{height}")]
    InvalidRegion { width: u32, height: u32 },
}

/// Why a single accepted box contributed nothing
#[derive(Error, Debug)]
pub enum RecognitionFault {
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

#[derive(Error, Debug)]
pub enum ArtifactWriteError {
    #[error("cannot create artifact directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Invocation-level failures surfaced by [`crate::service::ScanService`]
#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    ArtifactWrite(#[from] ArtifactWriteError),
    #[error("scan did not finish within {0:?}")]
    DeadlineExceeded(Duration),
    #[error("scan worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
