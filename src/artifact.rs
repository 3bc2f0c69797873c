use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::info;
use uuid::Uuid;

use crate::error::ArtifactWriteError;

pub const ARTIFACT_PREFIX: &str = "processed_";

/// Persists annotated images under collision-free names
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
    extension: String,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Fresh file name in the output directory; nothing is created yet
    pub fn next_path(&self) -> PathBuf {
        let name = format!("{}{}.{}", ARTIFACT_PREFIX, Uuid::new_v4().simple(), self.extension);
        self.output_dir.join(name)
    }

    /// Write the image and return where it landed
    pub fn write(&self, image: &RgbImage) -> Result<PathBuf, ArtifactWriteError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| ArtifactWriteError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let path = self.next_path();
        image.save(&path).map_err(|source| ArtifactWriteError::Write {
            path: path.clone(),
            source,
        })?;

        info!("Processed image saved: {}", path.display());
        Ok(path)
    }
}
