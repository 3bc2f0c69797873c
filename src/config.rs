use std::path::PathBuf;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

/// Minimum detector confidence for a box to be considered
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_ARTIFACT_DIR: &str = "static/processed";
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "jpg";

/// How the pipeline picks its reading when several boxes yield text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Every accepted box with text replaces the previous reading
    #[default]
    LastMatch,
    /// Keep the reading whose box had the highest detector confidence
    HighestConfidence,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub acceptance_threshold: f32,
    pub policy: SelectionPolicy,
    pub artifact_dir: PathBuf,
    pub artifact_extension: String,
    pub font_path: Option<PathBuf>,
    /// Root directory for per-box debug images; `None` disables them
    pub debug_dir: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self {
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            policy: SelectionPolicy::default(),
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            artifact_extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
            font_path: None,
            debug_dir: None,
        }
    }

    pub fn with_acceptance_threshold(mut self, threshold: f32) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn with_artifact_extension(mut self, extension: impl Into<String>) -> Self {
        self.artifact_extension = extension.into().trim_start_matches('.').to_lowercase();
        self
    }

    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug_dir = Some(output_dir);

        Ok(self)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}
