use image::RgbImage;
pub use ocrs::{ImageSource, OcrEngine};
use ocrs::OcrEngineParams;
use rten::Model;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::detection::TextRecognizer;
use crate::error::InferenceError;

pub const DETECTION_MODEL_FILE: &str = "text-detection.rten";
pub const RECOGNITION_MODEL_FILE: &str = "text-recognition.rten";

/// Standard cache location used by `ocrs-cli` when it downloads its models
pub fn default_models_dir() -> anyhow::Result<PathBuf> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))?;

    Ok(Path::new(&home_dir).join(".cache/ocrs"))
}

/// Initialize OCR engine with models from the given directory
pub fn init_ocr_engine(models_dir: &Path) -> anyhow::Result<OcrEngine> {
    let detection_model_path = models_dir.join(DETECTION_MODEL_FILE);
    let recognition_model_path = models_dir.join(RECOGNITION_MODEL_FILE);

    if !detection_model_path.exists() || !recognition_model_path.exists() {
        anyhow::bail!(
            "OCR models not found. Please run: ocrs-cli --help (or download models manually)\n\
             Expected locations:\n  - {}\n  - {}",
            detection_model_path.display(),
            recognition_model_path.display()
        );
    }

    let detection_model = Model::load_file(&detection_model_path)?;
    let recognition_model = Model::load_file(&recognition_model_path)?;

    let engine = OcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        ..Default::default()
    })?;

    Ok(engine)
}

/// Join recognized fragments into a plate string: no whitespace, upper case.
/// Returns `None` when nothing is left.
pub fn normalize_plate_text(raw: &str) -> Option<String> {
    let text: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();

    if text.is_empty() { None } else { Some(text) }
}

/// Plate text recognizer backed by the `ocrs` engine
pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    pub fn new(engine: OcrEngine) -> Self {
        Self { engine }
    }

    pub fn from_models_dir(models_dir: &Path) -> anyhow::Result<Self> {
        info!("Loading OCR models from {}", models_dir.display());
        let engine = init_ocr_engine(models_dir)?;
        info!("OCR engine initialized");
        Ok(Self::new(engine))
    }

    fn read_lines(&self, region: &RgbImage) -> Result<String, InferenceError> {
        let img_source = ImageSource::from_bytes(region.as_raw(), region.dimensions())
            .map_err(|e| InferenceError::InvalidShape(e.to_string()))?;
        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        // Lines come back in reading order, separated by newlines
        self.engine
            .get_text(&ocr_input)
            .map_err(|e| InferenceError::Model(e.to_string()))
    }
}

impl TextRecognizer for OcrsRecognizer {
    fn recognize(&self, region: &RgbImage) -> Result<Option<String>, InferenceError> {
        match self.read_lines(region) {
            Ok(raw) => {
                let text = normalize_plate_text(&raw);
                debug!("OCR raw {:?} -> {:?}", raw, text);
                Ok(text)
            }
            Err(e) => {
                warn!("OCR failed on {}x{} region: {}", region.width(), region.height(), e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_plate_text(" ab 12 cd "), Some("AB12CD".to_string()));
        assert_eq!(normalize_plate_text("ka01\nmh 2024"), Some("KA01MH2024".to_string()));
        assert_eq!(normalize_plate_text("\tXy-9\r\n"), Some("XY-9".to_string()));
    }

    #[test]
    fn blank_text_is_absent() {
        assert_eq!(normalize_plate_text(""), None);
        assert_eq!(normalize_plate_text("  \n\t "), None);
    }
}
