use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{Rgb, RgbImage};
use platescan::detection::Annotator;
use platescan::{
    BoundingBox, DetectionPipeline, InferenceError, PipelineConfig, PlateDetector,
    TextRecognizer,
};
use tempfile::TempDir;

/// Detector that always reports the same boxes
pub struct FixedDetector {
    pub boxes: Vec<BoundingBox>,
}

impl PlateDetector for FixedDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<BoundingBox>, InferenceError> {
        Ok(self.boxes.clone())
    }
}

/// Detector whose model cannot run
pub struct FailingDetector;

impl PlateDetector for FailingDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<BoundingBox>, InferenceError> {
        Err(InferenceError::Model("corrupt model".to_string()))
    }
}

/// Detector that takes a while before answering
pub struct SlowDetector {
    pub delay: Duration,
}

impl PlateDetector for SlowDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<BoundingBox>, InferenceError> {
        std::thread::sleep(self.delay);
        Ok(Vec::new())
    }
}

/// Scripted answer for one recognizer call
#[derive(Clone)]
pub enum Answer {
    Text(&'static str),
    Nothing,
    Fault,
}

/// Recognizer replaying scripted answers in call order; extra calls get `Nothing`
pub struct ScriptedRecognizer {
    answers: Mutex<VecDeque<Answer>>,
    calls: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn recognize(&self, _region: &RgbImage) -> Result<Option<String>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.answers.lock().unwrap().pop_front().unwrap_or(Answer::Nothing);
        match answer {
            Answer::Text(text) => Ok(Some(text.to_string())),
            Answer::Nothing => Ok(None),
            Answer::Fault => Err(InferenceError::Model("recognizer crashed".to_string())),
        }
    }
}

/// Recognizer that returns the same text for every region
pub struct ConstantRecognizer(pub &'static str);

impl TextRecognizer for ConstantRecognizer {
    fn recognize(&self, _region: &RgbImage) -> Result<Option<String>, InferenceError> {
        Ok(Some(self.0.to_string()))
    }
}

/// A 160x120 gradient "vehicle photo"
pub fn source_image() -> RgbImage {
    RgbImage::from_fn(160, 120, |x, y| Rgb([x as u8, y as u8, ((x + y) / 2) as u8]))
}

/// Writes the test photo as PNG and returns its path
pub fn write_source_image(dir: &Path) -> PathBuf {
    let path = dir.join("vehicle.png");
    source_image()
        .save(&path)
        .expect("Failed to save test image");
    path
}

/// Lossless artifacts so pixels can be compared exactly
pub fn test_config(dir: &Path) -> PipelineConfig {
    PipelineConfig::new()
        .with_artifact_dir(dir.join("processed"))
        .with_artifact_extension("png")
}

pub fn make_pipeline(
    detector: impl PlateDetector + 'static,
    recognizer: Arc<dyn TextRecognizer>,
    config: PipelineConfig,
) -> DetectionPipeline {
    DetectionPipeline::new(Arc::new(detector), recognizer, config)
        .with_annotator(Annotator::bundled())
}

/// Creates a temp dir holding the test photo
pub fn scratch() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let image_path = write_source_image(dir.path());
    (dir, image_path)
}

pub fn artifact_count(dir: &Path) -> usize {
    match std::fs::read_dir(dir.join("processed")) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

pub fn open_rgb(path: &Path) -> RgbImage {
    image::open(path).expect("Failed to open artifact").to_rgb8()
}
