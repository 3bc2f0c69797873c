use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::artifact::ArtifactWriter;
use crate::config::{PipelineConfig, SelectionPolicy};
use crate::detection::{
    Annotator, PlateDetector, TextRecognizer, load_image, normalize_plate_text, preprocessing,
};
use crate::error::{ArtifactWriteError, RecognitionFault};
use crate::models::{BoundingBox, PlateReading};

/// Running best reading across the boxes of one invocation
#[derive(Debug, Clone)]
pub struct Selection {
    policy: SelectionPolicy,
    best: Option<(String, f32)>,
}

impl Selection {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy, best: None }
    }

    /// Offer a recognized reading; returns whether it became the current best
    pub fn offer(&mut self, text: String, confidence: f32) -> bool {
        let replace = match (&self.best, self.policy) {
            (None, _) => true,
            (Some(_), SelectionPolicy::LastMatch) => true,
            (Some((_, best)), SelectionPolicy::HighestConfidence) => confidence >= *best,
        };

        if replace {
            self.best = Some((text, confidence));
        }
        replace
    }

    pub fn best(&self) -> Option<(&str, f32)> {
        self.best.as_ref().map(|(text, conf)| (text.as_str(), *conf))
    }

    pub fn into_reading(self, artifact_path: PathBuf) -> PlateReading {
        let (plate_text, confidence) = match self.best {
            Some((text, conf)) => (Some(text), conf),
            None => (None, 0.0),
        };

        PlateReading {
            plate_text,
            confidence,
            artifact_path: Some(artifact_path),
        }
    }
}

/// Per-invocation debug image dump
struct DebugSink {
    dir: PathBuf,
}

impl DebugSink {
    fn open(root: &Path) -> Option<Self> {
        let dir = root.join(Uuid::new_v4().simple().to_string());
        match std::fs::create_dir_all(&dir) {
            Ok(()) => Some(Self { dir }),
            Err(e) => {
                warn!("Cannot create debug directory {}: {}", dir.display(), e);
                None
            }
        }
    }

    fn save(&self, index: usize, stage: &str, image: &RgbImage) {
        let path = self.dir.join(format!("{:02}_{}.png", index + 1, stage));
        match image.save(&path) {
            Ok(()) => debug!("Debug: saved {}", path.display()),
            Err(e) => warn!("Failed to save debug image {}: {}", path.display(), e),
        }
    }
}

/// Photo in, plate reading plus annotated artifact out
pub struct DetectionPipeline {
    detector: Arc<dyn PlateDetector>,
    recognizer: Arc<dyn TextRecognizer>,
    annotator: Annotator,
    artifacts: ArtifactWriter,
    config: PipelineConfig,
}

impl DetectionPipeline {
    pub fn new(
        detector: Arc<dyn PlateDetector>,
        recognizer: Arc<dyn TextRecognizer>,
        config: PipelineConfig,
    ) -> Self {
        let annotator = Annotator::from_font_path(config.font_path.as_deref());
        let artifacts = ArtifactWriter::new(&config.artifact_dir, &config.artifact_extension);

        Self {
            detector,
            recognizer,
            annotator,
            artifacts,
            config,
        }
    }

    /// Replace the annotator built from the config
    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline on an image file.
    ///
    /// An unreadable source yields an empty reading without an artifact.
    /// Only a failed artifact write is returned as an error.
    pub fn scan(&self, image_path: impl AsRef<Path>) -> Result<PlateReading, ArtifactWriteError> {
        let image_path = image_path.as_ref();

        let source = match load_image(image_path) {
            Ok(img) => img,
            Err(e) => {
                error!("{}", e);
                return Ok(PlateReading::unreadable());
            }
        };

        self.scan_image(&source)
    }

    /// Run the pipeline on an already decoded image
    pub fn scan_image(&self, source: &RgbImage) -> Result<PlateReading, ArtifactWriteError> {
        let boxes = match self.detector.detect(source) {
            Ok(boxes) => boxes,
            Err(e) => {
                warn!("Plate detection failed, continuing without boxes: {}", e);
                Vec::new()
            }
        };
        debug!("Detector returned {} boxes", boxes.len());

        // The loop owns the working copy; per-box steps only borrow it
        let mut working = source.clone();
        let mut selection = Selection::new(self.config.policy);
        let mut accepted = 0usize;
        // Created on the first accepted box so empty scans leave no directory
        let mut debug_sink: Option<DebugSink> = None;

        for bbox in &boxes {
            debug!("Detection confidence: {:.3}", bbox.confidence);

            // A reading must carry a positive confidence, whatever the threshold.
            // Written so that NaN scores are rejected too.
            let passes = bbox.confidence >= self.config.acceptance_threshold && bbox.confidence > 0.0;
            if !passes {
                continue;
            }

            self.annotator.draw_box(&mut working, bbox);
            let index = accepted;
            accepted += 1;

            if debug_sink.is_none() {
                debug_sink = self.config.debug_dir.as_deref().and_then(DebugSink::open);
            }

            match self.read_box(source, bbox, index, debug_sink.as_ref()) {
                Ok(Some(text)) => {
                    self.annotator.draw_plate_text(&mut working, bbox, &text);
                    if selection.offer(text.clone(), bbox.confidence) {
                        debug!("Box {} now best: {} ({:.3})", index + 1, text, bbox.confidence);
                    }
                }
                Ok(None) => debug!("Box {}: no text recognized", index + 1),
                Err(fault) => warn!("Box {} skipped: {}", index + 1, fault),
            }
        }

        let artifact_path = self.artifacts.write(&working)?;
        let reading = selection.into_reading(artifact_path);

        info!(
            "Scan finished: {} boxes, {} accepted, plate {:?} ({:.3})",
            boxes.len(),
            accepted,
            reading.plate_text,
            reading.confidence
        );

        Ok(reading)
    }

    fn read_box(
        &self,
        source: &RgbImage,
        bbox: &BoundingBox,
        index: usize,
        debug_sink: Option<&DebugSink>,
    ) -> Result<Option<String>, RecognitionFault> {
        let crop = preprocessing::crop_region(source, bbox)?;
        let prepared = preprocessing::prepare_for_ocr(&crop)?;

        if let Some(sink) = debug_sink {
            sink.save(index, "crop", &crop);
            sink.save(index, "preprocessed", &prepared);
        }

        let text = self.recognizer.recognize(&prepared)?;
        Ok(text.and_then(|raw| normalize_plate_text(&raw)))
    }
}
