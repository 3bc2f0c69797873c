use std::path::{Path, PathBuf};

use image::RgbImage;
use image::imageops::FilterType;
use rten::Model;
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;
use tracing::{debug, info};

use crate::detection::PlateDetector;
use crate::error::InferenceError;
use crate::models::BoundingBox;

pub const DEFAULT_INPUT_SIZE: u32 = 640;
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Builder for [`YoloPlateDetector`]
pub struct YoloPlateDetectorBuilder {
    model_path: PathBuf,
    input_size: u32,
    score_threshold: f32,
    iou_threshold: f32,
}

impl YoloPlateDetectorBuilder {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            input_size: DEFAULT_INPUT_SIZE,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }

    pub fn input_size(mut self, size: u32) -> Self {
        self.input_size = size;
        self
    }

    pub fn score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    pub fn build(self) -> anyhow::Result<YoloPlateDetector> {
        if self.input_size == 0 {
            anyhow::bail!("Detector input size must be positive");
        }

        info!("Loading plate detector model: {}", self.model_path.display());
        let model = load_model(&self.model_path)?;
        info!("Plate detector loaded");

        Ok(YoloPlateDetector {
            model,
            input_size: self.input_size,
            score_threshold: self.score_threshold,
            iou_threshold: self.iou_threshold,
        })
    }
}

fn load_model(path: &Path) -> anyhow::Result<Model> {
    if !path.exists() {
        anyhow::bail!("Detector model not found: {}", path.display());
    }
    Ok(Model::load_file(path)?)
}

/// Single-class YOLOv8-style plate detector run through `rten`
pub struct YoloPlateDetector {
    model: Model,
    input_size: u32,
    score_threshold: f32,
    iou_threshold: f32,
}

impl YoloPlateDetector {
    pub fn builder(model_path: impl Into<PathBuf>) -> YoloPlateDetectorBuilder {
        YoloPlateDetectorBuilder::new(model_path)
    }

    /// Resize to the square model input and lay out as normalized NCHW
    fn preprocess(&self, img: &RgbImage) -> NdTensor<f32, 4> {
        let size = self.input_size;
        let resized = image::imageops::resize(img, size, size, FilterType::Triangle);

        let plane = (size * size) as usize;
        let mut data = vec![0.0f32; 3 * plane];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let idx = (y * size + x) as usize;
            data[idx] = pixel[0] as f32 / 255.0;
            data[plane + idx] = pixel[1] as f32 / 255.0;
            data[2 * plane + idx] = pixel[2] as f32 / 255.0;
        }

        NdTensor::from_data([1, 3, size as usize, size as usize], data)
    }
}

impl PlateDetector for YoloPlateDetector {
    fn detect(&self, img: &RgbImage) -> Result<Vec<BoundingBox>, InferenceError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(InferenceError::InvalidShape(format!("{}x{} image", width, height)));
        }

        let input = self.preprocess(img);

        debug!("Running plate detector");
        let output = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| InferenceError::Model(e.to_string()))?;
        let output: NdTensor<f32, 3> = output
            .try_into()
            .map_err(|e| InferenceError::Output(format!("{:?}", e)))?;

        let [batch, rows, predictions] = output.shape();
        debug!("Detector output shape [{}, {}, {}]", batch, rows, predictions);
        let values = output.to_vec();
        let raw = first_batch(&values, [batch, rows, predictions])?;

        let candidates = decode_predictions(
            raw,
            rows,
            predictions,
            (self.input_size, self.input_size),
            (width, height),
            self.score_threshold,
        )?;
        let boxes = non_max_suppression(candidates, self.iou_threshold);

        debug!("Plate detector kept {} boxes", boxes.len());
        Ok(boxes)
    }
}

/// The `[rows, predictions]` block of the first image in a
/// `[batch, rows, predictions]` output
pub fn first_batch(values: &[f32], shape: [usize; 3]) -> Result<&[f32], InferenceError> {
    let [batch, rows, predictions] = shape;
    if batch < 1 {
        return Err(InferenceError::Output("detector returned an empty batch".to_string()));
    }

    let len = rows * predictions;
    values.get(..len).ok_or_else(|| {
        InferenceError::Output(format!("expected {} values, got {}", len, values.len()))
    })
}

/// Decode a `[4 + classes, predictions]` row-major YOLOv8 head into boxes in
/// source coordinates. Each prediction's score is its best class score.
pub fn decode_predictions(
    raw: &[f32],
    rows: usize,
    predictions: usize,
    input_size: (u32, u32),
    source_size: (u32, u32),
    score_threshold: f32,
) -> Result<Vec<BoundingBox>, InferenceError> {
    if rows < 5 {
        return Err(InferenceError::Output(format!(
            "expected at least 5 rows per prediction, got {}",
            rows
        )));
    }
    if raw.len() != rows * predictions {
        return Err(InferenceError::Output(format!(
            "expected {} values, got {}",
            rows * predictions,
            raw.len()
        )));
    }

    let at = |row: usize, i: usize| raw[row * predictions + i];
    let scale_x = source_size.0 as f32 / input_size.0 as f32;
    let scale_y = source_size.1 as f32 / input_size.1 as f32;
    let max_x = source_size.0 as f32;
    let max_y = source_size.1 as f32;

    let mut boxes = Vec::new();
    for i in 0..predictions {
        let score = (4..rows).map(|row| at(row, i)).fold(f32::MIN, f32::max);
        if score < score_threshold {
            continue;
        }

        let cx = at(0, i);
        let cy = at(1, i);
        let w = at(2, i);
        let h = at(3, i);

        let x1 = ((cx - w / 2.0) * scale_x).clamp(0.0, max_x);
        let y1 = ((cy - h / 2.0) * scale_y).clamp(0.0, max_y);
        let x2 = ((cx + w / 2.0) * scale_x).clamp(0.0, max_x);
        let y2 = ((cy + h / 2.0) * scale_y).clamp(0.0, max_y);

        boxes.push(BoundingBox::new(
            x1.round() as i32,
            y1.round() as i32,
            x2.round() as i32,
            y2.round() as i32,
            score,
        ));
    }

    Ok(boxes)
}

/// Greedy NMS; survivors come back in descending confidence order
pub fn non_max_suppression(mut boxes: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<BoundingBox> = Vec::new();
    for candidate in boxes {
        if keep.iter().all(|kept| kept.iou(&candidate) < iou_threshold) {
            keep.push(candidate);
        }
    }

    keep
}
