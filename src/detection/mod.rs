pub mod annotate;
pub mod loader;
pub mod ocr;
pub mod preprocessing;
pub mod yolo;

use image::RgbImage;

use crate::error::InferenceError;
use crate::models::BoundingBox;

pub use annotate::Annotator;
pub use loader::{is_supported_image, load_image};
pub use ocr::{OcrsRecognizer, normalize_plate_text};
pub use yolo::{YoloPlateDetector, YoloPlateDetectorBuilder};

/// Finds candidate plate regions in a full image.
///
/// Implementations are built once and shared read-only between invocations.
/// The order of the returned boxes carries no meaning; an empty result is valid.
pub trait PlateDetector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Vec<BoundingBox>, InferenceError>;
}

/// Reads the text on a preprocessed plate region.
///
/// Returns normalized text (upper case, no whitespace), or `None` when nothing
/// usable was recognized.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, region: &RgbImage) -> Result<Option<String>, InferenceError>;
}
