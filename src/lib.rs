pub mod artifact;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod service;

pub use artifact::ArtifactWriter;
pub use config::{PipelineConfig, SelectionPolicy};
pub use detection::{OcrsRecognizer, PlateDetector, TextRecognizer, YoloPlateDetector};
pub use error::{
    ArtifactWriteError, ImageUnreadable, InferenceError, RecognitionFault, RegionError, ScanError,
};
pub use models::{BoundingBox, PlateReading};
pub use pipeline::{DetectionPipeline, Selection};
pub use service::ScanService;
