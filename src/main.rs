use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, warn};

use platescan::config::{DEFAULT_ACCEPTANCE_THRESHOLD, DEFAULT_ARTIFACT_DIR, DEFAULT_ARTIFACT_EXTENSION};
use platescan::detection::{is_supported_image, ocr, yolo};
use platescan::{
    DetectionPipeline, OcrsRecognizer, PipelineConfig, ScanService, SelectionPolicy,
    YoloPlateDetector,
};

#[derive(Parser)]
#[command(name = "platescan")]
#[command(about = "Detect and read license plates from vehicle photos")]
struct Cli {
    /// Vehicle photos to scan (png, jpg, jpeg)
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// Plate detector model (.rten)
    #[arg(long, value_name = "FILE")]
    detector_model: PathBuf,

    /// Directory holding text-detection.rten and text-recognition.rten
    /// (defaults to ~/.cache/ocrs)
    #[arg(long, value_name = "DIR")]
    ocr_models: Option<PathBuf>,

    /// Where annotated artifacts are written
    #[arg(long, value_name = "DIR", default_value = DEFAULT_ARTIFACT_DIR)]
    output_dir: PathBuf,

    /// Which reading wins when several boxes yield text
    #[arg(long, value_enum, default_value_t = SelectionPolicy::LastMatch)]
    policy: SelectionPolicy,

    /// Minimum detector confidence for a box to be read (0.0 - 1.0)
    #[arg(long, default_value_t = DEFAULT_ACCEPTANCE_THRESHOLD, value_name = "THRESHOLD")]
    threshold: f32,

    /// Detector input size in pixels
    #[arg(long, default_value_t = yolo::DEFAULT_INPUT_SIZE)]
    input_size: u32,

    /// NMS IOU threshold (0.0 - 1.0)
    #[arg(long, default_value_t = yolo::DEFAULT_IOU_THRESHOLD, value_name = "THRESHOLD")]
    nms_threshold: f32,

    /// Artifact image format, by extension
    #[arg(long, default_value = DEFAULT_ARTIFACT_EXTENSION, value_name = "EXT")]
    artifact_ext: String,

    /// TrueType font used for plate labels
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Save per-box crops to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Per-image deadline in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Print one JSON object per image
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let detector = YoloPlateDetector::builder(&args.detector_model)
        .input_size(args.input_size)
        .iou_threshold(args.nms_threshold)
        .build()?;

    let models_dir = match args.ocr_models {
        Some(dir) => dir,
        None => ocr::default_models_dir()?,
    };
    let recognizer = OcrsRecognizer::from_models_dir(&models_dir)?;

    let mut config = PipelineConfig::new()
        .with_acceptance_threshold(args.threshold)
        .with_policy(args.policy)
        .with_artifact_dir(args.output_dir)
        .with_artifact_extension(args.artifact_ext);
    if let Some(font) = args.font {
        config = config.with_font(font);
    }
    if let Some(debug_dir) = args.debug_out {
        config = config.with_debug(debug_dir)?;
    }

    let pipeline = DetectionPipeline::new(Arc::new(detector), Arc::new(recognizer), config);
    let service = ScanService::new(Arc::new(pipeline))
        .with_deadline(Duration::from_secs(args.timeout_secs));

    for path in &args.images {
        if !is_supported_image(path) {
            warn!("{} does not have a png/jpg/jpeg extension", path.display());
        }
    }

    let results = service.scan_many(args.images.clone()).await;

    let mut failures = 0usize;
    for (path, result) in args.images.iter().zip(results) {
        match result {
            Ok(reading) if args.json => {
                let line = serde_json::json!({
                    "image": path,
                    "plate_text": reading.plate_text,
                    "confidence": reading.confidence,
                    "artifact_path": reading.artifact_path,
                });
                println!("{}", line);
            }
            Ok(reading) => {
                let artifact = reading
                    .artifact_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string());
                match &reading.plate_text {
                    Some(text) => println!(
                        "{}: {} (confidence: {:.2}) -> {}",
                        path.display(),
                        text,
                        reading.confidence,
                        artifact
                    ),
                    None => println!("{}: no plate recognized -> {}", path.display(), artifact),
                }
            }
            Err(e) => {
                failures += 1;
                if args.json {
                    let line = serde_json::json!({
                        "image": path,
                        "error": e.to_string(),
                    });
                    println!("{}", line);
                } else {
                    eprintln!("{}: {}", path.display(), e);
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} scans failed", failures, args.images.len());
    }

    Ok(())
}
