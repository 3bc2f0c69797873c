//! Integration tests for running scans through the service.
//!
//! Tests cover:
//! - Scanning on worker threads
//! - Deadline enforcement
//! - Concurrent scans sharing one pipeline
//! - Artifact write failures surfacing distinctly

mod common;

use std::sync::Arc;
use std::time::Duration;

use platescan::{BoundingBox, ScanError, ScanService};

use common::*;

#[tokio::test]
async fn test_scan_returns_reading() -> anyhow::Result<()> {
    let (dir, image_path) = scratch();
    let pipeline = make_pipeline(
        FixedDetector { boxes: vec![BoundingBox::new(20, 20, 90, 50, 0.8)] },
        Arc::new(ConstantRecognizer("tn 09 bx 7777")),
        test_config(dir.path()),
    );
    let service = ScanService::new(Arc::new(pipeline));

    let reading = service.scan(image_path).await?;

    assert_eq!(reading.plate_text.as_deref(), Some("TN09BX7777"));
    assert_eq!(reading.confidence, 0.8);
    assert!(reading.artifact_path.unwrap().exists());

    Ok(())
}

#[tokio::test]
async fn test_scan_past_deadline_is_reported() -> anyhow::Result<()> {
    let (dir, image_path) = scratch();
    let pipeline = make_pipeline(
        SlowDetector { delay: Duration::from_millis(500) },
        Arc::new(ConstantRecognizer("AB12CD")),
        test_config(dir.path()),
    );
    let service =
        ScanService::new(Arc::new(pipeline)).with_deadline(Duration::from_millis(20));

    let result = service.scan(image_path).await;

    assert!(matches!(result, Err(ScanError::DeadlineExceeded(d)) if d == Duration::from_millis(20)));

    // Let the abandoned worker finish before the temp dir goes away
    tokio::time::sleep(Duration::from_millis(600)).await;

    Ok(())
}

#[tokio::test]
async fn test_scan_many_keeps_input_order() -> anyhow::Result<()> {
    let (dir, image_path) = scratch();
    let pipeline = make_pipeline(
        FixedDetector { boxes: vec![BoundingBox::new(20, 20, 90, 50, 0.75)] },
        Arc::new(ConstantRecognizer("AB12CD")),
        test_config(dir.path()),
    );
    let service = ScanService::new(Arc::new(pipeline));
    let missing = dir.path().join("missing.png");

    let results = service
        .scan_many(vec![image_path.clone(), missing, image_path])
        .await;

    assert_eq!(results.len(), 3);
    let readings = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(readings[0].plate_text.as_deref(), Some("AB12CD"));
    assert_eq!(readings[1].plate_text, None);
    assert_eq!(readings[1].artifact_path, None);
    assert_eq!(readings[2].plate_text.as_deref(), Some("AB12CD"));
    assert_ne!(readings[0].artifact_path, readings[2].artifact_path);
    assert_eq!(artifact_count(dir.path()), 2);

    Ok(())
}

#[tokio::test]
async fn test_artifact_failure_is_distinct_from_no_plate() -> anyhow::Result<()> {
    let (dir, image_path) = scratch();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"")?;
    let pipeline = make_pipeline(
        FixedDetector { boxes: vec![] },
        Arc::new(ConstantRecognizer("AB12CD")),
        test_config(dir.path()).with_artifact_dir(blocker.join("out")),
    );
    let service = ScanService::new(Arc::new(pipeline));

    let result = service.scan(image_path).await;

    assert!(matches!(result, Err(ScanError::ArtifactWrite(_))));

    Ok(())
}
