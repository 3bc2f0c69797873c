use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::error::ScanError;
use crate::models::PlateReading;
use crate::pipeline::DetectionPipeline;

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Runs pipeline invocations on blocking worker threads under a deadline.
///
/// Each invocation owns its image and working copy; only the pipeline (and the
/// models inside it) is shared, read-only.
#[derive(Clone)]
pub struct ScanService {
    pipeline: Arc<DetectionPipeline>,
    deadline: Duration,
}

impl ScanService {
    pub fn new(pipeline: Arc<DetectionPipeline>) -> Self {
        Self {
            pipeline,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn pipeline(&self) -> &DetectionPipeline {
        &self.pipeline
    }

    /// Scan one image. A worker that overruns the deadline is abandoned, not
    /// interrupted; it finishes in the background and its result is dropped.
    pub async fn scan(&self, image_path: impl Into<PathBuf>) -> Result<PlateReading, ScanError> {
        let image_path = image_path.into();
        let pipeline = Arc::clone(&self.pipeline);
        let worker = tokio::task::spawn_blocking(move || pipeline.scan(&image_path));

        match tokio::time::timeout(self.deadline, worker).await {
            Ok(joined) => Ok(joined??),
            Err(_) => {
                warn!("Scan exceeded deadline of {:?}", self.deadline);
                Err(ScanError::DeadlineExceeded(self.deadline))
            }
        }
    }

    /// Scan several images concurrently; results keep the input order
    pub async fn scan_many(&self, paths: Vec<PathBuf>) -> Vec<Result<PlateReading, ScanError>> {
        let handles: Vec<_> = paths
            .into_iter()
            .map(|path| {
                let service = self.clone();
                tokio::spawn(async move { service.scan(path).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Scan task failed: {}", e);
                    Err(ScanError::Worker(e))
                }
            };
            results.push(result);
        }

        results
    }
}
