use serde::Serialize;
use std::path::PathBuf;

/// A candidate plate region reported by the detector, in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub confidence: f32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, confidence: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            // Non-finite scores become 0.0 and never pass acceptance
            confidence: if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 },
        }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    pub fn area(&self) -> f32 {
        (self.width() as f32) * (self.height() as f32)
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = ((x2 - x1) * (y2 - y1)) as f32;
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    /// Clamp the box to an image of the given size.
    /// Returns `(x, y, width, height)`, where width or height may be zero.
    pub fn clamp_to(&self, img_width: u32, img_height: u32) -> (u32, u32, u32, u32) {
        let max_x = img_width as i32;
        let max_y = img_height as i32;

        let x1 = self.x1.clamp(0, max_x);
        let y1 = self.y1.clamp(0, max_y);
        let x2 = self.x2.clamp(0, max_x);
        let y2 = self.y2.clamp(0, max_y);

        let width = (x2 - x1).max(0) as u32;
        let height = (y2 - y1).max(0) as u32;

        (x1 as u32, y1 as u32, width, height)
    }
}

/// Final output of one pipeline invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateReading {
    pub plate_text: Option<String>,
    /// Detector confidence of the box the text came from; 0.0 when no text
    pub confidence: f32,
    /// Annotated copy of the source; absent only when the source was unreadable
    pub artifact_path: Option<PathBuf>,
}

impl PlateReading {
    /// Reading for an invocation whose source image could not be loaded
    pub fn unreadable() -> Self {
        Self {
            plate_text: None,
            confidence: 0.0,
            artifact_path: None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        self.plate_text.is_some()
    }
}
