//! Object-detection capability boundary.

use async_trait::async_trait;
use argus_types::{
    config::DetectorConfig,
    detection::{DetectionResult, Label},
    frame::{FrameMetadata, Rotation},
    geometry::Rect,
    ArgusError, Result,
};
use tokio::time::{sleep, Duration};
use tracing::debug;

/// Borrowed view of one frame handed to the detector. The borrow forbids the
/// detector from retaining the buffer past the call.
#[derive(Debug, Clone, Copy)]
pub struct DetectorInput<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub rotation: Rotation,
}

impl<'a> DetectorInput<'a> {
    pub fn from_frame(data: &'a [u8], metadata: &FrameMetadata) -> Self {
        Self {
            data,
            width: metadata.width,
            height: metadata.height,
            rotation: metadata.rotation,
        }
    }
}

/// Asynchronous, variable-latency detection capability. Implementations own
/// their worker threads; calls never block the caller's thread.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, image: DetectorInput<'_>) -> Result<Vec<DetectionResult>>;
}

/// Stub detector used for integration and the demo binary. Sleeps for the
/// configured latency and reports one centered object per call, filtered
/// through the configured confidence threshold.
pub struct StubDetector {
    config: DetectorConfig,
}

impl StubDetector {
    /// Models the construction-time capability check: failure here is fatal
    /// and the detector must not be used.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.confidence_threshold) {
            return Err(detector_unavailable(format!(
                "confidence threshold {} out of range",
                config.confidence_threshold
            )));
        }
        if config.max_results == 0 {
            return Err(detector_unavailable("max_results must be nonzero"));
        }
        Ok(Self { config })
    }

    fn filter(&self, results: Vec<DetectionResult>) -> Vec<DetectionResult> {
        results
            .into_iter()
            .filter(|r| {
                r.primary_label()
                    .map(|l| l.confidence >= self.config.confidence_threshold)
                    .unwrap_or(false)
            })
            .take(self.config.max_results)
            .collect()
    }
}

#[async_trait]
impl Detector for StubDetector {
    async fn detect(&self, image: DetectorInput<'_>) -> Result<Vec<DetectionResult>> {
        if image.data.is_empty() {
            return Err(detection_error("empty frame buffer"));
        }
        debug!(
            "stub detect on {}x{} frame ({} bytes)",
            image.width,
            image.height,
            image.data.len()
        );
        sleep(Duration::from_millis(self.config.latency_ms)).await;

        let (w, h) = (image.width as f32, image.height as f32);
        let result = DetectionResult::new(
            Some(1),
            Rect::new(w * 0.25, h * 0.25, w * 0.75, h * 0.75),
            vec![Label::new("object", 0.9)],
        );
        Ok(self.filter(vec![result]))
    }
}

/// Construction-time fatal error: the capability cannot be used at all.
pub fn detector_unavailable(message: impl Into<String>) -> ArgusError {
    ArgusError::Construction(message.into())
}

/// Per-frame recoverable error.
pub fn detection_error(message: impl Into<String>) -> ArgusError {
    ArgusError::Detection(message.into())
}
