use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ArgusError, Result};

/// Rotation of the sensor image relative to the view, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Result<Self> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(ArgusError::Configuration(format!(
                "unsupported rotation: {other} degrees"
            ))),
        }
    }

    /// Whether this rotation swaps the effective width/height of the image.
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub width: u32,
    pub height: u32,
    pub rotation: Rotation,
    pub mirrored: bool,
}

impl FrameMetadata {
    /// Width/height as seen by the view, after applying rotation.
    pub fn effective_dimensions(&self) -> (u32, u32) {
        if self.rotation.swaps_dimensions() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// Caller-owned, reusable image. Backs the still-image mode input and the
/// pre-detection background graphic.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// Raw RGBA pixel buffer.
    pub data: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }
}

type ReleaseFn = Box<dyn FnOnce() -> Result<()> + Send>;

/// Guard around the producer's release callback. Fires at most once; a
/// release failure is logged and swallowed, the frame is considered lost
/// either way. Dropping an unfired guard fires it so no exit path can leak
/// the underlying buffer.
pub struct FrameRelease {
    release: Option<ReleaseFn>,
}

impl FrameRelease {
    pub fn new(release: ReleaseFn) -> Self {
        Self {
            release: Some(release),
        }
    }

    /// Guard that does nothing on release. Useful when the buffer needs no
    /// explicit return to the producer.
    pub fn noop() -> Self {
        Self::new(Box::new(|| Ok(())))
    }

    pub fn fire(&mut self) {
        if let Some(release) = self.release.take() {
            if let Err(err) = release() {
                warn!("frame release failed: {err}");
            }
        }
    }

    pub fn is_fired(&self) -> bool {
        self.release.is_none()
    }
}

impl Drop for FrameRelease {
    fn drop(&mut self) {
        self.fire();
    }
}

impl std::fmt::Debug for FrameRelease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRelease")
            .field("fired", &self.is_fired())
            .finish()
    }
}

/// One capturable unit of image data. Exclusively owned by the producer until
/// handed to the scheduler, which must release it on every exit path.
#[derive(Debug)]
pub struct Frame {
    /// Raw RGBA pixel buffer.
    pub data: Vec<u8>,
    pub metadata: FrameMetadata,
    pub captured_at: DateTime<Utc>,
    pub release: FrameRelease,
}

impl Frame {
    pub fn new(data: Vec<u8>, metadata: FrameMetadata, release: FrameRelease) -> Self {
        Self {
            data,
            metadata,
            captured_at: Utc::now(),
            release,
        }
    }

    /// Frame wrapping a caller-owned bitmap, as used by the still-image path.
    pub fn from_bitmap(bitmap: &Bitmap) -> Self {
        Self::new(
            bitmap.data.clone(),
            FrameMetadata {
                width: bitmap.width,
                height: bitmap.height,
                rotation: Rotation::Deg0,
                mirrored: false,
            },
            FrameRelease::noop(),
        )
    }
}
