use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{ArgusError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub confidence_threshold: f32,
    pub max_results: usize,
    /// Simulated inference latency for the stub detector.
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// FPS window length. 1000ms in production; shorter in tests.
    #[serde(default = "default_fps_window_ms")]
    pub fps_window_ms: u64,
    /// When the live viewport renders the camera feed itself, no background
    /// bitmap is attached to live frames; when disabled, each live frame's
    /// pixels are re-drawn behind the detections.
    pub live_viewport: bool,
}

fn default_fps_window_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub view_width: u32,
    pub view_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgusConfig {
    pub detector: DetectorConfig,
    pub scheduler: SchedulerConfig,
    pub surface: SurfaceConfig,
    pub ops: OpsConfig,
}

impl ArgusConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            ArgusError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            ArgusError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(ArgusError::Configuration(
                "detector.confidence_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if self.detector.max_results == 0 {
            return Err(ArgusError::Configuration(
                "detector.max_results must be greater than zero".into(),
            ));
        }
        if self.scheduler.fps_window_ms == 0 {
            return Err(ArgusError::Configuration(
                "scheduler.fps_window_ms must be greater than zero".into(),
            ));
        }
        if self.surface.view_width == 0 || self.surface.view_height == 0 {
            return Err(ArgusError::Configuration(
                "surface view dimensions must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
