use serde::{Deserialize, Serialize};

/// Cumulative and windowed latency counters for one scheduler instance.
///
/// The cumulative fields are monotonic while the scheduler runs. The windowed
/// `frames_in_second` counter is rolled into `fps` once per window by the
/// scheduler's tick.
#[derive(Debug, Clone)]
pub struct DetectorMetrics {
    pub num_runs: u64,
    pub total_latency_ms: u64,
    pub max_latency_ms: u64,
    pub min_latency_ms: u64,
    pub frames_in_second: u32,
    pub fps: u32,
}

impl Default for DetectorMetrics {
    fn default() -> Self {
        Self {
            num_runs: 0,
            total_latency_ms: 0,
            max_latency_ms: 0,
            min_latency_ms: u64::MAX,
            frames_in_second: 0,
            fps: 0,
        }
    }
}

impl DetectorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed detection. Returns true when this is the first
    /// frame of the current FPS window, which drives the once-per-window
    /// telemetry log.
    pub fn record_latency(&mut self, latency_ms: u64) -> bool {
        self.num_runs += 1;
        self.frames_in_second += 1;
        self.total_latency_ms += latency_ms;
        self.max_latency_ms = self.max_latency_ms.max(latency_ms);
        self.min_latency_ms = self.min_latency_ms.min(latency_ms);
        self.frames_in_second == 1
    }

    /// Snapshots the windowed counter into `fps` and resets it. Called once
    /// per 1000ms window.
    pub fn roll_window(&mut self) {
        self.fps = self.frames_in_second;
        self.frames_in_second = 0;
    }

    pub fn average_latency_ms(&self) -> u64 {
        if self.num_runs == 0 {
            0
        } else {
            self.total_latency_ms / self.num_runs
        }
    }

    /// Zeroes the cumulative run counters. Min/max are deliberately kept; a
    /// stopped scheduler instance is about to be discarded and the extrema
    /// still describe its lifetime.
    pub fn reset_runs(&mut self) {
        self.num_runs = 0;
        self.total_latency_ms = 0;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            num_runs: self.num_runs,
            total_latency_ms: self.total_latency_ms,
            max_latency_ms: self.max_latency_ms,
            min_latency_ms: if self.min_latency_ms == u64::MAX {
                None
            } else {
                Some(self.min_latency_ms)
            },
            average_latency_ms: self.average_latency_ms(),
            fps: self.fps,
        }
    }
}

/// Serializable view of [`DetectorMetrics`] for logging and event publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub num_runs: u64,
    pub total_latency_ms: u64,
    pub max_latency_ms: u64,
    pub min_latency_ms: Option<u64>,
    pub average_latency_ms: u64,
    pub fps: u32,
}
