//! Operational helpers: logging setup, memory probe, event persistence.

use std::sync::Arc;

use argus_types::{config::OpsConfig, events::PipelineEvent, ArgusError, Result};
use tokio::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| ArgusError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| ArgusError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

/// Available system memory in megabytes, read from /proc/meminfo. Returns
/// None on platforms without it; the once-per-window telemetry log simply
/// omits the figure then.
pub fn available_memory_mb() -> Option<u64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    let line = meminfo
        .lines()
        .find(|line| line.starts_with("MemAvailable:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024)
}

/// In-memory event store for early development and test inspection.
#[derive(Clone, Default)]
pub struct EventStore {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, event: PipelineEvent) {
        self.events.lock().await.push(event);
    }

    pub async fn snapshot(&self) -> Vec<PipelineEvent> {
        self.events.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_types::events::{EventKind, EventPayload, LifecycleEvent, LifecyclePhase};

    #[tokio::test]
    async fn event_store_records_in_order() {
        let store = EventStore::new();
        for phase in [LifecyclePhase::Start, LifecyclePhase::Stop] {
            store
                .record(PipelineEvent::new(
                    EventKind::Lifecycle,
                    EventPayload::Lifecycle(LifecycleEvent {
                        phase,
                        details: None,
                    }),
                ))
                .await;
        }
        let events = store.snapshot().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0].payload,
            EventPayload::Lifecycle(LifecycleEvent {
                phase: LifecyclePhase::Start,
                ..
            })
        ));
    }
}
