//! Rendering-surface and selection capabilities with in-process backends.

use argus_types::{
    detection::DetectionResult,
    events::{EventKind, EventPayload, PipelineEvent, SelectionEvent},
};
use futures::{stream::BoxStream, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

/// External rendering surface. `request_redraw` is idempotent and
/// coalescable: any number of requests before a repaint collapse to one.
pub trait RenderingSurface: Send + Sync {
    fn request_redraw(&self);
    fn view_size(&self) -> (u32, u32);
}

/// Collaborator notified when a drawn detection is selected by touch. The
/// translation/dialog workflow it runs happens elsewhere.
pub trait SelectionSink: Send + Sync {
    fn object_selected(&self, result: &DetectionResult);
}

/// Surface backed by a watch channel. The channel holds only the latest
/// redraw generation, so a slow repainter sees one wakeup however many
/// requests arrived.
pub struct WatchSurface {
    view_width: u32,
    view_height: u32,
    redraw_tx: watch::Sender<u64>,
}

impl WatchSurface {
    pub fn new(view_width: u32, view_height: u32) -> Self {
        let (redraw_tx, _) = watch::channel(0);
        Self {
            view_width,
            view_height,
            redraw_tx,
        }
    }

    /// The receiver resolves whenever at least one redraw was requested
    /// since it last observed the generation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.redraw_tx.subscribe()
    }
}

impl RenderingSurface for WatchSurface {
    fn request_redraw(&self) {
        self.redraw_tx.send_modify(|generation| {
            *generation = generation.wrapping_add(1);
        });
    }

    fn view_size(&self) -> (u32, u32) {
        (self.view_width, self.view_height)
    }
}

/// In-process event bus backed by a broadcast channel. Doubles as the
/// selection sink: hits are published as selection events.
#[derive(Clone)]
pub struct LocalEventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl LocalEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> BoxStream<'static, PipelineEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move { event.ok() })
            .boxed()
    }
}

impl SelectionSink for LocalEventBus {
    fn object_selected(&self, result: &DetectionResult) {
        let Some(label) = result.primary_label() else {
            return;
        };
        info!("object selected: {}", label.text);
        self.publish(PipelineEvent::new(
            EventKind::Selection,
            EventPayload::Selection(SelectionEvent {
                tracking_id: result.tracking_id,
                label: label.text.clone(),
                confidence: label.confidence,
            }),
        ));
    }
}
