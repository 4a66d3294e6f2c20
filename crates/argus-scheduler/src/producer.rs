use std::sync::Arc;

use async_trait::async_trait;
use argus_types::{
    frame::{Frame, FrameMetadata, FrameRelease},
    ArgusError, Result,
};
use tokio::sync::Semaphore;

/// Source of frames. The producer contract: never deliver the next live
/// frame until the prior frame's release callback has fired. That gating is
/// how single-flight holds without the scheduler needing a queue.
#[async_trait]
pub trait FrameProducer: Send {
    /// Next frame, or None when the stream ends.
    async fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Producer generating gradient test frames, gated on release via a
/// one-permit semaphore: `next_frame` blocks until the previous frame's
/// release callback returned the permit.
pub struct SyntheticProducer {
    metadata: FrameMetadata,
    remaining: u32,
    gate: Arc<Semaphore>,
}

impl SyntheticProducer {
    pub fn new(metadata: FrameMetadata, count: u32) -> Self {
        Self {
            metadata,
            remaining: count,
            gate: Arc::new(Semaphore::new(1)),
        }
    }

    fn gradient(&self) -> Vec<u8> {
        let len = (self.metadata.width * self.metadata.height * 4) as usize;
        (0..len).map(|i| (i / 4 % 256) as u8).collect()
    }
}

#[async_trait]
impl FrameProducer for SyntheticProducer {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let permit = self
            .gate
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| ArgusError::Ops(format!("frame gate closed: {err}")))?;
        permit.forget();
        self.remaining -= 1;

        let gate = self.gate.clone();
        let release = FrameRelease::new(Box::new(move || {
            gate.add_permits(1);
            Ok(())
        }));
        Ok(Some(Frame::new(self.gradient(), self.metadata, release)))
    }
}
