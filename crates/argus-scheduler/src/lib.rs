//! Frame scheduling against an asynchronous, variable-latency detector.
//!
//! At most one detection is in flight at a time: the producer withholds the
//! next frame until the prior frame's release callback fires, and the
//! scheduler serializes every completion onto one lock so overlay mutation
//! never races a `stop` call or the FPS tick. Every submitted frame is
//! released exactly once, on success, failure, and post-stop alike.

pub mod producer;

use std::sync::{Arc, Mutex};

use argus_detect::{Detector, DetectorInput};
use argus_overlay::{
    graphic::{DetectionGraphic, Graphic, StillImageGraphic},
    OverlayModel,
};
use argus_surface::RenderingSurface;
use argus_types::{
    config::SchedulerConfig,
    detection::DetectionResult,
    frame::{Bitmap, Frame},
    telemetry::{DetectorMetrics, MetricsSnapshot},
    ArgusError, Result,
};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Duration, Instant},
};
use tracing::{debug, info, warn};

type FailureHook = Arc<dyn Fn(&ArgusError) + Send + Sync>;

struct SchedulerState {
    stopped: bool,
    detecting: bool,
    metrics: DetectorMetrics,
}

/// Throttles frame submission, drives overlay updates, and keeps latency and
/// frame-rate telemetry for its lifetime.
pub struct FrameScheduler<D: Detector + 'static> {
    config: SchedulerConfig,
    detector: Arc<D>,
    overlay: Arc<Mutex<OverlayModel>>,
    surface: Arc<dyn RenderingSurface>,
    on_failure: FailureHook,
    state: Arc<Mutex<SchedulerState>>,
    tick: Mutex<Option<JoinHandle<()>>>,
}

impl<D: Detector + 'static> FrameScheduler<D> {
    pub fn new(
        config: SchedulerConfig,
        detector: Arc<D>,
        overlay: Arc<Mutex<OverlayModel>>,
        surface: Arc<dyn RenderingSurface>,
    ) -> Self {
        let state = Arc::new(Mutex::new(SchedulerState {
            stopped: false,
            detecting: false,
            metrics: DetectorMetrics::new(),
        }));
        let tick = Mutex::new(Some(spawn_fps_tick(
            state.clone(),
            config.fps_window_ms,
        )));
        Self {
            config,
            detector,
            overlay,
            surface,
            on_failure: Arc::new(|err: &ArgusError| warn!("detection failed: {err}")),
            state,
            tick,
        }
    }

    /// Replaces the default failure hook. Per-frame detection errors stop
    /// here; they never propagate further.
    pub fn with_failure_hook(
        mut self,
        hook: impl Fn(&ArgusError) + Send + Sync + 'static,
    ) -> Self {
        self.on_failure = Arc::new(hook);
        self
    }

    /// Hands one frame to the detector. Never blocks: the detection runs on
    /// a spawned task and completes through the serialized completion path.
    /// A frame submitted after `stop` is released immediately and ignored.
    pub fn submit(&self, mut frame: Frame, is_still_image: bool) {
        {
            let Ok(mut state) = self.state.lock() else {
                frame.release.fire();
                return;
            };
            if state.stopped {
                drop(state);
                frame.release.fire();
                return;
            }
            if state.detecting {
                // Producer contract violation; the detections will still be
                // serialized on completion but latency figures overlap.
                warn!("frame submitted while a detection is outstanding");
            }
            state.detecting = true;
        }

        let (effective_width, effective_height) = frame.metadata.effective_dimensions();
        if let Ok(mut overlay) = self.overlay.lock() {
            overlay.set_image_source_info(effective_width, effective_height, frame.metadata.mirrored);
        }

        // Still images and non-viewport live previews re-draw the original
        // pixels behind the detections. The preview is shown upright, so the
        // buffer is paired with the effective dimensions.
        let background = if is_still_image || !self.config.live_viewport {
            Some(Bitmap::new(
                effective_width,
                effective_height,
                frame.data.clone(),
            ))
        } else {
            None
        };

        let started = Instant::now();
        let detector = self.detector.clone();
        let state = self.state.clone();
        let overlay = self.overlay.clone();
        let surface = self.surface.clone();
        let on_failure = self.on_failure.clone();
        tokio::spawn(async move {
            let input = DetectorInput::from_frame(&frame.data, &frame.metadata);
            let outcome = detector.detect(input).await;
            complete(
                &state, &overlay, &*surface, &*on_failure, frame, outcome, started, background,
            );
        });
    }

    /// Idempotent; safe to call while a detection is outstanding. The
    /// in-flight completion still releases its frame but no longer touches
    /// metrics or the overlay.
    pub fn stop(&self) {
        {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            if state.stopped {
                return;
            }
            state.stopped = true;
            state.metrics.reset_runs();
        }
        if let Ok(mut tick) = self.tick.lock() {
            if let Some(handle) = tick.take() {
                handle.abort();
            }
        }
        info!("frame scheduler stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().map(|s| s.stopped).unwrap_or(true)
    }

    pub fn is_detecting(&self) -> bool {
        self.state.lock().map(|s| s.detecting).unwrap_or(false)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.state
            .lock()
            .map(|s| s.metrics.snapshot())
            .unwrap_or_else(|_| DetectorMetrics::new().snapshot())
    }
}

impl<D: Detector + 'static> Drop for FrameScheduler<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_fps_tick(state: Arc<Mutex<SchedulerState>>, window_ms: u64) -> JoinHandle<()> {
    let period = Duration::from_millis(window_ms);
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            let Ok(mut state) = state.lock() else {
                break;
            };
            if state.stopped {
                break;
            }
            state.metrics.roll_window();
        }
    })
}

/// The single logical completion sequence. Runs once per submitted frame;
/// holds the state lock across the overlay mutation so a concurrent `stop`
/// or next-frame submission observes either all of it or none of it.
#[allow(clippy::too_many_arguments)]
fn complete(
    state: &Mutex<SchedulerState>,
    overlay: &Mutex<OverlayModel>,
    surface: &dyn RenderingSurface,
    on_failure: &dyn Fn(&ArgusError),
    mut frame: Frame,
    outcome: Result<Vec<DetectionResult>>,
    started: Instant,
    background: Option<Bitmap>,
) {
    let latency_ms = started.elapsed().as_millis() as u64;

    let Ok(mut state) = state.lock() else {
        frame.release.fire();
        return;
    };
    state.detecting = false;
    if state.stopped {
        drop(state);
        frame.release.fire();
        return;
    }

    let first_of_window = state.metrics.record_latency(latency_ms);
    if first_of_window {
        let snapshot = state.metrics.snapshot();
        debug!(
            max_latency_ms = snapshot.max_latency_ms,
            min_latency_ms = ?snapshot.min_latency_ms,
            average_latency_ms = snapshot.average_latency_ms,
            num_runs = snapshot.num_runs,
            available_memory_mb = ?argus_ops::available_memory_mb(),
            "inference telemetry"
        );
    }

    if let Ok(mut overlay) = overlay.lock() {
        overlay.clear();
        if let Ok(results) = &outcome {
            if let Some(bitmap) = background {
                overlay.add(Graphic::StillImage(StillImageGraphic::new(bitmap)));
            }
            for result in results {
                overlay.add(Graphic::Detection(DetectionGraphic::new(result.clone())));
            }
        }
    }
    surface.request_redraw();

    if let Err(err) = &outcome {
        on_failure(err);
    }

    drop(state);
    frame.release.fire();
}

pub fn scheduler_error(message: impl Into<String>) -> ArgusError {
    ArgusError::Ops(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::{FrameProducer, SyntheticProducer};
    use argus_types::{
        detection::Label,
        frame::{FrameMetadata, FrameRelease, Rotation},
        geometry::Rect,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tokio::time::{advance, sleep};

    struct NullSurface {
        redraws: AtomicUsize,
    }

    impl NullSurface {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                redraws: AtomicUsize::new(0),
            })
        }
    }

    impl RenderingSurface for NullSurface {
        fn request_redraw(&self) {
            self.redraws.fetch_add(1, Ordering::SeqCst);
        }

        fn view_size(&self) -> (u32, u32) {
            (1080, 1920)
        }
    }

    /// Detector returning queued outcomes, optionally held until notified,
    /// and tracking peak call concurrency.
    struct ScriptedDetector {
        outcomes: Mutex<VecDeque<Result<Vec<DetectionResult>>>>,
        hold: Option<Arc<Notify>>,
        latency: Duration,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ScriptedDetector {
        fn ok_results(count: usize) -> Vec<DetectionResult> {
            (0..count)
                .map(|i| {
                    DetectionResult::new(
                        Some(i as i32),
                        Rect::new(0.0, 0.0, 10.0, 10.0),
                        vec![Label::new("thing", 0.9)],
                    )
                })
                .collect()
        }

        fn with_outcomes(outcomes: Vec<Result<Vec<DetectionResult>>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
                hold: None,
                latency: Duration::from_millis(10),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            })
        }

        fn held(hold: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(VecDeque::new()),
                hold: Some(hold),
                latency: Duration::ZERO,
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Detector for ScriptedDetector {
        async fn detect(&self, _image: DetectorInput<'_>) -> Result<Vec<DetectionResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(hold) = &self.hold {
                hold.notified().await;
            } else {
                sleep(self.latency).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Self::ok_results(1)))
        }
    }

    fn scheduler_config(live_viewport: bool) -> SchedulerConfig {
        SchedulerConfig {
            fps_window_ms: 1000,
            live_viewport,
        }
    }

    fn overlay() -> Arc<Mutex<OverlayModel>> {
        let mut model = OverlayModel::new(1080, 1920);
        model.set_image_source_info(640, 480, false);
        Arc::new(Mutex::new(model))
    }

    fn frame(released: &Arc<AtomicUsize>) -> Frame {
        let counter = released.clone();
        Frame::new(
            vec![0u8; 640 * 480 * 4],
            FrameMetadata {
                width: 640,
                height: 480,
                rotation: Rotation::Deg0,
                mirrored: false,
            },
            FrameRelease::new(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
        )
    }

    async fn wait_for_runs<D: Detector + 'static>(scheduler: &FrameScheduler<D>, runs: u64) {
        for _ in 0..1000 {
            if scheduler.metrics().num_runs >= runs {
                return;
            }
            sleep(Duration::from_millis(1)).await;
        }
        panic!("detections did not complete in time");
    }

    async fn wait_for_releases(released: &Arc<AtomicUsize>, count: usize) {
        for _ in 0..1000 {
            if released.load(Ordering::SeqCst) >= count {
                return;
            }
            sleep(Duration::from_millis(1)).await;
        }
        panic!("frames were not released in time");
    }

    #[tokio::test(start_paused = true)]
    async fn gated_producer_keeps_detection_single_flight() {
        let detector = ScriptedDetector::with_outcomes(Vec::new());
        let scheduler = FrameScheduler::new(
            scheduler_config(true),
            detector.clone(),
            overlay(),
            NullSurface::new(),
        );

        let metadata = FrameMetadata {
            width: 8,
            height: 8,
            rotation: Rotation::Deg0,
            mirrored: false,
        };
        let mut producer = SyntheticProducer::new(metadata, 5);
        while let Some(frame) = producer.next_frame().await.unwrap() {
            assert!(!scheduler.is_detecting());
            scheduler.submit(frame, false);
        }
        wait_for_runs(&scheduler, 5).await;

        assert_eq!(detector.calls.load(Ordering::SeqCst), 5);
        assert_eq!(detector.peak_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn frame_released_once_on_success_and_failure() {
        let detector = ScriptedDetector::with_outcomes(vec![
            Ok(ScriptedDetector::ok_results(2)),
            Err(ArgusError::Detection("model choked".into())),
        ]);
        let failures = Arc::new(AtomicUsize::new(0));
        let failures_seen = failures.clone();
        let overlay = overlay();
        let surface = NullSurface::new();
        let scheduler = FrameScheduler::new(
            scheduler_config(true),
            detector,
            overlay.clone(),
            surface.clone(),
        )
        .with_failure_hook(move |_| {
            failures_seen.fetch_add(1, Ordering::SeqCst);
        });

        let released = Arc::new(AtomicUsize::new(0));
        scheduler.submit(frame(&released), false);
        wait_for_runs(&scheduler, 1).await;
        assert_eq!(overlay.lock().unwrap().len(), 2);

        scheduler.submit(frame(&released), false);
        wait_for_runs(&scheduler, 2).await;
        wait_for_releases(&released, 2).await;

        assert_eq!(released.load(Ordering::SeqCst), 2);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        // Failure leaves the overlay cleared but still repaints.
        assert!(overlay.lock().unwrap().is_empty());
        assert_eq!(surface.redraws.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn late_completion_after_stop_releases_but_stays_quiescent() {
        let hold = Arc::new(Notify::new());
        let detector = ScriptedDetector::held(hold.clone());
        let overlay = overlay();
        let surface = NullSurface::new();
        let scheduler = FrameScheduler::new(
            scheduler_config(true),
            detector,
            overlay.clone(),
            surface.clone(),
        );

        let released = Arc::new(AtomicUsize::new(0));
        scheduler.submit(frame(&released), false);
        sleep(Duration::from_millis(1)).await;

        scheduler.stop();
        scheduler.stop(); // idempotent
        assert!(scheduler.is_stopped());

        hold.notify_one();
        wait_for_releases(&released, 1).await;

        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(overlay.lock().unwrap().is_empty());
        assert_eq!(surface.redraws.load(Ordering::SeqCst), 0);
        let metrics = scheduler.metrics();
        assert_eq!(metrics.num_runs, 0);
        assert_eq!(metrics.total_latency_ms, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_after_stop_releases_immediately() {
        let detector = ScriptedDetector::with_outcomes(Vec::new());
        let scheduler = FrameScheduler::new(
            scheduler_config(true),
            detector.clone(),
            overlay(),
            NullSurface::new(),
        );
        scheduler.stop();

        let released = Arc::new(AtomicUsize::new(0));
        scheduler.submit(frame(&released), false);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn metrics_follow_observed_latencies() {
        let detector = ScriptedDetector::with_outcomes(Vec::new());
        let scheduler = FrameScheduler::new(
            scheduler_config(true),
            detector,
            overlay(),
            NullSurface::new(),
        );

        let released = Arc::new(AtomicUsize::new(0));
        for expected_runs in 1..=3u64 {
            scheduler.submit(frame(&released), false);
            wait_for_runs(&scheduler, expected_runs).await;
        }

        let metrics = scheduler.metrics();
        assert_eq!(metrics.num_runs, 3);
        // Scripted latency is a fixed 10ms of virtual time per run.
        assert_eq!(metrics.min_latency_ms, Some(10));
        assert_eq!(metrics.max_latency_ms, 10);
        assert_eq!(metrics.total_latency_ms, 30);
        assert_eq!(metrics.average_latency_ms, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn fps_window_counts_completions_and_resets() {
        let detector = ScriptedDetector::with_outcomes(Vec::new());
        let scheduler = FrameScheduler::new(
            scheduler_config(true),
            detector,
            overlay(),
            NullSurface::new(),
        );

        let released = Arc::new(AtomicUsize::new(0));
        for expected_runs in 1..=3u64 {
            scheduler.submit(frame(&released), false);
            wait_for_runs(&scheduler, expected_runs).await;
        }
        assert_eq!(scheduler.metrics().fps, 0);

        advance(Duration::from_millis(1000)).await;
        sleep(Duration::from_millis(1)).await;
        assert_eq!(scheduler.metrics().fps, 3);

        // An empty window resets the figure.
        advance(Duration::from_millis(1000)).await;
        sleep(Duration::from_millis(1)).await;
        assert_eq!(scheduler.metrics().fps, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn still_image_gets_background_graphic_first() {
        let detector = ScriptedDetector::with_outcomes(vec![Ok(ScriptedDetector::ok_results(1))]);
        let overlay = overlay();
        let scheduler = FrameScheduler::new(
            scheduler_config(true),
            detector,
            overlay.clone(),
            NullSurface::new(),
        );

        let released = Arc::new(AtomicUsize::new(0));
        scheduler.submit(frame(&released), true);
        wait_for_runs(&scheduler, 1).await;

        let overlay = overlay.lock().unwrap();
        assert_eq!(overlay.len(), 2);
        assert!(matches!(overlay.graphics()[0], Graphic::StillImage(_)));
        assert!(matches!(overlay.graphics()[1], Graphic::Detection(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn live_viewport_frame_has_no_background_graphic() {
        let detector = ScriptedDetector::with_outcomes(vec![Ok(ScriptedDetector::ok_results(1))]);
        let overlay = overlay();
        let scheduler = FrameScheduler::new(
            scheduler_config(true),
            detector,
            overlay.clone(),
            NullSurface::new(),
        );

        let released = Arc::new(AtomicUsize::new(0));
        scheduler.submit(frame(&released), false);
        wait_for_runs(&scheduler, 1).await;

        let overlay = overlay.lock().unwrap();
        assert_eq!(overlay.len(), 1);
        assert!(matches!(overlay.graphics()[0], Graphic::Detection(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn rotated_frame_swaps_transform_dimensions() {
        let detector = ScriptedDetector::with_outcomes(Vec::new());
        let overlay = overlay();
        let scheduler = FrameScheduler::new(
            scheduler_config(true),
            detector,
            overlay.clone(),
            NullSurface::new(),
        );

        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let rotated = Frame::new(
            vec![0u8; 480 * 640 * 4],
            FrameMetadata {
                width: 480,
                height: 640,
                rotation: Rotation::Deg90,
                mirrored: false,
            },
            FrameRelease::new(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
        );
        scheduler.submit(rotated, false);
        wait_for_runs(&scheduler, 1).await;

        // Effective 640x480 source against a 1080x1920 view covers at 4.0.
        let mut overlay = overlay.lock().unwrap();
        let mut canvas = argus_overlay::canvas::RecordingCanvas::new();
        overlay.draw(&mut canvas);
        assert_eq!(overlay.transform().scale(), 4.0);
    }
}
