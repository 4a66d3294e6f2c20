use std::{
    env,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use argus_detect::StubDetector;
use argus_ops::{init_tracing, EventStore};
use argus_overlay::{canvas::RecordingCanvas, OverlayModel};
use argus_scheduler::{
    producer::{FrameProducer, SyntheticProducer},
    FrameScheduler,
};
use argus_surface::{LocalEventBus, RenderingSurface, WatchSurface};
use argus_types::{
    config::{ArgusConfig, DetectorConfig, OpsConfig, SchedulerConfig, SurfaceConfig},
    events::{EventKind, EventPayload, FailureEvent, LifecycleEvent, LifecyclePhase, PipelineEvent},
    frame::{Bitmap, Frame, FrameMetadata, Rotation},
};
use clap::Parser;
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use tracing::info;

/// Demo driver for the Argus detection overlay pipeline.
#[derive(Parser, Debug)]
#[command(name = "argus", about = "Object-detection overlay pipeline demo")]
struct Args {
    /// Config file path; falls back to ARGUS_CONFIG, then configs/dev.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Process a single still image (PNG) instead of a live stream.
    #[arg(long)]
    image: Option<PathBuf>,
    /// Number of synthetic live frames to stream.
    #[arg(long, default_value_t = 30)]
    frames: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config);
    init_tracing(&config.ops)?;

    let detector = Arc::new(StubDetector::new(config.detector.clone())?);
    let surface = Arc::new(WatchSurface::new(
        config.surface.view_width,
        config.surface.view_height,
    ));
    let overlay = Arc::new(Mutex::new(OverlayModel::new(
        config.surface.view_width,
        config.surface.view_height,
    )));
    let bus = LocalEventBus::new(64);
    let store = EventStore::new();

    spawn_event_recorder(&bus, store.clone());
    spawn_repaint_loop(surface.clone(), overlay.clone());

    bus.publish(lifecycle(LifecyclePhase::Start));
    let failure_bus = bus.clone();
    let scheduler = FrameScheduler::new(
        config.scheduler.clone(),
        detector,
        overlay.clone(),
        surface.clone(),
    )
    .with_failure_hook(move |err| {
        failure_bus.publish(PipelineEvent::new(
            EventKind::Failure,
            EventPayload::Failure(FailureEvent {
                message: err.to_string(),
            }),
        ));
    });

    let frames = match &args.image {
        Some(path) => {
            submit_still_image(&scheduler, path)?;
            1
        }
        None => stream_live_frames(&scheduler, args.frames).await?,
    };
    wait_for_runs(&scheduler, frames as u64).await;

    // Simulate a touch at the view center; the stub detection covers it.
    let (view_width, view_height) = surface.view_size();
    let handled = overlay.lock().map(|mut model| {
        model.dispatch_touch(view_width as f32 / 2.0, view_height as f32 / 2.0, &bus)
    });
    info!("center touch handled: {:?}", handled.unwrap_or(false));

    scheduler.stop();
    bus.publish(lifecycle(LifecyclePhase::Stop));
    sleep(Duration::from_millis(20)).await;

    let metrics = serde_json::to_string(&scheduler.metrics())?;
    info!("final metrics: {metrics}");
    info!("recorded {} pipeline events", store.snapshot().await.len());
    Ok(())
}

fn spawn_event_recorder(bus: &LocalEventBus, store: EventStore) {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            info!("pipeline event: {:?}", event.kind);
            store.record(event).await;
        }
    });
}

fn spawn_repaint_loop(surface: Arc<WatchSurface>, overlay: Arc<Mutex<OverlayModel>>) {
    let mut redraws = surface.subscribe();
    tokio::spawn(async move {
        while redraws.changed().await.is_ok() {
            let mut canvas = RecordingCanvas::new();
            if let Ok(mut model) = overlay.lock() {
                model.draw(&mut canvas);
            }
            info!("repaint: {} draw commands", canvas.commands.len());
        }
    });
}

fn submit_still_image(scheduler: &FrameScheduler<StubDetector>, path: &PathBuf) -> Result<()> {
    let decoded = image::open(path)
        .with_context(|| format!("failed to load image {}", path.display()))?
        .to_rgba8();
    let (width, height) = decoded.dimensions();
    let bitmap = Bitmap::new(width, height, decoded.into_raw());
    info!("processing still image {} ({width}x{height})", path.display());
    scheduler.submit(Frame::from_bitmap(&bitmap), true);
    Ok(())
}

async fn stream_live_frames(scheduler: &FrameScheduler<StubDetector>, count: u32) -> Result<u32> {
    let metadata = FrameMetadata {
        width: 640,
        height: 480,
        rotation: Rotation::Deg0,
        mirrored: false,
    };
    let mut producer = SyntheticProducer::new(metadata, count);
    let mut submitted = 0;
    while let Some(frame) = producer.next_frame().await? {
        scheduler.submit(frame, false);
        submitted += 1;
    }
    info!("streamed {submitted} synthetic frames");
    Ok(submitted)
}

async fn wait_for_runs(scheduler: &FrameScheduler<StubDetector>, runs: u64) {
    while scheduler.metrics().num_runs < runs {
        sleep(Duration::from_millis(5)).await;
    }
}

fn lifecycle(phase: LifecyclePhase) -> PipelineEvent {
    PipelineEvent::new(
        EventKind::Lifecycle,
        EventPayload::Lifecycle(LifecycleEvent {
            phase,
            details: None,
        }),
    )
}

fn load_config(from_args: Option<PathBuf>) -> ArgusConfig {
    let from_env = env::var("ARGUS_CONFIG").ok().map(PathBuf::from);
    let path = from_args
        .or(from_env)
        .unwrap_or_else(|| PathBuf::from("configs/dev.toml"));
    match ArgusConfig::from_file(&path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path.display()
                );
                default_config()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path.display()
            );
            default_config()
        }
    }
}

fn default_config() -> ArgusConfig {
    let config = ArgusConfig {
        detector: DetectorConfig {
            confidence_threshold: 0.5,
            max_results: 5,
            latency_ms: 30,
        },
        scheduler: SchedulerConfig {
            fps_window_ms: 1000,
            live_viewport: true,
        },
        surface: SurfaceConfig {
            view_width: 1080,
            view_height: 1920,
        },
        ops: OpsConfig {
            log_level: "info".into(),
        },
    };
    debug_assert!(config.validate().is_ok());
    config
}
