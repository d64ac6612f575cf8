//! IR Capture CLI
//!
//! Streams frames from an infrared source (a synthetic one unless the
//! `camera` feature selects real hardware), keeps the latest frame in the
//! front buffer, and saves it as a PNG when the source goes idle.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ir_capture::{
    capture::{FileConfig, FrameSourceProvider, MockProvider, MockSource, VideoProfile},
    dispatch::UiDispatcher,
    export::{DirectoryPicker, ExportOutcome, SaveExporter},
    pipeline::HeadlessSurface,
    session::CaptureSession,
    CaptureApp,
};
use tracing::{info, warn};

/// Capture infrared frames and save the last one as PNG.
#[derive(Debug, Parser)]
#[command(name = "ir-capture", version, about)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of synthetic frames to stream.
    #[arg(long)]
    frames: Option<u64>,

    /// Synthetic frame width.
    #[arg(long)]
    width: Option<u32>,

    /// Synthetic frame height.
    #[arg(long)]
    height: Option<u32>,

    /// Directory for the saved frame.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Do not save the last frame.
    #[arg(long)]
    no_save: bool,

    /// Simulate a denied capture permission prompt.
    #[arg(long)]
    deny_access: bool,

    /// Capture from the first camera device instead of the synthetic source.
    #[cfg(feature = "camera")]
    #[arg(long)]
    camera: bool,

    /// Serve Prometheus metrics on this port.
    #[cfg(feature = "metrics")]
    #[arg(long)]
    metrics_port: Option<u16>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("IR Capture v{}", ir_capture::VERSION);

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    apply_overrides(&mut config, &args);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let dispatcher = UiDispatcher::new();
    let shutdown = dispatcher.handle();
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown.shutdown();
    }) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    let session = CaptureSession::new(config.capture.clone(), HeadlessSurface::new());
    let picker = DirectoryPicker::new(&config.export.output_dir).timestamped(config.export.timestamped);
    let exporter = SaveExporter::new(config.export.suggested_name.clone());
    let app = CaptureApp::new(session, exporter, picker);
    #[cfg(feature = "metrics")]
    let app = match args.metrics_port {
        Some(port) => with_metrics_server(app, port),
        None => app,
    };
    let mut app = app;

    let mut provider = provider_for(&config, &args);
    if let Err(e) = app.start(provider.as_mut(), &dispatcher) {
        eprintln!("Capture unavailable: {}", e);
        std::process::exit(1);
    }

    info!("Streaming frames (Ctrl-C to stop)...");
    let idle = config.mock.frame_interval() * 10 + Duration::from_millis(500);
    if app.run_until_idle(&dispatcher, idle) {
        info!("Interrupted");
    }

    let stats = app.session().stats();
    info!(
        presented = stats.frames_presented,
        skipped = stats.frames_skipped,
        failed = stats.frames_failed,
        swaps = stats.swaps,
        "Capture finished"
    );

    if !args.no_save {
        match app.save() {
            Ok(ExportOutcome::Saved(path)) => println!("Saved {}", path.display()),
            Ok(ExportOutcome::Cancelled) => println!("Save cancelled"),
            Err(e) => {
                eprintln!("Failed to save frame: {}", e);
                app.shutdown();
                std::process::exit(1);
            }
        }
    }

    app.shutdown();
    info!("Done");
}

fn apply_overrides(config: &mut FileConfig, args: &Args) {
    if let Some(frames) = args.frames {
        config.mock.frames = frames;
    }
    if let Some(width) = args.width {
        config.mock.width = width;
    }
    if let Some(height) = args.height {
        config.mock.height = height;
    }
    if let Some(dir) = &args.output_dir {
        config.export.output_dir = dir.clone();
    }
}

fn provider_for(config: &FileConfig, args: &Args) -> Box<dyn FrameSourceProvider> {
    #[cfg(feature = "camera")]
    if args.camera {
        return Box::new(ir_capture::capture::NativeProvider::new());
    }

    let mock = &config.mock;
    let profile = VideoProfile::new(mock.width, mock.height, mock.fps);
    let source = MockSource::new(profile).synthetic(Some(mock.frames), mock.frame_interval());
    let provider = MockProvider::new().with_source(source);
    if args.deny_access {
        Box::new(provider.denied())
    } else {
        Box::new(provider)
    }
}

#[cfg(feature = "metrics")]
fn with_metrics_server<P: ir_capture::export::SavePicker>(
    app: CaptureApp<HeadlessSurface, P>,
    port: u16,
) -> CaptureApp<HeadlessSurface, P> {
    use ir_capture::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};
    use std::sync::Arc;

    let registry = match MetricsRegistry::new() {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            return app;
        }
    };
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), Arc::clone(&registry));
    if let Err(e) = server.spawn() {
        warn!("Failed to start metrics server: {}", e);
    }
    app.with_metrics(registry)
}
