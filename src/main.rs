//! Snapcam CLI
//!
//! Runs the camera activity against a terminal: Enter takes a photo, `q`
//! quits. With `--frames N` it takes N photos and exits.

use clap::Parser;
use snapcam::{
    activity::{ActivityExit, ActivityHandle, ActivityOptions, ActivityState, CameraActivity},
    capture::{CameraService, FileConfig, MockCameraService, PermissionPolicy},
    metrics::MetricsRegistry,
    permission::{MemoryPermissions, Permission, PermissionRegistry, PermissionStatus, TerminalPermissions},
    storage::OutputDirectory,
    ui::{LogNotifier, LogViewfinder},
};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "snapcam", version, about = "Camera preview and photo capture")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Camera device index used as the rear camera.
    #[arg(short, long)]
    device: Option<u32>,

    /// How camera permission is decided: granted, denied, prompt or system.
    #[arg(short, long)]
    permission: Option<PermissionPolicy>,

    /// Write photos straight to this directory.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Metrics server port (0 to disable).
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Take this many photos, then exit.
    #[arg(short, long)]
    frames: Option<u32>,

    /// Use the synthetic camera even when a real backend is built in.
    #[arg(long)]
    mock: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    info!("Snapcam v{}", snapcam::VERSION);

    let mut config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(device) = cli.device {
        config.capture.device_id = device;
    }
    if let Some(policy) = cli.permission {
        config.permissions.camera = policy;
    }
    if let Some(port) = cli.metrics_port {
        config.output.metrics_port = port;
    }

    let output = match &cli.output_dir {
        Some(dir) => OutputDirectory::resolve(None, &config.storage.app_name, dir),
        None => OutputDirectory::from_config(&config.storage),
    };
    let output = match output {
        Ok(output) => output,
        Err(e) => {
            eprintln!("No usable output directory: {}", e);
            std::process::exit(1);
        }
    };

    let metrics = match MetricsRegistry::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            std::process::exit(1);
        }
    };
    start_metrics_server(config.output.metrics_port, &metrics);

    let options = ActivityOptions {
        service: camera_service(&cli, config.capture.device_id),
        permissions: permission_registry(config.permissions.camera),
        capture: config.capture,
        output,
        viewfinder: Arc::new(LogViewfinder::new(30)),
        notifier: Box::new(LogNotifier),
        metrics,
    };
    let activity = match CameraActivity::new(options) {
        Ok(activity) => activity,
        Err(e) => {
            eprintln!("Failed to start camera activity: {}", e);
            std::process::exit(1);
        }
    };

    let handle = activity.handle();
    let ctrlc_handle = handle.clone();
    if let Err(e) = ctrlc::set_handler(move || ctrlc_handle.destroy()) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    tokio::spawn(drive_input(handle, cli.frames));
    let report = activity.run().await;

    for path in &report.saved {
        println!("{}", path.display());
    }
    info!(
        "Done. {} photo(s) saved, {} failed",
        report.saved.len(),
        report.failed
    );

    if report.exit == ActivityExit::PermissionDenied {
        std::process::exit(1);
    }
}

/// Feeds capture triggers once the activity has settled.
///
/// Stdin is only read after the permission prompt has been answered.
async fn drive_input(mut handle: ActivityHandle, frames: Option<u32>) {
    let Some(status) = handle.wait_for(|s| s.state.is_settled()).await else {
        return;
    };

    match status.state {
        ActivityState::Ready | ActivityState::Capturing => {}
        ActivityState::CameraUnavailable => {
            warn!("No camera bound; photos cannot be taken");
            if frames.is_some() {
                handle.destroy();
                return;
            }
        }
        _ => return,
    }

    match frames {
        Some(count) => {
            for taken in 0..u64::from(count) {
                if !handle.click() {
                    return;
                }
                let finished = handle
                    .wait_for(|s| {
                        (s.captures_completed > taken && s.state != ActivityState::Capturing)
                            || s.state == ActivityState::Terminated
                    })
                    .await;
                if finished.map_or(true, |s| s.state == ActivityState::Terminated) {
                    return;
                }
            }
            handle.destroy();
        }
        None => {
            println!("Press Enter to take a photo, q to quit.");
            std::thread::spawn(move || read_stdin(handle));
        }
    }
}

fn read_stdin(handle: ActivityHandle) {
    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }
        if !handle.click() {
            return;
        }
    }
    handle.destroy();
}

fn camera_service(cli: &Cli, device_id: u32) -> Arc<dyn CameraService> {
    #[cfg(feature = "camera")]
    if !cli.mock {
        info!(device_id, "Using system camera backend");
        return Arc::new(snapcam::capture::NokhwaCameraService::new(device_id));
    }

    let _ = (cli, device_id);
    info!("Using synthetic camera");
    Arc::new(MockCameraService::new())
}

fn permission_registry(policy: PermissionPolicy) -> Arc<dyn PermissionRegistry> {
    let fixed = |status| {
        Arc::new(MemoryPermissions::new().with_status(Permission::Camera, status))
            as Arc<dyn PermissionRegistry>
    };

    match policy {
        PermissionPolicy::Granted => fixed(PermissionStatus::Granted),
        PermissionPolicy::Denied => fixed(PermissionStatus::Denied),
        PermissionPolicy::Prompt => Arc::new(TerminalPermissions::new()),
        #[cfg(feature = "camera")]
        PermissionPolicy::System => Arc::new(snapcam::permission::NokhwaPermissions),
        #[cfg(not(feature = "camera"))]
        PermissionPolicy::System => {
            warn!("System permissions need the `camera` feature; treating camera as granted");
            fixed(PermissionStatus::Granted)
        }
    }
}

#[cfg(feature = "metrics")]
fn start_metrics_server(port: u16, metrics: &Arc<MetricsRegistry>) {
    use snapcam::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return;
    }
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), Arc::clone(metrics));
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            warn!("Metrics server stopped: {}", e);
        }
    });
}

#[cfg(not(feature = "metrics"))]
fn start_metrics_server(port: u16, _metrics: &Arc<MetricsRegistry>) {
    if port != 0 {
        tracing::debug!(port, "Built without the `metrics` feature; exporter disabled");
    }
}
