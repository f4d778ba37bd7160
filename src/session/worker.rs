//! Dedicated camera worker queue.
//!
//! One OS thread owns the open device. Bind, unbind and capture requests
//! are processed strictly in the order they were sent; between requests
//! the worker pumps preview frames to the bound surface.

use crate::capture::{write_jpeg, Camera, CameraError, CameraInfo, CameraService, CaptureConfig};
use crate::metrics::MetricsRegistry;
use crate::photo::CaptureOutcome;
use crate::ui::PreviewSurface;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

/// Identifies one successful bind. Never reused.
pub type BindingId = u64;

enum Command {
    Bind {
        camera: CameraInfo,
        config: CaptureConfig,
        surface: Option<Arc<dyn PreviewSurface>>,
        reply: oneshot::Sender<Result<BindingId, CameraError>>,
    },
    UnbindAll,
    Capture {
        binding: BindingId,
        target: PathBuf,
        quality: u8,
        reply: oneshot::Sender<CaptureOutcome>,
    },
    Shutdown,
}

/// Owner of the worker thread. Shuts the thread down when dropped.
pub struct CameraWorker {
    tx: mpsc::Sender<Command>,
    thread: Option<thread::JoinHandle<()>>,
}

/// Cloneable sender side of the worker queue.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Bind { camera, .. } => f.debug_struct("Bind").field("camera", camera).finish(),
            Command::UnbindAll => f.write_str("UnbindAll"),
            Command::Capture {
                binding, target, ..
            } => f
                .debug_struct("Capture")
                .field("binding", binding)
                .field("target", target)
                .finish(),
            Command::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl CameraWorker {
    /// Starts the worker thread.
    pub fn spawn(
        service: Arc<dyn CameraService>,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Self, CameraError> {
        let (tx, rx) = mpsc::channel();
        // Devices are not Send; the state is built on the worker thread
        let thread = thread::Builder::new()
            .name("snapcam-camera".into())
            .spawn(move || {
                let state = WorkerState {
                    service,
                    metrics,
                    bound: None,
                    next_binding: 1,
                };
                state.run(rx)
            })
            .map_err(|e| CameraError::WorkerUnavailable(e.to_string()))?;

        tracing::debug!("Camera worker started");
        Ok(Self {
            tx,
            thread: Some(thread),
        })
    }

    /// Returns a sender for the worker queue.
    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            tx: self.tx.clone(),
        }
    }

    /// Closes the device and joins the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.tx.send(Command::Shutdown);
            if thread.join().is_err() {
                tracing::error!("Camera worker panicked");
            }
        }
    }
}

impl Drop for CameraWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl WorkerHandle {
    /// Opens `camera` and makes it the only bound device.
    pub async fn bind(
        &self,
        camera: CameraInfo,
        config: CaptureConfig,
        surface: Option<Arc<dyn PreviewSurface>>,
    ) -> Result<BindingId, CameraError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Bind {
                camera,
                config,
                surface,
                reply,
            })
            .map_err(|_| CameraError::WorkerUnavailable("queue closed".into()))?;
        rx.await
            .map_err(|_| CameraError::WorkerUnavailable("bind dropped".into()))?
    }

    /// Closes the bound device, if any.
    pub fn unbind_all(&self) {
        if self.tx.send(Command::UnbindAll).is_err() {
            tracing::debug!("Unbind skipped, camera worker already stopped");
        }
    }

    /// Captures one frame from `binding` into `target`.
    pub fn capture(
        &self,
        binding: BindingId,
        target: PathBuf,
        quality: u8,
    ) -> oneshot::Receiver<CaptureOutcome> {
        let (reply, rx) = oneshot::channel();
        let command = Command::Capture {
            binding,
            target,
            quality,
            reply,
        };
        if let Err(mpsc::SendError(Command::Capture { reply, .. })) = self.tx.send(command) {
            let _ = reply.send(CaptureOutcome::failed("camera worker is not running"));
        }
        rx
    }
}

struct BoundDevice {
    id: BindingId,
    info: CameraInfo,
    camera: Box<dyn Camera>,
    surface: Option<Arc<dyn PreviewSurface>>,
    frame_interval: Duration,
}

struct WorkerState {
    service: Arc<dyn CameraService>,
    metrics: Arc<MetricsRegistry>,
    bound: Option<BoundDevice>,
    next_binding: BindingId,
}

impl WorkerState {
    fn run(mut self, rx: mpsc::Receiver<Command>) {
        loop {
            let preview_interval = self
                .bound
                .as_ref()
                .filter(|device| device.surface.is_some())
                .map(|device| device.frame_interval);

            let command = match preview_interval {
                Some(interval) => match rx.recv_timeout(interval) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => {
                        self.pump_preview();
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match rx.recv() {
                    Ok(command) => command,
                    Err(_) => break,
                },
            };

            tracing::trace!(?command, "Camera worker command");
            match command {
                Command::Bind {
                    camera,
                    config,
                    surface,
                    reply,
                } => {
                    let result = self.bind(camera, &config, surface);
                    let _ = reply.send(result);
                }
                Command::UnbindAll => self.unbind(),
                Command::Capture {
                    binding,
                    target,
                    quality,
                    reply,
                } => {
                    let outcome = self.capture(binding, target, quality);
                    let _ = reply.send(outcome);
                }
                Command::Shutdown => break,
            }
        }

        self.unbind();
        tracing::debug!("Camera worker stopped");
    }

    fn bind(
        &mut self,
        info: CameraInfo,
        config: &CaptureConfig,
        surface: Option<Arc<dyn PreviewSurface>>,
    ) -> Result<BindingId, CameraError> {
        // A new binding always replaces the old one
        self.unbind();

        let mut camera = self.service.create(&info)?;
        camera.open(config)?;

        let id = self.next_binding;
        self.next_binding += 1;
        tracing::info!(
            binding = id,
            camera = %info.name,
            facing = %info.facing,
            "Camera bound"
        );
        self.metrics.set_camera_bound(true);
        self.bound = Some(BoundDevice {
            id,
            info,
            camera,
            surface,
            frame_interval: Duration::from_secs(1) / config.fps.max(1),
        });
        Ok(id)
    }

    fn unbind(&mut self) {
        if let Some(mut device) = self.bound.take() {
            device.camera.close();
            self.metrics.set_camera_bound(false);
            tracing::info!(binding = device.id, camera = %device.info.name, "Camera unbound");
        }
    }

    fn pump_preview(&mut self) {
        let Some(device) = self.bound.as_mut() else {
            return;
        };
        match device.camera.capture() {
            Ok(frame) => {
                if let Some(surface) = &device.surface {
                    surface.render(&frame);
                    self.metrics.record_preview_frame();
                }
            }
            Err(e) => tracing::debug!(error = %e, "Preview frame dropped"),
        }
    }

    fn capture(&mut self, binding: BindingId, target: PathBuf, quality: u8) -> CaptureOutcome {
        let device = match self.bound.as_mut() {
            Some(device) if device.id == binding => device,
            _ => return CaptureOutcome::failed("capture output is not bound to a camera"),
        };

        let frame = match device.camera.capture() {
            Ok(frame) => frame,
            Err(e) => return CaptureOutcome::failed(e.to_string()),
        };
        match write_jpeg(frame, &target, quality) {
            Ok(()) => CaptureOutcome::Saved { path: target },
            Err(e) => CaptureOutcome::failed(e.to_string()),
        }
    }
}
