use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::actuator::ActuatorClient;
use crate::analytics::{compute_offset, FaceDetector};
use crate::camera::{CameraError, ConnectionBudget, Frame, MjpegStream};
use crate::config::CameraConfig;
use crate::storage::FaceState;

struct ConnectionSummary {
    frames: u32,
    elapsed: Duration,
}

/// The acquisition → detection → actuation loop for one camera.
pub struct Tracker {
    camera: CameraConfig,
    http: reqwest::Client,
    detector: Arc<Mutex<Box<dyn FaceDetector>>>,
    actuator: ActuatorClient,
    state: FaceState,
}

impl Tracker {
    pub fn new(
        camera: CameraConfig,
        detector: Box<dyn FaceDetector>,
        actuator: ActuatorClient,
        state: FaceState,
    ) -> Result<Self, CameraError> {
        // No overall timeout: the body is an endless stream.
        let http = reqwest::Client::builder()
            .connect_timeout(camera.connect_timeout())
            .read_timeout(camera.connect_timeout())
            .build()?;

        Ok(Self {
            camera,
            http,
            detector: Arc::new(Mutex::new(detector)),
            actuator,
            state,
        })
    }

    fn budget(&self) -> ConnectionBudget {
        ConnectionBudget {
            max_frames: self.camera.max_frames_per_connection,
            max_duration: self.camera.max_connection_duration(),
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let url = self.camera.stream_url.clone();
        tracing::info!(url = %url, "tracking started");

        loop {
            let outcome = tokio::select! {
                outcome = self.run_connection() => outcome,
                _ = wait_for_shutdown(&mut shutdown) => break,
            };

            let backoff = match outcome {
                Ok(summary) if summary.frames == 0 => {
                    tracing::warn!(url = %url, "camera stream closed without frames");
                    true
                }
                Ok(summary) => {
                    tracing::debug!(
                        frames = summary.frames,
                        elapsed_ms = summary.elapsed.as_millis() as u64,
                        "connection cycle finished, reconnecting"
                    );
                    false
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "camera stream unavailable");
                    true
                }
            };

            if backoff {
                let delay = self.camera.reconnect_backoff();
                tracing::debug!(delay_ms = delay.as_millis() as u64, "waiting before reconnect");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = wait_for_shutdown(&mut shutdown) => break,
                }
            }
        }

        tracing::info!(url = %url, "tracking stopped");
    }

    /// One connection cycle. The response is dropped, closing the
    /// connection, on every return path.
    async fn run_connection(&self) -> Result<ConnectionSummary, CameraError> {
        let mut stream =
            MjpegStream::connect(&self.http, &self.camera.stream_url, self.budget()).await?;
        tracing::debug!(url = %self.camera.stream_url, "camera stream connected");

        while let Some(frame) = stream.next_frame().await? {
            self.process_frame(frame).await;
        }

        Ok(ConnectionSummary {
            frames: stream.frames_yielded(),
            elapsed: stream.elapsed(),
        })
    }

    async fn process_frame(&self, frame: Frame) {
        let (width, height) = (frame.width(), frame.height());

        let detector = Arc::clone(&self.detector);
        let result = tokio::task::spawn_blocking(move || {
            let mut detector = detector.lock().unwrap_or_else(PoisonError::into_inner);
            detector.detect(&frame)
        })
        .await;

        let detection = match result {
            Ok(Ok(detection)) => detection,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "face detection failed");
                None
            }
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                tracing::warn!(error = %e, "face detection task cancelled");
                None
            }
        };

        let Some(detection) = detection else {
            self.state.set(None);
            return;
        };

        let offset = compute_offset(&detection, width, height);
        tracing::debug!(
            confidence = format!("{:.2}", detection.confidence),
            dx = format!("{:.2}", offset.dx),
            dy = format!("{:.2}", offset.dy),
            "face detected"
        );
        self.state.set(Some(offset));

        // Failures are logged by the client; the frame is done either way.
        let _ = self.actuator.send_move(&offset).await;
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        // Sender gone without a stop request: keep running for the process lifetime.
        std::future::pending::<()>().await;
    }
}

/// Whether the tracking task is still alive. Cleared when the loop returns
/// and when it unwinds from a panic.
#[derive(Debug, Clone, Default)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn set(&self, running: bool) {
        self.0.store(running, Ordering::SeqCst);
    }
}

struct RunningGuard(Liveness);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Owner's side of a running tracker.
pub struct TrackingHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    liveness: Liveness,
}

impl TrackingHandle {
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    /// Ask the loop to stop and wait for it. Any open camera connection is
    /// closed before this returns.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "tracking task failed");
        }
    }
}

/// Spawn the tracking loop on the current runtime. Each call starts a new
/// loop; the host is expected to call this once.
pub fn start(tracker: Tracker) -> TrackingHandle {
    let (shutdown, rx) = watch::channel(false);
    let liveness = Liveness::default();
    liveness.set(true);

    let guard = RunningGuard(liveness.clone());
    let task = tokio::spawn(async move {
        let _guard = guard;
        tracker.run(rx).await;
    });

    TrackingHandle {
        shutdown,
        task,
        liveness,
    }
}
