use tracing_subscriber::EnvFilter;

mod actuator;
mod analytics;
mod api;
mod camera;
mod config;
mod storage;
mod tracking;

use actuator::ActuatorClient;
use analytics::SsdFaceDetector;
use api::AppState;
use config::Config;
use storage::FaceState;
use tracking::Tracker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("facetrack=debug".parse()?))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tracing::info!(
        stream = %config.camera.stream_url,
        actuator = %config.actuator.move_url,
        "configuration loaded"
    );

    let detector = SsdFaceDetector::new(
        &config.detector.model_path,
        config.detector.confidence_threshold,
    )?;
    let actuator = ActuatorClient::new(&config.actuator)?;
    let face_state = FaceState::new();

    let tracker = Tracker::new(
        config.camera.clone(),
        Box::new(detector),
        actuator,
        face_state.clone(),
    )?;
    let tracking = tracking::start(tracker);

    let app_state = AppState::new(face_state, &config.camera.stream_url, tracking.liveness());

    tokio::select! {
        result = api::start_server(app_state, config.http.port) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracking.shutdown().await;
    tracing::info!("shutdown complete");

    Ok(())
}
