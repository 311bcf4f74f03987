use std::sync::Arc;
use std::time::UNIX_EPOCH;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::analytics::FaceOffset;
use crate::storage::FaceState;
use crate::tracking::Liveness;

#[derive(Clone)]
pub struct AppState {
    pub face_state: FaceState,
    pub stream_url: Arc<str>,
    pub tracker: Liveness,
}

impl AppState {
    pub fn new(face_state: FaceState, stream_url: &str, tracker: Liveness) -> Self {
        Self {
            face_state,
            stream_url: Arc::from(stream_url),
            tracker,
        }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    message: &'static str,
}

#[derive(Serialize)]
struct FaceResponse {
    face: Option<FaceOffset>,
    updated_at_ms: Option<u64>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/status", get(status_handler))
        .route("/api/face", get(face_handler))
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> Result<(), std::io::Error> {
    let app = router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let url = escape_html(&state.stream_url);
    let face = match state.face_state.current_face() {
        Some(offset) => format!("dx={:.1}% dy={:.1}%", offset.dx, offset.dy),
        None => "no face".to_string(),
    };
    Html(format!(
        "<!doctype html>\n\
         <html><head><title>facetrack</title></head>\n\
         <body><h1>Face tracker</h1><img src=\"{url}\" alt=\"camera stream\">\n\
         <p id=\"face\">{face}</p></body></html>\n"
    ))
}

async fn status_handler(State(state): State<AppState>) -> (StatusCode, Json<StatusResponse>) {
    if state.tracker.is_running() {
        let body = StatusResponse {
            status: "OK",
            message: "Tracker is running",
        };
        (StatusCode::OK, Json(body))
    } else {
        let body = StatusResponse {
            status: "ERROR",
            message: "Tracker is not running",
        };
        (StatusCode::SERVICE_UNAVAILABLE, Json(body))
    }
}

async fn face_handler(State(state): State<AppState>) -> Json<FaceResponse> {
    let snapshot = state.face_state.snapshot();
    let updated_at_ms = snapshot
        .updated_at
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64);

    Json(FaceResponse {
        face: snapshot.face,
        updated_at_ms,
    })
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
