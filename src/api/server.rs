use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use rust_embed::Embed;
use serde::Serialize;

use crate::analytics::{FrameCounts, Label, Phase};
use crate::storage::{CycleSnapshot, SnapshotStore};

#[derive(Embed)]
#[folder = "src/assets/"]
struct Assets;

#[derive(Clone)]
pub struct AppState {
    pub store: SnapshotStore,
    pub reset_requested: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(store: SnapshotStore, reset_requested: Arc<AtomicBool>) -> Self {
        Self {
            store,
            reset_requested,
        }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    phase: Option<Phase>,
    cycles_processed: u64,
    latest_sequence: Option<u64>,
    source_ended: bool,
}

#[derive(Debug, Serialize)]
struct DetectionItem {
    label: Label,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    area: f64,
}

#[derive(Debug, Serialize)]
struct CountsResponse {
    sequence: u64,
    phase: Phase,
    counts: FrameCounts,
    detections: Vec<DetectionItem>,
}

pub async fn start_server(state: AppState, port: u16) -> Result<(), std::io::Error> {
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/assets/{*path}", get(static_handler))
        .route("/api/status", get(status_handler))
        .route("/api/counts", get(counts_handler))
        .route("/api/frame.jpg", get(frame_handler))
        .route("/api/background/reset", post(reset_handler))
        .with_state(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    match Assets::get("index.html") {
        Some(content) => Html(content.data.to_vec()).into_response(),
        None => (StatusCode::NOT_FOUND, "index.html not found").into_response(),
    }
}

async fn static_handler(Path(path): Path<String>) -> impl IntoResponse {
    match Assets::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.to_vec(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.store.status();
    axum::Json(StatusResponse {
        phase: status.phase,
        cycles_processed: status.cycles_processed,
        latest_sequence: status.latest_sequence,
        source_ended: status.source_ended,
    })
}

async fn counts_handler(State(state): State<AppState>) -> Response {
    match state.store.latest() {
        Some(snapshot) => axum::Json(counts_response(&snapshot)).into_response(),
        None => (StatusCode::NOT_FOUND, "no cycle processed yet").into_response(),
    }
}

async fn frame_handler(State(state): State<AppState>) -> Response {
    match state.store.latest_frame() {
        Some(jpeg) => ([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response(),
        None => (StatusCode::NOT_FOUND, "no frame available").into_response(),
    }
}

async fn reset_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.reset_requested.store(true, Ordering::Relaxed);
    tracing::info!("background reset queued");
    (StatusCode::ACCEPTED, "background reset queued")
}

fn counts_response(snapshot: &CycleSnapshot) -> CountsResponse {
    CountsResponse {
        sequence: snapshot.sequence,
        phase: snapshot.report.phase,
        counts: snapshot.report.counts,
        detections: snapshot
            .report
            .classifications
            .iter()
            .map(|c| DetectionItem {
                label: c.label,
                x: c.bbox.x,
                y: c.bbox.y,
                width: c.bbox.width,
                height: c.bbox.height,
                area: c.area,
            })
            .collect(),
    }
}
