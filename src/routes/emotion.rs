use std::convert::Infallible;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::StreamExt;

use crate::constants::FRAME_BOUNDARY;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::vision::frame_stream;

/// Mounted at `/emotion`.
pub fn feed_router() -> Router<AppState> {
    Router::new().route("/video-feed", get(video_feed))
}

/// Mounted at `/api/emotion`.
pub fn router() -> Router<AppState> {
    Router::new().route("/detections", get(list_detections))
}

async fn video_feed(State(state): State<AppState>) -> Result<Response, AppError> {
    let camera = state.camera().open().map_err(|e| {
        tracing::warn!(error = %e, "Camera could not be opened");
        AppError::service_unavailable("CAMERA_UNAVAILABLE", "Camera is not available")
    })?;
    tracing::info!("Video stream opened");

    let stream = frame_stream(state.frames().clone(), camera, state.shutdown_rx())
        .map(Ok::<_, Infallible>);

    Response::builder()
        .header(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={FRAME_BOUNDARY}"),
        )
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::internal(&e.to_string()))
}

async fn list_detections(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let events = state.records().list().await?;
    Ok(ok(events))
}
