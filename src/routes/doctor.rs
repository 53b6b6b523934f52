use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

use crate::constants::EMPTY_SYMPTOMS_MESSAGE;
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::services::doctor;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/diagnose", post(diagnose))
        .route("/consult", post(consult))
}

#[derive(Debug, Deserialize)]
struct DiagnoseRequest {
    #[serde(default)]
    symptoms: String,
}

#[derive(Debug, Deserialize)]
struct ConsultRequest {
    #[serde(default)]
    text: String,
}

async fn diagnose(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<DiagnoseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let symptoms = req.symptoms.trim();
    if symptoms.is_empty() {
        return Err(AppError::validation(EMPTY_SYMPTOMS_MESSAGE));
    }
    let result = doctor::diagnose(state.llm(), state.dataset(), symptoms).await?;
    Ok(ok(result))
}

async fn consult(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ConsultRequest>,
) -> Result<impl IntoResponse, AppError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::validation(EMPTY_SYMPTOMS_MESSAGE));
    }
    let result = doctor::consult(state.llm(), state.dataset(), text).await?;
    Ok(ok(result))
}
