use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::constants::EMPTY_MESSAGE_MESSAGE;
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(chat))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
}

async fn chat(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::validation(EMPTY_MESSAGE_MESSAGE));
    }
    let reply = state.llm().converse(message).await?;
    Ok(ok(ChatResponse { reply }))
}
