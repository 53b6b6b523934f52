use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifyError, LabelProbability};
use crate::constants::{DEFAULT_HISTORY_LIMIT, EMPTY_TEXT_MESSAGE, MAX_HISTORY_LIMIT};
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::operations::sentiments::SentimentRecord;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(analyze))
        .route("/history", get(history))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    input_text: String,
    sentiment: String,
    probabilities: Vec<LabelProbability>,
}

async fn analyze(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AnalyzeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let prediction = state
        .sentiment()
        .classify(&req.text)
        .await
        .map_err(|e| match e {
            ClassifyError::EmptyInput => AppError::validation(EMPTY_TEXT_MESSAGE),
            other => other.into(),
        })?;

    let record = SentimentRecord::new(&req.text, &prediction.label, prediction.probabilities.clone());
    // 历史写入失败不影响本次结果
    if let Err(e) = state.store().create_sentiment(&record) {
        tracing::error!(error = %e, "Failed to save sentiment history");
    }

    Ok(ok(AnalyzeResponse {
        input_text: req.text,
        sentiment: prediction.label,
        probabilities: prediction.probabilities,
    }))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
    let records = state.store().list_recent_sentiments(limit)?;
    Ok(ok(records))
}
