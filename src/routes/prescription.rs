use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifyError, LabelProbability};
use crate::constants::{EMPTY_CONDITION_MESSAGE, EMPTY_SYMPTOMS_MESSAGE, NO_MEDICINE_MESSAGE};
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recommend", post(recommend))
        .route("/lookup", post(lookup))
}

#[derive(Debug, Deserialize)]
struct RecommendRequest {
    #[serde(default)]
    condition: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendResponse {
    condition: String,
    medicine: String,
    probabilities: Vec<LabelProbability>,
}

/// Medicine predicted by the sequence model for a condition description.
async fn recommend(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RecommendRequest>,
) -> Result<impl IntoResponse, AppError> {
    let prediction = state
        .medicine()
        .classify(&req.condition)
        .await
        .map_err(|e| match e {
            ClassifyError::EmptyInput => AppError::validation(EMPTY_CONDITION_MESSAGE),
            other => other.into(),
        })?;

    Ok(ok(RecommendResponse {
        condition: req.condition,
        medicine: prediction.label,
        probabilities: prediction.probabilities,
    }))
}

#[derive(Debug, Deserialize)]
struct LookupRequest {
    #[serde(default)]
    symptoms: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    condition: Option<String>,
    medicine: Option<String>,
    rating: Option<f64>,
    message: Option<String>,
}

/// Best-rated dataset drug for the first symptom that matches a condition.
async fn lookup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LookupRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.symptoms.iter().all(|s| s.trim().is_empty()) {
        return Err(AppError::validation(EMPTY_SYMPTOMS_MESSAGE));
    }

    let response = match state.dataset().get_best_medicine(&req.symptoms) {
        Some(found) => LookupResponse {
            condition: Some(found.condition),
            medicine: Some(found.drug_name),
            rating: Some(found.rating),
            message: None,
        },
        None => LookupResponse {
            condition: None,
            medicine: None,
            rating: None,
            message: Some(NO_MEDICINE_MESSAGE.to_string()),
        },
    };
    Ok(ok(response))
}
