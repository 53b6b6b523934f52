//! Seams to the pretrained models.
//!
//! The Keras artifacts are served out of process by a TF-Serving compatible
//! REST server; face detection is a separate HTTP endpoint wrapping the
//! cascade detector. Everything in the crate talks to them through the traits
//! below so tests can script predictions.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::{GrayImage, ImageFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::InferenceConfig;
use crate::vision::types::FaceRegion;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference network error: {0}")]
    Network(String),
    #[error("inference server returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected inference payload: {0}")]
    Payload(String),
    #[error("image encoding failed: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(value: reqwest::Error) -> Self {
        InferenceError::Network(value.to_string())
    }
}

#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, frame: &GrayImage) -> Result<Vec<FaceRegion>, InferenceError>;
}

/// Square single-channel image in, class probabilities out.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn predict_image(&self, pixels: &[f32], side: u32) -> Result<Vec<f32>, InferenceError>;
}

/// Padded token ids in, class probabilities out.
#[async_trait]
pub trait SequenceClassifier: Send + Sync {
    async fn predict_sequence(&self, ids: &[u32]) -> Result<Vec<f32>, InferenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    pub scale_factor: f64,
    pub min_neighbors: u32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.3,
            min_neighbors: 5,
        }
    }
}

pub fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[derive(Debug, Serialize)]
struct PredictRequest<T: Serialize> {
    instances: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Vec<f32>>,
}

/// A model hosted behind `POST {base}/v1/models/{name}:predict`.
#[derive(Debug, Clone)]
pub struct RemoteModel {
    client: reqwest::Client,
    endpoint: String,
    name: String,
}

impl RemoteModel {
    pub fn new(client: reqwest::Client, base_url: &str, name: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/v1/models/{}:predict", base_url.trim_end_matches('/'), name),
            name: name.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn predict<T: Serialize + Send + Sync>(&self, instance: T) -> Result<Vec<f32>, InferenceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PredictRequest {
                instances: vec![instance],
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(model = %self.name, status = status.as_u16(), "Model server rejected prediction");
            return Err(InferenceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Payload(e.to_string()))?;
        body.predictions
            .into_iter()
            .next()
            .filter(|row| !row.is_empty())
            .ok_or_else(|| InferenceError::Payload(format!("empty predictions from {}", self.name)))
    }
}

#[async_trait]
impl ImageClassifier for RemoteModel {
    async fn predict_image(&self, pixels: &[f32], side: u32) -> Result<Vec<f32>, InferenceError> {
        let side = side as usize;
        if pixels.len() != side * side {
            return Err(InferenceError::Payload(format!(
                "expected {} pixels, got {}",
                side * side,
                pixels.len()
            )));
        }
        // [side][side][1]
        let instance: Vec<Vec<[f32; 1]>> = pixels
            .chunks(side)
            .map(|row| row.iter().map(|p| [*p]).collect())
            .collect();
        self.predict(instance).await
    }
}

#[async_trait]
impl SequenceClassifier for RemoteModel {
    async fn predict_sequence(&self, ids: &[u32]) -> Result<Vec<f32>, InferenceError> {
        self.predict(ids.to_vec()).await
    }
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    faces: Vec<[i64; 4]>,
}

/// Cascade detector exposed over HTTP. The grayscale frame is posted as PNG.
#[derive(Debug, Clone)]
pub struct RemoteFaceDetector {
    client: reqwest::Client,
    url: String,
    params: DetectorParams,
}

impl RemoteFaceDetector {
    pub fn new(client: reqwest::Client, url: &str, params: DetectorParams) -> Self {
        Self {
            client,
            url: url.to_string(),
            params,
        }
    }
}

#[async_trait]
impl FaceDetector for RemoteFaceDetector {
    async fn detect(&self, frame: &GrayImage) -> Result<Vec<FaceRegion>, InferenceError> {
        let mut png = Vec::new();
        frame
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| InferenceError::Encode(e.to_string()))?;

        let response = self
            .client
            .post(&self.url)
            .query(&[
                ("scaleFactor", self.params.scale_factor.to_string()),
                ("minNeighbors", self.params.min_neighbors.to_string()),
            ])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(png)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: DetectResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Payload(e.to_string()))?;
        Ok(body
            .faces
            .into_iter()
            .map(|[x, y, w, h]| FaceRegion::new(x, y, w, h))
            .collect())
    }
}

/// Remote models wired from configuration.
pub struct RemoteModels {
    pub face_detector: RemoteFaceDetector,
    pub emotion: RemoteModel,
    pub sentiment: RemoteModel,
    pub medicine: RemoteModel,
}

impl RemoteModels {
    pub fn from_config(config: &InferenceConfig, params: DetectorParams) -> Self {
        let client = http_client(config.timeout_secs);
        let base = config.model_server_url.as_str();
        Self {
            face_detector: RemoteFaceDetector::new(client.clone(), &config.face_detector_url, params),
            emotion: RemoteModel::new(client.clone(), base, &config.emotion_model),
            sentiment: RemoteModel::new(client.clone(), base, &config.sentiment_model),
            medicine: RemoteModel::new(client, base, &config.medicine_model),
        }
    }
}
