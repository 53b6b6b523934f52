use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::VisionConfig;
use crate::constants::{EVENT_TIMESTAMP_FORMAT, FACE_INPUT_SIZE};
use crate::inference::{FaceDetector, ImageClassifier, InferenceError};
use crate::records::RecordStore;

use super::annotate::{encode_jpeg, multipart_part, AnnotateError, Annotator};
use super::camera::FrameSource;
use super::tracker::{Observation, TrackingSession};
use super::types::{Classification, DetectionEvent};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Annotate(#[from] AnnotateError),
}

/// Runs one frame through detect → classify → track → annotate → encode.
pub struct FrameProcessor {
    detector: Arc<dyn FaceDetector>,
    classifier: Arc<dyn ImageClassifier>,
    records: Arc<RecordStore>,
    annotator: Annotator,
    threshold: f32,
    dwell: Duration,
}

impl FrameProcessor {
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        classifier: Arc<dyn ImageClassifier>,
        records: Arc<RecordStore>,
        annotator: Annotator,
        config: &VisionConfig,
    ) -> Self {
        Self {
            detector,
            classifier,
            records,
            annotator,
            threshold: config.probability_threshold,
            dwell: Duration::from_secs(config.dwell_secs),
        }
    }

    pub fn new_session(&self) -> TrackingSession {
        TrackingSession::new(self.dwell)
    }

    pub async fn process(
        &self,
        frame: RgbImage,
        session: &mut TrackingSession,
    ) -> Result<Bytes, FrameError> {
        self.process_at(frame, session, Instant::now()).await
    }

    pub async fn process_at(
        &self,
        mut frame: RgbImage,
        session: &mut TrackingSession,
        now: Instant,
    ) -> Result<Bytes, FrameError> {
        let gray = imageops::grayscale(&frame);
        let faces = self.detector.detect(&gray).await?;
        let (width, height) = gray.dimensions();

        for face in faces {
            let Some(rect) = face.clamp_to(width, height) else {
                tracing::debug!(?face, "Face region outside frame, skipped");
                continue;
            };

            let pixels = preprocess_face(&gray, rect);
            let probabilities = self
                .classifier
                .predict_image(&pixels, FACE_INPUT_SIZE)
                .await?;
            let result = Classification::from_probabilities(&probabilities, self.threshold)
                .ok_or_else(|| {
                    InferenceError::Payload(format!(
                        "expression model returned {} classes",
                        probabilities.len()
                    ))
                })?;

            self.annotator.draw_face(&mut frame, rect, &result);

            if let Observation::Confirmed(label) = session.observe(result.label, now) {
                let event = DetectionEvent {
                    emotion: label,
                    timestamp: chrono::Local::now().format(EVENT_TIMESTAMP_FORMAT).to_string(),
                    confidence: result.confidence,
                };
                if let Err(e) = self.records.append_if_absent(&event).await {
                    tracing::error!(error = %e, "Failed to persist detection");
                }
            }
        }

        self.annotator.draw_overlay(
            &mut frame,
            session.total_detections(),
            session.confirmed_detections(),
        );

        let jpeg = encode_jpeg(&frame)?;
        Ok(multipart_part(&jpeg))
    }
}

/// Crop, resize to the model's input square and scale intensities to `[0, 1]`.
pub fn preprocess_face(gray: &GrayImage, rect: (u32, u32, u32, u32)) -> Vec<f32> {
    let (x, y, w, h) = rect;
    let crop = imageops::crop_imm(gray, x, y, w, h).to_image();
    let resized = imageops::resize(&crop, FACE_INPUT_SIZE, FACE_INPUT_SIZE, FilterType::Triangle);
    resized.pixels().map(|p| p.0[0] as f32 / 255.0).collect()
}

/// Encoded frames, one per camera read, until the camera fails, a frame
/// cannot be processed, or the server shuts down.
pub fn frame_stream(
    processor: Arc<FrameProcessor>,
    mut camera: Box<dyn FrameSource>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> impl Stream<Item = Bytes> {
    async_stream::stream! {
        let mut session = processor.new_session();
        let mut frames: u64 = 0;

        loop {
            let frame = tokio::select! {
                frame = camera.read() => frame,
                _ = shutdown_rx.recv() => {
                    tracing::info!(frames, "Video stream closed by shutdown");
                    break;
                }
            };

            let Some(frame) = frame else {
                tracing::info!(frames, "Camera read failed, ending video stream");
                break;
            };

            match processor.process(frame, &mut session).await {
                Ok(part) => {
                    frames += 1;
                    yield part;
                }
                Err(e) => {
                    tracing::warn!(error = %e, frames, "Frame processing failed, ending video stream");
                    break;
                }
            }
        }
    }
}
