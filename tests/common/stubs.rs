use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use image::{GrayImage, Rgb, RgbImage};

use virtual_doctor::inference::{FaceDetector, ImageClassifier, InferenceError, SequenceClassifier};
use virtual_doctor::vision::camera::{CameraError, CameraProvider, FrameSource};
use virtual_doctor::vision::FaceRegion;

/// Always returns the same probability vector and counts calls.
pub struct FixedSequenceModel {
    pub probabilities: Vec<f32>,
    pub calls: AtomicUsize,
}

impl FixedSequenceModel {
    pub fn new(probabilities: Vec<f32>) -> Self {
        Self {
            probabilities,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SequenceClassifier for FixedSequenceModel {
    async fn predict_sequence(&self, ids: &[u32]) -> Result<Vec<f32>, InferenceError> {
        assert_eq!(ids.len(), 100);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.probabilities.clone())
    }
}

pub struct FailingSequenceModel;

#[async_trait]
impl SequenceClassifier for FailingSequenceModel {
    async fn predict_sequence(&self, _ids: &[u32]) -> Result<Vec<f32>, InferenceError> {
        Err(InferenceError::Status {
            status: 503,
            message: "model unavailable".to_string(),
        })
    }
}

/// One face in the middle of every frame.
pub struct CenterFaceDetector;

#[async_trait]
impl FaceDetector for CenterFaceDetector {
    async fn detect(&self, frame: &GrayImage) -> Result<Vec<FaceRegion>, InferenceError> {
        let (w, h) = frame.dimensions();
        Ok(vec![FaceRegion::new(
            i64::from(w / 4),
            i64::from(h / 4),
            i64::from(w / 2),
            i64::from(h / 2),
        )])
    }
}

/// Classifies every face as the given class with the given probability.
pub struct FixedExpressionModel {
    pub class: usize,
    pub probability: f32,
}

#[async_trait]
impl ImageClassifier for FixedExpressionModel {
    async fn predict_image(&self, pixels: &[f32], side: u32) -> Result<Vec<f32>, InferenceError> {
        assert_eq!(pixels.len(), (side * side) as usize);
        let mut row = vec![0.0; 12];
        row[self.class] = self.probability;
        Ok(row)
    }
}

/// Every stream gets a camera that yields `frames` frames and then fails.
pub struct FiniteCamera {
    pub frames: usize,
}

struct CountdownSource(usize);

#[async_trait]
impl FrameSource for CountdownSource {
    async fn read(&mut self) -> Option<RgbImage> {
        if self.0 == 0 {
            return None;
        }
        self.0 -= 1;
        Some(RgbImage::from_pixel(96, 72, Rgb([128, 100, 90])))
    }
}

impl CameraProvider for FiniteCamera {
    fn open(&self) -> Result<Box<dyn FrameSource>, CameraError> {
        Ok(Box::new(CountdownSource(self.frames)))
    }
}

pub struct MissingCamera;

impl CameraProvider for MissingCamera {
    fn open(&self) -> Result<Box<dyn FrameSource>, CameraError> {
        Err(CameraError::Unavailable("no device".to_string()))
    }
}
