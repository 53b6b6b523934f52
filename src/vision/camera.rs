use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;
use thiserror::Error;
use tokio::time::{Interval, MissedTickBehavior};

use crate::config::VisionConfig;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera source unavailable: {0}")]
    Unavailable(String),
}

/// A camera yields frames until a read fails; after that it is finished.
#[async_trait]
pub trait FrameSource: Send {
    async fn read(&mut self) -> Option<RgbImage>;
}

/// Opens a fresh camera for every video stream.
pub trait CameraProvider: Send + Sync {
    fn open(&self) -> Result<Box<dyn FrameSource>, CameraError>;
}

/// Tick period for `fps`, never below one millisecond.
fn frame_period(fps: u32) -> Duration {
    Duration::from_millis((1000 / u64::from(fps.max(1))).max(1))
}

/// Polls a still-image endpoint (IP cameras expose one) at a fixed rate.
pub struct SnapshotCamera {
    client: reqwest::Client,
    url: String,
    ticker: Interval,
}

impl SnapshotCamera {
    pub fn new(client: reqwest::Client, url: &str, fps: u32) -> Self {
        let mut ticker = tokio::time::interval(frame_period(fps));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            client,
            url: url.to_string(),
            ticker,
        }
    }
}

#[async_trait]
impl FrameSource for SnapshotCamera {
    async fn read(&mut self) -> Option<RgbImage> {
        self.ticker.tick().await;

        let response = match self.client.get(&self.url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!(status = r.status().as_u16(), "Snapshot camera returned error status");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Snapshot camera read failed");
                return None;
            }
        };
        let bytes = response.bytes().await.ok()?;
        decode(&bytes)
    }
}

/// Replays image files from a directory in name order.
pub struct DirectoryCamera {
    frames: std::vec::IntoIter<PathBuf>,
}

impl DirectoryCamera {
    pub fn open(dir: &Path) -> Result<Self, CameraError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Unavailable(format!("{}: {e}", dir.display())))?;
        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image_file(path))
            .collect();
        frames.sort();
        Ok(Self {
            frames: frames.into_iter(),
        })
    }
}

#[async_trait]
impl FrameSource for DirectoryCamera {
    async fn read(&mut self) -> Option<RgbImage> {
        let path = self.frames.next()?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => decode(&bytes),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Frame file unreadable");
                None
            }
        }
    }
}

fn decode(bytes: &[u8]) -> Option<RgbImage> {
    match image::load_from_memory(bytes) {
        Ok(img) => Some(img.to_rgb8()),
        Err(e) => {
            tracing::debug!(error = %e, "Frame decode failed");
            None
        }
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
        .unwrap_or(false)
}

/// Chooses a snapshot or directory camera from `CAMERA_SOURCE`.
pub struct ConfiguredCamera {
    source: String,
    fps: u32,
    client: reqwest::Client,
}

impl ConfiguredCamera {
    pub fn new(config: &VisionConfig, client: reqwest::Client) -> Self {
        Self {
            source: config.camera_source.clone(),
            fps: config.camera_fps,
            client,
        }
    }

    fn is_remote(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }
}

impl CameraProvider for ConfiguredCamera {
    fn open(&self) -> Result<Box<dyn FrameSource>, CameraError> {
        if self.is_remote() {
            Ok(Box::new(SnapshotCamera::new(
                self.client.clone(),
                &self.source,
                self.fps,
            )))
        } else {
            Ok(Box::new(DirectoryCamera::open(Path::new(&self.source))?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_frame(dir: &Path, name: &str) {
        let img = RgbImage::from_pixel(8, 6, image::Rgb([10, 20, 30]));
        img.save(dir.join(name)).unwrap();
    }

    #[tokio::test]
    async fn directory_camera_replays_in_order_then_stops() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_frame(tmp.path(), "002.png");
        write_frame(tmp.path(), "001.png");
        std::fs::write(tmp.path().join("notes.txt"), "skip me").unwrap();

        let mut cam = DirectoryCamera::open(tmp.path()).unwrap();
        let first = cam.read().await.unwrap();
        assert_eq!(first.dimensions(), (8, 6));
        assert!(cam.read().await.is_some());
        assert!(cam.read().await.is_none());
        assert!(cam.read().await.is_none());
    }

    #[test]
    fn frame_period_never_zero() {
        assert_eq!(frame_period(15), Duration::from_millis(66));
        assert_eq!(frame_period(0), Duration::from_millis(1000));
        assert_eq!(frame_period(5000), Duration::from_millis(1));
    }

    #[tokio::test]
    async fn snapshot_camera_accepts_high_fps() {
        let _cam = SnapshotCamera::new(reqwest::Client::new(), "http://127.0.0.1:9/snap", 5000);
    }

    #[tokio::test]
    async fn corrupt_frame_ends_reads() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("001.jpg"), b"not an image").unwrap();
        let mut cam = DirectoryCamera::open(tmp.path()).unwrap();
        assert!(cam.read().await.is_none());
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let config = VisionConfig {
            camera_source: "/definitely/not/here".to_string(),
            ..VisionConfig::default()
        };
        let provider = ConfiguredCamera::new(&config, reqwest::Client::new());
        assert!(provider.open().is_err());
    }

    #[tokio::test]
    async fn snapshot_camera_fails_when_unreachable() {
        let mut cam = SnapshotCamera::new(reqwest::Client::new(), "http://127.0.0.1:9/snap.jpg", 30);
        assert!(cam.read().await.is_none());
    }
}
