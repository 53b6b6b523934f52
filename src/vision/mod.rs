//! Emotion detection over a camera feed.
//!
//! - `types`: emotion labels, face regions, detection events
//! - `tracker`: per-stream dwell tracking
//! - `camera`: frame sources
//! - `annotate`: overlay drawing and JPEG/multipart framing
//! - `pipeline`: the per-frame loop and the frame stream

pub mod annotate;
pub mod camera;
pub mod pipeline;
pub mod tracker;
pub mod types;

pub use pipeline::{frame_stream, FrameProcessor};
pub use tracker::TrackingSession;
pub use types::{DetectionEvent, Emotion, FaceRegion};
