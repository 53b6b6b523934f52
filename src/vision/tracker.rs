//! Temporal stability tracking for the detection loop.
//!
//! A label becomes a confirmed detection once it has been observed without
//! interruption for the dwell duration. One session belongs to one video
//! stream; every face region of a frame feeds the same session.

use std::time::{Duration, Instant};

use super::types::Emotion;

#[derive(Debug, Clone)]
pub struct TrackingSession {
    dwell: Duration,
    previous_label: Option<Emotion>,
    label_start: Option<Instant>,
    total_detections: u64,
    confirmed_detections: u64,
}

/// Outcome of feeding one observation to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Label seen, nothing to report yet.
    Tracking,
    /// The label held for the dwell duration.
    Confirmed(Emotion),
}

impl TrackingSession {
    pub fn new(dwell: Duration) -> Self {
        Self {
            dwell,
            previous_label: None,
            label_start: None,
            total_detections: 0,
            confirmed_detections: 0,
        }
    }

    pub fn observe(&mut self, label: Emotion, now: Instant) -> Observation {
        self.total_detections += 1;

        if label.is_uncertain() {
            self.previous_label = None;
            self.label_start = None;
            return Observation::Tracking;
        }

        if self.previous_label != Some(label) {
            self.previous_label = Some(label);
            self.label_start = Some(now);
            return Observation::Tracking;
        }

        match self.label_start {
            None => {
                self.label_start = Some(now);
                Observation::Tracking
            }
            Some(start) if now.saturating_duration_since(start) >= self.dwell => {
                self.label_start = None;
                self.confirmed_detections += 1;
                Observation::Confirmed(label)
            }
            Some(_) => Observation::Tracking,
        }
    }

    pub fn total_detections(&self) -> u64 {
        self.total_detections
    }

    pub fn confirmed_detections(&self) -> u64 {
        self.confirmed_detections
    }

    pub fn previous_label(&self) -> Option<Emotion> {
        self.previous_label
    }

    pub fn is_timing(&self) -> bool {
        self.label_start.is_some()
    }
}
