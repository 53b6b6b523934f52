use std::fmt;

use serde::{Deserialize, Serialize};

/// Expression categories produced by the 12-class model, plus the
/// low-confidence sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
    Confused,
    Tired,
    Bored,
    Excited,
    Content,
    Uncertain,
}

impl Emotion {
    /// Model output order.
    pub const CLASSES: [Emotion; 12] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
        Emotion::Confused,
        Emotion::Tired,
        Emotion::Bored,
        Emotion::Excited,
        Emotion::Content,
    ];

    pub fn from_class_index(index: usize) -> Option<Self> {
        Self::CLASSES.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "Angry",
            Emotion::Disgust => "Disgust",
            Emotion::Fear => "Fear",
            Emotion::Happy => "Happy",
            Emotion::Sad => "Sad",
            Emotion::Surprise => "Surprise",
            Emotion::Neutral => "Neutral",
            Emotion::Confused => "Confused",
            Emotion::Tired => "Tired",
            Emotion::Bored => "Bored",
            Emotion::Excited => "Excited",
            Emotion::Content => "Content",
            Emotion::Uncertain => "Uncertain",
        }
    }

    pub fn is_uncertain(&self) -> bool {
        matches!(self, Emotion::Uncertain)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Face rectangle in frame pixel coordinates, as reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl FaceRegion {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersect with a `frame_w × frame_h` frame. Returns `(x, y, w, h)`
    /// or `None` when nothing of the region is inside the frame.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = (self.x + self.width).min(frame_w as i64);
        let y1 = (self.y + self.height).min(frame_h as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

/// One classified face within a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: Emotion,
    /// Arg-max probability in percent.
    pub confidence: f32,
}

impl Classification {
    /// Arg-max over the probability vector; below `threshold` percent the
    /// label collapses to `Uncertain`.
    pub fn from_probabilities(probabilities: &[f32], threshold: f32) -> Option<Self> {
        let (index, max) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })?;
        let label = Emotion::from_class_index(index)?;
        let confidence = max * 100.0;
        let label = if confidence < threshold {
            Emotion::Uncertain
        } else {
            label
        };
        Some(Self { label, confidence })
    }
}

/// A confirmed detection persisted to the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub emotion: Emotion,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: f32,
}

impl DetectionEvent {
    pub fn same_key(&self, other: &DetectionEvent) -> bool {
        self.emotion == other.emotion && self.timestamp == other.timestamp
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn class_indices_follow_model_order() {
        assert_eq!(Emotion::from_class_index(0), Some(Emotion::Angry));
        assert_eq!(Emotion::from_class_index(3), Some(Emotion::Happy));
        assert_eq!(Emotion::from_class_index(11), Some(Emotion::Content));
        assert_eq!(Emotion::from_class_index(12), None);
    }

    #[test]
    fn argmax_picks_highest_probability() {
        let mut probs = vec![0.01_f32; 12];
        probs[4] = 0.89;
        let c = Classification::from_probabilities(&probs, 40.0).unwrap();
        assert_eq!(c.label, Emotion::Sad);
        assert!((c.confidence - 89.0).abs() < 1e-3);
    }

    #[test]
    fn low_confidence_becomes_uncertain() {
        let mut probs = vec![0.05_f32; 12];
        probs[3] = 0.39;
        let c = Classification::from_probabilities(&probs, 40.0).unwrap();
        assert_eq!(c.label, Emotion::Uncertain);
        assert!((c.confidence - 39.0).abs() < 1e-3);
    }

    #[test]
    fn confidence_at_threshold_keeps_label() {
        let mut probs = vec![0.05_f32; 12];
        probs[4] = 0.4;
        let c = Classification::from_probabilities(&probs, 40.0).unwrap();
        assert_eq!(c.label, Emotion::Sad);
        assert_eq!(c.confidence, 40.0);
    }

    proptest! {
        #[test]
        fn pt_below_threshold_is_always_uncertain(
            probs in proptest::collection::vec(0.0_f32..1.0, 1..=12)
        ) {
            let c = Classification::from_probabilities(&probs, 40.0).unwrap();
            let max = probs.iter().copied().fold(f32::MIN, f32::max);
            let first_max = probs.iter().position(|&p| p == max).unwrap();
            if max * 100.0 < 40.0 {
                prop_assert_eq!(c.label, Emotion::Uncertain);
            } else {
                prop_assert_eq!(Some(c.label), Emotion::from_class_index(first_max));
            }
        }
    }

    #[test]
    fn ties_resolve_to_first_class() {
        let probs = vec![0.5_f32, 0.5];
        let c = Classification::from_probabilities(&probs, 40.0).unwrap();
        assert_eq!(c.label, Emotion::Angry);
    }

    #[test]
    fn empty_probabilities_yield_nothing() {
        assert!(Classification::from_probabilities(&[], 40.0).is_none());
    }

    #[test]
    fn region_is_clamped_to_frame() {
        let region = FaceRegion::new(-10, 5, 50, 200);
        assert_eq!(region.clamp_to(100, 100), Some((0, 5, 40, 95)));
        assert_eq!(FaceRegion::new(120, 0, 10, 10).clamp_to(100, 100), None);
    }

    #[test]
    fn event_without_confidence_still_parses() {
        let raw = r#"{"emotion":"Happy","timestamp":"2024-01-01 10:00:00"}"#;
        let event: DetectionEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.emotion, Emotion::Happy);
        assert_eq!(event.confidence, 0.0);
    }
}
