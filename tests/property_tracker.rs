use std::time::{Duration, Instant};

use proptest::prelude::*;

use virtual_doctor::vision::tracker::Observation;
use virtual_doctor::vision::{Emotion, TrackingSession};

const DWELL: Duration = Duration::from_secs(5);

fn label_strategy() -> impl Strategy<Value = Emotion> {
    prop_oneof![
        Just(Emotion::Happy),
        Just(Emotion::Sad),
        Just(Emotion::Neutral),
        Just(Emotion::Uncertain),
    ]
}

proptest! {
    #[test]
    fn pt_confirmation_needs_an_unbroken_run(
        steps in proptest::collection::vec((label_strategy(), 0_u64..3_000), 1..80)
    ) {
        let base = Instant::now();
        let mut session = TrackingSession::new(DWELL);
        let mut now = base;
        let mut history: Vec<(Emotion, Instant)> = Vec::new();
        let mut confirmed = 0_u64;

        for (label, gap_ms) in steps {
            now += Duration::from_millis(gap_ms);
            history.push((label, now));

            if let Observation::Confirmed(emitted) = session.observe(label, now) {
                confirmed += 1;
                prop_assert_eq!(emitted, label);
                prop_assert!(!emitted.is_uncertain());

                // 向前找到同一标签的连续区间起点
                let run_start = history
                    .iter()
                    .rev()
                    .take_while(|(l, _)| *l == label)
                    .last()
                    .map(|(_, t)| *t)
                    .unwrap();
                prop_assert!(now.duration_since(run_start) >= DWELL);
            }
        }

        prop_assert_eq!(session.total_detections(), history.len() as u64);
        prop_assert_eq!(session.confirmed_detections(), confirmed);
    }

    #[test]
    fn pt_steady_label_is_confirmed(seconds in 6_u64..30) {
        let base = Instant::now();
        let mut session = TrackingSession::new(DWELL);
        let mut events = 0;
        for s in 0..=seconds {
            if let Observation::Confirmed(_) = session.observe(Emotion::Sad, base + Duration::from_secs(s)) {
                events += 1;
            }
        }
        prop_assert!(events >= 1);
        // 每次确认后计时从下一次观测重新开始
        prop_assert!(events <= (seconds / 5) as usize);
    }
}
