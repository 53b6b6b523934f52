use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::LabelProbability;
use crate::store::keys;
use crate::store::{Store, StoreError};

/// One analysed text, as shown in the history view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentRecord {
    pub id: String,
    pub text_input: String,
    pub sentiment_result: String,
    pub probabilities: Vec<LabelProbability>,
    pub created_at: DateTime<Utc>,
}

impl SentimentRecord {
    pub fn new(text_input: &str, sentiment_result: &str, probabilities: Vec<LabelProbability>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text_input: text_input.to_string(),
            sentiment_result: sentiment_result.to_string(),
            probabilities,
            created_at: Utc::now(),
        }
    }
}

impl Store {
    pub fn create_sentiment(&self, record: &SentimentRecord) -> Result<(), StoreError> {
        let key = keys::sentiment_key(record.created_at.timestamp_millis(), &record.id);
        self.sentiment_history
            .insert(key.as_bytes(), Self::serialize(record)?)?;
        Ok(())
    }

    /// Newest first.
    pub fn list_recent_sentiments(&self, limit: usize) -> Result<Vec<SentimentRecord>, StoreError> {
        let mut records = Vec::new();
        for item in self.sentiment_history.iter() {
            if records.len() >= limit {
                break;
            }
            let (_, value) = item?;
            records.push(Self::deserialize::<SentimentRecord>(&value)?);
        }
        Ok(records)
    }

    pub fn count_sentiments(&self) -> usize {
        self.sentiment_history.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::tempdir;

    use super::*;

    fn record(text: &str, result: &str, offset_ms: i64) -> SentimentRecord {
        let mut r = SentimentRecord::new(
            text,
            result,
            vec![LabelProbability {
                label: result.to_string(),
                probability: 0.9,
            }],
        );
        r.created_at += Duration::milliseconds(offset_ms);
        r
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        store.create_sentiment(&record("first", "Neutral", 0)).unwrap();
        store.create_sentiment(&record("second", "Positive", 1_000)).unwrap();
        store.create_sentiment(&record("third", "Negative", 2_000)).unwrap();

        assert_eq!(store.count_sentiments(), 3);
        let recent = store.list_recent_sentiments(2).unwrap();
        let texts: Vec<&str> = recent.iter().map(|r| r.text_input.as_str()).collect();
        assert_eq!(texts, ["third", "second"]);
        assert_eq!(recent[0].probabilities[0].label, "Negative");
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        store.create_sentiment(&record("x", "Neutral", 0)).unwrap();
        assert!(store.list_recent_sentiments(0).unwrap().is_empty());
    }
}
