//! Free text → label through a pretrained sequence model.
//!
//! Preprocessing mirrors the Keras pipeline the models were trained with:
//! a `Tokenizer` word index, `num_words` cut-off and `pad_sequences`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::inference::SequenceClassifier;

use super::ClassifyError;

/// Characters the Keras tokenizer treats as separators.
const KERAS_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid digits regex"))
}

fn punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"))
}

/// Lowercase, then drop digits and anything that is not a word character or
/// whitespace.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let no_digits = digits_re().replace_all(&lowered, "");
    punctuation_re().replace_all(&no_digits, "").into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    Pre,
    Post,
}

/// Pads with zeros to `maxlen`. Over-long sequences keep their tail.
pub fn pad_sequence(ids: &[u32], maxlen: usize, padding: Padding) -> Vec<u32> {
    let kept = &ids[ids.len().saturating_sub(maxlen)..];
    let fill = maxlen - kept.len();
    let mut out = Vec::with_capacity(maxlen);
    match padding {
        Padding::Pre => {
            out.extend(std::iter::repeat(0).take(fill));
            out.extend_from_slice(kept);
        }
        Padding::Post => {
            out.extend_from_slice(kept);
            out.extend(std::iter::repeat(0).take(fill));
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct Vocabulary {
    word_index: HashMap<String, u32>,
    num_words: Option<u32>,
    oov_index: Option<u32>,
}

impl Vocabulary {
    pub fn new(word_index: HashMap<String, u32>, num_words: Option<u32>) -> Self {
        Self {
            word_index,
            num_words,
            oov_index: None,
        }
    }

    /// Accepts a bare `{"word": index}` map or a Keras `tokenizer.to_json()`
    /// document. A `num_words` stored in the snapshot wins over `num_words`;
    /// an explicit `null` there means the tokenizer had no cap.
    pub fn from_json(raw: &str, num_words: Option<u32>) -> Result<Self, ClassifyError> {
        let doc: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| ClassifyError::Vocabulary(e.to_string()))?;

        let Some(config) = doc.get("config") else {
            let word_index: HashMap<String, u32> = serde_json::from_value(doc)
                .map_err(|e| ClassifyError::Vocabulary(e.to_string()))?;
            return Ok(Self::new(word_index, num_words));
        };

        let word_index: HashMap<String, u32> = match config.get("word_index") {
            Some(serde_json::Value::String(encoded)) => serde_json::from_str(encoded)
                .map_err(|e| ClassifyError::Vocabulary(e.to_string()))?,
            Some(value @ serde_json::Value::Object(_)) => serde_json::from_value(value.clone())
                .map_err(|e| ClassifyError::Vocabulary(e.to_string()))?,
            _ => return Err(ClassifyError::Vocabulary("missing config.word_index".into())),
        };

        let num_words = match config.get("num_words") {
            None => num_words,
            Some(serde_json::Value::Null) => None,
            Some(value) => Some(
                value
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| ClassifyError::Vocabulary(format!("bad num_words: {value}")))?,
            ),
        };
        let oov_index = config
            .get("oov_token")
            .and_then(|v| v.as_str())
            .and_then(|token| word_index.get(token).copied());

        Ok(Self {
            word_index,
            num_words,
            oov_index,
        })
    }

    pub fn load(path: impl AsRef<Path>, num_words: Option<u32>) -> Result<Self, ClassifyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ClassifyError::Vocabulary(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw, num_words)
    }

    pub fn len(&self) -> usize {
        self.word_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_index.is_empty()
    }

    pub fn texts_to_sequence(&self, text: &str) -> Vec<u32> {
        let lowered = text.to_lowercase();
        let split: String = lowered
            .chars()
            .map(|c| if KERAS_FILTERS.contains(c) { ' ' } else { c })
            .collect();

        split
            .split_whitespace()
            .filter_map(|word| match self.word_index.get(word) {
                Some(&i) if self.num_words.map_or(true, |n| i < n) => Some(i),
                _ => self.oov_index,
            })
            .collect()
    }
}

pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<String>, ClassifyError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ClassifyError::Labels(format!("{}: {e}", path.display())))?;
    let labels: Vec<String> =
        serde_json::from_str(&raw).map_err(|e| ClassifyError::Labels(e.to_string()))?;
    if labels.is_empty() {
        return Err(ClassifyError::Labels(format!("{} has no classes", path.display())));
    }
    Ok(labels)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPrediction {
    pub label: String,
    pub probabilities: Vec<LabelProbability>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelProbability {
    pub label: String,
    pub probability: f32,
}

pub struct TextClassifier {
    vocabulary: Vocabulary,
    labels: Vec<String>,
    model: Arc<dyn SequenceClassifier>,
    max_len: usize,
    padding: Padding,
}

impl TextClassifier {
    pub fn new(
        vocabulary: Vocabulary,
        labels: Vec<String>,
        model: Arc<dyn SequenceClassifier>,
        max_len: usize,
        padding: Padding,
    ) -> Self {
        Self {
            vocabulary,
            labels,
            model,
            max_len,
            padding,
        }
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u32>, ClassifyError> {
        if text.trim().is_empty() {
            return Err(ClassifyError::EmptyInput);
        }
        let normalized = normalize(text);
        if normalized.trim().is_empty() {
            return Err(ClassifyError::EmptyInput);
        }
        let ids = self.vocabulary.texts_to_sequence(&normalized);
        Ok(pad_sequence(&ids, self.max_len, self.padding))
    }

    pub async fn classify(&self, text: &str) -> Result<TextPrediction, ClassifyError> {
        let input = self.encode(text)?;
        let probabilities = self.model.predict_sequence(&input).await?;

        let best = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
            .map(|(i, _)| i)
            .ok_or(ClassifyError::UnknownClass(0))?;
        let label = self
            .labels
            .get(best)
            .cloned()
            .ok_or(ClassifyError::UnknownClass(best))?;

        let probabilities = self
            .labels
            .iter()
            .zip(probabilities.iter())
            .map(|(label, p)| LabelProbability {
                label: label.clone(),
                probability: *p,
            })
            .collect();

        tracing::debug!(%label, "Text classified");
        Ok(TextPrediction {
            label,
            probabilities,
        })
    }
}
