//! Drug review dataset: best-rated medicine lookup by condition.

pub mod tfidf;

use std::cmp::Ordering;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use tfidf::TfidfIndex;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset is missing the `{0}` column")]
    MissingColumn(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugReview {
    pub drug_name: String,
    pub condition: String,
    pub rating: f64,
}

/// A dataset row selected for a symptom.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub condition: String,
    pub drug_name: String,
    pub rating: f64,
}

impl From<&DrugReview> for Match {
    fn from(row: &DrugReview) -> Self {
        Self {
            condition: row.condition.clone(),
            drug_name: row.drug_name.clone(),
            rating: row.rating,
        }
    }
}

/// Rows sorted by rating, highest first. Equal ratings keep file order.
#[derive(Debug, Clone, Default)]
pub struct DrugDataset {
    rows: Vec<DrugReview>,
    conditions_lower: Vec<String>,
    index: TfidfIndex,
}

impl DrugDataset {
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dataset = Self::from_reader(file)?;
        tracing::info!(
            path = %path.display(),
            rows = dataset.len(),
            terms = dataset.index.vocabulary_len(),
            "Drug dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader.headers()?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or(DatasetError::MissingColumn(name))
        };
        let drug_col = column("drugName")?;
        let condition_col = column("condition")?;
        let rating_col = column("rating")?;

        let mut rows = Vec::new();
        let mut dropped = 0usize;
        for record in reader.records() {
            let record = record?;
            let field = |i: usize| record.get(i).map(str::trim).filter(|s| !s.is_empty());
            let parsed = match (field(drug_col), field(condition_col), field(rating_col)) {
                (Some(drug), Some(condition), Some(rating)) => rating
                    .parse::<f64>()
                    .ok()
                    .filter(|r| r.is_finite())
                    .map(|rating| DrugReview {
                        drug_name: drug.to_string(),
                        condition: condition.to_string(),
                        rating,
                    }),
                _ => None,
            };
            match parsed {
                Some(row) => rows.push(row),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "Dropped incomplete dataset rows");
        }

        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(mut rows: Vec<DrugReview>) -> Self {
        // sort_by 是稳定排序，同分保持原始顺序
        rows.sort_by(|a, b| b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal));
        let conditions_lower = rows.iter().map(|r| r.condition.to_lowercase()).collect();
        let index = TfidfIndex::fit(rows.iter().map(|r| r.condition.as_str()));
        Self {
            rows,
            conditions_lower,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[DrugReview] {
        &self.rows
    }

    /// Symptoms are tried in order; the first one contained in some condition
    /// (case-insensitive) yields the highest-rated row for it. Blank symptoms
    /// are skipped.
    pub fn get_best_medicine<S: AsRef<str>>(&self, symptoms: &[S]) -> Option<Match> {
        symptoms
            .iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .find_map(|needle| {
                self.conditions_lower
                    .iter()
                    .position(|cond| cond.contains(needle.as_str()))
            })
            .map(|i| Match::from(&self.rows[i]))
    }

    /// Drug name of the highest-rated row for `condition`.
    pub fn best_medicine_for(&self, condition: &str) -> Option<String> {
        self.get_best_medicine(&[condition]).map(|m| m.drug_name)
    }

    /// Dataset condition most similar to `text` under TF-IDF cosine
    /// similarity. `None` when nothing overlaps.
    pub fn find_condition(&self, text: &str) -> Option<String> {
        self.index
            .best_match(text)
            .map(|(condition, _)| condition.to_string())
    }
}
