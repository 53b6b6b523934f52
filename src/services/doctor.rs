use serde::Serialize;

use crate::constants::{NO_CONDITION_MESSAGE, NO_MEDICINE_MESSAGE};
use crate::dataset::DrugDataset;

use super::llm_provider::{LlmError, LlmProvider};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub predicted_disease: String,
    pub condition: Option<String>,
    pub medicine: Option<String>,
    pub advice: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub condition: Option<String>,
    pub medicine: Option<String>,
    pub advice: Option<String>,
    pub message: String,
}

fn recommendation_message(condition: &str, medicine: &str) -> String {
    format!("The best-rated medicine for {condition} is: {medicine}")
}

/// Symptoms → LLM diagnosis → best-rated drug for the diagnosis → LLM advice.
pub async fn diagnose(
    llm: &LlmProvider,
    dataset: &DrugDataset,
    symptoms: &str,
) -> Result<Diagnosis, LlmError> {
    let predicted_disease = llm.diagnose(symptoms).await?;

    let Some(found) = dataset.get_best_medicine(&[predicted_disease.as_str()]) else {
        tracing::info!("No dataset condition matched the diagnosis");
        return Ok(Diagnosis {
            predicted_disease,
            condition: None,
            medicine: None,
            advice: None,
            message: NO_MEDICINE_MESSAGE.to_string(),
        });
    };

    let advice = llm.advise(&found.drug_name).await?;
    Ok(Diagnosis {
        predicted_disease,
        message: recommendation_message(&found.condition, &found.drug_name),
        condition: Some(found.condition),
        medicine: Some(found.drug_name),
        advice: Some(advice),
    })
}

/// Text → closest dataset condition → best-rated drug → LLM advice.
pub async fn consult(
    llm: &LlmProvider,
    dataset: &DrugDataset,
    text: &str,
) -> Result<Consultation, LlmError> {
    let Some(condition) = dataset.find_condition(text) else {
        return Ok(Consultation {
            condition: None,
            medicine: None,
            advice: None,
            message: NO_CONDITION_MESSAGE.to_string(),
        });
    };

    let Some(medicine) = dataset.best_medicine_for(&condition) else {
        return Ok(Consultation {
            condition: Some(condition),
            medicine: None,
            advice: None,
            message: NO_MEDICINE_MESSAGE.to_string(),
        });
    };

    let advice = llm.advise(&medicine).await?;
    Ok(Consultation {
        message: recommendation_message(&condition, &medicine),
        condition: Some(condition),
        medicine: Some(medicine),
        advice: Some(advice),
    })
}
