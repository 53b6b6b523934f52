pub mod doctor;
pub mod llm_provider;
