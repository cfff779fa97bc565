// Trial Navigator - multi-stage LLM pipeline for clinical-trial lookup

pub mod config;
pub mod types;
pub mod llm;
pub mod trials;    // Trial dataset lookup and status chart
pub mod agents;
pub mod pipeline;
pub mod form;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use config::Config;
pub use form::PatientForm;
pub use pipeline::{EvaluationResult, Pipeline};
