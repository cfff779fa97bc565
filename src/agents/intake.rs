//! Intake Agent
//!
//! Turns the caller's free-text patient description into a [`PatientProfile`].
//! An unparseable reply never fails the run: the default (empty) profile is
//! used instead and downstream validation reflects the degraded result.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::agents::StageAgent;
use crate::pipeline::context::RunContext;
use crate::pipeline::state::{PatientProfile, PipelineState};
use crate::types::AppResult;

#[derive(Debug, Error)]
pub enum ProfileParseError {
    #[error("empty response")]
    Empty,

    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

pub struct IntakeAgent;

impl IntakeAgent {
    fn create_prompt(user_text: &str) -> String {
        format!(
            r#"Extract patient info into JSON:

Text:
{user_text}

Return ONLY JSON with:
age, sex, condition, symptoms, comorbidities, location.
"#
        )
    }

    /// Parse an LLM reply into a profile. Tolerates a surrounding markdown code fence.
    pub fn parse_profile(response: &str) -> Result<PatientProfile, ProfileParseError> {
        let json_str = strip_code_fence(response);
        if json_str.is_empty() {
            return Err(ProfileParseError::Empty);
        }

        let value: Value = serde_json::from_str(json_str)?;
        let kind = match &value {
            Value::Object(_) => None,
            Value::Array(_) => Some("array"),
            Value::String(_) => Some("string"),
            Value::Number(_) => Some("number"),
            Value::Bool(_) => Some("boolean"),
            Value::Null => Some("null"),
        };
        if let Some(kind) = kind {
            return Err(ProfileParseError::NotAnObject(kind));
        }

        Ok(serde_json::from_value(value)?)
    }
}

fn strip_code_fence(response: &str) -> &str {
    if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
            .trim()
    } else if response.contains("```") {
        response.split("```").nth(1).unwrap_or(response).trim()
    } else {
        response.trim()
    }
}

#[async_trait]
impl StageAgent for IntakeAgent {
    fn name(&self) -> &'static str {
        "intake"
    }

    async fn run(&self, mut state: PipelineState, ctx: &RunContext) -> AppResult<PipelineState> {
        info!(run_id = %ctx.run_id(), input_len = state.input_text.len(), "Running intake agent");

        let response = ctx.generator().generate(&Self::create_prompt(&state.input_text)).await?;

        let profile = match Self::parse_profile(&response) {
            Ok(profile) => profile,
            Err(e) => {
                warn!(run_id = %ctx.run_id(), error = %e, "Could not parse patient profile, using empty profile");
                PatientProfile::default()
            }
        };

        info!(run_id = %ctx.run_id(), condition = %profile.condition, "Patient profile extracted");

        ctx.memory()
            .update(|memory| memory.patient_profile = Some(profile.clone()))
            .await;
        ctx.publish_profile(profile.clone());
        state.patient_profile = Some(profile);
        Ok(state)
    }
}
