use serde::{Deserialize, Serialize};

use crate::pipeline::state::PipelineState;

/// An explanation must be longer than this many characters to count
pub const MIN_EXPLANATION_CHARS: usize = 10;

/// Health checklist for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub patient_parsed: bool,
    pub tool_used: bool,
    pub has_examples: bool,
    pub explanation_ok: bool,
}

impl ValidationResult {
    pub fn checks(&self) -> [(&'static str, bool); 4] {
        [
            ("patient_parsed", self.patient_parsed),
            ("tool_used", self.tool_used),
            ("has_examples", self.has_examples),
            ("explanation_ok", self.explanation_ok),
        ]
    }

    pub fn passed(&self) -> usize {
        self.checks().iter().filter(|(_, ok)| *ok).count()
    }
}

pub fn validate_state(state: &PipelineState) -> ValidationResult {
    ValidationResult {
        patient_parsed: state.patient_profile.is_some(),
        tool_used: state.tool_result.is_some(),
        has_examples: state
            .tool_result
            .as_ref()
            .is_some_and(|result| !result.examples.is_empty()),
        explanation_ok: state
            .explanation
            .as_ref()
            .is_some_and(|text| text.chars().count() > MIN_EXPLANATION_CHARS),
    }
}

/// Unweighted mean of the checks, in [0, 1]
pub fn compute_score(validation: &ValidationResult) -> f64 {
    let checks = validation.checks();
    validation.passed() as f64 / checks.len() as f64
}
