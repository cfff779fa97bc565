use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::trials::TrialSearchResult;

/// Structured patient description extracted by the Intake stage.
///
/// Deserialization is lenient about the shapes an LLM tends to produce:
/// `"age": "60"`, `"symptoms": "cough, fever"`, explicit nulls and so on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    #[serde(default, deserialize_with = "lenient_age")]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub sex: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub condition: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub symptoms: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub comorbidities: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: String,
}

/// Everything a run has produced so far.
///
/// Stages only ever set fields; nothing is removed once written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub input_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_profile: Option<PatientProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<TrialSearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_plot_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_report: Option<String>,
}

impl PipelineState {
    pub fn new(input_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            ..Default::default()
        }
    }

    /// Overlay `other` on top of `self`: every field `other` has set wins.
    pub fn merge(self, other: PipelineState) -> PipelineState {
        PipelineState {
            input_text: if other.input_text.is_empty() {
                self.input_text
            } else {
                other.input_text
            },
            patient_profile: other.patient_profile.or(self.patient_profile),
            tool_result: other.tool_result.or(self.tool_result),
            status_plot_path: other.status_plot_path.or(self.status_plot_path),
            explanation: other.explanation.or(self.explanation),
            final_report: other.final_report.or(self.final_report),
        }
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Array(items) => {
            let joined = items.into_iter().filter_map(value_to_string).collect::<Vec<_>>().join(", ");
            Some(joined).filter(|s| !s.is_empty())
        }
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_string).unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_string))
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().filter_map(value_to_string).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        Some(other) => value_to_string(other).into_iter().collect(),
    })
}

fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|n| u32::try_from(n).ok()),
        // "60", "60 years", "60-year-old"
        Some(Value::String(s)) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    })
}
