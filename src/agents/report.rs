//! Report Agent
//!
//! Composes the final text report from what the earlier stages left in run
//! memory. LLMs tend to repeat themselves, so explanation lines are
//! deduplicated before they go into the report.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::agents::StageAgent;
use crate::pipeline::context::RunContext;
use crate::pipeline::state::{PatientProfile, PipelineState};
use crate::trials::{TrialSearchResult, MAX_EXAMPLES};
use crate::types::AppResult;

pub const REPORT_TITLE: &str = "Clinical Trials Navigator - Final Report";

pub struct ReportAgent;

/// Drop blank and repeated lines. Lines are trimmed; the first occurrence keeps its place.
pub fn dedup_lines(text: &str) -> String {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && seen.insert(*line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn underline(title: &str, ch: char) -> String {
    format!("{}\n{}", title, ch.to_string().repeat(title.chars().count()))
}

/// Render the report body. Missing inputs are shown as empty values.
pub fn build_report(
    profile: Option<&PatientProfile>,
    tool_result: Option<&TrialSearchResult>,
    explanation: &str,
    plot_path: &str,
) -> AppResult<String> {
    let profile_json = match profile {
        Some(p) => serde_json::to_string_pretty(p)?,
        None => "{}".to_string(),
    };
    let (condition, total, examples) = match tool_result {
        Some(r) => (r.condition.as_str(), r.total_trials, serde_json::to_value(&r.examples)?),
        None => ("", 0, Value::Array(vec![])),
    };
    let examples_json = serde_json::to_string_pretty(&examples)?;
    let examples_title = format!("Examples (first {})", MAX_EXAMPLES);

    Ok(format!(
        "{title}\n\n\
{profile_title}\n{profile_json}\n\n\
{results_title}\nCondition Searched: {condition}\nTotal Trials Found: {total}\n\n\
{examples_title}\n{examples_json}\n\n\
{explanation_title}\n{explanation}\n\n\
{plot_title}\n{plot_path}\n",
        title = underline(REPORT_TITLE, '='),
        profile_title = underline("Patient Profile", '-'),
        results_title = underline("Trial Results", '-'),
        examples_title = underline(&examples_title, '-'),
        explanation_title = underline("Explanation", '-'),
        plot_title = underline("Plot Saved At", '-'),
        explanation = dedup_lines(explanation),
    ))
}

#[async_trait]
impl StageAgent for ReportAgent {
    fn name(&self) -> &'static str {
        "report"
    }

    async fn run(&self, mut state: PipelineState, ctx: &RunContext) -> AppResult<PipelineState> {
        info!(run_id = %ctx.run_id(), "Running report agent");

        let memory = ctx.memory().snapshot().await;
        let report = build_report(
            memory.patient_profile.as_ref(),
            memory.tool_result.as_ref(),
            memory.explanation.as_deref().unwrap_or_default(),
            memory.status_plot_path.as_deref().unwrap_or_default(),
        )?;

        info!(run_id = %ctx.run_id(), report_len = report.len(), "Report composed");

        ctx.memory()
            .update(|memory| memory.final_report = Some(report.clone()))
            .await;
        state.final_report = Some(report);
        Ok(state)
    }
}

/// Summary row shown next to the report
pub fn trial_summary(result: &TrialSearchResult) -> Value {
    json!({
        "Condition": result.condition,
        "Total Trials": result.total_trials,
    })
}
