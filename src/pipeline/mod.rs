//! Pipeline Orchestrator
//!
//! Runs one evaluation: Intake and Retrieval concurrently, then Explain, then
//! Report, then validation and scoring. Every run gets its own [`RunContext`],
//! so nothing leaks between runs.

pub mod context;
pub mod state;
pub mod validation;

pub use context::{RunContext, Services, SharedMemory};
pub use state::{PatientProfile, PipelineState};
pub use validation::{compute_score, validate_state, ValidationResult};

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::{error, info};
use uuid::Uuid;

use crate::agents::{ExplainAgent, IntakeAgent, ReportAgent, RetrievalAgent, StageAgent};
use crate::config::PipelineConfig;
use crate::llm::TextGenerator;
use crate::trials::{chart_path, ChartRenderer, PlottersChartRenderer, TrialCatalog};
use crate::types::AppResult;

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Wall-clock time per phase, serialized as seconds
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PhaseTimings {
    #[serde(serialize_with = "as_secs")]
    pub parallel: Duration,
    #[serde(serialize_with = "as_secs")]
    pub explain: Duration,
    #[serde(serialize_with = "as_secs")]
    pub report: Duration,
    #[serde(serialize_with = "as_secs")]
    pub total: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub state: PipelineState,
    pub validation: ValidationResult,
    pub score: f64,
    pub timings: PhaseTimings,
}

impl EvaluationResult {
    pub fn score_percent(&self) -> f64 {
        self.score * 100.0
    }
}

pub struct Pipeline {
    services: Services,
    config: PipelineConfig,
    intake: IntakeAgent,
    retrieval: RetrievalAgent,
    explain: ExplainAgent,
    report: ReportAgent,
}

impl Pipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, catalog: Arc<TrialCatalog>, config: PipelineConfig) -> Self {
        Self {
            services: Services {
                generator,
                catalog,
                charts: Arc::new(PlottersChartRenderer::default()),
            },
            config,
            intake: IntakeAgent,
            retrieval: RetrievalAgent,
            explain: ExplainAgent,
            report: ReportAgent,
        }
    }

    pub fn with_chart_renderer(mut self, charts: Arc<dyn ChartRenderer>) -> Self {
        self.services.charts = charts;
        self
    }

    /// Run all four stages on one patient description.
    ///
    /// Returns an error, and no partial result, if any stage fails.
    pub async fn evaluate(&self, input_text: &str) -> AppResult<EvaluationResult> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start_all = Instant::now();

        let ctx = RunContext::new(
            run_id,
            self.services.clone(),
            self.config.retrieval_sync,
            chart_path(&self.config.output_dir, self.config.chart_mode, run_id),
        );
        let state = PipelineState::new(input_text);

        info!(run_id = %run_id, input_len = input_text.len(), "Agent evaluation started");

        let t0 = Instant::now();
        let state = self.run_parallel(state, &ctx).await?;
        let parallel = t0.elapsed();
        info!(run_id = %run_id, elapsed_ms = parallel.as_millis() as u64, "Parallel phase finished");

        let t0 = Instant::now();
        let state = self.run_stage(&self.explain, state, &ctx).await?;
        let explain = t0.elapsed();
        info!(run_id = %run_id, elapsed_ms = explain.as_millis() as u64, "Explain phase finished");

        let t0 = Instant::now();
        let state = self.run_stage(&self.report, state, &ctx).await?;
        let report = t0.elapsed();
        info!(run_id = %run_id, elapsed_ms = report.as_millis() as u64, "Report phase finished");

        let timings = PhaseTimings {
            parallel,
            explain,
            report,
            total: start_all.elapsed(),
        };

        let validation = validate_state(&state);
        let score = compute_score(&validation);

        info!(
            run_id = %run_id,
            score = score,
            checks_passed = validation.passed(),
            total_ms = timings.total.as_millis() as u64,
            "Agent evaluation complete"
        );

        Ok(EvaluationResult {
            run_id,
            started_at,
            state,
            validation,
            score,
            timings,
        })
    }

    /// Intake and Retrieval side by side; Retrieval's fields are applied last.
    async fn run_parallel(&self, state: PipelineState, ctx: &RunContext) -> AppResult<PipelineState> {
        let (from_intake, from_retrieval) = futures::future::try_join(
            self.run_stage(&self.intake, state.clone(), ctx),
            self.run_stage(&self.retrieval, state.clone(), ctx),
        )
        .await?;

        Ok(state.merge(from_intake).merge(from_retrieval))
    }

    async fn run_stage(
        &self,
        stage: &dyn StageAgent,
        state: PipelineState,
        ctx: &RunContext,
    ) -> AppResult<PipelineState> {
        stage.run(state, ctx).await.map_err(|e| {
            error!(run_id = %ctx.run_id(), stage = stage.name(), error = %e, "Stage failed");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChartPathMode, RetrievalSync};
    use crate::test_support::{
        catalog_without_covid, sample_catalog, RecordingChartRenderer, ScriptedGenerator, COVID_PATIENT_TEXT,
        COVID_PROFILE_JSON,
    };
    use crate::types::AppError;
    use std::path::PathBuf;

    const EXPLANATION: &str = "There are several COVID-19 trials recruiting.\n\
There are several COVID-19 trials recruiting.\n\
Talk to your doctor before enrolling.";

    fn config(chart_mode: ChartPathMode, retrieval_sync: RetrievalSync) -> PipelineConfig {
        PipelineConfig {
            output_dir: PathBuf::from("test-artifacts"),
            chart_mode,
            retrieval_sync,
        }
    }

    fn pipeline(
        generator: ScriptedGenerator,
        catalog: TrialCatalog,
        config: PipelineConfig,
    ) -> (Pipeline, Arc<RecordingChartRenderer>) {
        let charts = Arc::new(RecordingChartRenderer::default());
        let pipeline = Pipeline::new(Arc::new(generator), Arc::new(catalog), config).with_chart_renderer(charts.clone());
        (pipeline, charts)
    }

    fn default_config() -> PipelineConfig {
        config(ChartPathMode::PerRun, RetrievalSync::Handoff)
    }

    #[tokio::test]
    async fn test_covid_scenario_end_to_end() {
        let (pipeline, charts) = pipeline(
            ScriptedGenerator::new(COVID_PROFILE_JSON, EXPLANATION),
            sample_catalog(),
            default_config(),
        );

        let result = pipeline.evaluate(COVID_PATIENT_TEXT).await.unwrap();
        let state = &result.state;

        let tool_result = state.tool_result.as_ref().unwrap();
        assert!(tool_result.total_trials >= 1);
        assert_eq!(tool_result.examples.len(), tool_result.total_trials.min(3));

        let report = state.final_report.as_deref().unwrap();
        assert!(!report.is_empty());
        assert!(report.contains("COVID"));
        assert_eq!(report.matches("There are several COVID-19 trials recruiting.").count(), 1);

        assert_eq!(state.input_text, COVID_PATIENT_TEXT);
        assert_eq!(state.patient_profile.as_ref().unwrap().location, "Brazil");
        assert_eq!(result.validation.passed(), 4);
        assert_eq!(result.score, 1.0);
        assert_eq!(result.score_percent(), 100.0);
        assert!(result.timings.total >= result.timings.parallel);

        let renders = charts.renders();
        assert_eq!(renders.len(), 1);
        assert_eq!(
            state.status_plot_path.as_deref(),
            Some(renders[0].0.to_string_lossy().as_ref())
        );
        assert!(renders[0].0.to_string_lossy().contains(&result.run_id.to_string()));
    }

    #[tokio::test]
    async fn test_no_covid_rows_lowers_score() {
        let (pipeline, _) = pipeline(
            ScriptedGenerator::new(COVID_PROFILE_JSON, EXPLANATION),
            catalog_without_covid(),
            default_config(),
        );

        let result = pipeline.evaluate(COVID_PATIENT_TEXT).await.unwrap();
        let tool_result = result.state.tool_result.as_ref().unwrap();

        assert_eq!(tool_result.total_trials, 0);
        assert!(tool_result.examples.is_empty());
        assert!(!result.validation.has_examples);
        assert!(result.score <= 0.75);
        assert!(result.state.final_report.as_deref().unwrap().contains("Total Trials Found: 0"));
    }

    #[tokio::test]
    async fn test_malformed_profile_still_completes() {
        let (pipeline, _) = pipeline(
            ScriptedGenerator::new("I think the patient has COVID.", EXPLANATION),
            sample_catalog(),
            default_config(),
        );

        let result = pipeline.evaluate(COVID_PATIENT_TEXT).await.unwrap();

        assert_eq!(result.state.patient_profile, Some(PatientProfile::default()));
        assert_eq!(result.state.tool_result.as_ref().unwrap().total_trials, 0);
        assert!(result.state.final_report.is_some());
        assert!(!result.validation.has_examples);
    }

    #[tokio::test]
    async fn test_explain_failure_fails_the_run() {
        let (pipeline, _) = pipeline(
            ScriptedGenerator::failing_explanation(COVID_PROFILE_JSON, "service unavailable"),
            sample_catalog(),
            default_config(),
        );

        let err = pipeline.evaluate(COVID_PATIENT_TEXT).await.unwrap_err();
        assert!(matches!(err, AppError::LLMApi(_)));
    }

    #[tokio::test]
    async fn test_handoff_waits_for_slow_intake() {
        let generator = ScriptedGenerator::new(COVID_PROFILE_JSON, EXPLANATION)
            .with_intake_delay(std::time::Duration::from_millis(50));
        let (pipeline, _) = pipeline(generator, sample_catalog(), default_config());

        let result = pipeline.evaluate(COVID_PATIENT_TEXT).await.unwrap();
        assert_eq!(result.state.tool_result.as_ref().unwrap().total_trials, 5);
    }

    #[tokio::test]
    async fn test_racy_mode_reproduces_missed_condition() {
        let generator = ScriptedGenerator::new(COVID_PROFILE_JSON, EXPLANATION)
            .with_intake_delay(std::time::Duration::from_millis(50));
        let (pipeline, _) = pipeline(
            generator,
            sample_catalog(),
            config(ChartPathMode::PerRun, RetrievalSync::Racy),
        );

        let result = pipeline.evaluate(COVID_PATIENT_TEXT).await.unwrap();

        // Retrieval ran before Intake wrote the profile
        let tool_result = result.state.tool_result.as_ref().unwrap();
        assert_eq!(tool_result.condition, "");
        assert_eq!(tool_result.total_trials, 0);
        assert_eq!(result.state.patient_profile.as_ref().unwrap().condition, "COVID");
    }

    #[tokio::test]
    async fn test_runs_do_not_share_memory_or_charts() {
        let (pipeline, charts) = pipeline(
            ScriptedGenerator::new(COVID_PROFILE_JSON, EXPLANATION),
            sample_catalog(),
            default_config(),
        );

        let (first, second) = tokio::join!(
            pipeline.evaluate(COVID_PATIENT_TEXT),
            pipeline.evaluate("Patient: 30-year-old female. Condition: asthma.")
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_ne!(first.run_id, second.run_id);
        assert_ne!(first.state.status_plot_path, second.state.status_plot_path);
        assert_eq!(first.state.input_text, COVID_PATIENT_TEXT);
        assert!(second.state.input_text.contains("asthma"));
        assert_eq!(charts.renders().len(), 2);
    }

    #[tokio::test]
    async fn test_shared_chart_mode_reuses_path() {
        let (pipeline, _) = pipeline(
            ScriptedGenerator::new(COVID_PROFILE_JSON, EXPLANATION),
            sample_catalog(),
            config(ChartPathMode::Shared, RetrievalSync::Handoff),
        );

        let first = pipeline.evaluate(COVID_PATIENT_TEXT).await.unwrap();
        let second = pipeline.evaluate(COVID_PATIENT_TEXT).await.unwrap();

        assert_eq!(first.state.status_plot_path, second.state.status_plot_path);
        assert_eq!(
            first.state.status_plot_path.as_deref(),
            Some(PathBuf::from("test-artifacts").join("trial_status.png").to_string_lossy().as_ref())
        );
    }

    #[tokio::test]
    async fn test_result_serializes_for_display() {
        let (pipeline, _) = pipeline(
            ScriptedGenerator::new(COVID_PROFILE_JSON, EXPLANATION),
            sample_catalog(),
            default_config(),
        );

        let result = pipeline.evaluate(COVID_PATIENT_TEXT).await.unwrap();
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["validation"]["patient_parsed"], true);
        assert_eq!(value["score"], 1.0);
        assert!(value["timings"]["total"].is_f64());
        assert!(value["state"]["final_report"].is_string());
        assert!(value["state"]["tool_result"]["examples"].is_array());
    }
}
