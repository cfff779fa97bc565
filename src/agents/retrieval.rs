//! Retrieval Agent
//!
//! Looks up trials for the patient's condition and renders the status chart.
//! The chart does not depend on the condition and is drawn concurrently.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::agents::StageAgent;
use crate::config::RetrievalSync;
use crate::pipeline::context::RunContext;
use crate::pipeline::state::PipelineState;
use crate::types::{AppError, AppResult};

pub struct RetrievalAgent;

impl RetrievalAgent {
    async fn condition(ctx: &RunContext) -> AppResult<String> {
        match ctx.retrieval_sync() {
            RetrievalSync::Handoff => Ok(ctx.await_profile().await?.condition),
            RetrievalSync::Racy => {
                let profile = ctx.memory().patient_profile().await;
                if profile.is_none() {
                    warn!(run_id = %ctx.run_id(), "Patient profile not in memory yet, searching with empty condition");
                }
                Ok(profile.map(|p| p.condition).unwrap_or_default())
            }
        }
    }

    async fn render_chart(ctx: &RunContext) -> AppResult<String> {
        let catalog = ctx.catalog_handle();
        let renderer = ctx.chart_renderer();
        let path = ctx.chart_path().to_path_buf();

        let rendered = path.clone();
        tokio::task::spawn_blocking(move || renderer.render_status_chart(&catalog.status_counts(), &rendered))
            .await
            .map_err(|e| AppError::Internal(format!("Chart task failed: {}", e)))??;

        Ok(path.to_string_lossy().to_string())
    }
}

#[async_trait]
impl StageAgent for RetrievalAgent {
    fn name(&self) -> &'static str {
        "retrieval"
    }

    async fn run(&self, mut state: PipelineState, ctx: &RunContext) -> AppResult<PipelineState> {
        info!(run_id = %ctx.run_id(), sync = ?ctx.retrieval_sync(), "Running retrieval agent");

        // The chart covers the whole dataset, so it renders while the condition is pending
        let (condition, plot_path) = futures::future::try_join(Self::condition(ctx), Self::render_chart(ctx)).await?;
        let tool_result = ctx.catalog().find_trials(&condition);

        info!(
            run_id = %ctx.run_id(),
            condition = %condition,
            total_trials = tool_result.total_trials,
            "Trial lookup complete"
        );

        ctx.memory()
            .update(|memory| memory.tool_result = Some(tool_result.clone()))
            .await;
        state.tool_result = Some(tool_result);

        info!(run_id = %ctx.run_id(), path = %plot_path, "Status chart written");

        ctx.memory()
            .update(|memory| memory.status_plot_path = Some(plot_path.clone()))
            .await;
        state.status_plot_path = Some(plot_path);
        Ok(state)
    }
}
