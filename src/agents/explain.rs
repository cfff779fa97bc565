//! Explain Agent
//!
//! Asks the LLM to explain the trial lookup in plain language. Generation
//! failures are not recovered here; they abort the run.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::agents::StageAgent;
use crate::pipeline::context::RunContext;
use crate::pipeline::state::PipelineState;
use crate::types::AppResult;

pub struct ExplainAgent;

impl ExplainAgent {
    fn create_prompt(tool_result_json: &str) -> String {
        format!(
            r#"Explain in plain language the meaning of these clinical trial results:

{tool_result_json}
"#
        )
    }
}

#[async_trait]
impl StageAgent for ExplainAgent {
    fn name(&self) -> &'static str {
        "explain"
    }

    async fn run(&self, mut state: PipelineState, ctx: &RunContext) -> AppResult<PipelineState> {
        info!(run_id = %ctx.run_id(), "Running explain agent");

        let tool_result = match ctx.memory().tool_result().await {
            Some(result) => serde_json::to_value(result)?,
            None => json!({}),
        };
        let prompt = Self::create_prompt(&serde_json::to_string_pretty(&tool_result)?);

        let explanation = ctx.generator().generate(&prompt).await?;
        info!(run_id = %ctx.run_id(), explanation_len = explanation.len(), "Explanation generated");

        ctx.memory()
            .update(|memory| memory.explanation = Some(explanation.clone()))
            .await;
        state.explanation = Some(explanation);
        Ok(state)
    }
}
