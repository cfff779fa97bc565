//! Stage Agents
//!
//! The four units of the trial-navigation pipeline:
//!
//! - **Intake Agent**: extracts a structured patient profile from free text
//! - **Retrieval Agent**: looks up matching trials and renders the status chart
//! - **Explain Agent**: asks the LLM for a plain-language reading of the results
//! - **Report Agent**: assembles the final text report
//!
//! ## Pipeline Overview
//!
//! ```text
//!   Patient text
//!        │
//!   ┌────┴─────┐
//!   ▼          ▼
//! ┌────────┐ ┌───────────┐
//! │ Intake │→│ Retrieval │  → run concurrently, profile handed over
//! └────────┘ └───────────┘
//!   └────┬─────┘
//!        ▼
//! ┌─────────────┐
//! │   Explain   │  → LLM explanation of trial results
//! └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   Report    │  → Final report text
//! └─────────────┘
//! ```

pub mod intake;
pub mod retrieval;
pub mod explain;
pub mod report;

pub use explain::ExplainAgent;
pub use intake::{IntakeAgent, ProfileParseError};
pub use report::ReportAgent;
pub use retrieval::RetrievalAgent;

use async_trait::async_trait;

use crate::pipeline::context::RunContext;
use crate::pipeline::state::PipelineState;
use crate::types::AppResult;

/// One pipeline step: take the accumulated state, return it with this stage's keys set.
#[async_trait]
pub trait StageAgent: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, state: PipelineState, ctx: &RunContext) -> AppResult<PipelineState>;
}
