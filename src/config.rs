use anyhow::Result;
use std::env;
use std::path::PathBuf;

use crate::types::LLMProvider;

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LLMConfig,
    pub dataset: DatasetConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub google_api_key: String,
    pub openai_api_key: String,
    pub groq_api_key: String,
}

impl LLMConfig {
    /// API key for the selected provider, if one is configured
    pub fn active_api_key(&self) -> Option<String> {
        let key = match self.provider {
            LLMProvider::Google => &self.google_api_key,
            LLMProvider::OpenAI => &self.openai_api_key,
            LLMProvider::Groq => &self.groq_api_key,
        };
        if key.trim().is_empty() {
            None
        } else {
            Some(key.clone())
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub chart_mode: ChartPathMode,
    pub retrieval_sync: RetrievalSync,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("artifacts"),
            chart_mode: ChartPathMode::PerRun,
            retrieval_sync: RetrievalSync::Handoff,
        }
    }
}

/// Where the status chart is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ChartPathMode {
    /// `trial_status-<run_id>.png`, one file per run. Files are never
    /// removed; clearing `output_dir` is up to the caller.
    PerRun,
    /// `trial_status.png`, overwritten by every run
    Shared,
}

/// How Retrieval obtains the condition that Intake extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RetrievalSync {
    /// Retrieval waits for the profile Intake publishes
    Handoff,
    /// Retrieval reads run memory immediately and may observe no profile yet
    Racy,
}

impl std::str::FromStr for ChartPathMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "per-run" | "per_run" | "unique" => Ok(ChartPathMode::PerRun),
            "shared" | "fixed" => Ok(ChartPathMode::Shared),
            other => Err(anyhow::anyhow!("Unknown CHART_PATH_MODE: {}", other)),
        }
    }
}

impl std::str::FromStr for RetrievalSync {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "handoff" => Ok(RetrievalSync::Handoff),
            "racy" => Ok(RetrievalSync::Racy),
            other => Err(anyhow::anyhow!("Unknown RETRIEVAL_SYNC: {}", other)),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let provider: LLMProvider = env::var("LLM_PROVIDER")
            .unwrap_or_else(|_| "google".to_string())
            .parse()?;

        Ok(Self {
            llm: LLMConfig {
                provider,
                model: env::var("LLM_MODEL").unwrap_or_else(|_| provider.default_model().to_string()),
                temperature: env::var("LLM_TEMPERATURE").ok().map(|v| v.parse()).transpose()?,
                max_tokens: env::var("LLM_MAX_TOKENS").ok().map(|v| v.parse()).transpose()?,
                google_api_key: env::var("GEMINI_API_KEY")
                    .or_else(|_| env::var("GOOGLE_API_KEY"))
                    .unwrap_or_default(),
                openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            },
            dataset: DatasetConfig {
                path: env::var("TRIALS_DATASET_PATH")
                    .unwrap_or_else(|_| "input/COVID clinical trials.csv".to_string())
                    .into(),
            },
            pipeline: PipelineConfig {
                output_dir: env::var("OUTPUT_DIR")
                    .unwrap_or_else(|_| "artifacts".to_string())
                    .into(),
                chart_mode: env::var("CHART_PATH_MODE")
                    .unwrap_or_else(|_| "per-run".to_string())
                    .parse()?,
                retrieval_sync: env::var("RETRIEVAL_SYNC")
                    .unwrap_or_else(|_| "handoff".to_string())
                    .parse()?,
            },
        })
    }
}
