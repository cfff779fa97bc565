use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trial_navigator::agents::report::trial_summary;
use trial_navigator::config::{ChartPathMode, Config, RetrievalSync};
use trial_navigator::llm::{LLMProviderConfig, LLM};
use trial_navigator::trials::TrialCatalog;
use trial_navigator::{EvaluationResult, PatientForm, Pipeline};

/// Run the clinical-trials navigator pipeline on one patient description
#[derive(Debug, Parser)]
#[command(name = "trial-navigator", version)]
struct Cli {
    /// Free-text patient description; when omitted it is built from the form fields
    #[arg(long)]
    prompt: Option<String>,

    #[command(flatten)]
    form: PatientForm,

    /// Trials CSV (overrides TRIALS_DATASET_PATH)
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Directory for the status chart (overrides OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    chart_mode: Option<ChartPathMode>,

    #[arg(long, value_enum)]
    retrieval_sync: Option<RetrievalSync>,

    /// Print the whole evaluation result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trial_navigator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration, CLI flags win over the environment
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(dataset) = cli.dataset {
        config.dataset.path = dataset;
    }
    if let Some(output_dir) = cli.output_dir {
        config.pipeline.output_dir = output_dir;
    }
    if let Some(mode) = cli.chart_mode {
        config.pipeline.chart_mode = mode;
    }
    if let Some(sync) = cli.retrieval_sync {
        config.pipeline.retrieval_sync = sync;
    }
    info!(dataset = %config.dataset.path.display(), "Configuration loaded");

    let catalog = TrialCatalog::load(&config.dataset.path).context("Failed to load trial dataset")?;

    let llm_config = LLMProviderConfig::from_config(&config.llm).context("Failed to configure LLM provider")?;
    let llm = LLM::new(llm_config);
    info!(provider = %llm.provider(), model = llm.model(), "LLM provider ready");

    let pipeline = Pipeline::new(Arc::new(llm), Arc::new(catalog), config.pipeline.clone());

    let prompt = cli.prompt.unwrap_or_else(|| cli.form.to_prompt());
    let result = pipeline.evaluate(&prompt).await.context("Agent evaluation failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result)?;
    }

    Ok(())
}

fn print_result(result: &EvaluationResult) -> anyhow::Result<()> {
    let state = &result.state;

    println!("{}", state.final_report.as_deref().unwrap_or_default());

    println!("Trial Summary");
    println!("-------------");
    match &state.tool_result {
        Some(tool_result) => {
            println!("{}", serde_json::to_string_pretty(&trial_summary(tool_result))?);
            println!("\nExamples");
            println!("--------");
            println!("{}", serde_json::to_string_pretty(&tool_result.examples)?);
        }
        None => println!("No trial lookup was performed"),
    }

    if let Some(path) = &state.status_plot_path {
        println!("\nStatus chart: {}", path);
    }

    println!("\nExplanation");
    println!("-----------");
    println!("{}", state.explanation.as_deref().unwrap_or_default());

    println!("\nValidation");
    println!("----------");
    for (name, ok) in result.validation.checks() {
        println!("  [{}] {}", if ok { "x" } else { " " }, name);
    }
    println!("Agent Evaluation Score: {:.0}%", result.score_percent());

    let timings = &result.timings;
    println!("\nRuntime (run {} started {})", result.run_id, result.started_at.to_rfc3339());
    println!("  Intake + Retrieval: {:.2}s", timings.parallel.as_secs_f64());
    println!("  Explain:            {:.2}s", timings.explain.as_secs_f64());
    println!("  Report:             {:.2}s", timings.report.as_secs_f64());
    println!("  Total:              {:.2}s", timings.total.as_secs_f64());

    Ok(())
}
