//! Fakes shared by the stage and pipeline tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::TextGenerator;
use crate::trials::{ChartRenderer, TrialCatalog};
use crate::types::{AppError, AppResult};

pub const COVID_PATIENT_TEXT: &str = "Patient: 60-year-old male. Condition: COVID. Symptoms: breathing problems. \
Comorbidities: diabetes. Location: Brazil.";

pub const COVID_PROFILE_JSON: &str = r#"{"age": 60, "sex": "male", "condition": "COVID", "symptoms": ["breathing problems"], "comorbidities": ["diabetes"], "location": "Brazil"}"#;

const TRIALS_CSV: &str = "\
Rank,NCT Number,Title,Status,Conditions,Interventions,Locations
1,NCT04785898,Diagnostic Performance of the ID Now,Active not recruiting,Covid19,Diagnostic Test: ID Now,Spain
2,NCT04595136,Study to Evaluate the Efficacy of COVID19-0001-USR,Not yet recruiting,SARS-CoV-2 Infection|COVID-19,Drug: Drug COVID19-0001-USR,
3,NCT04395482,Lung CT Scan Analysis of SARS-CoV2 Induced Lung Injury,Recruiting,covid19,Other: Lung CT scan analysis,Italy
4,NCT04416061,The Role of a Private Hospital in Hong Kong Amid COVID-19 Pandemic,Active not recruiting,COVID,Diagnostic Test: COVID 19 Diagnostic Test,Hong Kong
5,NCT04395924,Maternal-foetal Transmission of SARS-Cov-2,Recruiting,Maternal Fetal Infection Transmission|COVID-19,,France
6,NCT04377308,Diabetes Outcomes Registry,Completed,Type 2 Diabetes,NaN,Brazil
7,NCT04320615,Asthma Cohort,Recruiting,Asthma,Drug: Placebo,Chile
";

const NON_COVID_CSV: &str = "\
Rank,NCT Number,Title,Status,Conditions,Interventions,Locations
1,NCT04377308,Diabetes Outcomes Registry,Completed,Type 2 Diabetes,NaN,Brazil
2,NCT04320615,Asthma Cohort,Recruiting,Asthma,Drug: Placebo,Chile
";

pub fn sample_catalog() -> TrialCatalog {
    TrialCatalog::from_reader(TRIALS_CSV.as_bytes()).expect("sample CSV is valid")
}

pub fn catalog_without_covid() -> TrialCatalog {
    TrialCatalog::from_reader(NON_COVID_CSV.as_bytes()).expect("sample CSV is valid")
}

/// Answers Intake prompts with a fixed profile reply and everything else with a
/// fixed explanation (or error).
pub struct ScriptedGenerator {
    profile_reply: String,
    explanation_reply: Result<String, String>,
    intake_delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(profile_reply: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            profile_reply: profile_reply.into(),
            explanation_reply: Ok(explanation.into()),
            intake_delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_explanation(profile_reply: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            explanation_reply: Err(error.into()),
            ..Self::new(profile_reply, "")
        }
    }

    pub fn with_intake_delay(mut self, delay: Duration) -> Self {
        self.intake_delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if prompt.contains("Extract patient info") {
            if let Some(delay) = self.intake_delay {
                tokio::time::sleep(delay).await;
            }
            return Ok(self.profile_reply.clone());
        }

        self.explanation_reply.clone().map_err(AppError::LLMApi)
    }
}

/// Remembers every chart request instead of drawing it
#[derive(Default)]
pub struct RecordingChartRenderer {
    renders: Mutex<Vec<(PathBuf, Vec<(String, usize)>)>>,
}

impl RecordingChartRenderer {
    pub fn renders(&self) -> Vec<(PathBuf, Vec<(String, usize)>)> {
        self.renders.lock().unwrap().clone()
    }
}

impl ChartRenderer for RecordingChartRenderer {
    fn render_status_chart(&self, counts: &[(String, usize)], output_path: &Path) -> AppResult<()> {
        self.renders
            .lock()
            .unwrap()
            .push((output_path.to_path_buf(), counts.to_vec()));
        Ok(())
    }
}
