use clap::Args;

/// Patient intake form fields, assembled into the free-text prompt the
/// pipeline consumes.
#[derive(Debug, Clone, Args)]
pub struct PatientForm {
    #[arg(long, default_value_t = 60)]
    pub age: u32,

    #[arg(long, default_value = "male")]
    pub sex: String,

    #[arg(long, default_value = "breathing problems")]
    pub symptoms: String,

    #[arg(long, default_value = "COVID")]
    pub condition: String,

    #[arg(long, default_value = "diabetes")]
    pub comorbidities: String,

    #[arg(long, default_value = "Brazil")]
    pub location: String,
}

impl Default for PatientForm {
    fn default() -> Self {
        Self {
            age: 60,
            sex: "male".to_string(),
            symptoms: "breathing problems".to_string(),
            condition: "COVID".to_string(),
            comorbidities: "diabetes".to_string(),
            location: "Brazil".to_string(),
        }
    }
}

impl PatientForm {
    pub fn to_prompt(&self) -> String {
        format!(
            "Patient: {}-year-old {}. Condition: {}. Symptoms: {}. Comorbidities: {}. Location: {}.",
            self.age,
            self.sex.trim(),
            self.condition.trim(),
            self.symptoms.trim(),
            self.comorbidities.trim(),
            self.location.trim(),
        )
    }
}
