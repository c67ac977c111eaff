//! Job DTOs exchanged with job drivers

use serde::{Deserialize, Serialize};

use crate::domain::catalog::{AnalysisConfig, Analyst, StepCatalog, StepDefinition};
use crate::domain::progress::Terminal;
use crate::error::ConfigurationError;

/// Request to register a job before its first update
///
/// Either `steps` gives an explicit catalog, or the analysis options are used
/// to build the trading-analysis catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterJob {
    pub job_id: Option<String>,
    #[serde(default)]
    pub analysts: Vec<Analyst>,
    #[serde(default = "default_research_depth")]
    pub research_depth: u8,
    pub steps: Option<Vec<StepDefinition>>,
}

fn default_research_depth() -> u8 {
    AnalysisConfig::default().research_depth
}

impl RegisterJob {
    /// Resolves the catalog this job will run with
    pub fn catalog(&self) -> Result<StepCatalog, ConfigurationError> {
        match &self.steps {
            Some(steps) => StepCatalog::new(steps.clone()),
            None => StepCatalog::build(&AnalysisConfig::new(
                self.analysts.clone(),
                self.research_depth,
            )),
        }
    }
}

/// Registered job summary returned to the driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredJob {
    pub job_id: String,
    pub total_steps: usize,
    pub estimated_total_seconds: f64,
    pub steps: Vec<StepDefinition>,
}

impl RegisteredJob {
    pub fn new(job_id: impl Into<String>, catalog: &StepCatalog) -> Self {
        Self {
            job_id: job_id.into(),
            total_steps: catalog.len(),
            estimated_total_seconds: catalog.estimated_total_seconds(),
            steps: catalog.steps().to_vec(),
        }
    }
}

/// Status message sent by a job driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub message: String,
    pub terminal: Option<Terminal>,
    /// Final output stored with a completed job
    pub result: Option<serde_json::Value>,
}
