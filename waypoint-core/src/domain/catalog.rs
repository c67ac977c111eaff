//! Step catalog domain types
//!
//! A job moves through a fixed, ordered list of named steps. The catalog is
//! built once per job and its length fixes `total_steps` for the whole life of
//! the job.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// Text rule recognising a status message as belonging to a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Pattern {
    /// Matches when the text appears anywhere in the message
    Contains(String),
    /// Matches when the message starts with the text
    Prefix(String),
}

impl Pattern {
    pub fn contains(text: impl Into<String>) -> Self {
        Self::Contains(text.into())
    }

    pub fn prefix(text: impl Into<String>) -> Self {
        Self::Prefix(text.into())
    }

    /// The raw text of the rule
    pub fn text(&self) -> &str {
        match self {
            Pattern::Contains(text) | Pattern::Prefix(text) => text,
        }
    }

    /// Whether `message` satisfies this rule
    pub fn matches(&self, message: &str) -> bool {
        match self {
            Pattern::Contains(text) => message.contains(text.as_str()),
            Pattern::Prefix(text) => message.starts_with(text.as_str()),
        }
    }
}

/// One named phase of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Ordered match rules; a step without rules is only reachable by
    /// completing the job while it is the last step
    #[serde(default)]
    pub matches: Vec<Pattern>,
    /// Expected duration of the step, used for remaining-time estimates
    #[serde(default)]
    pub estimated_seconds: f64,
}

impl StepDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            matches: Vec::new(),
            estimated_seconds: 0.0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends a match rule; rules are evaluated in insertion order
    pub fn matching(mut self, pattern: Pattern) -> Self {
        self.matches.push(pattern);
        self
    }

    pub fn with_estimate(mut self, seconds: f64) -> Self {
        self.estimated_seconds = seconds;
        self
    }
}

/// Fixed, ordered list of steps for one job
///
/// Construction validates the steps, so every catalog in circulation has at
/// least one step, unique names and non-empty match rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StepDefinition>", into = "Vec<StepDefinition>")]
pub struct StepCatalog {
    steps: Vec<StepDefinition>,
}

impl StepCatalog {
    /// Creates a catalog from explicit step definitions
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, ConfigurationError> {
        if steps.is_empty() {
            return Err(ConfigurationError::EmptyCatalog);
        }

        let mut seen = HashSet::new();
        for (index, step) in steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(ConfigurationError::UnnamedStep { index });
            }
            if !seen.insert(step.name.as_str()) {
                return Err(ConfigurationError::DuplicateStep(step.name.clone()));
            }
            if step.matches.iter().any(|p| p.text().is_empty()) {
                return Err(ConfigurationError::EmptyPattern {
                    step: step.name.clone(),
                });
            }
            if !step.estimated_seconds.is_finite() || step.estimated_seconds < 0.0 {
                return Err(ConfigurationError::InvalidEstimate {
                    step: step.name.clone(),
                });
            }
        }

        Ok(Self { steps })
    }

    /// Creates a catalog where every step matches messages containing its name
    pub fn from_names<I, S>(names: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let steps = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                StepDefinition::new(name.clone()).matching(Pattern::Contains(name))
            })
            .collect();
        Self::new(steps)
    }

    /// Builds the catalog of a trading analysis run
    ///
    /// Output is deterministic for identical configs. Steps, in order:
    /// preparation (validation, environment, cost, parameters, engine), one
    /// step per selected analyst, research debate and manager, trader, risk
    /// debate (depth 2 and up), risk manager, signal processing and report.
    pub fn build(config: &AnalysisConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let depth = f64::from(config.research_depth);
        let analyst_factor = 0.5 + 0.5 * depth;

        let mut steps = vec![
            StepDefinition::new("Data validation")
                .with_description("Validate the stock code and prefetch market data")
                .matching(Pattern::prefix("Starting stock analysis"))
                .matching(Pattern::contains("Validating stock code"))
                .matching(Pattern::contains("Data ready"))
                .with_estimate(5.0),
            StepDefinition::new("Environment check")
                .with_description("Check API keys and environment variables")
                .matching(Pattern::contains("environment"))
                .matching(Pattern::contains("Environment"))
                .with_estimate(2.0),
            StepDefinition::new("Cost estimation")
                .with_description("Estimate the model cost of the analysis")
                .matching(Pattern::contains("Estimated analysis cost"))
                .with_estimate(1.0),
            StepDefinition::new("Parameter setup")
                .with_description("Configure analysis parameters and result directories")
                .matching(Pattern::contains("Configuring analysis"))
                .matching(Pattern::contains("Creating result directories"))
                .with_estimate(2.0),
            StepDefinition::new("Engine initialization")
                .with_description("Initialize the analysis engine and agent graph")
                .matching(Pattern::contains("Initializing analysis engine"))
                .with_estimate(5.0),
        ];

        for analyst in &config.analysts {
            steps.push(
                StepDefinition::new(analyst.step_name())
                    .with_description(analyst.description())
                    .matching(Pattern::contains(analyst.module_name()))
                    .matching(Pattern::contains(format!("[{}]", analyst.label())))
                    .with_estimate(40.0 * analyst_factor),
            );
        }

        steps.push(
            StepDefinition::new("Research debate")
                .with_description("Bull and bear researchers debate the findings")
                .matching(Pattern::contains("bull_researcher"))
                .matching(Pattern::contains("bear_researcher"))
                .with_estimate(30.0 * depth),
        );
        steps.push(
            StepDefinition::new("Research manager")
                .with_description("Research manager settles the debate")
                .matching(Pattern::contains("research_manager"))
                .with_estimate(15.0),
        );
        steps.push(
            StepDefinition::new("Trader")
                .with_description("Trader drafts the investment plan")
                .matching(Pattern::contains("trader"))
                .with_estimate(20.0),
        );
        if config.research_depth >= 2 {
            steps.push(
                StepDefinition::new("Risk debate")
                    .with_description("Risky, safe and neutral analysts assess the plan")
                    .matching(Pattern::contains("risky_analyst"))
                    .matching(Pattern::contains("safe_analyst"))
                    .matching(Pattern::contains("neutral_analyst"))
                    .with_estimate(25.0 * depth),
            );
        }
        steps.push(
            StepDefinition::new("Risk manager")
                .with_description("Risk manager issues the final decision")
                .matching(Pattern::contains("risk_manager"))
                .with_estimate(15.0),
        );
        steps.push(
            StepDefinition::new("Signal processing")
                .with_description("Extract the trading signal from the decision")
                .matching(Pattern::contains("graph_signal_processing"))
                .with_estimate(5.0),
        );
        steps.push(
            StepDefinition::new("Report generation")
                .with_description("Format the analysis report")
                .matching(Pattern::contains("Generating report"))
                .matching(Pattern::contains("Analysis complete"))
                .with_estimate(5.0),
        );

        Self::new(steps)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDefinition> {
        self.steps.iter()
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Sum of the per-step estimates
    pub fn estimated_total_seconds(&self) -> f64 {
        self.steps.iter().map(|s| s.estimated_seconds).sum()
    }

    /// Index of the last step
    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }
}

impl TryFrom<Vec<StepDefinition>> for StepCatalog {
    type Error = ConfigurationError;

    fn try_from(steps: Vec<StepDefinition>) -> Result<Self, Self::Error> {
        Self::new(steps)
    }
}

impl From<StepCatalog> for Vec<StepDefinition> {
    fn from(catalog: StepCatalog) -> Self {
        catalog.steps
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

/// Analyst agents that can take part in a trading analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analyst {
    Market,
    Fundamentals,
    News,
    Social,
}

impl Analyst {
    pub const ALL: [Analyst; 4] = [
        Analyst::Market,
        Analyst::Fundamentals,
        Analyst::News,
        Analyst::Social,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Analyst::Market => "market",
            Analyst::Fundamentals => "fundamentals",
            Analyst::News => "news",
            Analyst::Social => "social",
        }
    }

    /// Agent module name as it appears in pipeline log lines
    pub fn module_name(self) -> &'static str {
        match self {
            Analyst::Market => "market_analyst",
            Analyst::Fundamentals => "fundamentals_analyst",
            Analyst::News => "news_analyst",
            Analyst::Social => "social_media_analyst",
        }
    }

    /// Human readable tag used in tool-call log lines
    pub fn label(self) -> &'static str {
        match self {
            Analyst::Market => "market analyst",
            Analyst::Fundamentals => "fundamentals analyst",
            Analyst::News => "news analyst",
            Analyst::Social => "social media analyst",
        }
    }

    fn step_name(self) -> &'static str {
        match self {
            Analyst::Market => "Market analysis",
            Analyst::Fundamentals => "Fundamentals analysis",
            Analyst::News => "News analysis",
            Analyst::Social => "Social sentiment analysis",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Analyst::Market => "Price action and technical indicators",
            Analyst::Fundamentals => "Financial statements and valuation",
            Analyst::News => "Company and macro news",
            Analyst::Social => "Social media and investor sentiment",
        }
    }
}

impl fmt::Display for Analyst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Analyst {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "market" => Ok(Analyst::Market),
            "fundamentals" => Ok(Analyst::Fundamentals),
            "news" => Ok(Analyst::News),
            "social" | "social_media" => Ok(Analyst::Social),
            other => Err(ConfigurationError::UnknownAnalyst(other.to_string())),
        }
    }
}

/// Options that decide which steps an analysis run goes through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub analysts: Vec<Analyst>,
    pub research_depth: u8,
}

impl AnalysisConfig {
    pub const MAX_RESEARCH_DEPTH: u8 = 5;

    pub fn new(analysts: Vec<Analyst>, research_depth: u8) -> Self {
        Self {
            analysts,
            research_depth,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.analysts.is_empty() {
            return Err(ConfigurationError::NoAnalysts);
        }

        let mut seen = HashSet::new();
        for analyst in &self.analysts {
            if !seen.insert(*analyst) {
                return Err(ConfigurationError::DuplicateAnalyst(*analyst));
            }
        }

        if !(1..=Self::MAX_RESEARCH_DEPTH).contains(&self.research_depth) {
            return Err(ConfigurationError::InvalidResearchDepth(
                self.research_depth,
            ));
        }

        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::new(vec![Analyst::Market, Analyst::Fundamentals], 2)
    }
}
