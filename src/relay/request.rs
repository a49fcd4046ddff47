//! Problem requests and the enumerations they are validated against.

use crate::config::SolverSettings;
use crate::error::{AbacusError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Preset problems offered by the UI.
pub const EXAMPLE_PROBLEMS: &[&str] = &[
    "Solve for x: 2x + 5 = 15",
    "Find the area of a circle with radius 4 cm",
    "If a train travels at 60 mph and takes 3 hours to reach its destination, how far did it travel?",
    "I have 5 bananas and 7 grapes. I eat 2 bananas and give away 3 grapes. Then I buy a dozen apples and 2 packs of blueberries. Each pack contains 25 berries. How many total pieces of fruit do I have at the end?",
];

/// Look up a preset problem by its 1-based number.
pub fn example_problem(number: usize) -> Result<&'static str> {
    number
        .checked_sub(1)
        .and_then(|i| EXAMPLE_PROBLEMS.get(i))
        .copied()
        .ok_or_else(|| {
            AbacusError::Configuration(format!(
                "No example {} (choose 1-{})",
                number,
                EXAMPLE_PROBLEMS.len()
            ))
        })
}

/// Supported hosted models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelId {
    #[default]
    #[serde(rename = "gemma2-9b-it")]
    Gemma2_9b,
    #[serde(rename = "llama3-8b-8192")]
    Llama3_8b,
    #[serde(rename = "llama3-70b-8192")]
    Llama3_70b,
    #[serde(rename = "mixtral-8x7b-32768")]
    Mixtral8x7b,
}

impl ModelId {
    pub const ALL: [ModelId; 4] = [
        ModelId::Gemma2_9b,
        ModelId::Llama3_8b,
        ModelId::Llama3_70b,
        ModelId::Mixtral8x7b,
    ];

    /// Identifier sent to the provider.
    pub fn id(&self) -> &'static str {
        match self {
            ModelId::Gemma2_9b => "gemma2-9b-it",
            ModelId::Llama3_8b => "llama3-8b-8192",
            ModelId::Llama3_70b => "llama3-70b-8192",
            ModelId::Mixtral8x7b => "mixtral-8x7b-32768",
        }
    }

    /// Human-readable label for menus.
    pub fn label(&self) -> &'static str {
        match self {
            ModelId::Gemma2_9b => "Gemma 2 9B (Fast)",
            ModelId::Llama3_8b => "Llama 3 8B (Balanced)",
            ModelId::Llama3_70b => "Llama 3 70B (Powerful)",
            ModelId::Mixtral8x7b => "Mixtral 8x7B (Comprehensive)",
        }
    }
}

impl FromStr for ModelId {
    type Err = AbacusError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        ModelId::ALL
            .into_iter()
            .find(|m| m.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                AbacusError::Configuration(format!(
                    "Unsupported model '{}'. Supported models: {}",
                    wanted,
                    ModelId::ALL.map(|m| m.id()).join(", ")
                ))
            })
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Knowledge tools the agent may be given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    Wikipedia,
    Arxiv,
    WebSearch,
    Calculator,
    MathReasoning,
}

impl ToolId {
    pub const ALL: [ToolId; 5] = [
        ToolId::Wikipedia,
        ToolId::Arxiv,
        ToolId::WebSearch,
        ToolId::Calculator,
        ToolId::MathReasoning,
    ];

    /// Function name exposed to the model.
    pub fn name(&self) -> &'static str {
        match self {
            ToolId::Wikipedia => "wikipedia",
            ToolId::Arxiv => "arxiv",
            ToolId::WebSearch => "web_search",
            ToolId::Calculator => "calculator",
            ToolId::MathReasoning => "math_reasoning",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ToolId::Wikipedia => "Wikipedia",
            ToolId::Arxiv => "arXiv papers",
            ToolId::WebSearch => "Web search",
            ToolId::Calculator => "Calculator",
            ToolId::MathReasoning => "Step-by-step reasoning",
        }
    }
}

impl FromStr for ToolId {
    type Err = AbacusError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        ToolId::ALL
            .into_iter()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| {
                AbacusError::Configuration(format!(
                    "Unknown tool '{}'. Available tools: {}",
                    s.trim(),
                    ToolId::ALL.map(|t| t.name()).join(", ")
                ))
            })
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A validated problem ready to be relayed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemRequest {
    pub problem_text: String,
    pub model: ModelId,
    pub temperature: f32,
    pub show_reasoning: bool,
    pub enabled_tools: BTreeSet<ToolId>,
}

impl ProblemRequest {
    /// Create a request using the built-in solver defaults.
    pub fn new(problem_text: impl Into<String>) -> Self {
        Self::with_defaults(problem_text, &SolverSettings::default())
    }

    /// Create a request using the given solver defaults.
    pub fn with_defaults(problem_text: impl Into<String>, defaults: &SolverSettings) -> Self {
        Self {
            problem_text: problem_text.into(),
            model: defaults.model,
            temperature: defaults.temperature,
            show_reasoning: defaults.show_reasoning,
            enabled_tools: defaults.enabled_tools.iter().copied().collect(),
        }
    }

    pub fn with_model(mut self, model: ModelId) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_reasoning(mut self, show: bool) -> Self {
        self.show_reasoning = show;
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolId>) -> Self {
        self.enabled_tools = tools.into_iter().collect();
        self
    }

    /// Check the request without touching the network.
    pub fn validate(&self) -> Result<()> {
        if self.problem_text.trim().is_empty() {
            return Err(AbacusError::Configuration(
                "Problem text is empty. Type a math problem or pick an example.".to_string(),
            ));
        }

        if !self.temperature.is_finite() || !(0.0..=1.0).contains(&self.temperature) {
            return Err(AbacusError::Configuration(format!(
                "Temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            )));
        }

        Ok(())
    }
}

/// A problem as submitted by a user, before validation.
///
/// Every option is optional and falls back to the configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemSubmission {
    #[serde(default, alias = "question")]
    pub problem_text: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub show_reasoning: Option<bool>,
    #[serde(default)]
    pub enabled_tools: Option<Vec<String>>,
}

impl ProblemSubmission {
    pub fn new(problem_text: impl Into<String>) -> Self {
        Self {
            problem_text: problem_text.into(),
            ..Default::default()
        }
    }

    /// Resolve defaults and parse the enumerations into a typed request.
    pub fn into_request(self, defaults: &SolverSettings) -> Result<ProblemRequest> {
        let mut request = ProblemRequest::with_defaults(self.problem_text, defaults);

        if let Some(model) = self.model.as_deref().filter(|m| !m.trim().is_empty()) {
            request.model = model.parse()?;
        }
        if let Some(temperature) = self.temperature {
            request.temperature = temperature;
        }
        if let Some(show) = self.show_reasoning {
            request.show_reasoning = show;
        }
        if let Some(tools) = self.enabled_tools {
            request.enabled_tools = tools
                .iter()
                .map(|t| t.parse::<ToolId>())
                .collect::<Result<BTreeSet<_>>>()?;
        }

        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_ids_round_trip() {
        for model in ModelId::ALL {
            assert_eq!(model.id().parse::<ModelId>().unwrap(), model);
        }
        assert_eq!("LLAMA3-70B-8192".parse::<ModelId>().unwrap(), ModelId::Llama3_70b);
    }

    #[test]
    fn test_unsupported_model_is_configuration_error() {
        for bad in ["gpt-4o", "", "gemma2", "llama3-8b"] {
            let err = bad.parse::<ModelId>().unwrap_err();
            assert!(err.is_configuration(), "{} gave {:?}", bad, err);
        }
    }

    #[test]
    fn test_tool_names_accept_dashes() {
        assert_eq!("web-search".parse::<ToolId>().unwrap(), ToolId::WebSearch);
        assert_eq!(" Calculator ".parse::<ToolId>().unwrap(), ToolId::Calculator);
        assert!("wolfram".parse::<ToolId>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_blank_problem_rejected() {
        for text in ["", "   ", "\n\t  "] {
            let err = ProblemRequest::new(text).validate().unwrap_err();
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn test_temperature_bounds() {
        assert!(ProblemRequest::new("1+1").with_temperature(0.0).validate().is_ok());
        assert!(ProblemRequest::new("1+1").with_temperature(1.0).validate().is_ok());
        assert!(ProblemRequest::new("1+1").with_temperature(1.5).validate().is_err());
        assert!(ProblemRequest::new("1+1").with_temperature(-0.1).validate().is_err());
        assert!(ProblemRequest::new("1+1").with_temperature(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_submission_applies_defaults() {
        let defaults = SolverSettings::default();
        let request = ProblemSubmission::new("Solve for x: 2x + 5 = 15")
            .into_request(&defaults)
            .unwrap();

        assert_eq!(request.model, ModelId::Gemma2_9b);
        assert!(request.show_reasoning);
        assert_eq!(request.enabled_tools.len(), ToolId::ALL.len());
    }

    #[test]
    fn test_submission_overrides() {
        let submission: ProblemSubmission = serde_json::from_str(
            r#"{
                "question": "What is 7 * 6?",
                "model": "mixtral-8x7b-32768",
                "temperature": 0.5,
                "show_reasoning": false,
                "enabled_tools": ["calculator"]
            }"#,
        )
        .unwrap();

        let request = submission.into_request(&SolverSettings::default()).unwrap();
        assert_eq!(request.problem_text, "What is 7 * 6?");
        assert_eq!(request.model, ModelId::Mixtral8x7b);
        assert!(!request.show_reasoning);
        assert_eq!(request.enabled_tools, BTreeSet::from([ToolId::Calculator]));
    }

    #[test]
    fn test_submission_rejects_unknown_model_and_tool() {
        let defaults = SolverSettings::default();

        let mut submission = ProblemSubmission::new("1 + 1");
        submission.model = Some("claude-9".to_string());
        assert!(submission.into_request(&defaults).unwrap_err().is_configuration());

        let mut submission = ProblemSubmission::new("1 + 1");
        submission.enabled_tools = Some(vec!["calculator".into(), "oracle".into()]);
        assert!(submission.into_request(&defaults).unwrap_err().is_configuration());
    }

    #[test]
    fn test_example_lookup() {
        assert_eq!(example_problem(1).unwrap(), "Solve for x: 2x + 5 = 15");
        assert!(example_problem(0).is_err());
        assert!(example_problem(EXAMPLE_PROBLEMS.len() + 1).is_err());
    }

    #[test]
    fn test_submission_without_problem_is_empty_text() {
        let submission: ProblemSubmission =
            serde_json::from_value(serde_json::json!({"model": "gemma2-9b-it"})).unwrap();
        assert_eq!(submission.problem_text, "");

        let err = submission
            .into_request(&SolverSettings::default())
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("empty"));
    }
}
