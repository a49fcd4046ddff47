//! Prompt templates for Abacus.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    pub reasoning: ReasoningPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the tool-calling agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
    /// Sent when the iteration cap is hit and the model must answer without tools.
    pub final_answer: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert mathematics tutor and problem solver. Your goal is to:
1. Solve mathematical problems accurately
2. Provide clear, step-by-step explanations
3. Use the appropriate tools for calculations and information gathering
4. Organize your answers in a structured format with headings
5. Include formulas and equations where relevant

For math problems, always show your work and explain your thinking.
For information queries, cite your sources where appropriate."#
                .to_string(),

            final_answer: r#"You have used all available tool calls. Using only the information gathered so far, give your best final answer to the original problem now. Do not request any more tools."#
                .to_string(),
        }
    }
}

/// Prompt for the step-by-step reasoning tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningPrompts {
    pub template: String,
}

impl Default for ReasoningPrompts {
    fn default() -> Self {
        Self {
            template: r#"You're an expert mathematics teacher. Solve the following problem step by step:

{{question}}

First, identify what information is given and what is being asked.
Then, lay out a clear strategy for solving the problem.
Show your work carefully, with each step clearly labeled.
Provide a final answer with appropriate units if applicable.

Your solution:"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }

            let reasoning_path = custom_path.join("reasoning.toml");
            if reasoning_path.exists() {
                let content = std::fs::read_to_string(&reasoning_path)?;
                prompts.reasoning = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The agent's system prompt with custom variables applied.
    pub fn agent_system(&self) -> String {
        self.render_with_custom(&self.agent.system, &HashMap::new())
    }

    /// The reasoning tool prompt for one question.
    pub fn reasoning_for(&self, question: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        self.render_with_custom(&self.reasoning.template, &vars)
    }
}
