//! Configuration module for Abacus.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts, ReasoningPrompts};
pub use settings::{
    GeneralSettings, PromptSettings, ProviderSettings, ServerSettings, Settings, SolverSettings,
    ToolSettings,
};
