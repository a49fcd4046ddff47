//! Configuration settings for Abacus.

use crate::relay::{Credential, ModelId, ToolId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub provider: ProviderSettings,
    pub solver: SolverSettings,
    pub tools: ToolSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Hosted model provider settings. Any OpenAI-compatible endpoint works.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Provider name, used in logs and error messages.
    pub name: String,
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// API key stored in the config file (prefer the environment).
    pub api_key: Option<String>,
    /// Timeout for a single model request, in seconds.
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: "groq".to_string(),
            api_base: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            api_key: None,
            timeout_secs: 300,
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("name", &self.name)
            .field("api_base", &self.api_base)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Defaults applied to every problem submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Default model.
    pub model: ModelId,
    /// Default sampling temperature (0.0 - 1.0).
    pub temperature: f32,
    /// Show the tool-call trace by default.
    pub show_reasoning: bool,
    /// Tools offered to the model by default.
    pub enabled_tools: Vec<ToolId>,
    /// Maximum model round-trips before forcing a final answer.
    pub max_iterations: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            temperature: 0.2,
            show_reasoning: true,
            enabled_tools: ToolId::ALL.to_vec(),
            max_iterations: 15,
        }
    }
}

/// Knowledge tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// User agent sent to tool backends.
    pub user_agent: String,
    /// Timeout for a single tool request, in seconds.
    pub timeout_secs: u64,
    /// Maximum characters of tool output handed back to the model.
    pub max_chars: usize,
    /// MediaWiki API endpoint.
    pub wikipedia_api: String,
    /// Number of Wikipedia pages summarized per lookup.
    pub wikipedia_top_k: usize,
    /// arXiv query API endpoint.
    pub arxiv_api: String,
    /// Number of papers returned per search.
    pub arxiv_top_k: usize,
    /// DuckDuckGo HTML search endpoint.
    pub search_url: String,
    /// Number of web results returned per search.
    pub search_max_results: usize,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("abacus/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            max_chars: 4000,
            wikipedia_api: "https://en.wikipedia.org/w/api.php".to_string(),
            wikipedia_top_k: 2,
            arxiv_api: "https://export.arxiv.org/api/query".to_string(),
            arxiv_top_k: 1,
            search_url: "https://html.duckduckgo.com/html/".to_string(),
            search_max_results: 5,
        }
    }
}

impl ToolSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Web server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AbacusError::Configuration(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("abacus")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Resolve the credential to use for a call.
    ///
    /// An explicit key (CLI flag or UI field) wins over the config file,
    /// which wins over the environment. Blank values are skipped.
    pub fn resolve_credential(&self, explicit: Option<&str>) -> Option<Credential> {
        let from_env = std::env::var(&self.provider.api_key_env).ok();
        self.resolve_credential_with(explicit, from_env.as_deref())
    }

    fn resolve_credential_with(
        &self,
        explicit: Option<&str>,
        from_env: Option<&str>,
    ) -> Option<Credential> {
        [explicit, self.provider.api_key.as_deref(), from_env]
            .into_iter()
            .flatten()
            .find_map(Credential::parse)
    }
}
