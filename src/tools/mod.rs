//! Knowledge tools the agent can call.
//!
//! Each tool is a [`Tool`] with a name, a description and a JSON schema for
//! its arguments. Which tool to call, and when, is decided by the remote
//! model; this module only executes the calls it asks for.

mod arxiv;
mod calculator;
mod http;
mod reasoning;
mod web_search;
mod wikipedia;

pub use arxiv::ArxivSearch;
pub use calculator::{evaluate, Calculator};
pub use http::ToolHttp;
pub use reasoning::MathReasoning;
pub use web_search::WebSearch;
pub use wikipedia::WikipediaLookup;

use crate::agent::ChatModel;
use crate::config::{Prompts, ToolSettings};
use crate::error::{Result, UpstreamFailure};
use crate::relay::{Credential, ModelId, ToolId};
use async_trait::async_trait;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

/// Why a tool call did not produce output.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The model sent arguments the tool cannot use. Fed back to the model.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backing service failed. Ends the request.
    #[error(transparent)]
    Upstream(#[from] UpstreamFailure),

    /// The provider rejected the credential on a nested model call. Ends the request.
    #[error("{0}")]
    Credential(String),
}

/// Per-request context handed to tools that call back into the model.
pub struct ToolContext<'a> {
    pub chat: &'a dyn ChatModel,
    pub model: ModelId,
    pub temperature: f32,
    pub credential: &'a Credential,
}

/// A callable knowledge source.
#[async_trait]
pub trait Tool: Send + Sync {
    fn id(&self) -> ToolId;

    /// Function name exposed to the model.
    fn name(&self) -> &str {
        self.id().name()
    }

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    async fn invoke(&self, args: Value, ctx: &ToolContext<'_>) -> std::result::Result<String, ToolError>;
}

/// The set of tools available to the relay.
#[derive(Clone, Default)]
pub struct Toolbox {
    tools: Vec<Arc<dyn Tool>>,
}

impl Toolbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five built-in tools, sharing one HTTP client.
    pub fn standard(settings: &ToolSettings, prompts: &Prompts) -> Result<Self> {
        let http = ToolHttp::new(settings)?;
        Ok(Self::new()
            .with(WikipediaLookup::new(http.clone(), settings))
            .with(ArxivSearch::new(http.clone(), settings))
            .with(WebSearch::new(http, settings))
            .with(Calculator)
            .with(MathReasoning::new(prompts.clone())))
    }

    /// Register a tool, replacing any tool with the same id.
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        let id = tool.id();
        self.tools.retain(|t| t.id() != id);
        self.tools.push(Arc::new(tool));
        self
    }

    /// Tools whose ids are in `enabled`, in registration order.
    pub fn select(&self, enabled: &BTreeSet<ToolId>) -> Vec<Arc<dyn Tool>> {
        self.tools
            .iter()
            .filter(|t| enabled.contains(&t.id()))
            .cloned()
            .collect()
    }

    pub fn ids(&self) -> Vec<ToolId> {
        self.tools.iter().map(|t| t.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Pull a required non-empty string argument out of a tool's arguments.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> std::result::Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidInput(format!("Missing '{}' argument", key)))
}

/// Cut text to at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Decode numeric and common named HTML entities in one pass. Unknown ones are left as written.
pub(crate) fn html_decode(s: &str) -> String {
    ENTITY_RE
        .replace_all(s, |caps: &Captures| {
            decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+[0-9]*);").unwrap());

fn decode_entity(name: &str) -> Option<String> {
    if let Some(code) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        return u32::from_str_radix(code, 16).ok().and_then(char::from_u32).map(String::from);
    }
    if let Some(code) = name.strip_prefix('#') {
        return code.parse().ok().and_then(char::from_u32).map(String::from);
    }
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "pi" => "π",
        "Pi" => "Π",
        "times" => "×",
        "divide" => "÷",
        "minus" => "−",
        "plusmn" => "±",
        "le" => "≤",
        "ge" => "≥",
        "ne" => "≠",
        "asymp" => "≈",
        "infin" => "∞",
        "radic" => "√",
        "sum" => "∑",
        "prod" => "∏",
        "int" => "∫",
        "deg" => "°",
        "middot" => "·",
        "sup2" => "²",
        "sup3" => "³",
        "frac12" => "½",
        "frac14" => "¼",
        "frac34" => "¾",
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "Delta" => "Δ",
        "theta" => "θ",
        "lambda" => "λ",
        "mu" => "μ",
        "sigma" => "σ",
        "Sigma" => "Σ",
        "omega" => "ω",
        "hellip" => "…",
        "ndash" => "–",
        "mdash" => "—",
        "lsquo" | "rsquo" => "'",
        "ldquo" | "rdquo" => "\"",
        _ => return None,
    };
    Some(decoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_toolbox_has_every_tool() {
        let toolbox = Toolbox::standard(&ToolSettings::default(), &Prompts::default()).unwrap();
        assert_eq!(toolbox.ids(), ToolId::ALL.to_vec());
    }

    #[test]
    fn test_select_keeps_only_enabled() {
        let toolbox = Toolbox::standard(&ToolSettings::default(), &Prompts::default()).unwrap();
        let enabled = BTreeSet::from([ToolId::Calculator, ToolId::Arxiv]);
        let names: Vec<_> = toolbox
            .select(&enabled)
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["arxiv", "calculator"]);
        assert!(toolbox.select(&BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_with_replaces_same_id() {
        let toolbox = Toolbox::new().with(Calculator).with(Calculator);
        assert_eq!(toolbox.len(), 1);
    }

    #[test]
    fn test_required_str() {
        let args = json!({"query": "  pythagoras ", "blank": "  ", "n": 3});
        assert_eq!(required_str(&args, "query").unwrap(), "pythagoras");
        assert!(required_str(&args, "blank").is_err());
        assert!(required_str(&args, "n").is_err());
        assert!(required_str(&args, "missing").is_err());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_html_decode() {
        assert_eq!(html_decode("a &amp;lt; b &quot;c&quot;"), "a &lt; b \"c\"");
        assert_eq!(html_decode("A = &pi;r&sup2; &times; 2"), "A = πr² × 2");
        assert_eq!(html_decode("&#960; &#x3C0; &#39;"), "π π '");
        assert_eq!(html_decode("&unknown; &#xD800; AT&T"), "&unknown; &#xD800; AT&T");
    }
}
