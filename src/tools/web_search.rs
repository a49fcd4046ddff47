//! Web search through the DuckDuckGo HTML endpoint (no API key needed).

use super::{html_decode, required_str, truncate_chars, Tool, ToolContext, ToolError, ToolHttp};
use crate::config::ToolSettings;
use crate::relay::ToolId;
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;
use tracing::instrument;

const SERVICE: &str = "duckduckgo";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Titles, snippets and links of the top web results.
pub struct WebSearch {
    http: ToolHttp,
    url: String,
    max_results: usize,
    max_chars: usize,
}

impl WebSearch {
    pub fn new(http: ToolHttp, settings: &ToolSettings) -> Self {
        Self {
            http,
            url: settings.search_url.clone(),
            max_results: settings.search_max_results.max(1),
            max_chars: settings.max_chars,
        }
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn id(&self) -> ToolId {
        ToolId::WebSearch
    }

    fn description(&self) -> &str {
        "Search the web for current information, worked examples or facts not found in an \
        encyclopedia. Returns result titles, snippets and URLs."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    #[instrument(skip(self, args, _ctx))]
    async fn invoke(&self, args: Value, _ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let query = required_str(&args, "query")?;
        let url = ToolHttp::url(SERVICE, &self.url, &[("q", query)])?;

        let html = self.http.get_text(SERVICE, url).await?;
        let results = extract_results(&html, self.max_results);

        if results.is_empty() {
            return Ok(format!("No results found for: {}", query));
        }

        Ok(truncate_chars(&results.join("\n\n"), self.max_chars))
    }
}

/// Pull result blocks out of DuckDuckGo's HTML page.
fn extract_results(html: &str, limit: usize) -> Vec<String> {
    html.split("result__body")
        .skip(1)
        .filter_map(|chunk| {
            let title = field_text(chunk, "result__a")?;
            let snippet = field_text(chunk, "result__snippet").unwrap_or_default();
            let url = field_text(chunk, "result__url").unwrap_or_default();
            Some(format!("**{}**\n{}\nURL: {}", title, snippet, url))
        })
        .take(limit)
        .collect()
}

/// Text content of the first element carrying `class`, tags stripped.
fn field_text(chunk: &str, class: &str) -> Option<String> {
    let marker = format!("class=\"{}\"", class);
    let after = chunk.split(marker.as_str()).nth(1)?;
    let (_, rest) = after.split_once('>')?;
    let inner = rest
        .split("</a>")
        .next()
        .map(|s| s.split("</td>").next().unwrap_or(s))
        .unwrap_or(rest);
    let text = html_decode(TAG_RE.replace_all(inner, "").trim());
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}
