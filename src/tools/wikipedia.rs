//! Encyclopedia lookup through the MediaWiki API.

use super::{required_str, truncate_chars, Tool, ToolContext, ToolError, ToolHttp};
use crate::config::ToolSettings;
use crate::relay::ToolId;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::instrument;

const SERVICE: &str = "wikipedia";
const NO_RESULT: &str = "No good Wikipedia Search Result was found";

/// Summaries of the top matching Wikipedia pages.
pub struct WikipediaLookup {
    http: ToolHttp,
    api: String,
    top_k: usize,
    max_chars: usize,
}

impl WikipediaLookup {
    pub fn new(http: ToolHttp, settings: &ToolSettings) -> Self {
        Self {
            http,
            api: settings.wikipedia_api.clone(),
            top_k: settings.wikipedia_top_k.max(1),
            max_chars: settings.max_chars,
        }
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        let limit = self.top_k.to_string();
        let url = ToolHttp::url(
            SERVICE,
            &self.api,
            &[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", &limit),
                ("format", "json"),
            ],
        )?;

        let response: SearchResponse = self.http.get_json(SERVICE, url).await?;
        Ok(response.query.map(|q| q.search).unwrap_or_default())
    }

    async fn extracts(&self, hits: &[SearchHit]) -> Result<HashMap<u64, Page>, ToolError> {
        let ids = hits
            .iter()
            .map(|h| h.pageid.to_string())
            .collect::<Vec<_>>()
            .join("|");
        let url = ToolHttp::url(
            SERVICE,
            &self.api,
            &[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("format", "json"),
                ("pageids", &ids),
            ],
        )?;

        let response: ExtractResponse = self.http.get_json(SERVICE, url).await?;
        let pages = response.query.map(|q| q.pages).unwrap_or_default();
        Ok(pages.into_values().map(|p| (p.pageid, p)).collect())
    }
}

#[async_trait]
impl Tool for WikipediaLookup {
    fn id(&self) -> ToolId {
        ToolId::Wikipedia
    }

    fn description(&self) -> &str {
        "Look up general knowledge on Wikipedia: definitions, formulas, historical facts, \
        people, places and units. Input is a short search query."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search Wikipedia for"
                }
            },
            "required": ["query"]
        })
    }

    #[instrument(skip(self, args, _ctx))]
    async fn invoke(&self, args: Value, _ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let query = required_str(&args, "query")?;

        let hits = self.search_titles(query).await?;
        if hits.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        let pages = self.extracts(&hits).await?;
        let summaries: Vec<String> = hits
            .iter()
            .filter_map(|hit| {
                let page = pages.get(&hit.pageid)?;
                let extract = page.extract.as_deref().unwrap_or("").trim();
                (!extract.is_empty())
                    .then(|| format!("Page: {}\nSummary: {}", page.title, extract))
            })
            .collect();

        if summaries.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        Ok(truncate_chars(&summaries.join("\n\n"), self.max_chars))
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    pageid: u64,
}

#[derive(Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Deserialize)]
struct Page {
    pageid: u64,
    title: String,
    extract: Option<String>,
}
