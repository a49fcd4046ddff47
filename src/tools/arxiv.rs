//! Academic paper search through the arXiv Atom API.

use super::{html_decode, required_str, truncate_chars, Tool, ToolContext, ToolError, ToolHttp};
use crate::config::ToolSettings;
use crate::relay::ToolId;
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;
use tracing::instrument;

const SERVICE: &str = "arxiv";
const NO_RESULT: &str = "No good Arxiv Result was found";

/// arXiv rejects very long queries.
const MAX_QUERY_CHARS: usize = 300;

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").unwrap());
static PUBLISHED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<published>(.*?)</published>").unwrap());
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<title>(.*?)</title>").unwrap());
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<summary>(.*?)</summary>").unwrap());
static AUTHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").unwrap());

/// Metadata and abstracts of the best matching papers.
pub struct ArxivSearch {
    http: ToolHttp,
    api: String,
    top_k: usize,
    max_chars: usize,
}

impl ArxivSearch {
    pub fn new(http: ToolHttp, settings: &ToolSettings) -> Self {
        Self {
            http,
            api: settings.arxiv_api.clone(),
            top_k: settings.arxiv_top_k.max(1),
            max_chars: settings.max_chars,
        }
    }
}

#[async_trait]
impl Tool for ArxivSearch {
    fn id(&self) -> ToolId {
        ToolId::Arxiv
    }

    fn description(&self) -> &str {
        "Search arXiv for academic papers in mathematics, physics, computer science and \
        statistics. Returns publication date, title, authors and abstract."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search terms for the paper"
                }
            },
            "required": ["query"]
        })
    }

    #[instrument(skip(self, args, _ctx))]
    async fn invoke(&self, args: Value, _ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let query = truncate_chars(required_str(&args, "query")?, MAX_QUERY_CHARS);
        let search = format!("all:{}", query);
        let max_results = self.top_k.to_string();

        let url = ToolHttp::url(
            SERVICE,
            &self.api,
            &[
                ("search_query", search.as_str()),
                ("start", "0"),
                ("max_results", &max_results),
            ],
        )?;

        let feed = self.http.get_text(SERVICE, url).await?;
        let papers = parse_feed(&feed);

        if papers.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        let formatted = papers
            .iter()
            .take(self.top_k)
            .map(Paper::to_string)
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(truncate_chars(&formatted, self.max_chars))
    }
}

#[derive(Debug, PartialEq)]
struct Paper {
    published: String,
    title: String,
    authors: Vec<String>,
    summary: String,
}

impl std::fmt::Display for Paper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
            self.published,
            self.title,
            self.authors.join(", "),
            self.summary
        )
    }
}

/// Extract papers from an Atom feed. The feed's own `<title>` sits outside
/// any `<entry>` and is ignored.
fn parse_feed(feed: &str) -> Vec<Paper> {
    ENTRY_RE
        .captures_iter(feed)
        .filter_map(|entry| {
            let body = entry.get(1)?.as_str();
            let title = capture(&TITLE_RE, body)?;
            let published = capture(&PUBLISHED_RE, body)
                .map(|p| p.chars().take(10).collect())
                .unwrap_or_default();
            let summary = capture(&SUMMARY_RE, body).unwrap_or_default();
            let authors = AUTHOR_RE
                .captures_iter(body)
                .filter_map(|c| c.get(1).map(|m| clean(m.as_str())))
                .collect();

            Some(Paper {
                published,
                title,
                authors,
                summary,
            })
        })
        .collect()
}

fn capture(re: &Regex, body: &str) -> Option<String> {
    re.captures(body)
        .and_then(|c| c.get(1))
        .map(|m| clean(m.as_str()))
}

/// Collapse whitespace and decode entities.
fn clean(text: &str) -> String {
    html_decode(&text.split_whitespace().collect::<Vec<_>>().join(" "))
}
