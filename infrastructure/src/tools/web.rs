//! Web tools: web_search, web_fetch
//!
//! `web_search` routes to the configured engine: the DuckDuckGo instant
//! answer API (no key required) or a SearXNG instance's JSON API.
//! `web_fetch` pulls a page and extracts its readable text.

use conductor_domain::tool::entities::{WebFetchArgs, WebSearchArgs};
use conductor_domain::tool::value_objects::{ToolError, ToolResult, ToolResultMetadata};
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

/// Default max extracted text size for web_fetch (50 KB)
const DEFAULT_MAX_TEXT: usize = 50 * 1024;

/// Maximum results rendered per search
const MAX_SEARCH_RESULTS: usize = 10;

const USER_AGENT: &str = "Conductor/0.4 (agent tool)";

/// Which search backend web_search talks to.
#[derive(Debug, Clone)]
pub enum SearchEngine {
    DuckDuckGo,
    SearxNg { url: String },
}

impl Default for SearchEngine {
    fn default() -> Self {
        SearchEngine::DuckDuckGo
    }
}

pub async fn execute_web_search(
    client: &reqwest::Client,
    engine: &SearchEngine,
    args: &WebSearchArgs,
) -> ToolResult {
    let start = Instant::now();
    debug!(query = %args.query, "web search");

    let outcome = match engine {
        SearchEngine::DuckDuckGo => duckduckgo_search(client, &args.query).await,
        SearchEngine::SearxNg { url } => searxng_search(client, url, &args.query).await,
    };

    match outcome {
        Ok(output) => {
            ToolResult::success("web_search", output).with_metadata(ToolResultMetadata {
                duration_ms: Some(start.elapsed().as_millis() as u64),
                ..Default::default()
            })
        }
        Err(message) => ToolResult::failure("web_search", ToolError::execution_failed(message)),
    }
}

async fn duckduckgo_search(client: &reqwest::Client, query: &str) -> Result<String, String> {
    let response = client
        .get("https://api.duckduckgo.com/")
        .query(&[
            ("q", query),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ])
        .header("User-Agent", USER_AGENT)
        .send()
        .await
        .map_err(|e| format!("search request failed: {e}"))?;
    if !response.status().is_success() {
        return Err(format!("search returned HTTP {}", response.status()));
    }
    let body: Value = response
        .json()
        .await
        .map_err(|e| format!("unparseable search response: {e}"))?;

    let mut sections = Vec::new();
    if let Some(abstract_text) = body["AbstractText"].as_str().filter(|s| !s.is_empty()) {
        let source = body["AbstractSource"].as_str().unwrap_or("unknown");
        sections.push(format!("## Summary ({source})\n{abstract_text}"));
    }
    if let Some(answer) = body["Answer"].as_str().filter(|s| !s.is_empty()) {
        sections.push(format!("## Answer\n{answer}"));
    }
    if let Some(definition) = body["Definition"].as_str().filter(|s| !s.is_empty()) {
        sections.push(format!("## Definition\n{definition}"));
    }
    if let Some(topics) = body["RelatedTopics"].as_array() {
        let lines: Vec<String> = topics
            .iter()
            .filter_map(|t| {
                let text = t["Text"].as_str()?;
                let url = t["FirstURL"].as_str()?;
                Some(format!("- {text} ({url})"))
            })
            .take(MAX_SEARCH_RESULTS)
            .collect();
        if !lines.is_empty() {
            sections.push(format!("## Related\n{}", lines.join("\n")));
        }
    }

    if sections.is_empty() {
        Ok(format!("No instant results for: {query}"))
    } else {
        Ok(sections.join("\n\n"))
    }
}

async fn searxng_search(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
) -> Result<String, String> {
    let url = format!("{}/search", base_url.trim_end_matches('/'));
    let response = client
        .get(&url)
        .query(&[("q", query), ("format", "json")])
        .header("User-Agent", USER_AGENT)
        .send()
        .await
        .map_err(|e| format!("search request failed: {e}"))?;
    if !response.status().is_success() {
        return Err(format!("search returned HTTP {}", response.status()));
    }
    let body: Value = response
        .json()
        .await
        .map_err(|e| format!("unparseable search response: {e}"))?;

    let results: Vec<String> = body["results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .take(MAX_SEARCH_RESULTS)
                .filter_map(|item| {
                    let title = item["title"].as_str()?;
                    let url = item["url"].as_str()?;
                    let content = item["content"].as_str().unwrap_or("");
                    Some(format!("- {title}\n  {url}\n  {content}"))
                })
                .collect()
        })
        .unwrap_or_default();

    if results.is_empty() {
        Ok(format!("No results for: {query}"))
    } else {
        Ok(results.join("\n"))
    }
}

pub async fn execute_web_fetch(client: &reqwest::Client, args: &WebFetchArgs) -> ToolResult {
    let start = Instant::now();
    let max_length = args.max_length.map(|v| v as usize).unwrap_or(DEFAULT_MAX_TEXT);

    let response = match client
        .get(&args.url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            return ToolResult::failure(
                "web_fetch",
                ToolError::execution_failed(format!("failed to fetch URL: {e}")),
            );
        }
    };

    let status = response.status();
    if !status.is_success() {
        return ToolResult::failure(
            "web_fetch",
            ToolError::execution_failed(format!("HTTP {} fetching {}", status.as_u16(), args.url)),
        );
    }

    let html = match response.text().await {
        Ok(html) => html,
        Err(e) => {
            return ToolResult::failure(
                "web_fetch",
                ToolError::execution_failed(format!("failed to read body: {e}")),
            );
        }
    };

    let mut text = extract_text(&html);
    if text.len() > max_length {
        let mut end = max_length;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push_str("\n... (truncated)");
    }

    let bytes = text.len();
    ToolResult::success("web_fetch", text).with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        bytes: Some(bytes),
        ..Default::default()
    })
}

/// Strip markup and boilerplate, keeping readable text lines.
fn extract_text(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse("body").ok();

    let root_text = match selector.as_ref().and_then(|s| document.select(s).next()) {
        Some(body) => collect_text(body),
        None => document.root_element().text().collect::<Vec<_>>().join(" "),
    };

    fn collect_text(element: scraper::ElementRef<'_>) -> String {
        let mut out = String::new();
        for node in element.children() {
            if let Some(child) = scraper::ElementRef::wrap(node) {
                let tag = child.value().name();
                if ["script", "style", "noscript"].contains(&tag) {
                    continue;
                }
                out.push_str(&collect_text(child));
                if matches!(tag, "p" | "div" | "br" | "li" | "h1" | "h2" | "h3" | "h4" | "tr") {
                    out.push('\n');
                }
            } else if let Some(text) = node.value().as_text() {
                out.push_str(text);
            }
        }
        out
    }

    root_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
