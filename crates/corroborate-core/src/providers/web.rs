//! Web search provider: DuckDuckGo instant answers plus Bing result pages,
//! optionally enriched by scraping each hit's page.

use async_trait::async_trait;
use futures::future::join_all;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tokio::time::{Duration, sleep};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{ReliabilityTable, SourceProvider};
use crate::config::HttpConfig;
use crate::error::ProviderError;
use crate::item::{ResearchItem, SourceKind};
use crate::text::{collapse_whitespace, truncate_chars};

const PROVIDER: &str = "web";
const RELATED_TOPIC_LIMIT: usize = 5;
const MAIN_CONTENT_SELECTORS: [&str; 7] = [
    "article",
    "main",
    ".content",
    ".post-content",
    ".entry-content",
    "#content",
    ".article-body",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchEngine {
    DuckDuckGo,
    Bing,
}

impl SearchEngine {
    const ALL: [SearchEngine; 2] = [SearchEngine::DuckDuckGo, SearchEngine::Bing];

    fn as_str(&self) -> &'static str {
        match self {
            SearchEngine::DuckDuckGo => "duckduckgo",
            SearchEngine::Bing => "bing",
        }
    }
}

#[derive(Debug, Clone)]
struct SearchHit {
    engine: SearchEngine,
    title: String,
    url: Option<String>,
    snippet: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DuckDuckGoResponse {
    #[serde(rename = "Heading")]
    heading: String,
    #[serde(rename = "Abstract")]
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    #[serde(rename = "RelatedTopics")]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelatedTopic {
    #[serde(rename = "Text")]
    text: String,
    #[serde(rename = "FirstURL")]
    first_url: String,
}

pub struct WebProvider {
    client: reqwest::Client,
    http: HttpConfig,
    reliability: ReliabilityTable,
}

impl WebProvider {
    pub fn new(http: HttpConfig, reliability: ReliabilityTable) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(http.request_timeout())
            .user_agent(http.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|source| ProviderError::Client {
                provider: PROVIDER.into(),
                source,
            })?;

        Ok(Self {
            client,
            http,
            reliability,
        })
    }

    /// Query every engine in turn. One engine failing is tolerated; all of
    /// them failing is a provider error.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ProviderError> {
        let per_engine = (limit / SearchEngine::ALL.len()).max(1);
        let mut hits = Vec::new();
        let mut failures = 0;

        for (idx, engine) in SearchEngine::ALL.into_iter().enumerate() {
            if idx > 0 && self.http.engine_delay_ms > 0 {
                sleep(Duration::from_millis(self.http.engine_delay_ms)).await;
            }

            let result = match engine {
                SearchEngine::DuckDuckGo => self.search_duckduckgo(query, per_engine).await,
                SearchEngine::Bing => self.search_bing(query, per_engine).await,
            };

            match result {
                Ok(found) => {
                    debug!(engine = engine.as_str(), hits = found.len(), "search engine answered");
                    hits.extend(found);
                }
                Err(err) => {
                    warn!(engine = engine.as_str(), error = %err, "search engine failed");
                    failures += 1;
                }
            }
        }

        if failures == SearchEngine::ALL.len() {
            return Err(ProviderError::AllEnginesFailed {
                provider: PROVIDER.into(),
            });
        }

        hits.truncate(limit);
        Ok(hits)
    }

    async fn search_duckduckgo(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        let endpoint = format!("{}/", self.http.duckduckgo_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|err| ProviderError::transport(PROVIDER, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: PROVIDER.into(),
                status,
            });
        }

        let body: DuckDuckGoResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::decode(PROVIDER, err.to_string()))?;

        Ok(duckduckgo_hits(body, query, limit))
    }

    async fn search_bing(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ProviderError> {
        let endpoint = format!("{}/search", self.http.bing_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|err| ProviderError::transport(PROVIDER, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: PROVIDER.into(),
                status,
            });
        }

        let html = response
            .text()
            .await
            .map_err(|err| ProviderError::decode(PROVIDER, err.to_string()))?;

        Ok(bing_hits(&html, &endpoint, limit))
    }

    /// Best-effort page retrieval; any failure just keeps the search snippet.
    async fn scrape(&self, url: Option<&str>) -> Option<String> {
        if !self.http.scrape_pages {
            return None;
        }
        let url = url?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return None;
        }

        let response = match self
            .client
            .get(url)
            .timeout(self.http.scrape_timeout())
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(%url, status = %response.status(), "page scrape rejected");
                return None;
            }
            Err(err) => {
                debug!(%url, error = %err, "page scrape failed");
                return None;
            }
        };

        let body = response.text().await.ok()?;
        let text = extract_main_text(&body);
        (!text.is_empty()).then_some(text)
    }
}

#[async_trait]
impl SourceProvider for WebProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Web
    }

    #[instrument(name = "provider.web", skip(self))]
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<ResearchItem>, ProviderError> {
        let hits = self.search(query, limit).await?;
        let pages = join_all(hits.iter().map(|hit| self.scrape(hit.url.as_deref()))).await;

        let mut items = Vec::with_capacity(hits.len());
        for (hit, page) in hits.into_iter().zip(pages) {
            let content = match page {
                Some(text) if text.chars().count() > hit.snippet.chars().count() => text,
                _ => hit.snippet,
            };
            let source_name = format!("WebSearch:{}", hit.engine.as_str());
            let reliability = self.reliability.score(&source_name, hit.url.as_deref());
            let title = if hit.title.is_empty() {
                "Unknown".to_string()
            } else {
                hit.title
            };

            match ResearchItem::new(
                source_name,
                title,
                &content,
                hit.url,
                reliability,
                self.http.max_page_chars,
            ) {
                Ok(item) => items.push(item),
                Err(err) => debug!(error = %err, "dropping malformed web item"),
            }
        }

        debug!(items = items.len(), "web provider collected items");
        Ok(items)
    }
}

fn duckduckgo_hits(body: DuckDuckGoResponse, query: &str, limit: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    if !body.abstract_text.trim().is_empty() {
        let title = if body.heading.trim().is_empty() {
            query.to_string()
        } else {
            body.heading
        };
        hits.push(SearchHit {
            engine: SearchEngine::DuckDuckGo,
            title,
            url: non_empty(body.abstract_url),
            snippet: body.abstract_text,
        });
    }

    let related = body
        .related_topics
        .into_iter()
        .filter(|topic| !topic.text.trim().is_empty())
        .take(RELATED_TOPIC_LIMIT)
        .map(|topic| SearchHit {
            engine: SearchEngine::DuckDuckGo,
            title: truncate_chars(&topic.text, 100).to_string(),
            url: non_empty(topic.first_url),
            snippet: topic.text,
        });
    hits.extend(related);

    hits.truncate(limit);
    hits
}

fn bing_hits(html: &str, endpoint: &str, limit: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let result_sel = selector("li.b_algo");
    let title_sel = selector("h2");
    let link_sel = selector("a");
    let paragraph_sel = selector("p");
    let caption_sel = selector("div.b_caption");
    let base = Url::parse(endpoint).ok();

    document
        .select(&result_sel)
        .filter_map(|result| {
            let title_el = result.select(&title_sel).next()?;
            let snippet_el = result
                .select(&paragraph_sel)
                .next()
                .or_else(|| result.select(&caption_sel).next())?;

            let url = title_el
                .select(&link_sel)
                .next()
                .and_then(|link| link.value().attr("href"))
                .and_then(|href| resolve_href(base.as_ref(), href));

            Some(SearchHit {
                engine: SearchEngine::Bing,
                title: element_text(title_el),
                url,
                snippet: element_text(snippet_el),
            })
        })
        .take(limit)
        .collect()
}

/// Readable text of a page: the first main-content container if present,
/// otherwise the body, skipping script and style contents.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = MAIN_CONTENT_SELECTORS
        .iter()
        .find_map(|css| document.select(&selector(css)).next())
        .or_else(|| document.select(&selector("body")).next());

    let Some(root) = root else {
        return String::new();
    };

    let mut text = String::new();
    for node in root.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| matches!(el.name(), "script" | "style" | "noscript"))
        });
        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }

    collapse_whitespace(&text)
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static CSS selector must parse")
}

fn resolve_href(base: Option<&Url>, href: &str) -> Option<String> {
    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(_) => base.and_then(|base| base.join(href).ok()).map(String::from),
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}
