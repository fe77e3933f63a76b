//! Encyclopedia provider backed by the Wikipedia search and page-summary APIs.
//! Disambiguation pages are resolved to their first linked article.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{ReliabilityTable, SourceProvider};
use crate::config::HttpConfig;
use crate::error::ProviderError;
use crate::item::{ResearchItem, SourceKind};

const PROVIDER: &str = "encyclopedia";
const SOURCE_NAME: &str = "Encyclopedia";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    search: Vec<SearchEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchEntry {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageSummary {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    extract: String,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentUrls {
    desktop: Option<PageUrls>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageUrls {
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LinksResponse {
    query: LinksQuery,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LinksQuery {
    pages: BTreeMap<String, LinkedPage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LinkedPage {
    links: Vec<PageLink>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageLink {
    title: String,
}

impl LinksResponse {
    fn first_title(self) -> Option<String> {
        self.query
            .pages
            .into_values()
            .flat_map(|page| page.links)
            .map(|link| link.title)
            .find(|title| !title.trim().is_empty())
    }
}

enum SummaryLookup {
    Page(PageSummary),
    Disambiguation,
    Missing,
}

impl PageSummary {
    fn page_url(&self) -> Option<String> {
        self.content_urls
            .as_ref()
            .and_then(|urls| urls.desktop.as_ref())
            .and_then(|desktop| desktop.page.clone())
    }
}

pub struct EncyclopediaProvider {
    client: reqwest::Client,
    http: HttpConfig,
    reliability: ReliabilityTable,
}

impl EncyclopediaProvider {
    pub fn new(http: HttpConfig, reliability: ReliabilityTable) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(http.request_timeout())
            .user_agent(http.user_agent.clone())
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

    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<String>, ProviderError> {
        let endpoint = format!("{}/w/api.php", self.http.wikipedia_url.trim_end_matches('/'));
        let limit = limit.to_string();
        let response = self
            .client
            .get(&endpoint)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
                ("utf8", "1"),
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

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::decode(PROVIDER, err.to_string()))?;

        Ok(body
            .query
            .search
            .into_iter()
            .map(|entry| entry.title)
            .filter(|title| !title.trim().is_empty())
            .collect())
    }

    /// Summary for `title`. A disambiguation page is replaced by its first
    /// linked article; `Ok(None)` when nothing usable remains.
    async fn page_summary(&self, title: &str) -> Result<Option<PageSummary>, ProviderError> {
        match self.lookup_summary(title).await? {
            SummaryLookup::Page(page) => Ok(Some(page)),
            SummaryLookup::Missing => Ok(None),
            SummaryLookup::Disambiguation => {
                let Some(option) = self.first_linked_title(title).await? else {
                    debug!(%title, "disambiguation page has no article links");
                    return Ok(None);
                };
                debug!(%title, %option, "following disambiguation page");
                match self.lookup_summary(&option).await? {
                    SummaryLookup::Page(page) => Ok(Some(page)),
                    SummaryLookup::Disambiguation | SummaryLookup::Missing => Ok(None),
                }
            }
        }
    }

    async fn first_linked_title(&self, title: &str) -> Result<Option<String>, ProviderError> {
        let endpoint = format!("{}/w/api.php", self.http.wikipedia_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&endpoint)
            .query(&[
                ("action", "query"),
                ("prop", "links"),
                ("titles", title),
                ("plnamespace", "0"),
                ("pllimit", "1"),
                ("format", "json"),
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

        let body: LinksResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::decode(PROVIDER, err.to_string()))?;
        Ok(body.first_title())
    }

    async fn lookup_summary(&self, title: &str) -> Result<SummaryLookup, ProviderError> {
        let url = self.summary_url(title)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ProviderError::transport(PROVIDER, err))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(SummaryLookup::Missing);
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: PROVIDER.into(),
                status,
            });
        }

        let summary: PageSummary = response
            .json()
            .await
            .map_err(|err| ProviderError::decode(PROVIDER, err.to_string()))?;

        if summary.kind == "disambiguation" {
            return Ok(SummaryLookup::Disambiguation);
        }
        Ok(SummaryLookup::Page(summary))
    }

    fn summary_url(&self, title: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.http.wikipedia_url)
            .map_err(|err| ProviderError::decode(PROVIDER, format!("invalid base url: {err}")))?;
        let slug = title.replace(' ', "_");
        url.path_segments_mut()
            .map_err(|_| ProviderError::decode(PROVIDER, "base url cannot carry a path"))?
            .pop_if_empty()
            .extend(["api", "rest_v1", "page", "summary", slug.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl SourceProvider for EncyclopediaProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Encyclopedia
    }

    #[instrument(name = "provider.encyclopedia", skip(self))]
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<ResearchItem>, ProviderError> {
        let titles = self.search_titles(query, limit).await?;
        let summaries = join_all(titles.iter().map(|title| self.page_summary(title))).await;

        let mut items = Vec::with_capacity(titles.len());
        for (title, summary) in titles.iter().zip(summaries) {
            let page = match summary {
                Ok(Some(page)) => page,
                Ok(None) => {
                    debug!(%title, "skipping page without a usable summary");
                    continue;
                }
                Err(err) => {
                    warn!(%title, error = %err, "failed to load page summary");
                    continue;
                }
            };

            let url = page.page_url();
            let reliability = self.reliability.score(SOURCE_NAME, url.as_deref());
            let page_title = if page.title.trim().is_empty() {
                title.clone()
            } else {
                page.title
            };

            match ResearchItem::new(
                SOURCE_NAME,
                page_title,
                &page.extract,
                url,
                reliability,
                self.http.max_summary_chars,
            ) {
                Ok(item) => items.push(item),
                Err(err) => debug!(error = %err, "dropping malformed encyclopedia item"),
            }
        }

        debug!(items = items.len(), "encyclopedia provider collected items");
        Ok(items)
    }
}
