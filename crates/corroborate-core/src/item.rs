use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MalformedContentError;
use crate::text::{collapse_whitespace, truncate_chars};

/// Broad category of a provider, used to honour per-run source toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Web,
    Encyclopedia,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Web => "web",
            SourceKind::Encyclopedia => "encyclopedia",
        }
    }
}

/// One unit of gathered material. Read-only once a provider has created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchItem {
    source_name: String,
    title: String,
    content: String,
    url: Option<String>,
    reliability: f64,
    collected_at: DateTime<Utc>,
}

impl ResearchItem {
    /// Build an item, collapsing whitespace and truncating content to
    /// `max_chars` characters. Content that is empty after cleanup is rejected.
    pub fn new(
        source_name: impl Into<String>,
        title: impl Into<String>,
        content: &str,
        url: Option<String>,
        reliability: f64,
        max_chars: usize,
    ) -> Result<Self, MalformedContentError> {
        let source_name = source_name.into();
        let title = title.into();
        let cleaned = collapse_whitespace(content);

        if cleaned.is_empty() {
            return Err(MalformedContentError {
                source_name,
                title,
                reason: "content is empty after cleanup".into(),
            });
        }

        let content = truncate_chars(&cleaned, max_chars).trim_end().to_string();

        Ok(Self {
            source_name,
            title: collapse_whitespace(&title),
            content,
            url: url.filter(|u| !u.trim().is_empty()),
            reliability: reliability.clamp(0.0, 1.0),
            collected_at: Utc::now(),
        })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn reliability(&self) -> f64 {
        self.reliability
    }

    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }
}
