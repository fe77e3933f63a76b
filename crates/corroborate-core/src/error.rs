use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Core error type for Corroborate.
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("I/O error while reading {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("query is empty")]
    EmptyQuery,
    #[error("no research results found for \"{query}\"")]
    NoResults { query: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ResearchError {
    pub fn config_io(path: PathBuf, source: std::io::Error) -> Self {
        Self::ConfigIo { path, source }
    }

    pub fn is_no_results(&self) -> bool {
        matches!(self, Self::NoResults { .. })
    }
}

/// Failure of a single source provider. Always recovered by the orchestrator.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: failed to build HTTP client: {source}")]
    Client {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider}: request failed: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider}: unexpected HTTP status {status}")]
    Status {
        provider: String,
        status: reqwest::StatusCode,
    },
    #[error("{provider}: could not decode response: {reason}")]
    Decode { provider: String, reason: String },
    #[error("{provider}: every search engine failed")]
    AllEnginesFailed { provider: String },
    #[error("{provider}: timed out after {}ms", .after.as_millis())]
    Timeout { provider: String, after: Duration },
}

impl ProviderError {
    pub fn transport(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            provider: provider.into(),
            source,
        }
    }

    pub fn decode(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::Client { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Status { provider, .. }
            | Self::Decode { provider, .. }
            | Self::AllEnginesFailed { provider }
            | Self::Timeout { provider, .. } => provider,
        }
    }
}

/// A fetched item whose content is unusable; the item is dropped, never fatal.
#[derive(Debug, Clone, Error)]
#[error("malformed content in \"{title}\" from {source_name}: {reason}")]
pub struct MalformedContentError {
    pub source_name: String,
    pub title: String,
    pub reason: String,
}
