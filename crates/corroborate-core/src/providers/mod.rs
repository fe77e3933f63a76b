mod encyclopedia;
mod reliability;
mod web;

pub use encyclopedia::EncyclopediaProvider;
pub use reliability::ReliabilityTable;
pub use web::{WebProvider, extract_main_text};

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::ProviderError;
use crate::item::{ResearchItem, SourceKind};

/// Capability shared by every source of research material.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<ResearchItem>, ProviderError>;
}

pub type DynProvider = Arc<dyn SourceProvider>;

/// In-memory provider keyed by query, for tests and offline runs.
pub struct StaticProvider {
    name: String,
    kind: SourceKind,
    store: DashMap<String, Vec<ResearchItem>>,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            store: DashMap::new(),
        }
    }

    pub fn insert(&self, query: impl Into<String>, items: Vec<ResearchItem>) {
        self.store.entry(query.into()).or_default().extend(items);
    }

    pub fn with_items(self, query: impl Into<String>, items: Vec<ResearchItem>) -> Self {
        self.insert(query, items);
        self
    }
}

#[async_trait]
impl SourceProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<ResearchItem>, ProviderError> {
        Ok(self
            .store
            .get(query)
            .map(|entry| entry.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
