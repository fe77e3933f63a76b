//! Research orchestrator: bounded concurrent fan-out to source providers,
//! fan-in into a single item buffer, then synthesis, digest and report.
//!
//! A provider that fails, panics or exceeds its timeout contributes nothing
//! and never fails the run; the run fails only when the buffer ends up empty.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{Instrument, info, info_span, warn};

use crate::config::{ConfigLoader, ResearchConfig};
use crate::digest::DigestBuilder;
use crate::error::{ProviderError, ResearchError};
use crate::item::{ResearchItem, SourceKind};
use crate::metrics::record_provider_fetch;
use crate::providers::{DynProvider, EncyclopediaProvider, ReliabilityTable, WebProvider};
use crate::report::{ReportContext, ResearchReport, compose};
use crate::synthesizer::Synthesizer;

/// Fan-out volume. Both modes share the same synthesis and report logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchMode {
    /// Small per-provider caps, providers queried one at a time.
    Quick,
    /// Larger caps, providers queried concurrently on the worker pool.
    Deep,
}

impl ResearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchMode::Quick => "quick",
            ResearchMode::Deep => "deep",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub use_web: bool,
    pub use_encyclopedia: bool,
    pub mode: ResearchMode,
}

impl RunOptions {
    pub fn quick() -> Self {
        Self {
            use_web: true,
            use_encyclopedia: true,
            mode: ResearchMode::Quick,
        }
    }

    pub fn deep(use_web: bool, use_encyclopedia: bool) -> Self {
        Self {
            use_web,
            use_encyclopedia,
            mode: ResearchMode::Deep,
        }
    }

    fn allows(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Web => self.use_web,
            SourceKind::Encyclopedia => self.use_encyclopedia,
        }
    }
}

/// Outcome of one provider fetch
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Success { items: usize },
    Failure { reason: String },
    Timeout,
}

impl FetchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOutcome::Success { .. } => "success",
            FetchOutcome::Failure { .. } => "failure",
            FetchOutcome::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchRecord {
    pub provider: String,
    pub kind: SourceKind,
    pub outcome: FetchOutcome,
    pub duration_ms: u64,
}

struct ProviderRun {
    record: FetchRecord,
    items: Vec<ResearchItem>,
}

pub struct ResearchOrchestrator {
    config: ResearchConfig,
    providers: Vec<DynProvider>,
    synthesizer: Synthesizer,
    digest_builder: DigestBuilder,
}

impl ResearchOrchestrator {
    /// An orchestrator with no providers registered.
    pub fn new(config: ResearchConfig) -> Self {
        Self {
            synthesizer: Synthesizer::new(config.synthesis.clone()),
            digest_builder: DigestBuilder::new(config.digest.clone()),
            providers: Vec::new(),
            config,
        }
    }

    /// An orchestrator wired to the web and encyclopedia providers.
    pub fn with_default_providers(config: ResearchConfig) -> Result<Self, ResearchError> {
        ConfigLoader::validate(&config)?;
        let table = ReliabilityTable::new(config.reliability.clone());
        let web = WebProvider::new(config.http.clone(), table.clone())?;
        let encyclopedia = EncyclopediaProvider::new(config.http.clone(), table)?;

        Ok(Self::new(config)
            .register(Arc::new(web))
            .register(Arc::new(encyclopedia)))
    }

    pub fn register(mut self, provider: DynProvider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    fn limit_for(&self, kind: SourceKind, mode: ResearchMode) -> usize {
        let limits = &self.config.limits;
        match (mode, kind) {
            (ResearchMode::Quick, SourceKind::Web) => limits.quick_web,
            (ResearchMode::Quick, SourceKind::Encyclopedia) => limits.quick_encyclopedia,
            (ResearchMode::Deep, SourceKind::Web) => limits.deep_web,
            (ResearchMode::Deep, SourceKind::Encyclopedia) => limits.deep_encyclopedia,
        }
    }

    /// Research `query` end to end.
    pub async fn run(
        &self,
        query: &str,
        options: RunOptions,
    ) -> Result<ResearchReport, ResearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResearchError::EmptyQuery);
        }

        let context = ReportContext::new(query);
        let span = info_span!(
            "research.run",
            run_id = %context.run_id,
            query,
            mode = options.mode.as_str()
        );

        async move {
            info!("starting research");
            let (items, fetches) = self.gather(query, options).await;
            info!(
                items = items.len(),
                providers = fetches.len(),
                "collected research items"
            );

            if items.is_empty() {
                return Err(ResearchError::NoResults {
                    query: query.to_string(),
                });
            }

            let synthesis = self.synthesizer.cluster_and_score(&items);
            let digest = self.digest_builder.digest(&items);
            let report = compose(context, digest, synthesis, &items, fetches);

            info!(
                clusters = report.clusters.len(),
                verified = report.statistics.verified_count,
                disputed = report.statistics.disputed_count,
                "research complete"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Fan out to every enabled provider and collect items in completion order.
    async fn gather(
        &self,
        query: &str,
        options: RunOptions,
    ) -> (Vec<ResearchItem>, Vec<FetchRecord>) {
        let workers = match options.mode {
            ResearchMode::Quick => 1,
            ResearchMode::Deep => self.config.orchestrator.worker_count.max(1),
        };
        let semaphore = Arc::new(Semaphore::new(workers));
        let budget = self.config.orchestrator.provider_timeout();
        let mut tasks = JoinSet::new();

        for provider in self
            .providers
            .iter()
            .filter(|provider| options.allows(provider.kind()))
        {
            let provider = Arc::clone(provider);
            let semaphore = Arc::clone(&semaphore);
            let query = query.to_string();
            let limit = self.limit_for(provider.kind(), options.mode);

            tasks.spawn(
                async move { run_provider(provider, semaphore, &query, limit, budget).await }
                    .in_current_span(),
            );
        }

        let mut buffer = Vec::new();
        let mut fetches = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(run) => {
                    let record = run.record;
                    let count = run.items.len();
                    record_provider_fetch(
                        &record.provider,
                        record.outcome.as_str(),
                        record.duration_ms,
                        count,
                    );
                    buffer.extend(run.items);
                    fetches.push(record);
                }
                Err(err) => warn!(error = %err, "provider task did not complete"),
            }
        }

        (buffer, fetches)
    }
}

/// Waiting for a worker and the fetch itself are each bounded by `budget`.
async fn run_provider(
    provider: DynProvider,
    semaphore: Arc<Semaphore>,
    query: &str,
    limit: usize,
    budget: Duration,
) -> ProviderRun {
    let name = provider.name().to_string();
    let kind = provider.kind();

    let queued = Instant::now();
    let _permit = match timeout(budget, semaphore.acquire_owned()).await {
        Ok(permit) => permit.ok(),
        Err(_) => {
            warn!(provider = %name, "no worker became free within the provider budget");
            return ProviderRun {
                record: FetchRecord {
                    provider: name,
                    kind,
                    outcome: FetchOutcome::Timeout,
                    duration_ms: queued.elapsed().as_millis() as u64,
                },
                items: Vec::new(),
            };
        }
    };

    let started = Instant::now();
    let attempt = AssertUnwindSafe(provider.fetch(query, limit)).catch_unwind();
    let result = timeout(budget, attempt).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let (outcome, items) = match result {
        Ok(Ok(Ok(items))) => {
            info!(provider = %name, items = items.len(), duration_ms, "provider finished");
            (FetchOutcome::Success { items: items.len() }, items)
        }
        Ok(Ok(Err(err))) => {
            warn!(provider = %name, error = %err, duration_ms, "provider failed");
            (
                FetchOutcome::Failure {
                    reason: err.to_string(),
                },
                Vec::new(),
            )
        }
        Ok(Err(panic)) => {
            let reason = panic_message(panic.as_ref());
            warn!(provider = %name, %reason, "provider panicked");
            (FetchOutcome::Failure { reason }, Vec::new())
        }
        Err(_) => {
            let err = ProviderError::Timeout {
                provider: name.clone(),
                after: budget,
            };
            warn!(error = %err, "provider abandoned");
            (FetchOutcome::Timeout, Vec::new())
        }
    };

    ProviderRun {
        record: FetchRecord {
            provider: name,
            kind,
            outcome,
            duration_ms,
        },
        items,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "provider panicked".to_string()
    }
}
