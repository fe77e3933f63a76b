//! Corroborate core: multi-source research with claim corroboration.
//!
//! A query fans out to independent source providers, the collected items are
//! clustered into claims and scored for confidence, summarized per source and
//! overall, and assembled into a [`ResearchReport`].

mod assistant;
mod config;
mod digest;
mod error;
mod item;
mod metrics;
mod orchestrator;
mod providers;
mod report;
mod synthesizer;
mod telemetry;
mod text;

pub use assistant::{NO_RESULTS_MESSAGE, ResearchAssistant};
pub use config::{
    ConfigLoader, DigestConfig, HttpConfig, LimitsConfig, OrchestratorConfig, ReliabilityConfig,
    ResearchConfig, SynthesisConfig,
};
pub use digest::{Digest, DigestBuilder, SourceDigest};
pub use error::{MalformedContentError, ProviderError, ResearchError};
pub use item::{ResearchItem, SourceKind};
pub use metrics::{init_metrics_from_env, record_provider_fetch};
pub use orchestrator::{
    FetchOutcome, FetchRecord, ResearchMode, ResearchOrchestrator, RunOptions,
};
pub use providers::{
    DynProvider, EncyclopediaProvider, ReliabilityTable, SourceProvider, StaticProvider,
    WebProvider, extract_main_text,
};
pub use report::{
    ClaimSummary, ProvenanceEntry, ReportContext, ReportStatistics, ResearchReport, compose,
};
pub use synthesizer::{ClaimCluster, ClaimVerdict, Sentence, Synthesis, Synthesizer};
pub use telemetry::{TelemetryOptions, init_telemetry};
