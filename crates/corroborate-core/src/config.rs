use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::ResearchError;

const DEFAULT_CONFIG_PATH: &str = "corroborate.toml";
const CONFIG_PATH_ENV: &str = "CORROBORATE_CONFIG";

/// Top-level configuration passed explicitly into the orchestrator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub orchestrator: OrchestratorConfig,
    pub limits: LimitsConfig,
    pub synthesis: SynthesisConfig,
    pub digest: DigestConfig,
    pub reliability: ReliabilityConfig,
    pub http: HttpConfig,
}

/// Helper to load configuration with guard rails.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a provided path or discoverable defaults.
    ///
    /// Resolution order:
    /// 1. Explicit `path` argument.
    /// 2. `CORROBORATE_CONFIG` environment variable.
    /// 3. `corroborate.toml` in the current working directory.
    ///
    /// Built-in defaults are used when none of these is given and the default
    /// file does not exist. An explicitly named file must exist.
    pub fn load(path: Option<PathBuf>) -> Result<ResearchConfig, ResearchError> {
        let config = match resolve_path(path) {
            Some(candidate) => Self::load_file(&candidate)?,
            None => ResearchConfig::default(),
        };

        Self::validate(&config)?;
        Ok(config)
    }

    /// Parse a TOML document into a validated configuration.
    pub fn from_toml(raw: &str) -> Result<ResearchConfig, ResearchError> {
        let config: ResearchConfig = toml::from_str(raw)
            .map_err(|err| ResearchError::InvalidConfiguration(err.to_string()))?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<ResearchConfig, ResearchError> {
        let raw = fs::read_to_string(path)
            .map_err(|err| ResearchError::config_io(path.to_path_buf(), err))?;
        toml::from_str(&raw).map_err(|err| ResearchError::InvalidConfiguration(err.to_string()))
    }

    pub fn validate(config: &ResearchConfig) -> Result<(), ResearchError> {
        let invalid = |message: &str| Err(ResearchError::InvalidConfiguration(message.into()));

        if config.orchestrator.worker_count == 0 {
            return invalid("orchestrator.worker_count must be at least 1");
        }
        if config.orchestrator.provider_timeout_ms == 0 {
            return invalid("orchestrator.provider_timeout_ms must be positive");
        }

        let synthesis = &config.synthesis;
        if !(synthesis.similarity_threshold > 0.0 && synthesis.similarity_threshold <= 1.0) {
            return invalid("synthesis.similarity_threshold must be in (0, 1]");
        }
        if !(synthesis.confidence_cap > 0.0 && synthesis.confidence_cap <= 1.0) {
            return invalid("synthesis.confidence_cap must be in (0, 1]");
        }
        if synthesis.mention_weight <= 0.0 {
            return invalid("synthesis.mention_weight must be positive");
        }
        if synthesis.disputed_below > synthesis.verified_above {
            return invalid("synthesis.disputed_below must not exceed synthesis.verified_above");
        }

        if config.digest.per_source_chars == 0 || config.digest.overall_chars == 0 {
            return invalid("digest character caps must be positive");
        }

        let reliability = &config.reliability;
        let scores = [
            reliability.trusted_score,
            reliability.reference_score,
            reliability.unknown_score,
            reliability.missing_url_score,
        ];
        let overrides = reliability.source_overrides.values().copied();
        if scores
            .into_iter()
            .chain(overrides)
            .any(|score| !(0.0..=1.0).contains(&score))
        {
            return invalid("reliability scores must be within [0, 1]");
        }

        Ok(())
    }
}

fn resolve_path(path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = path {
        return Some(path);
    }

    if let Ok(from_env) = env::var(CONFIG_PATH_ENV) {
        if !from_env.trim().is_empty() {
            return Some(PathBuf::from(from_env));
        }
    }

    let default = Path::new(DEFAULT_CONFIG_PATH);
    default.exists().then(|| default.to_path_buf())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum providers fetching at once in deep mode.
    pub worker_count: usize,
    /// Budget for a single provider fetch.
    pub provider_timeout_ms: u64,
}

impl OrchestratorConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_count: 3,
            provider_timeout_ms: 30_000,
        }
    }
}

/// Per-provider result caps for each operating mode.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub quick_web: usize,
    pub quick_encyclopedia: usize,
    pub deep_web: usize,
    pub deep_encyclopedia: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            quick_web: 8,
            quick_encyclopedia: 3,
            deep_web: 15,
            deep_encyclopedia: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Sentences must be strictly longer than this many characters.
    pub min_sentence_chars: usize,
    pub similarity_threshold: f64,
    /// Confidence contributed by each mention before the cap.
    pub mention_weight: f64,
    pub confidence_cap: f64,
    pub verified_above: f64,
    pub disputed_below: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            min_sentence_chars: 30,
            similarity_threshold: 0.3,
            mention_weight: 0.2,
            confidence_cap: 0.9,
            verified_above: 0.7,
            disputed_below: 0.4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Sentences must be strictly longer than this many characters.
    pub min_sentence_chars: usize,
    pub per_source_chars: usize,
    pub overall_chars: usize,
    pub keywords: Vec<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            min_sentence_chars: 20,
            per_source_chars: 300,
            overall_chars: 800,
            keywords: [
                "important",
                "significant",
                "key",
                "main",
                "primary",
                "conclude",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Static trust table used by providers to tag items.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    pub trusted_domains: Vec<String>,
    pub reference_domains: Vec<String>,
    pub trusted_score: f64,
    pub reference_score: f64,
    pub unknown_score: f64,
    pub missing_url_score: f64,
    /// Scores keyed by item source name; consulted before any domain rule.
    pub source_overrides: std::collections::BTreeMap<String, f64>,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        let domains = |list: &[&str]| list.iter().map(|d| d.to_string()).collect();
        Self {
            trusted_domains: domains(&[
                "edu",
                "gov",
                "org",
                "nature.com",
                "science.org",
                "ieee.org",
                "acm.org",
                "arxiv.org",
            ]),
            reference_domains: domains(&[
                "reuters.com",
                "bbc.com",
                "bbc.co.uk",
                "npr.org",
                "pbs.org",
                "wikipedia.org",
                "britannica.com",
            ]),
            trusted_score: 0.9,
            reference_score: 0.7,
            unknown_score: 0.5,
            missing_url_score: 0.3,
            source_overrides: [("Encyclopedia".to_string(), 0.8)].into_iter().collect(),
        }
    }
}

/// Endpoints and transport limits for the network-backed providers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_ms: u64,
    pub scrape_timeout_ms: u64,
    pub duckduckgo_url: String,
    pub bing_url: String,
    pub wikipedia_url: String,
    /// Pause between consecutive search engines.
    pub engine_delay_ms: u64,
    pub scrape_pages: bool,
    pub max_page_chars: usize,
    pub max_summary_chars: usize,
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_millis(self.scrape_timeout_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("corroborate/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_ms: 10_000,
            scrape_timeout_ms: 15_000,
            duckduckgo_url: "https://api.duckduckgo.com".to_string(),
            bing_url: "https://www.bing.com".to_string(),
            wikipedia_url: "https://en.wikipedia.org".to_string(),
            engine_delay_ms: 500,
            scrape_pages: true,
            max_page_chars: 5000,
            max_summary_chars: 2000,
        }
    }
}
