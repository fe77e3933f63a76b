use url::Url;

use crate::config::ReliabilityConfig;

/// Deterministic trust lookup by source name, then by URL host.
#[derive(Debug, Clone)]
pub struct ReliabilityTable {
    config: ReliabilityConfig,
}

impl ReliabilityTable {
    pub fn new(config: ReliabilityConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, source_name: &str, url: Option<&str>) -> f64 {
        if let Some(score) = self.config.source_overrides.get(source_name) {
            return *score;
        }

        let host = url
            .and_then(|raw| Url::parse(raw).ok())
            .and_then(|parsed| parsed.host_str().map(str::to_lowercase));

        let Some(host) = host else {
            return self.config.missing_url_score;
        };

        let trusted = longest_match(&host, &self.config.trusted_domains);
        let reference = longest_match(&host, &self.config.reference_domains);

        // The more specific rule decides, so "npr.org" beats "org".
        match (trusted, reference) {
            (Some(t), Some(r)) if r > t => self.config.reference_score,
            (Some(_), _) => self.config.trusted_score,
            (None, Some(_)) => self.config.reference_score,
            (None, None) => self.config.unknown_score,
        }
    }
}

impl Default for ReliabilityTable {
    fn default() -> Self {
        Self::new(ReliabilityConfig::default())
    }
}

// A rule matches the host itself or any subdomain of it, so "edu" covers
// "mit.edu" but never "education.com". Returns the length of the longest
// matching rule.
fn longest_match(host: &str, rules: &[String]) -> Option<usize> {
    rules
        .iter()
        .map(|rule| rule.trim_start_matches('.').to_lowercase())
        .filter(|rule| host == rule || host.ends_with(&format!(".{rule}")))
        .map(|rule| rule.len())
        .max()
}
