use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::digest::{Digest, SourceDigest};
use crate::item::ResearchItem;
use crate::orchestrator::FetchRecord;
use crate::synthesizer::{ClaimCluster, Synthesis};

const NO_SUMMARY: &str = "No summary available.";

/// Identity of the run a report is produced for.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub run_id: Uuid,
    pub query: String,
    pub generated_at: DateTime<Utc>,
}

impl ReportContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            query: query.into(),
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimSummary {
    pub text: String,
    pub confidence: f64,
    pub mentions: usize,
    pub sources: Vec<String>,
}

impl From<&ClaimCluster> for ClaimSummary {
    fn from(cluster: &ClaimCluster) -> Self {
        Self {
            text: cluster.representative_text().to_string(),
            confidence: cluster.confidence(),
            mentions: cluster.member_count(),
            sources: cluster
                .source_names()
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportStatistics {
    /// Number of items consumed.
    pub source_count: usize,
    /// Mean reliability over every item, clustered or not.
    pub average_reliability: f64,
    pub verified_count: usize,
    pub disputed_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvenanceEntry {
    pub title: String,
    pub url: Option<String>,
    pub source_name: String,
}

/// Final artifact of one research run.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchReport {
    pub run_id: Uuid,
    pub query: String,
    pub generated_at: DateTime<Utc>,
    pub overall_summary: String,
    pub statistics: ReportStatistics,
    pub digests: Vec<SourceDigest>,
    pub verified: Vec<ClaimSummary>,
    pub disputed: Vec<ClaimSummary>,
    /// Every retained cluster, including those in neither section.
    pub clusters: Vec<ClaimCluster>,
    /// One entry per consumed item, in buffer order.
    pub provenance: Vec<ProvenanceEntry>,
    pub fetches: Vec<FetchRecord>,
}

/// Assemble the report. Pure: no I/O, output depends only on the inputs.
pub fn compose(
    context: ReportContext,
    digest: Digest,
    synthesis: Synthesis,
    items: &[ResearchItem],
    fetches: Vec<FetchRecord>,
) -> ResearchReport {
    let verified: Vec<ClaimSummary> = synthesis.verified().map(ClaimSummary::from).collect();
    let disputed: Vec<ClaimSummary> = synthesis.disputed().map(ClaimSummary::from).collect();

    let average_reliability = if items.is_empty() {
        0.0
    } else {
        items.iter().map(ResearchItem::reliability).sum::<f64>() / items.len() as f64
    };

    let provenance = items
        .iter()
        .map(|item| ProvenanceEntry {
            title: item.title().to_string(),
            url: item.url().map(String::from),
            source_name: item.source_name().to_string(),
        })
        .collect();

    ResearchReport {
        run_id: context.run_id,
        query: context.query,
        generated_at: context.generated_at,
        overall_summary: digest.overall_summary,
        statistics: ReportStatistics {
            source_count: items.len(),
            average_reliability,
            verified_count: verified.len(),
            disputed_count: disputed.len(),
        },
        digests: digest.sources,
        verified,
        disputed,
        clusters: synthesis.clusters,
        provenance,
        fetches,
    }
}

impl ResearchReport {
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# Research Report: {}", self.query);
        let _ = writeln!(
            out,
            "Generated on: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        );
        out.push('\n');

        out.push_str("## Executive Summary\n");
        let _ = writeln!(out, "{}", or_placeholder(&self.overall_summary));
        out.push('\n');

        let stats = &self.statistics;
        out.push_str("## Research Statistics\n");
        let _ = writeln!(out, "- Total sources analyzed: {}", stats.source_count);
        let _ = writeln!(
            out,
            "- Average source reliability: {:.2}",
            stats.average_reliability
        );
        let _ = writeln!(out, "- Verified facts found: {}", stats.verified_count);
        let _ = writeln!(out, "- Disputed facts found: {}", stats.disputed_count);
        out.push('\n');

        if !self.verified.is_empty() {
            out.push_str("## Verified Facts\n");
            for claim in &self.verified {
                let _ = writeln!(
                    out,
                    "- **{}** (Confidence: {:.2}, Sources: {})",
                    claim.text, claim.confidence, claim.mentions
                );
            }
            out.push('\n');
        }

        out.push_str("## Source Analysis\n");
        for digest in &self.digests {
            let _ = writeln!(out, "### {}", digest.source_name);
            let _ = writeln!(out, "- Articles analyzed: {}", digest.item_count);
            let _ = writeln!(out, "- Reliability score: {:.2}", digest.average_reliability);
            let _ = writeln!(out, "- Summary: {}", or_placeholder(&digest.summary_text));
            out.push('\n');
        }

        if !self.disputed.is_empty() {
            out.push_str("## Disputed Information\n");
            out.push_str("The following information appeared in sources but should be verified:\n");
            for claim in &self.disputed {
                let _ = writeln!(
                    out,
                    "- **{}** (Confidence: {:.2})",
                    claim.text, claim.confidence
                );
            }
            out.push('\n');
        }

        out.push_str("## Sources\n");
        for (idx, entry) in self.provenance.iter().enumerate() {
            match &entry.url {
                Some(url) => {
                    let _ = writeln!(
                        out,
                        "{}. [{}]({}) - {}",
                        idx + 1,
                        entry.title,
                        url,
                        entry.source_name
                    );
                }
                None => {
                    let _ = writeln!(out, "{}. {} - {}", idx + 1, entry.title, entry.source_name);
                }
            }
        }

        out.trim_end().to_string()
    }
}

fn or_placeholder(summary: &str) -> &str {
    if summary.is_empty() {
        NO_SUMMARY
    } else {
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::DigestBuilder;
    use crate::synthesizer::Synthesizer;
    use chrono::TimeZone;

    const SOLAR: &str = "Solar panel efficiency reached 26% in 2024.";

    fn context() -> ReportContext {
        ReportContext {
            run_id: Uuid::nil(),
            query: "solar efficiency".into(),
            generated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        }
    }

    fn item(source: &str, title: &str, url: Option<&str>, reliability: f64) -> ResearchItem {
        ResearchItem::new(source, title, SOLAR, url.map(String::from), reliability, 5000)
            .expect("valid item")
    }

    fn build(items: &[ResearchItem]) -> ResearchReport {
        let synthesis = Synthesizer::default().cluster_and_score(items);
        let digest = DigestBuilder::default().digest(items);
        compose(context(), digest, synthesis, items, Vec::new())
    }

    #[test]
    fn renders_sections_in_fixed_order() {
        let items = vec![
            item("WebSearch:bing", "Nature article", Some("https://www.nature.com/a"), 0.9),
            item("WebSearch:duckduckgo", "Blog post", None, 0.5),
        ];
        let report = build(&items);
        let text = report.render_markdown();

        let order = [
            "# Research Report: solar efficiency",
            "Generated on: 2024-05-01 12:30:00",
            "## Executive Summary",
            "## Research Statistics",
            "## Source Analysis",
            "## Disputed Information",
            "## Sources",
        ];
        let mut cursor = 0;
        for heading in order {
            let found = text[cursor..]
                .find(heading)
                .unwrap_or_else(|| panic!("missing {heading} after offset {cursor}:\n{text}"));
            cursor += found + heading.len();
        }

        assert!(!text.contains("## Verified Facts"));
        assert!(text.contains("- Average source reliability: 0.70"));
        assert!(text.contains("- **Solar panel efficiency reached 26% in 2024** (Confidence: 0.28)"));
        assert!(text.contains("1. [Nature article](https://www.nature.com/a) - WebSearch:bing"));
        assert!(text.contains("2. Blog post - WebSearch:duckduckgo"));
    }

    #[test]
    fn mid_band_clusters_are_kept_but_not_rendered() {
        let items = vec![
            item("A", "a", None, 0.9),
            item("B", "b", None, 0.9),
            item("C", "c", None, 0.9),
        ];
        let report = build(&items);

        assert_eq!(report.clusters.len(), 1);
        assert!(report.verified.is_empty());
        assert!(report.disputed.is_empty());

        let text = report.render_markdown();
        assert!(!text.contains("## Verified Facts"));
        assert!(!text.contains("## Disputed Information"));
        assert!(text.contains("- Verified facts found: 0"));
    }

    #[test]
    fn verified_claims_list_confidence_and_mentions() {
        let items: Vec<_> = (0..5).map(|i| item("S", &format!("t{i}"), None, 1.0)).collect();
        let report = build(&items);

        assert_eq!(report.statistics.verified_count, 1);
        assert!(report.render_markdown().contains(
            "- **Solar panel efficiency reached 26% in 2024** (Confidence: 0.90, Sources: 5)"
        ));
    }

    #[test]
    fn provenance_lists_every_item_once_even_without_clusters() {
        let lonely = ResearchItem::new("Encyclopedia", "Rivers", "Tiny.", None, 0.8, 5000).unwrap();
        let items = vec![
            item("WebSearch:bing", "Same title", None, 0.5),
            item("WebSearch:bing", "Same title", None, 0.5),
            lonely,
        ];
        let report = build(&items);

        assert_eq!(report.provenance.len(), items.len());
        assert_eq!(report.statistics.source_count, 3);
        assert_eq!(report.provenance[2].title, "Rivers");
        let text = report.render_markdown();
        assert!(text.contains("1. Same title - WebSearch:bing"));
        assert!(text.contains("2. Same title - WebSearch:bing"));
        assert!(text.contains("3. Rivers - Encyclopedia"));
    }

    #[test]
    fn empty_digests_render_a_placeholder() {
        let items = vec![item("WebSearch:bing", "a", None, 0.5)];
        let tight = DigestBuilder::new(crate::config::DigestConfig {
            per_source_chars: 10,
            overall_chars: 10,
            ..Default::default()
        });
        let digest = tight.digest(&items);
        let synthesis = Synthesizer::default().cluster_and_score(&items);
        let report = compose(context(), digest, synthesis, &items, Vec::new());
        assert!(report.digests[0].summary_text.is_empty());

        let text = report.render_markdown();
        assert!(text.contains("## Executive Summary\nNo summary available.\n"));
        assert!(text.contains("- Summary: No summary available.\n"));
        assert!(!text.contains("- Summary: \n"));
    }
}
