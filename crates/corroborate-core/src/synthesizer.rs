//! Claim clustering and corroboration scoring.
//!
//! Sentences from every item are grouped by bag-of-words overlap and each
//! group with at least two members is scored by mention count and the
//! reliability of the sources that made it.
//!
//! Clustering is a single greedy pass in extraction order: an unassigned
//! sentence seeds a cluster and later unassigned sentences join only when they
//! are similar to that seed. It is not a transitive closure, so reordering the
//! input can change which clusters form.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::config::SynthesisConfig;
use crate::item::ResearchItem;
use crate::text::{split_sentences, word_set};

/// A sentence taken from one research item, carrying that item's provenance.
#[derive(Debug, Clone, Serialize)]
pub struct Sentence {
    text: String,
    item_index: usize,
    source_name: String,
    reliability: f64,
    url: Option<String>,
}

impl Sentence {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Position of the originating item in the synthesized item slice.
    pub fn item_index(&self) -> usize {
        self.item_index
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn reliability(&self) -> f64 {
        self.reliability
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimVerdict {
    Verified,
    Disputed,
    Unresolved,
}

/// Group of mutually similar sentences, scored once membership is final.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimCluster {
    representative_text: String,
    members: Vec<Sentence>,
    confidence: f64,
    verdict: ClaimVerdict,
}

impl ClaimCluster {
    pub fn representative_text(&self) -> &str {
        &self.representative_text
    }

    pub fn members(&self) -> &[Sentence] {
        &self.members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn verdict(&self) -> ClaimVerdict {
        self.verdict
    }

    pub fn average_reliability(&self) -> f64 {
        mean(self.members.iter().map(Sentence::reliability))
    }

    /// Source names of the members, in member order.
    pub fn source_names(&self) -> Vec<&str> {
        self.members.iter().map(Sentence::source_name).collect()
    }
}

/// Every retained cluster, in the order its seed was extracted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Synthesis {
    pub clusters: Vec<ClaimCluster>,
}

impl Synthesis {
    pub fn verified(&self) -> impl Iterator<Item = &ClaimCluster> {
        self.with_verdict(ClaimVerdict::Verified)
    }

    pub fn disputed(&self) -> impl Iterator<Item = &ClaimCluster> {
        self.with_verdict(ClaimVerdict::Disputed)
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &ClaimCluster> {
        self.with_verdict(ClaimVerdict::Unresolved)
    }

    fn with_verdict(&self, verdict: ClaimVerdict) -> impl Iterator<Item = &ClaimCluster> {
        self.clusters
            .iter()
            .filter(move |cluster| cluster.verdict == verdict)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    config: SynthesisConfig,
}

impl Synthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    pub fn extract_sentences(&self, items: &[ResearchItem]) -> Vec<Sentence> {
        items
            .iter()
            .enumerate()
            .flat_map(|(item_index, item)| {
                split_sentences(item.content(), self.config.min_sentence_chars)
                    .into_iter()
                    .map(move |text| Sentence {
                        text: text.to_string(),
                        item_index,
                        source_name: item.source_name().to_string(),
                        reliability: item.reliability(),
                        url: item.url().map(String::from),
                    })
            })
            .collect()
    }

    /// Overlap of lowercase word sets relative to the smaller set.
    pub fn similar(&self, a: &str, b: &str) -> bool {
        self.overlaps(&word_set(a), &word_set(b))
    }

    fn overlaps(&self, a: &HashSet<String>, b: &HashSet<String>) -> bool {
        let smaller = a.len().min(b.len());
        if smaller == 0 {
            return false;
        }
        let common = a.intersection(b).count();
        common as f64 / smaller as f64 > self.config.similarity_threshold
    }

    pub fn cluster_and_score(&self, items: &[ResearchItem]) -> Synthesis {
        let sentences = self.extract_sentences(items);
        let words: Vec<HashSet<String>> = sentences.iter().map(|s| word_set(s.text())).collect();
        let mut assigned = vec![false; sentences.len()];
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for seed in 0..sentences.len() {
            if assigned[seed] {
                continue;
            }
            assigned[seed] = true;
            let mut members = vec![seed];

            for candidate in (seed + 1)..sentences.len() {
                if !assigned[candidate] && self.overlaps(&words[seed], &words[candidate]) {
                    assigned[candidate] = true;
                    members.push(candidate);
                }
            }

            if members.len() > 1 {
                groups.push(members);
            }
        }

        let clusters: Vec<ClaimCluster> = groups
            .into_iter()
            .map(|members| {
                let members: Vec<Sentence> =
                    members.into_iter().map(|idx| sentences[idx].clone()).collect();
                self.score(members)
            })
            .collect();

        debug!(
            sentences = sentences.len(),
            clusters = clusters.len(),
            "synthesizer clustered sentences"
        );

        Synthesis { clusters }
    }

    /// `min(cap, count * weight) * mean(reliability)`; zero for no members.
    pub fn confidence<I>(&self, reliabilities: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let reliabilities: Vec<f64> = reliabilities.into_iter().collect();
        if reliabilities.is_empty() {
            return 0.0;
        }
        let base = (reliabilities.len() as f64 * self.config.mention_weight)
            .min(self.config.confidence_cap);
        base * mean(reliabilities.iter().copied())
    }

    pub fn classify(&self, confidence: f64) -> ClaimVerdict {
        if confidence > self.config.verified_above {
            ClaimVerdict::Verified
        } else if confidence < self.config.disputed_below {
            ClaimVerdict::Disputed
        } else {
            ClaimVerdict::Unresolved
        }
    }

    fn score(&self, members: Vec<Sentence>) -> ClaimCluster {
        let confidence = self.confidence(members.iter().map(Sentence::reliability));
        ClaimCluster {
            representative_text: members[0].text.clone(),
            verdict: self.classify(confidence),
            confidence,
            members,
        }
    }
}

fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLAR: &str = "Solar panel efficiency reached 26% in 2024.";

    fn item(source: &str, content: &str, reliability: f64) -> ResearchItem {
        ResearchItem::new(source, source, content, None, reliability, 5000).expect("valid item")
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn two_mixed_reliability_mentions_are_disputed() {
        let synthesizer = Synthesizer::default();
        let items = vec![item("a", SOLAR, 0.9), item("b", SOLAR, 0.5)];

        let synthesis = synthesizer.cluster_and_score(&items);
        assert_eq!(synthesis.clusters.len(), 1);

        let cluster = &synthesis.clusters[0];
        assert_eq!(cluster.member_count(), 2);
        assert_eq!(
            cluster.representative_text(),
            "Solar panel efficiency reached 26% in 2024"
        );
        assert!(approx(cluster.confidence(), 0.28));
        assert_eq!(cluster.verdict(), ClaimVerdict::Disputed);
        assert_eq!(synthesis.disputed().count(), 1);
        assert_eq!(synthesis.verified().count(), 0);
    }

    #[test]
    fn three_trusted_mentions_land_in_the_middle_band() {
        let synthesizer = Synthesizer::default();
        let items = vec![
            item("a", SOLAR, 0.9),
            item("b", SOLAR, 0.9),
            item("c", SOLAR, 0.9),
        ];

        let synthesis = synthesizer.cluster_and_score(&items);
        assert_eq!(synthesis.clusters.len(), 1);
        assert!(approx(synthesis.clusters[0].confidence(), 0.54));
        assert_eq!(synthesis.unresolved().count(), 1);
        assert_eq!(synthesis.verified().count(), 0);
        assert_eq!(synthesis.disputed().count(), 0);
    }

    #[test]
    fn many_trusted_mentions_are_verified_and_capped() {
        let synthesizer = Synthesizer::default();
        let items: Vec<_> = (0..6).map(|i| item(&format!("s{i}"), SOLAR, 1.0)).collect();

        let synthesis = synthesizer.cluster_and_score(&items);
        let cluster = &synthesis.clusters[0];
        assert_eq!(cluster.member_count(), 6);
        assert!(approx(cluster.confidence(), 0.9));
        assert_eq!(cluster.verdict(), ClaimVerdict::Verified);
    }

    #[test]
    fn singletons_and_short_fragments_are_dropped() {
        let synthesizer = Synthesizer::default();
        let items = vec![
            item("a", "Tiny. A completely unrelated statement about rivers and lakes.", 0.9),
            item("b", "Another lonely sentence concerning mountain weather patterns.", 0.9),
        ];

        let synthesis = synthesizer.cluster_and_score(&items);
        assert!(synthesis.clusters.is_empty());
        assert_eq!(synthesizer.extract_sentences(&items).len(), 2);
    }

    #[test]
    fn sentences_keep_item_provenance() {
        let synthesizer = Synthesizer::default();
        let with_url = ResearchItem::new(
            "WebSearch:bing",
            "t",
            SOLAR,
            Some("https://www.nature.com/x".into()),
            0.9,
            5000,
        )
        .unwrap();
        let sentences = synthesizer.extract_sentences(&[item("a", SOLAR, 0.5), with_url]);

        assert_eq!(sentences[1].item_index(), 1);
        assert_eq!(sentences[1].source_name(), "WebSearch:bing");
        assert_eq!(sentences[1].url(), Some("https://www.nature.com/x"));
        assert_eq!(sentences[1].reliability(), 0.9);
    }

    #[test]
    fn similarity_is_symmetric() {
        let synthesizer = Synthesizer::default();
        let samples = [
            "Solar panel efficiency reached 26% in 2024",
            "Panel efficiency for solar cells reached a record",
            "Wind turbines generate a growing share of electricity",
            "solar SOLAR solar",
            "",
            "A short one",
        ];

        for a in samples {
            for b in samples {
                assert_eq!(synthesizer.similar(a, b), synthesizer.similar(b, a), "{a} / {b}");
            }
        }
    }

    #[test]
    fn similarity_threshold_is_exclusive() {
        let synthesizer = Synthesizer::default();
        // 3 of 10 words shared: exactly 0.3, which is not above the threshold.
        let a = "one two three four five six seven eight nine ten";
        let b = "one two three x4 x5 x6 x7 x8 x9 x10";
        assert!(!synthesizer.similar(a, b));

        let c = "one two three four x5 x6 x7 x8 x9 x10";
        assert!(synthesizer.similar(a, c));
        assert!(!synthesizer.similar("", a));
    }

    #[test]
    fn clustering_follows_seed_order_not_transitivity() {
        let synthesizer = Synthesizer::default();
        let a = "alpha bravo charlie delta echo foxtrot golf hotel india juliet.";
        let b = "alpha bravo charlie delta kilo lima mike november oscar papa.";
        let c = "kilo lima mike november quebec romeo sierra tango uniform victor.";

        let forward = vec![item("a", a, 0.5), item("b", b, 0.5), item("c", c, 0.5)];
        let synthesis = synthesizer.cluster_and_score(&forward);
        assert_eq!(synthesis.clusters.len(), 1);
        assert_eq!(synthesis.clusters[0].member_count(), 2);
        assert_eq!(synthesis.clusters[0].source_names(), vec!["a", "b"]);

        let seeded_by_b = vec![item("b", b, 0.5), item("a", a, 0.5), item("c", c, 0.5)];
        let synthesis = synthesizer.cluster_and_score(&seeded_by_b);
        assert_eq!(synthesis.clusters.len(), 1);
        assert_eq!(synthesis.clusters[0].member_count(), 3);
    }

    #[test]
    fn confidence_never_leaves_bounds_and_grows_with_reliable_members() {
        let synthesizer = Synthesizer::default();
        let mut reliabilities = vec![0.4, 0.6];

        for step in 0..10 {
            let before = synthesizer.confidence(reliabilities.iter().copied());
            assert!((0.0..=0.9).contains(&before));

            let average = mean(reliabilities.iter().copied());
            let addition = (average + 0.05 * step as f64).min(1.0);
            reliabilities.push(addition);

            let after = synthesizer.confidence(reliabilities.iter().copied());
            assert!(after + 1e-12 >= before, "{after} < {before}");
            assert!((0.0..=0.9).contains(&after));
        }

        assert_eq!(synthesizer.confidence(std::iter::empty()), 0.0);
    }

    #[test]
    fn classification_boundaries_are_strict() {
        let synthesizer = Synthesizer::default();
        assert_eq!(synthesizer.classify(0.7), ClaimVerdict::Unresolved);
        assert_eq!(synthesizer.classify(0.4), ClaimVerdict::Unresolved);
        assert_eq!(synthesizer.classify(0.71), ClaimVerdict::Verified);
        assert_eq!(synthesizer.classify(0.39), ClaimVerdict::Disputed);
    }
}
