//! Extractive summaries per source and across every source.

use serde::Serialize;

use crate::config::DigestConfig;
use crate::item::ResearchItem;
use crate::text::split_sentences;

/// Summary of every item contributed by one source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceDigest {
    pub source_name: String,
    pub summary_text: String,
    pub item_count: usize,
    pub average_reliability: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Digest {
    pub overall_summary: String,
    /// Ordered by each source's first appearance in the item list.
    pub sources: Vec<SourceDigest>,
}

#[derive(Debug, Clone, Default)]
pub struct DigestBuilder {
    config: DigestConfig,
}

impl DigestBuilder {
    pub fn new(config: DigestConfig) -> Self {
        Self { config }
    }

    /// Extractive summary of at most `max_chars` characters of sentence text.
    ///
    /// Text that already fits is returned unchanged. Otherwise sentences are
    /// ranked by position, length and keyword hits, taken in rank order until
    /// the next one would overflow, and joined with ". ". Separators are not
    /// counted against the budget. Returns an empty string when no sentence
    /// fits.
    pub fn summarize(&self, text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }

        let sentences = split_sentences(text, self.config.min_sentence_chars);
        let total = sentences.len() as f64;

        let mut ranked: Vec<(&str, u32)> = sentences
            .iter()
            .enumerate()
            .map(|(idx, sentence)| (*sentence, self.score(idx, total, sentence)))
            .collect();
        // Stable: equal scores keep their original order.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let mut selected = Vec::new();
        let mut used = 0;
        for (sentence, _) in ranked {
            let len = sentence.chars().count();
            if used + len > max_chars {
                break;
            }
            used += len;
            selected.push(sentence);
        }

        if selected.is_empty() {
            String::new()
        } else {
            format!("{}.", selected.join(". "))
        }
    }

    fn score(&self, idx: usize, total: f64, sentence: &str) -> u32 {
        let position = idx as f64;
        let mut score = 0;

        if position < total * 0.3 {
            score += 2;
        }
        if position > total * 0.7 {
            score += 1;
        }

        let len = sentence.chars().count();
        if len > 50 && len < 200 {
            score += 1;
        }

        let lowered = sentence.to_lowercase();
        score += self
            .config
            .keywords
            .iter()
            .filter(|keyword| lowered.contains(&keyword.to_lowercase()))
            .count() as u32;

        score
    }

    /// Per-source digests plus the overall digest of all content.
    pub fn digest(&self, items: &[ResearchItem]) -> Digest {
        let mut groups: Vec<(&str, Vec<&ResearchItem>)> = Vec::new();
        for item in items {
            match groups
                .iter_mut()
                .find(|(name, _)| *name == item.source_name())
            {
                Some((_, members)) => members.push(item),
                None => groups.push((item.source_name(), vec![item])),
            }
        }

        let mut combined_texts = Vec::with_capacity(groups.len());
        let sources = groups
            .into_iter()
            .map(|(source_name, members)| {
                let combined = members
                    .iter()
                    .map(|item| item.content())
                    .collect::<Vec<_>>()
                    .join(" ");
                let average_reliability = members.iter().map(|item| item.reliability()).sum::<f64>()
                    / members.len() as f64;
                let summary_text = self.summarize(&combined, self.config.per_source_chars);
                combined_texts.push(combined);

                SourceDigest {
                    source_name: source_name.to_string(),
                    summary_text,
                    item_count: members.len(),
                    average_reliability,
                }
            })
            .collect();

        let overall_summary = self.summarize(&combined_texts.join(" "), self.config.overall_chars);

        Digest {
            overall_summary,
            sources,
        }
    }
}
