use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::{Summarizer, SummaryResult};
use crate::config::DEFAULT_SUMMARY_RATIO;

/// A sentence with its closing punctuation kept.
static SENTENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]*").unwrap());

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself",
    "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on",
    "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same",
    "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Ranks sentences by the summed frequency of their content words and keeps
/// `max(1, floor(count * ratio))` of them, in document order.
pub struct FrequencySummarizer {
    ratio: f64,
}

impl FrequencySummarizer {
    /// `ratio` is clamped to `[0, 1]`.
    pub fn new(ratio: f64) -> Self {
        let ratio = if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            DEFAULT_SUMMARY_RATIO
        };
        Self { ratio }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

impl Default for FrequencySummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARY_RATIO)
    }
}

fn content_words(text: &str) -> impl Iterator<Item = String> + '_ {
    TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
}

impl Summarizer for FrequencySummarizer {
    fn summarize(&self, text: &str) -> SummaryResult {
        if text.is_empty() {
            return SummaryResult::nothing_to_summarize();
        }

        let sentences: Vec<&str> = SENTENCE
            .find_iter(text)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .collect();
        if sentences.is_empty() {
            return SummaryResult::from_texts(text, String::new());
        }

        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for word in content_words(text) {
            *frequencies.entry(word).or_default() += 1;
        }

        // Sentences without a single content word are never selected.
        let mut scored: Vec<(usize, usize)> = sentences
            .iter()
            .enumerate()
            .filter_map(|(i, sentence)| {
                let score: usize = content_words(sentence)
                    .filter_map(|w| frequencies.get(&w))
                    .sum();
                (score > 0).then_some((i, score))
            })
            .collect();

        let keep = ((sentences.len() as f64 * self.ratio).floor() as usize).max(1);

        // Stable sort: ties keep the earlier sentence.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.truncate(keep);
        scored.sort_by_key(|(i, _)| *i);

        let summary = scored
            .iter()
            .map(|(i, _)| sentences[*i])
            .collect::<Vec<_>>()
            .join(" ");

        SummaryResult::from_texts(text, summary)
    }
}
