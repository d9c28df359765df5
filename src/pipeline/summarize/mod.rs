//! Extractive summarization.
//!
//! Two strategies share the `Summarizer` seam:
//! - `KeySentenceSummarizer` picks the first, middle and last qualifying
//!   sentences (the default).
//! - `FrequencySummarizer` ranks sentences by word frequency and keeps a
//!   ratio of them.
//!
//! Both are pure and deterministic.

pub mod stats;
pub mod key_sentence;
pub mod frequency;

pub use frequency::FrequencySummarizer;
pub use key_sentence::KeySentenceSummarizer;
pub use stats::{reduction_percentage, round_one_decimal, word_count};

use serde::{Deserialize, Serialize};

use crate::config::SummaryMode;

/// Returned for empty input instead of an error.
pub const NOTHING_TO_SUMMARIZE: &str = "No text to summarize.";

/// Output of one summarization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary_text: String,
    pub original_word_count: usize,
    pub summary_word_count: usize,
    pub reduction_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<serde_json::Value>,
}

impl SummaryResult {
    /// Constant result for empty input: zero counts, zero reduction.
    pub fn nothing_to_summarize() -> Self {
        Self {
            summary_text: NOTHING_TO_SUMMARIZE.to_string(),
            original_word_count: 0,
            summary_word_count: 0,
            reduction_percentage: 0.0,
            structured_data: None,
        }
    }

    /// Build a result from source text and the chosen summary, computing stats.
    pub fn from_texts(original: &str, summary: String) -> Self {
        let original_word_count = word_count(original);
        let summary_word_count = word_count(&summary);
        Self {
            summary_text: summary,
            original_word_count,
            summary_word_count,
            reduction_percentage: reduction_percentage(original_word_count, summary_word_count),
            structured_data: None,
        }
    }

    pub fn with_structured_data(mut self, data: serde_json::Value) -> Self {
        self.structured_data = Some(data);
        self
    }
}

pub trait Summarizer: Send + Sync {
    fn summarize(&self, text: &str) -> SummaryResult;
}

/// Summarizer for a configured mode. `ratio` only matters in frequency mode.
pub fn summarizer_for(mode: SummaryMode, ratio: f64) -> Box<dyn Summarizer> {
    match mode {
        SummaryMode::KeySentence => Box::new(KeySentenceSummarizer),
        SummaryMode::Frequency => Box::new(FrequencySummarizer::new(ratio)),
    }
}

/// Split on `.`, `!` and `?`, trimming fragments and dropping empty ones.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_drops_empty_fragments() {
        let parts = split_sentences("One. Two!! Three?  . ");
        assert_eq!(parts, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn nothing_to_summarize_has_zero_counts() {
        let result = SummaryResult::nothing_to_summarize();
        assert_eq!(result.summary_text, NOTHING_TO_SUMMARIZE);
        assert_eq!(result.original_word_count, 0);
        assert_eq!(result.summary_word_count, 0);
        assert_eq!(result.reduction_percentage, 0.0);
    }

    #[test]
    fn summarizer_for_respects_mode() {
        let text = "The first sentence is comfortably long enough. \
                    The second sentence is also long enough here. \
                    The third sentence closes out this small text.";
        let key = summarizer_for(SummaryMode::KeySentence, 0.3).summarize(text);
        assert_eq!(key.summary_text.lines().count(), 3);

        let freq = summarizer_for(SummaryMode::Frequency, 0.3).summarize(text);
        assert_eq!(freq.summary_text.lines().count(), 1);
    }

    #[test]
    fn structured_data_is_skipped_when_absent() {
        let json = serde_json::to_value(SummaryResult::from_texts("a b", "a".into())).unwrap();
        assert!(json.get("structured_data").is_none());
        assert_eq!(json["summary_word_count"], 1);
    }

    #[test]
    fn trait_is_object_safe() {
        fn _assert(_: &dyn Summarizer) {}
    }
}
