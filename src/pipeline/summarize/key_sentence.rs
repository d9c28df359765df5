use super::{split_sentences, Summarizer, SummaryResult};

/// Sentences of this many characters or fewer are treated as noise
/// (headings, page numbers, labels).
pub const MIN_SENTENCE_CHARS: usize = 20;

/// First, middle and last qualifying sentence, in that order.
pub struct KeySentenceSummarizer;

impl KeySentenceSummarizer {
    /// Sentences that survive the length filter, in document order.
    pub fn qualifying_sentences(text: &str) -> Vec<&str> {
        split_sentences(text)
            .into_iter()
            .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
            .collect()
    }
}

impl Summarizer for KeySentenceSummarizer {
    fn summarize(&self, text: &str) -> SummaryResult {
        if text.is_empty() {
            return SummaryResult::nothing_to_summarize();
        }

        let sentences = Self::qualifying_sentences(text);
        let count = sentences.len();

        let mut picked = Vec::with_capacity(3);
        if count >= 1 {
            picked.push(sentences[0]);
        }
        if count >= 3 {
            picked.push(sentences[count / 2]);
        }
        if count >= 2 {
            picked.push(sentences[count - 1]);
        }

        let summary = picked
            .iter()
            .map(|s| format!("{s}."))
            .collect::<Vec<_>>()
            .join("\n");

        SummaryResult::from_texts(text, summary)
    }
}
