//! Tag normalization
//!
//! Raw text (OCR output or a user caption) becomes a canonical tag set:
//! whitespace-split tokens with non-alphanumerics stripped, lowercased,
//! anything shorter than three characters dropped. OCR output additionally
//! loses common function words; caption words are assumed intentional and
//! keep theirs. `TagSet` is a sorted set, so the comma-joined stored form
//! is reproducible.

use std::collections::BTreeSet;

/// Where a piece of raw text came from. Only OCR output gets the
/// stop-word filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagSource {
    Caption,
    Ocr,
}

pub type TagSet = BTreeSet<String>;

const MIN_TAG_LEN: usize = 3;

/// Function words filtered from OCR-derived tags. The contraction
/// fragments ("don", "ve", ...) are what alnum-stripping leaves behind of
/// "don't", "I've" and friends in recognized meme text.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "having", "do", "does", "did", "doing", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "should", "now", "d", "ll", "m", "o",
    "re", "ve", "y", "ain", "aren", "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn",
    "ma", "mightn", "mustn", "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Normalize raw text into a tag set per the source's rules.
pub fn normalize(raw: &str, source: TagSource) -> TagSet {
    raw.split_whitespace()
        .filter_map(|word| {
            let clean: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect();
            if clean.chars().count() < MIN_TAG_LEN {
                return None;
            }
            if source == TagSource::Ocr && is_stop_word(&clean) {
                return None;
            }
            Some(clean)
        })
        .collect()
}

/// Serialized form for the database: comma-joined in sorted order.
pub fn join(tags: &TagSet) -> String {
    tags.iter().cloned().collect::<Vec<_>>().join(",")
}

/// Parse the stored form back into a set. Tolerates empty segments from
/// legacy rows.
pub fn parse(stored: &str) -> TagSet {
    stored
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
