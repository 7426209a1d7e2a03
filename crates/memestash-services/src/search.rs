//! Tag search.
//!
//! Matching is subset semantics: every query tag must appear in the
//! record's tag set. An empty query matches everything. Results come back
//! newest-first, capped to one page. Each query is a full scan over all
//! records; at personal-archive scale that is the intended trade, and a
//! secondary index is the known next step if the archive outgrows it.

use memestash_core::tags::{self, TagSet, TagSource};
use memestash_core::{AppError, MediaRecord};
use memestash_db::MemeRepository;

/// Maximum results per query.
pub const RESULT_CAP: usize = 50;

#[derive(Clone)]
pub struct SearchEngine {
    repo: MemeRepository,
}

impl SearchEngine {
    pub fn new(repo: MemeRepository) -> Self {
        Self { repo }
    }

    /// Search with free-form query text. The text is normalized with
    /// caption rules: deliberate queries keep their function words.
    pub async fn search_text(&self, query: &str) -> Result<Vec<MediaRecord>, AppError> {
        let query_tags = tags::normalize(query, TagSource::Caption);
        self.search(&query_tags).await
    }

    /// Search with an already-normalized tag set.
    pub async fn search(&self, query: &TagSet) -> Result<Vec<MediaRecord>, AppError> {
        let mut records = self.repo.list_all().await?;
        // list_all is id-ascending; display order is most recent first.
        records.reverse();
        Ok(records
            .into_iter()
            .filter(|record| record.matches(query))
            .take(RESULT_CAP)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memestash_core::tags::parse;
    use memestash_db::open_in_memory;

    async fn engine_with(records: &[(&str, &str)]) -> SearchEngine {
        let repo = MemeRepository::new(open_in_memory().await.unwrap());
        for (i, (name, tag_str)) in records.iter().enumerate() {
            repo.insert(&format!("h{}", i), name, &parse(tag_str))
                .await
                .unwrap();
        }
        SearchEngine::new(repo)
    }

    #[tokio::test]
    async fn empty_query_matches_everything_newest_first() {
        let engine = engine_with(&[("a.jpg", "cat"), ("b.jpg", "dog"), ("c.jpg", "")]).await;

        let results = engine.search(&TagSet::new()).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].id > results[1].id);
        assert!(results[1].id > results[2].id);
    }

    #[tokio::test]
    async fn subset_match_requires_all_query_tags() {
        let engine = engine_with(&[
            ("a.jpg", "cat,dog,meme"),
            ("b.jpg", "cat"),
            ("c.jpg", "dog"),
        ])
        .await;

        let results = engine.search(&parse("cat,dog")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].asset_name, "a.jpg");
    }

    #[tokio::test]
    async fn no_substring_matching() {
        let engine = engine_with(&[("a.jpg", "category")]).await;
        assert!(engine.search_text("cat").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_text_is_normalized_like_a_caption() {
        let engine = engine_with(&[("a.jpg", "cat,the")]).await;

        // Punctuation and case fold away; "the" is kept because queries
        // are deliberate, like captions.
        let results = engine.search_text("  The C.A.T!  ").await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn results_capped_at_fifty() {
        let repo = MemeRepository::new(open_in_memory().await.unwrap());
        for i in 0..60 {
            repo.insert(&format!("h{}", i), &format!("{}.jpg", i), &parse("cat"))
                .await
                .unwrap();
        }
        let engine = SearchEngine::new(repo);

        let results = engine.search(&parse("cat")).await.unwrap();
        assert_eq!(results.len(), RESULT_CAP);
        // The cap keeps the newest, not the oldest.
        assert!(results[0].id > results[results.len() - 1].id);
        assert_eq!(results.last().unwrap().asset_name, "10.jpg");
    }
}
