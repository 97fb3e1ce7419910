//! Cross-domain matching: find books that go with a movie.
//!
//! Two tiers, tried in order:
//!
//! 1. **Category match.** Every tag (a movie genre token) is looked up in
//!    the secondary catalog's text. Hits run through a [`FilterPipeline`]
//!    that joins popularity stats, enforces the minimum rating count, drops
//!    already-rated and already-recommended items and collapses repeats.
//!    Survivors are ranked by average rating.
//! 2. **Popularity fallback.** If nothing survives tier 1, the globally
//!    top-rated items (same threshold, same exclusions) are returned
//!    instead, labelled [`CandidateSource::PopularityFallback`].
//!
//! The matcher therefore returns results whenever any qualifying item
//! exists, at the price of sometimes suggesting something genre-unrelated.
//!
//! ## Learning Goals
//! - Generic structs with a defaulted type parameter (`M = SubstringMatcher`)
//! - Composing a trait-object pipeline with concrete sources

use crate::filter_pipeline::FilterPipeline;
use crate::filters::{
    AlreadyRatedFilter, AlreadyRecommendedFilter, DedupFilter, MinimumRatingsFilter,
};
use crate::traits::FilterContext;
use anyhow::Result;
use data_loader::{Catalog, CatalogItem, RatingStore};
use sources::{
    Candidate, CandidateSource, CategoryMatchSource, CategoryMatcher, PopularitySource,
    SubstringMatcher,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default minimum rating count for a secondary-domain item
pub const DEFAULT_MIN_RATINGS: u32 = 50;

/// Keyword match with popularity fallback over one catalog
pub struct CrossDomainMatcher<T: CatalogItem, M: CategoryMatcher = SubstringMatcher> {
    keyword: CategoryMatchSource<T, M>,
    pipeline: FilterPipeline<T::Id>,
    fallback: PopularitySource<T>,
    min_ratings: u32,
}

impl<T: CatalogItem> CrossDomainMatcher<T, SubstringMatcher> {
    /// Matcher with case-insensitive substring matching and the default
    /// minimum of 50 ratings
    pub fn new(catalog: Arc<Catalog<T>>) -> Self {
        Self {
            keyword: CategoryMatchSource::new(catalog.clone()),
            pipeline: Self::default_pipeline(DEFAULT_MIN_RATINGS),
            fallback: PopularitySource::new(catalog)
                .with_min_rating_count(DEFAULT_MIN_RATINGS)
                .with_source(CandidateSource::PopularityFallback),
            min_ratings: DEFAULT_MIN_RATINGS,
        }
    }
}

impl<T: CatalogItem, M: CategoryMatcher> CrossDomainMatcher<T, M> {
    fn default_pipeline(min_ratings: u32) -> FilterPipeline<T::Id> {
        FilterPipeline::new()
            .add_filter(MinimumRatingsFilter::new(min_ratings))
            .add_filter(AlreadyRatedFilter)
            .add_filter(AlreadyRecommendedFilter)
            .add_filter(DedupFilter)
    }

    /// Minimum rating count for both tiers
    pub fn with_min_ratings(mut self, min_ratings: u32) -> Self {
        self.min_ratings = min_ratings;
        self.pipeline = Self::default_pipeline(min_ratings);
        self.fallback = self.fallback.with_min_rating_count(min_ratings);
        self
    }

    /// Swap the tag matching strategy; the fallback logic is unaffected
    pub fn with_matcher<N: CategoryMatcher>(self, matcher: N) -> CrossDomainMatcher<T, N> {
        CrossDomainMatcher {
            keyword: self.keyword.with_matcher(matcher),
            pipeline: self.pipeline,
            fallback: self.fallback,
            min_ratings: self.min_ratings,
        }
    }

    pub fn min_ratings(&self) -> u32 {
        self.min_ratings
    }

    /// Up to `limit` secondary-domain items for `tags`.
    ///
    /// Never returns an item twice, nor one in `rated` or
    /// `already_recommended`.
    #[instrument(skip(self, store, rated, already_recommended), fields(domain = %T::DOMAIN))]
    pub fn find_matches(
        &self,
        tags: &[String],
        store: &RatingStore<T::Id>,
        rated: &HashSet<T::Id>,
        already_recommended: &HashSet<T::Id>,
        limit: usize,
    ) -> Result<Vec<Candidate<T::Id>>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let hits = self.keyword.get_candidates(tags);
        let context = FilterContext::new(rated, already_recommended, store);
        let mut matches = self.pipeline.apply(hits, &context)?;

        if !matches.is_empty() {
            for candidate in &mut matches {
                candidate.score = candidate.metadata.avg_rating.unwrap_or(0.0);
            }
            matches.sort_by(|a, b| b.score.total_cmp(&a.score));
            matches.truncate(limit);
            debug!("Category match produced {} items", matches.len());
            return Ok(matches);
        }

        let exclude: HashSet<T::Id> = rated.union(already_recommended).cloned().collect();
        let fallback = self.fallback.get_candidates(store, &exclude, limit);
        debug!(
            "No category match survived filtering, popularity fallback produced {} items",
            fallback.len()
        );
        Ok(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Book, Isbn, Rating};
    use sources::TokenMatcher;

    fn book(isbn: &str, title: &str) -> Book {
        Book {
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: "Author".to_string(),
            year: Some(2000),
            publisher: String::new(),
            image_url: None,
        }
    }

    /// `count` ratings of `value` from distinct users
    fn rate(ratings: &mut Vec<Rating<Isbn>>, isbn: &str, count: u32, value: f32, user_base: u32) {
        for user_id in user_base..user_base + count {
            ratings.push(Rating {
                user_id,
                item_id: isbn.to_string(),
                value,
                timestamp: 0,
            });
        }
    }

    fn create_test_data() -> (Arc<Catalog<Book>>, RatingStore<Isbn>) {
        let catalog = Catalog::new(vec![
            book("w1", "The War of the Worlds"),
            book("w2", "War and Peace"),
            book("c1", "Comedy of War"),
            book("sw", "Software Craft"),
            book("p1", "Gardening Basics"),
            book("p2", "Cooking at Home"),
        ]);

        let mut ratings = Vec::new();
        rate(&mut ratings, "w1", 3, 7.0, 1000);
        rate(&mut ratings, "w2", 3, 9.0, 2000);
        rate(&mut ratings, "c1", 3, 8.0, 3000);
        rate(&mut ratings, "sw", 1, 10.0, 4000);
        rate(&mut ratings, "p1", 4, 6.0, 5000);
        rate(&mut ratings, "p2", 4, 9.5, 6000);

        (Arc::new(catalog), RatingStore::from_ratings(ratings))
    }

    fn ids(candidates: &[Candidate<Isbn>]) -> Vec<&str> {
        candidates.iter().map(|c| c.item_id.as_str()).collect()
    }

    #[test]
    fn test_category_match_ranked_by_average() {
        let (catalog, store) = create_test_data();
        let matcher = CrossDomainMatcher::new(catalog).with_min_ratings(2);
        let tags = vec!["War".to_string(), "Comedy".to_string()];

        let result = matcher
            .find_matches(&tags, &store, &HashSet::new(), &HashSet::new(), 5)
            .unwrap();

        // "sw" matches "war" by substring but has too few ratings; "c1"
        // matches both tags and appears once
        assert_eq!(ids(&result), vec!["w2", "c1", "w1"]);
        assert!(result.iter().all(|c| c.source == CandidateSource::CategoryMatch));
        assert_eq!(result[1].metadata.matched_tags, vec!["War", "Comedy"]);
        assert_eq!(result[0].score, 9.0);
    }

    #[test]
    fn test_exclusions_respected() {
        let (catalog, store) = create_test_data();
        let matcher = CrossDomainMatcher::new(catalog).with_min_ratings(2);
        let rated: HashSet<Isbn> = ["w2".to_string()].into_iter().collect();
        let recommended: HashSet<Isbn> = ["c1".to_string()].into_iter().collect();

        let result = matcher
            .find_matches(&["War".to_string()], &store, &rated, &recommended, 5)
            .unwrap();
        assert_eq!(ids(&result), vec!["w1"]);
    }

    #[test]
    fn test_fallback_when_no_hits() {
        let (catalog, store) = create_test_data();
        let matcher = CrossDomainMatcher::new(catalog).with_min_ratings(2);
        let rated: HashSet<Isbn> = ["p2".to_string()].into_iter().collect();

        let result = matcher
            .find_matches(&["Mystery".to_string()], &store, &rated, &HashSet::new(), 2)
            .unwrap();

        assert_eq!(ids(&result), vec!["w2", "c1"]);
        assert!(result.iter().all(|c| c.source == CandidateSource::PopularityFallback));
    }

    #[test]
    fn test_fallback_when_all_hits_filtered() {
        let (catalog, store) = create_test_data();
        let matcher = CrossDomainMatcher::new(catalog).with_min_ratings(4);

        // Only "sw" mentions "soft" and it has a single rating
        let result = matcher
            .find_matches(&["Soft".to_string()], &store, &HashSet::new(), &HashSet::new(), 3)
            .unwrap();
        assert_eq!(ids(&result), vec!["p2", "p1"]);
    }

    #[test]
    fn test_swapped_matcher_keeps_fallback() {
        let (catalog, store) = create_test_data();
        let matcher = CrossDomainMatcher::new(catalog)
            .with_min_ratings(1)
            .with_matcher(TokenMatcher);

        let result = matcher
            .find_matches(&["War".to_string()], &store, &HashSet::new(), &HashSet::new(), 5)
            .unwrap();
        // Whole-word matching no longer hits "Software Craft"
        assert_eq!(ids(&result), vec!["w2", "c1", "w1"]);
        assert_eq!(matcher.min_ratings(), 1);
    }

    #[test]
    fn test_zero_limit() {
        let (catalog, store) = create_test_data();
        let matcher = CrossDomainMatcher::new(catalog);
        let result = matcher
            .find_matches(&["War".to_string()], &store, &HashSet::new(), &HashSet::new(), 0)
            .unwrap();
        assert!(result.is_empty());
    }
}
