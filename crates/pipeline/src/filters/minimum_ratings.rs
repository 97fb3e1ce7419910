//! Filter to ensure minimum quality threshold.
//!
//! Joins each candidate with its popularity statistics and removes items
//! with too few ratings (or, optionally, too low an average), so only
//! well-established items are recommended.

use crate::traits::{Filter, FilterContext};
use anyhow::Result;
use data_loader::ItemKey;
use sources::Candidate;

/// Removes candidates below quality thresholds.
///
/// ## Algorithm
/// For each candidate:
/// 1. Look up ItemStats in the context's RatingStore
/// 2. Drop the candidate if it has no stats at all (never rated)
/// 3. Check `num_ratings >= min_count` and `avg_rating >= min_avg_rating`
/// 4. Copy the stats into the candidate's metadata for later ranking
pub struct MinimumRatingsFilter {
    min_count: u32,
    min_avg_rating: f32,
}

impl MinimumRatingsFilter {
    /// Create a new MinimumRatingsFilter.
    ///
    /// # Arguments
    /// * `min_count` - Minimum number of ratings (books default to 50)
    pub fn new(min_count: u32) -> Self {
        Self {
            min_count,
            min_avg_rating: f32::NEG_INFINITY,
        }
    }

    /// Also require an average rating of at least `min_avg_rating`
    pub fn with_min_avg_rating(mut self, min_avg_rating: f32) -> Self {
        self.min_avg_rating = min_avg_rating;
        self
    }
}

impl<K: ItemKey> Filter<K> for MinimumRatingsFilter {
    fn name(&self) -> &str {
        "MinimumRatingsFilter"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate<K>>,
        context: &FilterContext<'_, K>,
    ) -> Result<Vec<Candidate<K>>> {
        let filtered: Vec<Candidate<K>> = candidates
            .into_iter()
            .filter_map(|mut candidate| {
                let stats = context.store.get_stats(&candidate.item_id)?;
                if stats.num_ratings < self.min_count || stats.avg_rating < self.min_avg_rating {
                    return None;
                }
                candidate.metadata.avg_rating = Some(stats.avg_rating);
                candidate.metadata.num_ratings = Some(stats.num_ratings);
                Some(candidate)
            })
            .collect();

        Ok(filtered)
    }
}
