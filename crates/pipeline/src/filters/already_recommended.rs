//! Filter to keep one batch from proposing the same item twice.
//!
//! When several movies each get a set of books, a book handed to an earlier
//! movie must not show up again for a later one.

use crate::traits::{Filter, FilterContext};
use anyhow::Result;
use data_loader::ItemKey;
use sources::Candidate;

/// Removes candidates already proposed earlier in the batch
pub struct AlreadyRecommendedFilter;

impl<K: ItemKey> Filter<K> for AlreadyRecommendedFilter {
    fn name(&self) -> &str {
        "AlreadyRecommendedFilter"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate<K>>,
        context: &FilterContext<'_, K>,
    ) -> Result<Vec<Candidate<K>>> {
        Ok(candidates
            .into_iter()
            .filter(|candidate| !context.already_recommended.contains(&candidate.item_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::RatingStore;
    use sources::CandidateSource;
    use std::collections::HashSet;

    #[test]
    fn test_already_recommended_filter() {
        let empty = HashSet::new();
        let recommended: HashSet<u32> = [7].into_iter().collect();
        let store = RatingStore::new();
        let context = FilterContext::new(&empty, &recommended, &store);

        let candidates = vec![
            Candidate::new(7u32, CandidateSource::CategoryMatch, 0.0),
            Candidate::new(8u32, CandidateSource::CategoryMatch, 0.0),
        ];

        let filtered = AlreadyRecommendedFilter.apply(candidates, &context).unwrap();
        let ids: Vec<u32> = filtered.iter().map(|c| c.item_id).collect();
        assert_eq!(ids, vec![8]);
    }
}
