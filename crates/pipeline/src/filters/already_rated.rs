//! Filter to remove items the user has already rated.
//!
//! There's no point in recommending a book the user has already scored,
//! so this runs in every cross-domain pipeline.

use crate::traits::{Filter, FilterContext};
use anyhow::Result;
use data_loader::ItemKey;
use sources::Candidate;

/// Removes candidates that the user has already rated.
///
/// ## Algorithm
/// Uses the HashSet in `FilterContext::rated` for O(1) lookups.
pub struct AlreadyRatedFilter;

impl<K: ItemKey> Filter<K> for AlreadyRatedFilter {
    fn name(&self) -> &str {
        "AlreadyRatedFilter"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate<K>>,
        context: &FilterContext<'_, K>,
    ) -> Result<Vec<Candidate<K>>> {
        let filtered: Vec<Candidate<K>> = candidates
            .into_iter()
            .filter(|candidate| !context.rated.contains(&candidate.item_id))
            .collect();
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Isbn, RatingStore};
    use sources::CandidateSource;
    use std::collections::HashSet;

    #[test]
    fn test_already_rated_filter() {
        let rated: HashSet<Isbn> = ["100".to_string(), "200".to_string()].into_iter().collect();
        let empty = HashSet::new();
        let store = RatingStore::new();
        let context = FilterContext::new(&rated, &empty, &store);

        let candidates = vec![
            Candidate::new("100".to_string(), CandidateSource::CategoryMatch, 0.0),
            Candidate::new("101".to_string(), CandidateSource::CategoryMatch, 0.0),
            Candidate::new("200".to_string(), CandidateSource::CategoryMatch, 0.0),
            Candidate::new("300".to_string(), CandidateSource::CategoryMatch, 0.0),
        ];

        let filtered = AlreadyRatedFilter.apply(candidates, &context).unwrap();

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].item_id, "101");
        assert_eq!(filtered[1].item_id, "300");
    }
}
