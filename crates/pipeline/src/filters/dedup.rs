//! Filter to collapse repeated candidates.
//!
//! Keyword matching unions the hits of every tag, so an item whose title
//! mentions two genres arrives twice. Only the first occurrence survives;
//! the tags of later occurrences are folded into it.

use crate::traits::{Filter, FilterContext};
use anyhow::Result;
use data_loader::ItemKey;
use sources::Candidate;
use std::collections::HashMap;

/// Keeps the first occurrence of each item, merging matched tags
pub struct DedupFilter;

impl<K: ItemKey> Filter<K> for DedupFilter {
    fn name(&self) -> &str {
        "DedupFilter"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate<K>>,
        _context: &FilterContext<'_, K>,
    ) -> Result<Vec<Candidate<K>>> {
        let mut position: HashMap<K, usize> = HashMap::with_capacity(candidates.len());
        let mut unique: Vec<Candidate<K>> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match position.get(&candidate.item_id) {
                Some(&idx) => {
                    let tags = &mut unique[idx].metadata.matched_tags;
                    for tag in candidate.metadata.matched_tags {
                        if !tags.contains(&tag) {
                            tags.push(tag);
                        }
                    }
                }
                None => {
                    position.insert(candidate.item_id.clone(), unique.len());
                    unique.push(candidate);
                }
            }
        }

        Ok(unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::RatingStore;
    use sources::CandidateSource;
    use std::collections::HashSet;

    #[test]
    fn test_dedup_keeps_first_and_merges_tags() {
        let empty = HashSet::new();
        let store = RatingStore::new();
        let context = FilterContext::new(&empty, &empty, &store);

        let tagged = |id: &str, tag: &str| {
            Candidate::new(id.to_string(), CandidateSource::CategoryMatch, 0.0)
                .with_tags(vec![tag.to_string()])
        };
        let candidates = vec![
            tagged("a", "War"),
            tagged("b", "War"),
            tagged("a", "Comedy"),
            tagged("a", "War"),
        ];

        let filtered = DedupFilter.apply(candidates, &context).unwrap();

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].item_id, "a");
        assert_eq!(filtered[0].metadata.matched_tags, vec!["War", "Comedy"]);
        assert_eq!(filtered[1].item_id, "b");
    }
}
