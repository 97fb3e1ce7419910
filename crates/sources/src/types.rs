//! Shared types for candidate generation.

use crate::profile::ProfileVector;
use data_loader::{ItemKey, UserId};
use std::collections::HashSet;
use std::fmt;

/// Which scorer produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    /// Cosine similarity between the user's profile and item categories
    Content,
    /// Truncated-SVD score over the interaction matrix
    Collaborative,
    /// Popularity ranking for a user with no history
    ColdStart,
    /// Category tag found in the item's text
    CategoryMatch,
    /// Popularity pick used when no category match qualifies
    PopularityFallback,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::Content => "content",
            CandidateSource::Collaborative => "collaborative",
            CandidateSource::ColdStart => "cold_start",
            CandidateSource::CategoryMatch => "category_match",
            CandidateSource::PopularityFallback => "popularity_fallback",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra facts a source attaches to a candidate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateMetadata {
    /// Category tags that explain the match
    pub matched_tags: Vec<String>,
    pub avg_rating: Option<f32>,
    pub num_ratings: Option<u32>,
}

/// A scored item proposed by one source
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<K> {
    pub item_id: K,
    pub source: CandidateSource,
    pub score: f32,
    pub metadata: CandidateMetadata,
}

impl<K> Candidate<K> {
    pub fn new(item_id: K, source: CandidateSource, score: f32) -> Self {
        Self {
            item_id,
            source,
            score,
            metadata: CandidateMetadata::default(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.metadata.matched_tags = tags;
        self
    }
}

/// Everything a source needs to know about one user in one domain.
///
/// Built once per request by [`crate::profile::build_user_context`].
#[derive(Debug, Clone)]
pub struct UserContext<K: ItemKey> {
    pub user_id: UserId,
    /// Every item the user has rated
    pub rated_items: HashSet<K>,
    /// Items rated at or above the like-threshold, in rating order
    pub highly_rated: Vec<K>,
    /// Mean of all the user's ratings, 0.0 without history
    pub avg_rating: f32,
    /// Category-preference vector
    pub profile: ProfileVector,
}

impl<K: ItemKey> UserContext<K> {
    /// Context for a user with no ratings, over a vocabulary of `dims` categories
    pub fn empty(user_id: UserId, dims: usize) -> Self {
        Self {
            user_id,
            rated_items: HashSet::new(),
            highly_rated: Vec::new(),
            avg_rating: 0.0,
            profile: ProfileVector::zeros(dims),
        }
    }

    pub fn has_history(&self) -> bool {
        !self.rated_items.is_empty()
    }
}
