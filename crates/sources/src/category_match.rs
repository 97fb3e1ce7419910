//! Category match source - find items whose text mentions a category tag
//!
//! This is the first tier of cross-domain matching: a movie's genre tokens
//! are looked up in book titles. What counts as a "mention" is a pluggable
//! [`CategoryMatcher`], so the fallback logic never depends on it.
//!
//! ## Algorithm
//! For each tag, in order, walk the catalog and collect every item the
//! matcher accepts. Results are the union across tags; an item hit by two
//! tags appears twice. Deduplication is a later filter's job.

use crate::types::{Candidate, CandidateSource};
use data_loader::{Catalog, CatalogItem};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Decides whether a category tag matches an item's text
pub trait CategoryMatcher: Send + Sync {
    /// Name for logging
    fn name(&self) -> &'static str;

    fn matches(&self, tag: &str, text: &str) -> bool;
}

/// Case-insensitive substring containment
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl CategoryMatcher for SubstringMatcher {
    fn name(&self) -> &'static str {
        "substring"
    }

    fn matches(&self, tag: &str, text: &str) -> bool {
        let tag = tag.trim();
        !tag.is_empty() && text.to_lowercase().contains(&tag.to_lowercase())
    }
}

/// Case-insensitive whole-word match.
///
/// "War" matches "The War of the Worlds" but not "Software Design".
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenMatcher;

impl CategoryMatcher for TokenMatcher {
    fn name(&self) -> &'static str {
        "token"
    }

    fn matches(&self, tag: &str, text: &str) -> bool {
        let tag_words: Vec<String> = words(tag).collect();
        if tag_words.is_empty() {
            return false;
        }
        let text_words: Vec<String> = words(text).collect();
        text_words
            .windows(tag_words.len())
            .any(|window| window == tag_words.as_slice())
    }
}

fn words(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Category-match candidates over one catalog
pub struct CategoryMatchSource<T: CatalogItem, M: CategoryMatcher = SubstringMatcher> {
    catalog: Arc<Catalog<T>>,
    matcher: M,
}

impl<T: CatalogItem> CategoryMatchSource<T, SubstringMatcher> {
    pub fn new(catalog: Arc<Catalog<T>>) -> Self {
        Self {
            catalog,
            matcher: SubstringMatcher,
        }
    }
}

impl<T: CatalogItem, M: CategoryMatcher> CategoryMatchSource<T, M> {
    /// Swap the matching strategy
    pub fn with_matcher<N: CategoryMatcher>(self, matcher: N) -> CategoryMatchSource<T, N> {
        CategoryMatchSource {
            catalog: self.catalog,
            matcher,
        }
    }

    /// Items matching any tag; duplicates across tags are kept
    #[instrument(skip(self), fields(matcher = self.matcher.name()))]
    pub fn get_candidates(&self, tags: &[String]) -> Vec<Candidate<T::Id>> {
        let mut candidates = Vec::new();
        for tag in tags {
            let before = candidates.len();
            for item in self.catalog.items() {
                if self.matcher.matches(tag, &item.category_text()) {
                    candidates.push(
                        Candidate::new(item.id().clone(), CandidateSource::CategoryMatch, 0.0)
                            .with_tags(vec![tag.clone()]),
                    );
                }
            }
            debug!("Tag '{}' matched {} items", tag, candidates.len() - before);
        }
        candidates
    }
}
