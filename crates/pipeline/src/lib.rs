//! Pipeline for filtering candidates and linking the two catalogs.
//!
//! This crate provides:
//! - Filter trait and implementations for candidate filtering
//! - FilterPipeline for composing filters
//! - CrossDomainMatcher: movie genres in, matching books out
//! - ExplanationBuilder for the facts an explanation generator consumes
//!
//! ## Architecture
//! A cross-domain request flows through three stages:
//! 1. Category-match candidates are generated from the movie's genre tags
//! 2. Filters join stats and remove unqualified, rated, already-proposed
//!    and repeated candidates
//! 3. If nothing survives, the popularity ranker fills in
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::CrossDomainMatcher;
//!
//! let matcher = CrossDomainMatcher::new(books.clone()).with_min_ratings(50);
//! let mut recommended = HashSet::new();
//! for movie in &movies {
//!     let found = matcher.find_matches(&movie.genres, &book_ratings, &rated, &recommended, 3)?;
//!     recommended.extend(found.iter().map(|c| c.item_id.clone()));
//! }
//! ```

pub mod cross_domain;
pub mod explanation;
pub mod filter_pipeline;
pub mod filters;
pub mod traits;

// Re-export main types
pub use cross_domain::CrossDomainMatcher;
pub use explanation::{BookFacts, CategoryWeight, ExplanationBuilder, ExplanationFacts, MovieFacts};
pub use filter_pipeline::FilterPipeline;
pub use traits::{Filter, FilterContext};
