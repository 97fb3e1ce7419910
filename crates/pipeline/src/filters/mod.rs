//! Filter implementations for the candidate pipeline.
//!
//! This module contains all the concrete filter implementations
//! that can be composed into a FilterPipeline. Every filter is generic
//! over the item key, so the same set serves movies and books.

pub mod already_rated;
pub mod already_recommended;
pub mod dedup;
pub mod minimum_ratings;

// Re-export for convenience
pub use already_rated::AlreadyRatedFilter;
pub use already_recommended::AlreadyRecommendedFilter;
pub use dedup::DedupFilter;
pub use minimum_ratings::MinimumRatingsFilter;
