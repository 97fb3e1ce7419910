//! # Sources Crate
//!
//! This crate implements the candidate scorers behind movie and book
//! recommendations. Every source is generic over the catalog item type, so
//! one implementation serves both domains.
//!
//! ## Components
//!
//! ### Content (profile + content)
//! "You liked Action movies, here are more Action movies":
//! - Profile = mean one-hot category vector over the user's liked items
//! - Items ranked by cosine similarity to the profile
//!
//! ### Collaborative
//! Truncated SVD over a sparse user×item matrix of active users and popular
//! items. Users missing from the matrix get no candidates.
//!
//! ### Popularity
//! Highest average rating among items with enough ratings. Used for cold
//! start and as the fallback everywhere else.
//!
//! ### Category match
//! Items whose text mentions a category tag from the other domain, with a
//! pluggable matching strategy.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{ContentSource, PopularitySource, profile::build_user_context};
//! use data_loader::DataSet;
//! use std::sync::Arc;
//!
//! let data = DataSet::load_from_dir("data".as_ref())?;
//! let movies = Arc::new(data.movies);
//!
//! let context = build_user_context(&movies, &data.movie_ratings, user_id, 4.0);
//! let candidates = if context.has_history() {
//!     ContentSource::new(movies.clone()).get_candidates(&context, 5)
//! } else {
//!     PopularitySource::new(movies.clone())
//!         .with_min_rating_count(1000)
//!         .get_candidates(&data.movie_ratings, &context.rated_items, 5)
//! };
//! ```
//!
//! ## Learning Goals
//!
//! 1. **Generics**: sources parameterized by `CatalogItem`
//! 2. **Traits at seams**: `CategoryMatcher` as an injectable strategy
//! 3. **Arc for Sharing**: catalogs shared across sources without copying
//! 4. **Builder Pattern**: configurable sources with method chaining
//! 5. **Linear Algebra**: sparse matrices (`sprs`) and dense SVD (`nalgebra`)
//! 6. **Instrumentation**: Using tracing for observability

// Public modules
pub mod category_match;
pub mod collaborative;
pub mod content;
pub mod error;
pub mod popularity;
pub mod profile;
pub mod svd;
pub mod types;

// Re-export commonly used types
pub use category_match::{CategoryMatchSource, CategoryMatcher, SubstringMatcher, TokenMatcher};
pub use collaborative::{CollaborativeSource, InteractionMatrix};
pub use content::ContentSource;
pub use error::{Result, SourceError};
pub use popularity::PopularitySource;
pub use profile::{ProfileVector, build_user_context, build_user_profile, cosine_similarity};
pub use svd::{Factorization, TruncatedSvd};
pub use types::{Candidate, CandidateMetadata, CandidateSource, UserContext};
