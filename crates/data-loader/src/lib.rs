//! # Data Loader Crate
//!
//! This crate loads and indexes the movie (MovieLens) and book
//! (Book-Crossing) datasets the recommender runs on.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Movie, Book, Rating, ItemStats, Domain)
//! - **catalog**: Catalog Store, items plus one-hot category vectors
//! - **store**: Rating Store, per-domain rating events and item statistics
//! - **parser**: Parse the cleaned CSV files into Rust structs
//! - **index**: Build and validate a [`DataSet`] from a directory
//! - **error**: Error types for data loading and rating validation
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::DataSet;
//! use std::path::Path;
//!
//! let data = DataSet::load_from_dir(Path::new("data"))?;
//!
//! let movie = data.movies.get(&1).unwrap();
//! let ratings = data.movie_ratings.get_user_ratings(1);
//!
//! println!("User 1 rated {} movies; first is {}", ratings.len(), movie.title);
//! ```
//!
//! ## Learning Goals
//!
//! 1. **Generics**: one `Catalog<T>` and one `RatingStore<K>` serve both domains
//! 2. **Traits**: `CatalogItem` with an associated id type and constant
//! 3. **Error Handling**: Using Result<T> and custom error types
//! 4. **Collections**: HashMap for lookups, BTreeMap where order matters
//! 5. **Parallel Processing**: Using Rayon for parsing and statistics

// Public modules
pub mod catalog;
pub mod error;
pub mod index;
pub mod parser;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use catalog::Catalog;
pub use error::{DataLoadError, Result};
pub use store::RatingStore;
pub use types::{
    // Type aliases
    Isbn,
    MovieId,
    UserId,
    // Traits
    CatalogItem,
    ItemKey,
    // Core types
    Book,
    DataSet,
    Domain,
    ItemRef,
    ItemStats,
    Movie,
    Rating,
};
