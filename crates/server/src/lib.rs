//! Server crate for the Reel Reads recommendation engine.
//!
//! This crate contains the engine facade that the request-handling layer
//! calls into, along with its configuration and error types.

pub mod config;
pub mod engine;
pub mod error;
pub mod explain;

pub use config::EngineConfig;
pub use engine::{
    HistoryEntry, MovieBookPair, Recommendation, RecommendationEngine, SearchResult, UserProfile,
};
pub use error::{EngineError, Result};
pub use explain::{COLD_START_EXPLANATION, ExplanationProvider, PromptEcho};
