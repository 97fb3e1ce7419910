//! Simple test harness for the recommendation engine.
//!
//! Loads the cleaned datasets, then prints movie + book pairs and
//! collaborative book picks for one user.
//!
//! Usage: `server [DATA_DIR] [USER_ID]` (defaults: `data`, `1`)

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::{EngineConfig, PromptEcho, RecommendationEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,server=debug,sources=debug,pipeline=debug")
            }),
        )
        .init();

    info!("Starting Reel Reads engine test harness");

    let mut args = std::env::args().skip(1);
    let data_dir = PathBuf::from(args.next().unwrap_or_else(|| "data".to_string()));
    let user_id: u32 = match args.next() {
        Some(raw) => raw.parse().context("USER_ID must be a number")?,
        None => 1,
    };

    let config = EngineConfig::from_env()?;
    info!("Loading datasets from {}...", data_dir.display());
    let engine = tokio::task::spawn_blocking({
        let data_dir = data_dir.clone();
        move || RecommendationEngine::load(&data_dir, config)
    })
    .await
    .context("Loader task panicked")??
    .with_explanation_provider(PromptEcho);
    info!("Datasets loaded");

    let limit = 5;
    info!("Getting movie + book pairs for user {} (limit: {})", user_id, limit);
    let pairs = tokio::task::spawn_blocking({
        let engine = engine.clone();
        move || engine.recommend_with_books(user_id, limit)
    })
    .await
    .context("Recommendation task panicked")??;

    for (i, pair) in pairs.iter().enumerate() {
        info!(
            "{}. {} - Score: {:.3} [{}]",
            i + 1,
            pair.movie.item.title,
            pair.movie.score,
            pair.movie.source
        );
        info!("   Genres: {}", pair.movie.item.genres.join(", "));
        for book in &pair.books {
            info!(
                "   Book: {} by {} (avg {:.2}) [{}]",
                book.item.title,
                book.item.author,
                book.avg_rating.unwrap_or(0.0),
                book.source
            );
        }
        if let Some(text) = &pair.explanation {
            info!("   {}", text);
        }
    }

    let (movies, books) = engine.recommend_all(user_id, limit).await?;
    info!("Received {} movies and {} collaborative books", movies.len(), books.len());
    for (i, rec) in books.iter().enumerate() {
        info!("{}. {} - Score: {:.3} [{}]", i + 1, rec.item.title, rec.score, rec.source);
    }

    Ok(())
}
