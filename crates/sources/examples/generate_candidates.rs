//! Example: Generate candidates for a user
//!
//! Run with: cargo run --package sources --example generate_candidates
//!
//! This example shows how to:
//! 1. Load the movie and book datasets
//! 2. Build a user context (profile vector included)
//! 3. Generate content candidates for movies
//! 4. Generate collaborative candidates for books
//! 5. Display the results

use data_loader::DataSet;
use sources::{
    CollaborativeSource, ContentSource, InteractionMatrix, TruncatedSvd, build_user_context,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    println!("=== Reel Reads Candidate Generation Example ===\n");

    println!("Loading datasets...");
    let start = Instant::now();
    let data = DataSet::load_from_dir(Path::new("data"))?;
    println!("Loaded datasets in {:?}\n", start.elapsed());

    let movies = Arc::new(data.movies);
    let books = Arc::new(data.books);

    // Pick the first user with movie ratings
    let user_id = data.movie_ratings.users().next().unwrap_or(1);
    println!("Target User: {}", user_id);

    let start = Instant::now();
    let context = build_user_context(&movies, &data.movie_ratings, user_id, 4.0);
    println!("Built context in {:?}", start.elapsed());
    println!("  Rated movies: {}", context.rated_items.len());
    println!("  Highly rated: {}", context.highly_rated.len());
    println!("  Avg rating: {:.2}", context.avg_rating);
    for (genre, weight) in context.profile.top_categories(movies.vocabulary(), 3) {
        println!("  {genre}: {weight:.2}");
    }
    println!();

    let content = ContentSource::new(movies.clone());
    let start = Instant::now();
    let movie_candidates = content.get_candidates(&context, 5);
    println!("Content candidates in {:?}:", start.elapsed());
    for (i, candidate) in movie_candidates.iter().enumerate() {
        if let Some(movie) = movies.get(&candidate.item_id) {
            println!(
                "  {}. {} (similarity {:.3}, shared {:?})",
                i + 1,
                movie.title,
                candidate.score,
                candidate.metadata.matched_tags
            );
        }
    }

    println!("\nBuilding book interaction matrix...");
    let start = Instant::now();
    let matrix = InteractionMatrix::build(&data.book_ratings, 10, 10);
    let (rows, cols) = matrix.shape();
    println!("  {}x{} in {:?}", rows, cols, start.elapsed());

    let book_user = matrix.user_at(0).unwrap_or(user_id);
    let book_context = build_user_context(&books, &data.book_ratings, book_user, 8.0);
    let collaborative = CollaborativeSource::new(books.clone()).with_svd(TruncatedSvd::new(20));

    let start = Instant::now();
    match collaborative.get_candidates(&matrix, &book_context, 5) {
        Ok(candidates) => {
            println!("Collaborative candidates for user {} in {:?}:", book_user, start.elapsed());
            for (i, candidate) in candidates.iter().enumerate() {
                if let Some(book) = books.get(&candidate.item_id) {
                    println!(
                        "  {}. {} by {} (score {:.3})",
                        i + 1,
                        book.title,
                        book.author,
                        candidate.score
                    );
                }
            }
        }
        Err(e) => println!("Collaborative filter unavailable: {e}"),
    }

    Ok(())
}
