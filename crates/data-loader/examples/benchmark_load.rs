use data_loader::DataSet;
use std::path::Path;
use std::time::Instant;

fn main() {
    let data_dir = Path::new("data");

    println!("Loading movie and book datasets...\n");

    let start = Instant::now();
    let data = match DataSet::load_from_dir(data_dir) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to load dataset: {e}");
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    let (movie_users, _, movie_ratings) = data.movie_ratings.counts();
    let (book_users, _, book_ratings) = data.book_ratings.counts();
    let total = movie_ratings + book_ratings;

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Movies: {} ({} genres)", data.movies.len(), data.movies.vocabulary().len());
    println!("Movie ratings: {} from {} users", movie_ratings, movie_users);
    println!("Books: {}", data.books.len());
    println!("Book ratings: {} from {} users", book_ratings, book_users);
    println!("\nPerformance: {:.0} ratings/second",
             total as f64 / elapsed.as_secs_f64());
}
