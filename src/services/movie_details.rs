use crate::{
    error::AppResult,
    models::{MovieDetails, MovieId, MovieSummary},
    services::providers::MovieProvider,
};
use std::sync::Arc;

/// Service function for the movie page
///
/// Delegates the fetch to the configured MovieProvider and shapes the result
/// for the browser client.
pub async fn movie_details(
    provider: Arc<dyn MovieProvider>,
    movie_id: MovieId,
) -> AppResult<MovieDetails> {
    let movie = provider.fetch_movie(movie_id).await.map_err(|e| {
        tracing::warn!(movie_id = %movie_id, provider = provider.name(), error = %e, "Movie lookup failed");
        e
    })?;
    let details = MovieDetails::from(&movie);

    tracing::debug!(
        movie_id = %movie_id,
        provider = provider.name(),
        top_cast = details.top_cast.len(),
        has_trailer = details.trailer_url.is_some(),
        "Movie details shaped"
    );

    Ok(details)
}

/// Service function for "you might also like"
pub async fn recommendations(
    provider: Arc<dyn MovieProvider>,
    movie_id: MovieId,
) -> AppResult<Vec<MovieSummary>> {
    let movies = provider.fetch_recommendations(movie_id).await?;
    tracing::debug!(
        movie_id = %movie_id,
        provider = provider.name(),
        results = movies.len(),
        "Recommendations served"
    );
    Ok(movies)
}
