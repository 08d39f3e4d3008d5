use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::membership::{MembershipSnapshot, MembershipSync};
use crate::models::{ListKind, MovieDetails, MovieId, MovieSummary, Session};
use crate::services::movie_details;

use super::session::MaybeSession;
use super::AppState;

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Movie page data
pub async fn get_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<u64>,
) -> AppResult<Json<MovieDetails>> {
    let details = movie_details::movie_details(state.movies.clone(), MovieId(movie_id)).await?;
    Ok(Json(details))
}

/// "You might also like"
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(movie_id): Path<u64>,
) -> AppResult<Json<Vec<MovieSummary>>> {
    let movies = movie_details::recommendations(state.movies.clone(), MovieId(movie_id)).await?;
    Ok(Json(movies))
}

/// Opens the movie in the caller's view and returns its settled membership
pub async fn get_membership(
    State(state): State<AppState>,
    Path(movie_id): Path<u64>,
    session: MaybeSession,
) -> AppResult<Json<MembershipSnapshot>> {
    let session = Session::require(session.as_ref())?;
    let view = state.view_for(session).await;

    view.open(MovieId(movie_id), Some(session)).await.wait().await;

    Ok(Json(view.snapshot()))
}

/// Toggle favorite membership of a movie
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(movie_id): Path<u64>,
    session: MaybeSession,
) -> AppResult<(StatusCode, Json<MembershipSnapshot>)> {
    toggle(state, MovieId(movie_id), ListKind::Favorite, session).await
}

/// Toggle watchlist membership of a movie
pub async fn toggle_watchlist(
    State(state): State<AppState>,
    Path(movie_id): Path<u64>,
    session: MaybeSession,
) -> AppResult<(StatusCode, Json<MembershipSnapshot>)> {
    toggle(state, MovieId(movie_id), ListKind::Watchlist, session).await
}

/// Responds with the optimistic state right away; the outcome is visible
/// through `GET /view` once the remote service answers
async fn toggle(
    state: AppState,
    movie_id: MovieId,
    kind: ListKind,
    session: MaybeSession,
) -> AppResult<(StatusCode, Json<MembershipSnapshot>)> {
    let session = Session::require(session.as_ref())?;
    let view = state.view_for(session).await;

    if view.current_movie() != Some(movie_id) {
        view.open(movie_id, Some(session)).await.wait().await;
    }

    view.toggle(kind, Some(session)).await?;

    Ok((StatusCode::ACCEPTED, Json(view.snapshot())))
}

/// Current state of the caller's view
pub async fn get_view(
    State(state): State<AppState>,
    session: MaybeSession,
) -> AppResult<Json<MembershipSnapshot>> {
    let session = Session::require(session.as_ref())?;
    let view: MembershipSync = state
        .existing_view(session)
        .await
        .ok_or_else(|| AppError::NotFound("No movie has been opened".to_string()))?;

    Ok(Json(view.snapshot()))
}
