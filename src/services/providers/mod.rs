/// Remote entity fetchers
///
/// The movie page depends on two remote collaborators: a movie catalog (movie
/// details and recommendations) and the signed-in account's lists. They are
/// kept behind traits so the membership core can be driven by TMDB in
/// production and by mocks in tests.
use crate::{
    error::AppResult,
    models::{ListKind, ListPage, Movie, MovieId, MovieSummary, Session},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Read-only movie metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieProvider: Send + Sync {
    /// Fetch a movie with its credits and videos
    async fn fetch_movie(&self, movie_id: MovieId) -> AppResult<Movie>;

    /// Fetch movies recommended alongside `movie_id`
    async fn fetch_recommendations(&self, movie_id: MovieId) -> AppResult<Vec<MovieSummary>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Account-scoped favorite and watchlist lists
///
/// Every call carries the caller's session explicitly; providers never read
/// credentials from ambient state.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AccountListProvider: Send + Sync {
    /// Fetch one page of the `kind` list
    async fn fetch_list(&self, kind: ListKind, session: &Session, page: u32)
        -> AppResult<ListPage>;

    /// Declare the desired membership of `movie_id` in the `kind` list.
    ///
    /// Must return `Err` whenever the remote service did not accept the change.
    async fn set_membership(
        &self,
        kind: ListKind,
        movie_id: MovieId,
        desired: bool,
        session: &Session,
    ) -> AppResult<()>;
}
