/// TMDB v3 provider
///
/// Implements both remote collaborators of the movie page against
/// `api.themoviedb.org`:
///
/// 1. Movie details: `/movie/{id}?append_to_response=videos,credits` (cached)
/// 2. Recommendations: `/movie/{id}/recommendations` (cached)
/// 3. Account lists: `/account/{account_id}/{favorite|watchlist}/movies` (never cached)
/// 4. Membership changes: `POST /account/{account_id}/{favorite|watchlist}`
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        ListKind, ListPage, MembershipChange, Movie, MovieId, MovieSummary, Paged, Session,
        StatusResponse,
    },
    services::providers::{AccountListProvider, MovieProvider},
};
use reqwest::{Client as HttpClient, Response, StatusCode};

const MOVIE_CACHE_TTL: u64 = 86400; // 1 day
const RECOMMENDATION_CACHE_TTL: u64 = 3600; // 1 hour

/// Number of recommendations shown under a movie
pub const RECOMMENDATION_LIMIT: usize = 12;

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Option<Cache>,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, cache: Option<Cache>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    /// Maps a non-success response to an error. `account_scoped` requests
    /// treat 401 as a rejected session rather than a bad API key.
    async fn check_status(
        response: Response,
        context: &str,
        account_scoped: bool,
    ) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            status = %status,
            body = %body,
            context = %context,
            "TMDB request failed"
        );

        Err(match status {
            StatusCode::NOT_FOUND => AppError::NotFound(context.to_string()),
            StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited(context.to_string()),
            StatusCode::UNAUTHORIZED if account_scoped => AppError::Unauthorized,
            _ => AppError::ExternalApi(format!("TMDB returned status {} for {}", status, context)),
        })
    }
}

#[async_trait::async_trait]
impl MovieProvider for TmdbProvider {
    async fn fetch_movie(&self, movie_id: MovieId) -> AppResult<Movie> {
        cached!(
            self.cache,
            CacheKey::Movie(movie_id),
            MOVIE_CACHE_TTL,
            async move {
                let url = self.endpoint(&format!("movie/{}", movie_id));
                let response = self
                    .http_client
                    .get(&url)
                    .query(&[
                        ("api_key", self.api_key.as_str()),
                        ("append_to_response", "videos,credits"),
                    ])
                    .send()
                    .await?;

                let context = format!("movie {}", movie_id);
                let response = Self::check_status(response, &context, false).await?;
                let movie: Movie = response.json().await?;

                tracing::info!(
                    movie_id = %movie_id,
                    cast = movie.credits.cast.len(),
                    videos = movie.videos.results.len(),
                    provider = self.name(),
                    "Movie fetched"
                );

                Ok::<_, AppError>(movie)
            }
        )
    }

    async fn fetch_recommendations(&self, movie_id: MovieId) -> AppResult<Vec<MovieSummary>> {
        cached!(
            self.cache,
            CacheKey::Recommendations(movie_id),
            RECOMMENDATION_CACHE_TTL,
            async move {
                let url = self.endpoint(&format!("movie/{}/recommendations", movie_id));
                let response = self
                    .http_client
                    .get(&url)
                    .query(&[("api_key", self.api_key.as_str()), ("page", "1")])
                    .send()
                    .await?;

                let context = format!("recommendations for movie {}", movie_id);
                let response = Self::check_status(response, &context, false).await?;
                let page: Paged<MovieSummary> = response.json().await?;

                let mut movies = page.results;
                movies.truncate(RECOMMENDATION_LIMIT);

                tracing::info!(
                    movie_id = %movie_id,
                    results = movies.len(),
                    provider = self.name(),
                    "Recommendations fetched"
                );

                Ok::<_, AppError>(movies)
            }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[async_trait::async_trait]
impl AccountListProvider for TmdbProvider {
    async fn fetch_list(
        &self,
        kind: ListKind,
        session: &Session,
        page: u32,
    ) -> AppResult<ListPage> {
        session.ensure_valid()?;

        let url = self.endpoint(&format!("account/{}/{}/movies", session.account_id, kind));
        let page_param = page.to_string();
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("session_id", session.session_id.as_str()),
                ("page", page_param.as_str()),
            ])
            .send()
            .await?;

        let context = format!("{} list", kind);
        let response = Self::check_status(response, &context, true).await?;
        let list: ListPage = response.json().await?;

        tracing::debug!(
            kind = %kind,
            page = list.page,
            entries = list.results.len(),
            total_results = list.total_results,
            "Account list fetched"
        );

        Ok(list)
    }

    async fn set_membership(
        &self,
        kind: ListKind,
        movie_id: MovieId,
        desired: bool,
        session: &Session,
    ) -> AppResult<()> {
        session.ensure_valid()?;

        let url = self.endpoint(&format!("account/{}/{}", session.account_id, kind));
        let response = self
            .http_client
            .post(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("session_id", session.session_id.as_str()),
            ])
            .json(&MembershipChange::new(kind, movie_id, desired))
            .send()
            .await?;

        let context = format!("{} update for movie {}", kind, movie_id);
        let response = Self::check_status(response, &context, true).await?;

        // A 2xx can still carry `"success": false`
        let body = response.text().await?;
        if let Ok(status) = serde_json::from_str::<StatusResponse>(&body) {
            if status.success == Some(false) {
                tracing::warn!(
                    context = %context,
                    status_code = ?status.status_code,
                    status_message = ?status.status_message,
                    "TMDB rejected membership change"
                );
                return Err(AppError::ExternalApi(format!("TMDB rejected {}", context)));
            }
        }

        tracing::info!(
            kind = %kind,
            movie_id = %movie_id,
            desired = desired,
            "Membership updated"
        );

        Ok(())
    }
}
