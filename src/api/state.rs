use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::membership::MembershipSync;
use crate::models::Session;
use crate::services::{AccountListProvider, MovieProvider, TmdbProvider};

/// Bounds on the per-session views held in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewLimits {
    /// Views not touched for this long are dropped by the sweeper
    pub idle_timeout: Duration,
    /// Once reached, creating a view first evicts idle ones, then the least
    /// recently used one
    pub max_views: usize,
}

impl Default for ViewLimits {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30 * 60),
            max_views: 10_000,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub movies: Arc<dyn MovieProvider>,
    pub lists: Arc<dyn AccountListProvider>,
    pub mutation_timeout: Duration,
    pub view_limits: ViewLimits,
    inner: Arc<RwLock<AppStateInner>>,
}

struct SessionView {
    sync: MembershipSync,
    last_seen: Instant,
}

/// Inner state that can be modified
struct AppStateInner {
    /// One movie view per signed-in session; a view is never shared
    views: HashMap<String, SessionView>,
}

impl AppStateInner {
    /// Session ids of views that may be dropped, least recently used first.
    /// Views with a request on the wire are never candidates, so a later
    /// toggle cannot race a request the dropped view still owns.
    async fn eviction_candidates(&self, idle_since: Option<Instant>) -> Vec<String> {
        let mut candidates = Vec::new();
        for (session_id, view) in &self.views {
            if idle_since.is_some_and(|cutoff| view.last_seen > cutoff) {
                continue;
            }
            if view.sync.has_in_flight().await {
                continue;
            }
            candidates.push((view.last_seen, session_id.clone()));
        }
        candidates.sort();
        candidates.into_iter().map(|(_, id)| id).collect()
    }

    async fn evict_idle(&mut self, now: Instant, idle_timeout: Duration) -> usize {
        let cutoff = now.checked_sub(idle_timeout);
        let Some(cutoff) = cutoff else {
            return 0;
        };
        let idle = self.eviction_candidates(Some(cutoff)).await;
        for session_id in &idle {
            self.views.remove(session_id);
        }
        idle.len()
    }

    async fn evict_least_recent(&mut self) -> bool {
        match self.eviction_candidates(None).await.into_iter().next() {
            Some(session_id) => {
                self.views.remove(&session_id);
                true
            }
            None => false,
        }
    }
}

impl AppState {
    pub fn new(
        movies: Arc<dyn MovieProvider>,
        lists: Arc<dyn AccountListProvider>,
        mutation_timeout: Duration,
    ) -> Self {
        Self {
            movies,
            lists,
            mutation_timeout,
            view_limits: ViewLimits::default(),
            inner: Arc::new(RwLock::new(AppStateInner {
                views: HashMap::new(),
            })),
        }
    }

    /// State backed by a single TMDB provider for both movies and lists
    pub fn with_tmdb(provider: TmdbProvider, mutation_timeout: Duration) -> Self {
        let provider = Arc::new(provider);
        Self::new(provider.clone(), provider, mutation_timeout)
    }

    pub fn with_view_limits(mut self, view_limits: ViewLimits) -> Self {
        self.view_limits = view_limits;
        self
    }

    /// The view owned by `session`, created on first use
    pub async fn view_for(&self, session: &Session) -> MembershipSync {
        let now = Instant::now();
        let mut inner = self.inner.write().await;

        if let Some(view) = inner.views.get_mut(&session.session_id) {
            view.last_seen = now;
            return view.sync.clone();
        }

        if inner.views.len() >= self.view_limits.max_views {
            let evicted = inner.evict_idle(now, self.view_limits.idle_timeout).await;
            if evicted == 0 && !inner.evict_least_recent().await {
                tracing::warn!(
                    views = inner.views.len(),
                    max_views = self.view_limits.max_views,
                    "Every view has a request in flight, exceeding view limit"
                );
            }
        }

        tracing::debug!(account_id = %session.account_id, "Creating movie view");
        let sync = MembershipSync::new(
            self.movies.clone(),
            self.lists.clone(),
            self.mutation_timeout,
        );
        inner.views.insert(
            session.session_id.clone(),
            SessionView {
                sync: sync.clone(),
                last_seen: now,
            },
        );
        sync
    }

    pub async fn existing_view(&self, session: &Session) -> Option<MembershipSync> {
        let mut inner = self.inner.write().await;
        let view = inner.views.get_mut(&session.session_id)?;
        view.last_seen = Instant::now();
        Some(view.sync.clone())
    }

    pub async fn view_count(&self) -> usize {
        self.inner.read().await.views.len()
    }

    /// Drops views idle for longer than the configured timeout
    pub async fn evict_idle_views(&self) -> usize {
        let mut inner = self.inner.write().await;
        inner
            .evict_idle(Instant::now(), self.view_limits.idle_timeout)
            .await
    }

    /// Periodically evicts idle views until the runtime shuts down
    pub fn spawn_view_sweeper(&self) -> JoinHandle<()> {
        let state = self.clone();
        let period = (self.view_limits.idle_timeout / 2).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = state.evict_idle_views().await;
                if evicted > 0 {
                    let remaining = state.view_count().await;
                    tracing::info!(evicted, remaining, "Evicted idle views");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppResult,
        models::{ListKind, ListPage, Movie, MovieId},
        services::providers::MockMovieProvider,
    };

    /// Lists are empty and mutations never complete
    struct StuckLists;

    #[async_trait::async_trait]
    impl AccountListProvider for StuckLists {
        async fn fetch_list(
            &self,
            _kind: ListKind,
            _session: &Session,
            _page: u32,
        ) -> AppResult<ListPage> {
            Ok(ListPage::single(vec![]))
        }

        async fn set_membership(
            &self,
            _kind: ListKind,
            _movie_id: MovieId,
            _desired: bool,
            _session: &Session,
        ) -> AppResult<()> {
            std::future::pending().await
        }
    }

    fn state(limits: ViewLimits) -> AppState {
        let mut movies = MockMovieProvider::new();
        movies.expect_fetch_movie().returning(|id| {
            let movie: Movie =
                serde_json::from_value(serde_json::json!({"id": id.0, "title": "Movie"})).unwrap();
            Ok(movie)
        });
        AppState::new(
            Arc::new(movies),
            Arc::new(StuckLists),
            Duration::from_secs(600),
        )
        .with_view_limits(limits)
    }

    fn session(id: &str) -> Session {
        Session::new(42, id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_reused_per_session() {
        let state = state(ViewLimits::default());

        state.view_for(&session("a")).await;
        state.view_for(&session("a")).await;
        state.view_for(&session("b")).await;

        assert_eq!(state.view_count().await, 2);
        assert!(state.existing_view(&session("c")).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_views_evicted() {
        let state = state(ViewLimits {
            idle_timeout: Duration::from_secs(60),
            max_views: 100,
        });

        state.view_for(&session("old")).await;
        tokio::time::advance(Duration::from_secs(30)).await;
        state.view_for(&session("recent")).await;
        tokio::time::advance(Duration::from_secs(31)).await;

        assert_eq!(state.evict_idle_views().await, 1);
        assert!(state.existing_view(&session("old")).await.is_none());
        assert!(state.existing_view(&session("recent")).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_count_capped_by_evicting_least_recent() {
        let state = state(ViewLimits {
            idle_timeout: Duration::from_secs(3600),
            max_views: 2,
        });

        state.view_for(&session("a")).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        state.view_for(&session("b")).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        state.view_for(&session("a")).await;
        tokio::time::advance(Duration::from_secs(1)).await;

        for i in 0..50 {
            state.view_for(&session(&format!("flood-{}", i))).await;
        }

        assert_eq!(state.view_count().await, 2);
        assert!(state.existing_view(&session("b")).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_with_request_in_flight_is_kept() {
        let state = state(ViewLimits {
            idle_timeout: Duration::from_secs(60),
            max_views: 1,
        });

        let busy = session("busy");
        let view = state.view_for(&busy).await;
        view.open(MovieId(7), Some(&busy)).await.wait().await;
        view.toggle(ListKind::Favorite, Some(&busy)).await.unwrap();
        assert!(view.has_in_flight().await);

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(state.evict_idle_views().await, 0);

        state.view_for(&session("other")).await;
        assert!(state.existing_view(&busy).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_in_background() {
        let state = state(ViewLimits {
            idle_timeout: Duration::from_secs(60),
            max_views: 100,
        });
        let sweeper = state.spawn_view_sweeper();

        state.view_for(&session("a")).await;
        tokio::time::sleep(Duration::from_secs(121)).await;

        assert_eq!(state.view_count().await, 0);
        sweeper.abort();
    }
}
