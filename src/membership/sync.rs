use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::{
    error::{AppError, AppResult},
    models::{ListKind, MovieId, Session},
    services::providers::{AccountListProvider, MovieProvider},
};

use super::{Generation, MembershipSnapshot, MovieView, Resource, Settlement, ToggleStart};

/// Page of the account lists consulted for membership
const LIST_PAGE: u32 = 1;

/// Drives one [`MovieView`]: fans out the remote fetches when a movie is
/// opened, and issues the mutations behind optimistic toggles.
///
/// Cloning is cheap and every clone drives the same view.
#[derive(Clone)]
pub struct MembershipSync {
    view: Arc<RwLock<MovieView>>,
    movies: Arc<dyn MovieProvider>,
    lists: Arc<dyn AccountListProvider>,
    updates: Arc<watch::Sender<MembershipSnapshot>>,
    mutation_timeout: Duration,
}

/// Fetches spawned by [`MembershipSync::open`]
pub struct LoadHandle {
    pub generation: Generation,
    tasks: Vec<JoinHandle<()>>,
}

impl LoadHandle {
    /// Waits until the movie and both lists have resolved (or failed)
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Fetch task join error");
            }
        }
    }
}

/// Result of [`MembershipSync::toggle`]
#[derive(Debug)]
pub enum ToggleDispatch {
    /// A mutation was issued; the handle resolves once the window closes
    Started(JoinHandle<Settlement>),
    /// Folded into the mutation already in flight for this list
    Coalesced,
}

impl ToggleDispatch {
    /// Waits for the optimistic window opened by this toggle to close.
    /// Coalesced toggles return `None` right away; their outcome arrives with
    /// the request already in flight.
    pub async fn wait(self) -> Option<Settlement> {
        match self {
            ToggleDispatch::Started(handle) => match handle.await {
                Ok(settlement) => Some(settlement),
                Err(e) => {
                    tracing::error!(error = %e, "Toggle task join error");
                    None
                }
            },
            ToggleDispatch::Coalesced => None,
        }
    }
}

impl MembershipSync {
    pub fn new(
        movies: Arc<dyn MovieProvider>,
        lists: Arc<dyn AccountListProvider>,
        mutation_timeout: Duration,
    ) -> Self {
        let view = MovieView::new();
        let (updates, _) = watch::channel(view.snapshot());
        Self {
            view: Arc::new(RwLock::new(view)),
            movies,
            lists,
            updates: Arc::new(updates),
            mutation_timeout,
        }
    }

    /// Latest published state
    pub fn snapshot(&self) -> MembershipSnapshot {
        self.updates.borrow().clone()
    }

    /// Change notifications; every state transition publishes a new snapshot
    pub fn subscribe(&self) -> watch::Receiver<MembershipSnapshot> {
        self.updates.subscribe()
    }

    pub fn current_movie(&self) -> Option<MovieId> {
        self.updates.borrow().movie_id
    }

    /// True while any favorite or watchlist request of this view is on the
    /// wire, including requests for movies no longer on screen
    pub async fn has_in_flight(&self) -> bool {
        self.view.read().await.in_flight_count() > 0
    }

    /// Runs `f` against the view and publishes the resulting snapshot
    async fn update<R>(&self, f: impl FnOnce(&mut MovieView) -> R) -> R {
        let mut view = self.view.write().await;
        let result = f(&mut *view);
        self.updates.send_replace(view.snapshot());
        result
    }

    /// Opens `movie_id` and starts fetching the movie and both lists.
    ///
    /// Without a session the lists resolve as failed without a network call,
    /// so membership reads as `false`.
    pub async fn open(&self, movie_id: MovieId, session: Option<&Session>) -> LoadHandle {
        let generation = self.update(|view| view.navigate(movie_id)).await;
        tracing::info!(
            movie_id = %movie_id,
            generation = generation.0,
            signed_in = session.is_some(),
            "Opening movie"
        );

        let mut tasks = Vec::with_capacity(1 + ListKind::ALL.len());

        let sync = self.clone();
        tasks.push(tokio::spawn(async move {
            let movie = sync.movies.fetch_movie(movie_id).await;
            if let Err(e) = &movie {
                tracing::warn!(movie_id = %movie_id, error = %e, "Movie fetch failed");
            }
            let applied = sync
                .update(|view| view.apply_movie(generation, Resource::from(movie)))
                .await;
            if !applied {
                tracing::debug!(movie_id = %movie_id, generation = generation.0, "Discarded stale movie");
            }
        }));

        for kind in ListKind::ALL {
            let sync = self.clone();
            let session = session.cloned();
            tasks.push(tokio::spawn(async move {
                let page = match session {
                    Some(session) => {
                        let page = sync.lists.fetch_list(kind, &session, LIST_PAGE).await;
                        if let Err(e) = &page {
                            tracing::warn!(kind = %kind, error = %e, "List fetch failed");
                        }
                        Resource::from(page)
                    }
                    None => Resource::Failed(AppError::Unauthorized.to_string()),
                };
                let applied = sync
                    .update(|view| view.apply_list(generation, kind, page))
                    .await;
                if !applied {
                    tracing::debug!(kind = %kind, generation = generation.0, "Discarded stale list");
                }
            }));
        }

        LoadHandle { generation, tasks }
    }

    /// Flips `kind` for the open movie immediately and reconciles with the
    /// remote list in the background.
    ///
    /// The session is checked before anything else; a missing or invalid
    /// session leaves the view untouched and sends nothing.
    pub async fn toggle(
        &self,
        kind: ListKind,
        session: Option<&Session>,
    ) -> AppResult<ToggleDispatch> {
        let session = Session::require(session)?.clone();

        match self.update(|view| view.begin_toggle(kind)).await? {
            ToggleStart::Coalesced { desired } => {
                tracing::debug!(kind = %kind, desired, "Toggle coalesced into in-flight request");
                Ok(ToggleDispatch::Coalesced)
            }
            ToggleStart::Send { movie_id, desired } => {
                let sync = self.clone();
                let handle =
                    tokio::spawn(async move { sync.drive(kind, movie_id, desired, session).await });
                Ok(ToggleDispatch::Started(handle))
            }
        }
    }

    /// Keeps the single in-flight request for `(movie_id, kind)` going until
    /// the view has nothing newer to send. Navigating away does not stop it;
    /// the view only stops applying its outcome to the screen.
    async fn drive(
        self,
        kind: ListKind,
        movie_id: MovieId,
        mut desired: bool,
        session: Session,
    ) -> Settlement {
        loop {
            let request = self.lists.set_membership(kind, movie_id, desired, &session);
            let result = match tokio::time::timeout(self.mutation_timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(format!(
                    "{} update for movie {}",
                    kind, movie_id
                ))),
            };
            if let Err(e) = &result {
                tracing::warn!(kind = %kind, movie_id = %movie_id, desired, error = %e, "Membership update failed");
            }

            let settlement = self
                .update(|view| view.settle(movie_id, kind, result))
                .await;

            match &settlement {
                Settlement::Resend { desired: next } => {
                    tracing::debug!(kind = %kind, movie_id = %movie_id, desired = *next, "Sending coalesced toggle");
                    desired = *next;
                }
                Settlement::Confirmed { value } => {
                    tracing::info!(kind = %kind, movie_id = %movie_id, value = *value, "Membership confirmed");
                    return settlement;
                }
                Settlement::RolledBack { restored, .. } => {
                    tracing::warn!(kind = %kind, movie_id = %movie_id, restored = *restored, "Membership rolled back");
                    return settlement;
                }
                Settlement::Stale => {
                    tracing::debug!(kind = %kind, movie_id = %movie_id, "Discarded stale membership update");
                    return settlement;
                }
            }
        }
    }
}
