use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{ListKind, ListPage, Movie, MovieId},
};

use super::{evaluate_page, Resource, ResourceStatus};

/// Identifies one "open movie" episode of a view. Every navigation bumps it,
/// and any async result tagged with an older generation is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(pub u64);

/// Local derived + optimistic membership of the movie on screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MembershipState {
    pub favorited: bool,
    pub watchlisted: bool,
}

impl MembershipState {
    pub fn get(&self, kind: ListKind) -> bool {
        match kind {
            ListKind::Favorite => self.favorited,
            ListKind::Watchlist => self.watchlisted,
        }
    }

    pub fn set(&mut self, kind: ListKind, value: bool) {
        match kind {
            ListKind::Favorite => self.favorited = value,
            ListKind::Watchlist => self.watchlisted = value,
        }
    }
}

/// User-facing notice produced by a failed toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: ListKind,
    pub message: String,
}

impl Notice {
    pub fn toggle_failed(kind: ListKind, error: &AppError) -> Self {
        let message = match error {
            AppError::Unauthorized => "Your session has expired, please sign in again",
            AppError::RateLimited(_) => "Too many requests, please try again in a moment",
            AppError::Timeout(_) => "The server took too long to respond, please try again",
            _ => match kind {
                ListKind::Favorite => "Could not update your favorites, please try again",
                ListKind::Watchlist => "Could not update your watchlist, please try again",
            },
        };
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

/// What observers of a view see
#[derive(Debug, Clone, Serialize)]
pub struct MembershipSnapshot {
    pub generation: Generation,
    pub movie_id: Option<MovieId>,
    pub movie_status: ResourceStatus,
    pub favorited: bool,
    pub watchlisted: bool,
    pub favorite_pending: bool,
    pub watchlist_pending: bool,
    pub notice: Option<Notice>,
    pub updated_at: DateTime<Utc>,
}

impl MembershipSnapshot {
    pub fn membership(&self) -> MembershipState {
        MembershipState {
            favorited: self.favorited,
            watchlisted: self.watchlisted,
        }
    }

    pub fn is_pending(&self, kind: ListKind) -> bool {
        match kind {
            ListKind::Favorite => self.favorite_pending,
            ListKind::Watchlist => self.watchlist_pending,
        }
    }
}

/// The single request allowed in flight for a `(movie, kind)` pair.
///
/// Outlives navigation: reopening a movie whose toggle is still on the wire
/// picks the request back up instead of starting a second one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    /// Value carried by the request currently on the wire
    sent: bool,
    /// Most recent value the user asked for; superseded intents are dropped
    latest: bool,
}

#[derive(Debug, Clone, Default)]
struct ListSlot {
    page: Resource<ListPage>,
    /// Last value observed from, or confirmed by, the remote service
    confirmed: bool,
}

/// Instruction returned by [`MovieView::begin_toggle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleStart {
    /// Caller must issue a mutation carrying `desired`
    Send { movie_id: MovieId, desired: bool },
    /// A request is already on the wire; the new intent was folded into it
    Coalesced { desired: bool },
}

/// Outcome of feeding a mutation result back into the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Confirmed and nothing newer is pending
    Confirmed { value: bool },
    /// Confirmed, but the user changed their mind meanwhile; send `desired` next
    Resend { desired: bool },
    /// Failed; local state restored to the last confirmed value
    RolledBack { restored: bool, notice: Notice },
    /// The view moved on to another movie. The request is finished and the
    /// result did not touch what is on screen.
    Stale,
}

/// Single-owner state of one movie page: the three remote inputs, the derived
/// membership booleans, and the optimistic toggle bookkeeping.
///
/// Pure and synchronous. The async wiring lives in [`super::MembershipSync`].
#[derive(Debug, Clone)]
pub struct MovieView {
    generation: Generation,
    movie_id: Option<MovieId>,
    movie: Resource<Movie>,
    favorites: ListSlot,
    watchlist: ListSlot,
    membership: MembershipState,
    in_flight: HashMap<(MovieId, ListKind), InFlight>,
    notice: Option<Notice>,
    updated_at: DateTime<Utc>,
}

impl Default for MovieView {
    fn default() -> Self {
        Self::new()
    }
}

impl MovieView {
    pub fn new() -> Self {
        Self {
            generation: Generation(0),
            movie_id: None,
            movie: Resource::Loading,
            favorites: ListSlot::default(),
            watchlist: ListSlot::default(),
            membership: MembershipState::default(),
            in_flight: HashMap::new(),
            notice: None,
            updated_at: Utc::now(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn movie_id(&self) -> Option<MovieId> {
        self.movie_id
    }

    pub fn movie(&self) -> &Resource<Movie> {
        &self.movie
    }

    pub fn membership(&self) -> MembershipState {
        self.membership
    }

    pub fn is_pending(&self, kind: ListKind) -> bool {
        self.pending(kind).is_some()
    }

    /// Requests on the wire across every movie this view has shown
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn pending(&self, kind: ListKind) -> Option<InFlight> {
        let movie_id = self.movie_id?;
        self.in_flight.get(&(movie_id, kind)).copied()
    }

    fn slot(&self, kind: ListKind) -> &ListSlot {
        match kind {
            ListKind::Favorite => &self.favorites,
            ListKind::Watchlist => &self.watchlist,
        }
    }

    fn slot_mut(&mut self, kind: ListKind) -> &mut ListSlot {
        match kind {
            ListKind::Favorite => &mut self.favorites,
            ListKind::Watchlist => &mut self.watchlist,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Opens `movie_id`, dropping everything fetched for the previous movie.
    /// Toggles still in flight for `movie_id` keep showing their latest intent.
    pub fn navigate(&mut self, movie_id: MovieId) -> Generation {
        self.generation = Generation(self.generation.0 + 1);
        self.movie_id = Some(movie_id);
        self.movie = Resource::Loading;
        self.favorites = ListSlot::default();
        self.watchlist = ListSlot::default();
        self.membership = MembershipState::default();
        for kind in ListKind::ALL {
            if let Some(in_flight) = self.pending(kind) {
                self.membership.set(kind, in_flight.latest);
            }
        }
        self.notice = None;
        self.touch();
        self.generation
    }

    /// Records the movie fetch result. Returns false if it was stale.
    pub fn apply_movie(&mut self, generation: Generation, movie: Resource<Movie>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.movie = movie;
        for kind in ListKind::ALL {
            self.rederive(kind);
        }
        self.touch();
        true
    }

    /// Records a list fetch result. Returns false if it was stale.
    pub fn apply_list(
        &mut self,
        generation: Generation,
        kind: ListKind,
        page: Resource<ListPage>,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.slot_mut(kind).page = page;
        self.rederive(kind);
        self.touch();
        true
    }

    /// Recomputes `kind` from the latest resolved inputs. An open optimistic
    /// window keeps its value until the pending mutation settles.
    fn rederive(&mut self, kind: ListKind) {
        let resolved_id = self.movie.ready().map(|movie| movie.id);
        let pending = self.pending(kind).is_some();
        let slot = self.slot_mut(kind);
        let derived = evaluate_page(&slot.page, resolved_id);
        slot.confirmed = derived;
        if !pending {
            self.membership.set(kind, derived);
        }
    }

    /// Optimistically flips `kind` and tells the caller whether a request
    /// must go out
    pub fn begin_toggle(&mut self, kind: ListKind) -> AppResult<ToggleStart> {
        let movie_id = self
            .movie_id
            .ok_or_else(|| AppError::InvalidInput("No movie is open".to_string()))?;

        let desired = !self.membership.get(kind);
        self.membership.set(kind, desired);
        self.notice = None;
        self.touch();

        match self.in_flight.get_mut(&(movie_id, kind)) {
            Some(in_flight) => {
                in_flight.latest = desired;
                Ok(ToggleStart::Coalesced { desired })
            }
            None => {
                self.in_flight.insert(
                    (movie_id, kind),
                    InFlight {
                        sent: desired,
                        latest: desired,
                    },
                );
                Ok(ToggleStart::Send { movie_id, desired })
            }
        }
    }

    /// Feeds the result of the in-flight mutation for `(movie_id, kind)`
    /// back in.
    ///
    /// A success still sends the latest coalesced intent when the view has
    /// moved on to another movie, but only the movie on screen is confirmed
    /// or rolled back.
    pub fn settle(
        &mut self,
        movie_id: MovieId,
        kind: ListKind,
        result: AppResult<()>,
    ) -> Settlement {
        let key = (movie_id, kind);
        let Some(in_flight) = self.in_flight.get(&key).copied() else {
            return Settlement::Stale;
        };
        let on_screen = self.movie_id == Some(movie_id);

        match result {
            Ok(()) => {
                if on_screen {
                    let slot = self.slot_mut(kind);
                    slot.confirmed = in_flight.sent;
                    if let Some(page) = slot.page.ready_mut() {
                        page.record_membership(movie_id, in_flight.sent);
                    }
                }

                if in_flight.latest != in_flight.sent {
                    self.in_flight.insert(
                        key,
                        InFlight {
                            sent: in_flight.latest,
                            latest: in_flight.latest,
                        },
                    );
                    return Settlement::Resend {
                        desired: in_flight.latest,
                    };
                }

                self.in_flight.remove(&key);
                if !on_screen {
                    return Settlement::Stale;
                }
                self.membership.set(kind, in_flight.sent);
                self.touch();
                Settlement::Confirmed {
                    value: in_flight.sent,
                }
            }
            Err(e) => {
                self.in_flight.remove(&key);
                if !on_screen {
                    return Settlement::Stale;
                }
                let notice = Notice::toggle_failed(kind, &e);
                let restored = self.slot(kind).confirmed;
                self.membership.set(kind, restored);
                self.notice = Some(notice.clone());
                self.touch();
                Settlement::RolledBack { restored, notice }
            }
        }
    }

    pub fn snapshot(&self) -> MembershipSnapshot {
        MembershipSnapshot {
            generation: self.generation,
            movie_id: self.movie_id,
            movie_status: self.movie.status(),
            favorited: self.membership.favorited,
            watchlisted: self.membership.watchlisted,
            favorite_pending: self.is_pending(ListKind::Favorite),
            watchlist_pending: self.is_pending(ListKind::Watchlist),
            notice: self.notice.clone(),
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListEntry;

    fn movie(id: u64) -> Movie {
        serde_json::from_value(serde_json::json!({"id": id, "title": format!("Movie {}", id)}))
            .unwrap()
    }

    fn page(ids: &[u64]) -> Resource<ListPage> {
        Resource::Ready(ListPage::single(
            ids.iter().map(|id| ListEntry::new(MovieId(*id))).collect(),
        ))
    }

    /// View on `id` with the movie and both lists resolved
    fn loaded_view(id: u64, favorites: &[u64], watchlist: &[u64]) -> (MovieView, MovieId) {
        let mut view = MovieView::new();
        let generation = view.navigate(MovieId(id));
        view.apply_movie(generation, Resource::Ready(movie(id)));
        view.apply_list(generation, ListKind::Favorite, page(favorites));
        view.apply_list(generation, ListKind::Watchlist, page(watchlist));
        (view, MovieId(id))
    }

    fn send_value(start: ToggleStart) -> bool {
        match start {
            ToggleStart::Send { desired, .. } => desired,
            other => panic!("expected Send, got {:?}", other),
        }
    }

    #[test]
    fn test_membership_derived_from_lists() {
        let (view, _) = loaded_view(101, &[55, 101], &[]);
        assert_eq!(
            view.membership(),
            MembershipState {
                favorited: true,
                watchlisted: false
            }
        );
    }

    #[test]
    fn test_derivation_tolerates_any_arrival_order() {
        let mut view = MovieView::new();
        let generation = view.navigate(MovieId(101));

        view.apply_list(generation, ListKind::Favorite, page(&[101]));
        assert!(!view.membership().favorited, "movie not resolved yet");

        view.apply_list(generation, ListKind::Watchlist, page(&[101]));
        view.apply_movie(generation, Resource::Ready(movie(101)));
        assert!(view.membership().favorited);
        assert!(view.membership().watchlisted);
    }

    #[test]
    fn test_failed_list_reads_as_not_member() {
        let mut view = MovieView::new();
        let generation = view.navigate(MovieId(101));
        view.apply_movie(generation, Resource::Ready(movie(101)));
        view.apply_list(generation, ListKind::Favorite, Resource::Failed("401".into()));
        assert!(!view.membership().favorited);
    }

    #[test]
    fn test_stale_fetch_discarded_after_navigation() {
        let mut view = MovieView::new();
        let first = view.navigate(MovieId(1));
        let second = view.navigate(MovieId(2));
        view.apply_movie(second, Resource::Ready(movie(2)));

        assert!(!view.apply_list(first, ListKind::Favorite, page(&[1, 2])));
        assert!(!view.apply_movie(first, Resource::Ready(movie(1))));
        assert!(!view.membership().favorited);
        assert_eq!(view.movie().ready().map(|m| m.id), Some(MovieId(2)));
    }

    #[test]
    fn test_navigation_resets_membership() {
        let (mut view, _) = loaded_view(101, &[101], &[101]);
        view.navigate(MovieId(202));
        assert_eq!(view.membership(), MembershipState::default());
        assert_eq!(view.movie(), &Resource::Loading);
    }

    #[test]
    fn test_toggle_requires_open_movie() {
        let mut view = MovieView::new();
        assert!(matches!(
            view.begin_toggle(ListKind::Favorite),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_toggle_confirmed() {
        let (mut view, movie_id) = loaded_view(202, &[], &[]);

        assert!(send_value(view.begin_toggle(ListKind::Favorite).unwrap()));
        assert!(view.membership().favorited, "optimistic flip is immediate");
        assert!(view.is_pending(ListKind::Favorite));

        let settlement = view.settle(movie_id, ListKind::Favorite, Ok(()));
        assert_eq!(settlement, Settlement::Confirmed { value: true });
        assert!(view.membership().favorited);
        assert!(!view.is_pending(ListKind::Favorite));
    }

    #[test]
    fn test_toggle_round_trip() {
        let (mut view, movie_id) = loaded_view(202, &[], &[]);

        view.begin_toggle(ListKind::Favorite).unwrap();
        view.settle(movie_id, ListKind::Favorite, Ok(()));
        assert!(!send_value(view.begin_toggle(ListKind::Favorite).unwrap()));
        view.settle(movie_id, ListKind::Favorite, Ok(()));

        assert!(!view.membership().favorited);
    }

    #[test]
    fn test_toggle_rolled_back_on_failure() {
        let (mut view, movie_id) = loaded_view(202, &[], &[]);

        view.begin_toggle(ListKind::Favorite).unwrap();
        let settlement = view.settle(
            movie_id,
            ListKind::Favorite,
            Err(AppError::ExternalApi("500".into())),
        );

        match settlement {
            Settlement::RolledBack { restored, notice } => {
                assert!(!restored);
                assert_eq!(notice.kind, ListKind::Favorite);
            }
            other => panic!("expected rollback, got {:?}", other),
        }
        assert!(!view.membership().favorited);
        assert!(!view.is_pending(ListKind::Favorite));
        assert!(view.snapshot().notice.is_some());
    }

    #[test]
    fn test_rollback_restores_remote_truth() {
        let (mut view, movie_id) = loaded_view(101, &[101], &[]);

        view.begin_toggle(ListKind::Favorite).unwrap();
        assert!(!view.membership().favorited);
        view.settle(movie_id, ListKind::Favorite, Err(AppError::Unauthorized));
        assert!(view.membership().favorited);
    }

    #[test]
    fn test_second_toggle_is_coalesced() {
        let (mut view, movie_id) = loaded_view(202, &[], &[]);

        assert!(send_value(view.begin_toggle(ListKind::Favorite).unwrap()));
        assert_eq!(
            view.begin_toggle(ListKind::Favorite).unwrap(),
            ToggleStart::Coalesced { desired: false }
        );
        assert!(!view.membership().favorited);

        // First request lands; the user has since changed their mind
        assert_eq!(
            view.settle(movie_id, ListKind::Favorite, Ok(())),
            Settlement::Resend { desired: false }
        );
        assert!(view.is_pending(ListKind::Favorite));
        assert!(!view.membership().favorited);

        assert_eq!(
            view.settle(movie_id, ListKind::Favorite, Ok(())),
            Settlement::Confirmed { value: false }
        );
        assert!(!view.is_pending(ListKind::Favorite));
    }

    #[test]
    fn test_even_number_of_coalesced_toggles_still_single_request() {
        let (mut view, movie_id) = loaded_view(202, &[], &[]);

        view.begin_toggle(ListKind::Watchlist).unwrap();
        view.begin_toggle(ListKind::Watchlist).unwrap();
        view.begin_toggle(ListKind::Watchlist).unwrap();

        assert_eq!(
            view.settle(movie_id, ListKind::Watchlist, Ok(())),
            Settlement::Confirmed { value: true }
        );
        assert!(view.membership().watchlisted);
    }

    #[test]
    fn test_failure_drops_coalesced_intent() {
        let (mut view, movie_id) = loaded_view(202, &[], &[]);

        view.begin_toggle(ListKind::Favorite).unwrap();
        view.begin_toggle(ListKind::Favorite).unwrap();
        view.begin_toggle(ListKind::Favorite).unwrap();

        let settlement = view.settle(
            movie_id,
            ListKind::Favorite,
            Err(AppError::Timeout("mutation".into())),
        );
        assert!(matches!(settlement, Settlement::RolledBack { restored: false, .. }));
        assert!(!view.is_pending(ListKind::Favorite));
    }

    #[test]
    fn test_kinds_are_independent() {
        let (mut view, movie_id) = loaded_view(202, &[], &[]);

        view.begin_toggle(ListKind::Favorite).unwrap();
        view.begin_toggle(ListKind::Watchlist).unwrap();
        view.settle(
            movie_id,
            ListKind::Watchlist,
            Err(AppError::RateLimited("429".into())),
        );

        assert!(view.membership().favorited);
        assert!(!view.membership().watchlisted);
        assert!(view.is_pending(ListKind::Favorite));
    }

    #[test]
    fn test_list_arrival_does_not_clobber_optimistic_value() {
        let mut view = MovieView::new();
        let generation = view.navigate(MovieId(202));
        view.apply_movie(generation, Resource::Ready(movie(202)));

        view.begin_toggle(ListKind::Favorite).unwrap();
        view.apply_list(generation, ListKind::Favorite, page(&[]));
        assert!(view.membership().favorited);

        view.settle(MovieId(202), ListKind::Favorite, Ok(()));
        assert!(view.membership().favorited);

        // The locally held page now agrees with the confirmed state
        view.apply_movie(generation, Resource::Ready(movie(202)));
        assert!(view.membership().favorited);
    }

    #[test]
    fn test_settlement_after_navigation_is_stale() {
        let (mut view, movie_id) = loaded_view(202, &[], &[]);
        view.begin_toggle(ListKind::Favorite).unwrap();

        view.navigate(MovieId(303));
        assert_eq!(
            view.settle(movie_id, ListKind::Favorite, Ok(())),
            Settlement::Stale
        );
        assert!(!view.membership().favorited);
        assert!(!view.is_pending(ListKind::Favorite));
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let (mut view, movie_id) = loaded_view(101, &[101], &[]);
        view.begin_toggle(ListKind::Watchlist).unwrap();

        let snapshot = view.snapshot();
        assert_eq!(snapshot.generation, view.generation());
        assert_eq!(snapshot.movie_id, Some(movie_id));
        assert_eq!(snapshot.movie_status, ResourceStatus::Ready);
        assert!(snapshot.favorited);
        assert!(snapshot.watchlisted);
        assert!(snapshot.watchlist_pending);
        assert!(!snapshot.favorite_pending);
    }

    #[test]
    fn test_reopening_movie_keeps_request_in_flight() {
        let (mut view, movie_id) = loaded_view(101, &[], &[]);
        assert!(send_value(view.begin_toggle(ListKind::Favorite).unwrap()));

        // Same movie opened again while the request is on the wire
        let generation = view.navigate(movie_id);
        assert!(view.membership().favorited);
        view.apply_movie(generation, Resource::Ready(movie(101)));
        view.apply_list(generation, ListKind::Favorite, page(&[]));
        assert!(view.membership().favorited);
        assert!(view.is_pending(ListKind::Favorite));

        assert_eq!(
            view.begin_toggle(ListKind::Favorite).unwrap(),
            ToggleStart::Coalesced { desired: false }
        );
        assert_eq!(view.in_flight_count(), 1);

        assert_eq!(
            view.settle(movie_id, ListKind::Favorite, Ok(())),
            Settlement::Resend { desired: false }
        );
        assert_eq!(
            view.settle(movie_id, ListKind::Favorite, Ok(())),
            Settlement::Confirmed { value: false }
        );
        assert!(!view.membership().favorited);
    }

    #[test]
    fn test_returning_to_movie_joins_earlier_request() {
        let (mut view, movie_id) = loaded_view(101, &[], &[]);
        view.begin_toggle(ListKind::Watchlist).unwrap();

        view.navigate(MovieId(202));
        assert!(!view.is_pending(ListKind::Watchlist));
        assert!(!view.membership().watchlisted);

        view.navigate(movie_id);
        assert!(view.is_pending(ListKind::Watchlist));
        assert!(view.membership().watchlisted);
        assert!(matches!(
            view.begin_toggle(ListKind::Watchlist).unwrap(),
            ToggleStart::Coalesced { desired: false }
        ));
    }

    #[test]
    fn test_latest_intent_still_sent_after_navigation() {
        let (mut view, movie_id) = loaded_view(101, &[], &[]);
        view.begin_toggle(ListKind::Favorite).unwrap();
        view.begin_toggle(ListKind::Favorite).unwrap();

        view.navigate(MovieId(202));
        assert_eq!(
            view.settle(movie_id, ListKind::Favorite, Ok(())),
            Settlement::Resend { desired: false }
        );
        assert_eq!(
            view.settle(movie_id, ListKind::Favorite, Ok(())),
            Settlement::Stale
        );
        assert_eq!(view.in_flight_count(), 0);
        assert!(!view.membership().favorited);
    }

    #[test]
    fn test_failure_after_navigation_leaves_new_movie_alone() {
        let (mut view, movie_id) = loaded_view(101, &[], &[]);
        view.begin_toggle(ListKind::Favorite).unwrap();

        let generation = view.navigate(MovieId(202));
        view.apply_movie(generation, Resource::Ready(movie(202)));
        view.apply_list(generation, ListKind::Favorite, page(&[202]));

        assert_eq!(
            view.settle(movie_id, ListKind::Favorite, Err(AppError::Timeout("late".into()))),
            Settlement::Stale
        );
        assert!(view.membership().favorited);
        assert!(view.snapshot().notice.is_none());
        assert_eq!(view.in_flight_count(), 0);
    }
}
