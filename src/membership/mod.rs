//! List-membership reconciliation
//!
//! Keeps the favorite/watchlist booleans of the movie on screen in step with
//! the account's remote lists:
//!
//! - [`evaluator`] decides membership from whatever has been fetched so far;
//! - [`view`] holds the single-owner state machine (derivation, optimistic
//!   toggles, rollback, stale-result discard);
//! - [`sync`] performs the fetches and mutations and publishes snapshots.

pub mod evaluator;
pub mod resource;
pub mod sync;
pub mod view;

pub use evaluator::{evaluate, evaluate_page};
pub use resource::{Resource, ResourceStatus};
pub use sync::{LoadHandle, MembershipSync, ToggleDispatch};
pub use view::{
    Generation, MembershipSnapshot, MembershipState, MovieView, Notice, Settlement, ToggleStart,
};
