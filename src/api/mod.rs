pub mod handlers;
pub mod routes;
pub mod session;
pub mod state;

pub use routes::create_router;
pub use session::{MaybeSession, ACCOUNT_ID_HEADER, SESSION_ID_HEADER};
pub use state::{AppState, ViewLimits};
