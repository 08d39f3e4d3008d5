pub mod movie_details;
pub mod providers;

pub use providers::{AccountListProvider, MovieProvider, TmdbProvider};
