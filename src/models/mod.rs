pub mod list;
pub mod movie;
pub mod session;

pub use list::{ListEntry, ListKind, ListPage, MembershipChange, StatusResponse};
pub use movie::{
    CastCredit, CastMember, Credits, Genre, Movie, MovieDetails, MovieId, MovieSummary, Paged,
    Rating, SpokenLanguage, Video, Videos,
};
pub use session::{AccountId, Session};
