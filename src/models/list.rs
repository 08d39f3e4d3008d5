use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::{MovieId, Paged};

/// Account-scoped movie lists the user can toggle membership in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Favorite,
    Watchlist,
}

impl ListKind {
    pub const ALL: [ListKind; 2] = [ListKind::Favorite, ListKind::Watchlist];

    /// Path segment used by the TMDB account endpoints, and the name of the
    /// boolean field in the mutation body
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Favorite => "favorite",
            ListKind::Watchlist => "watchlist",
        }
    }
}

impl Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One membership record within a remote list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListEntry {
    pub id: MovieId,
    #[serde(default)]
    pub title: Option<String>,
}

impl ListEntry {
    pub fn new(id: MovieId) -> Self {
        Self {
            id,
            title: None,
        }
    }
}

/// One page of `GET /account/{id}/{favorite|watchlist}/movies`
pub type ListPage = Paged<ListEntry>;

impl ListPage {
    /// Builds a single page holding `entries`
    pub fn single(entries: Vec<ListEntry>) -> Self {
        let total = entries.len() as u32;
        Self {
            page: 1,
            results: entries,
            total_pages: 1,
            total_results: total,
        }
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.results
    }

    /// Applies a confirmed membership change to the locally held page so
    /// later re-derivations agree with the remote list
    pub fn record_membership(&mut self, movie_id: MovieId, member: bool) {
        let position = self.results.iter().position(|e| e.id == movie_id);
        match (member, position) {
            (true, None) => {
                self.results.push(ListEntry::new(movie_id));
                self.total_results += 1;
            }
            (false, Some(index)) => {
                self.results.remove(index);
                self.total_results = self.total_results.saturating_sub(1);
            }
            _ => {}
        }
    }
}

/// Body of `POST /account/{id}/{favorite|watchlist}`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MembershipChange {
    pub media_type: &'static str,
    pub media_id: MovieId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchlist: Option<bool>,
}

impl MembershipChange {
    pub fn new(kind: ListKind, movie_id: MovieId, desired: bool) -> Self {
        let (favorite, watchlist) = match kind {
            ListKind::Favorite => (Some(desired), None),
            ListKind::Watchlist => (None, Some(desired)),
        };
        Self {
            media_type: "movie",
            media_id: movie_id,
            favorite,
            watchlist,
        }
    }
}

/// TMDB status envelope returned by mutating endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub status_code: Option<i64>,
    #[serde(default)]
    pub status_message: Option<String>,
}
