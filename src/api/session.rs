use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::models::Session;

/// Header carrying the TMDB account id
pub const ACCOUNT_ID_HEADER: &str = "x-account-id";

/// Header carrying the TMDB session id
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Credentials forwarded by the client, if any.
///
/// Extraction never fails; handlers decide whether a session is required.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl MaybeSession {
    pub fn as_ref(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let account_id = header(ACCOUNT_ID_HEADER).and_then(|v| v.parse::<u64>().ok());
        let session_id = header(SESSION_ID_HEADER);

        Ok(MaybeSession(match (account_id, session_id) {
            (Some(account_id), Some(session_id)) => Some(Session::new(account_id, session_id)),
            _ => None,
        }))
    }
}
