use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::{AppError, AppResult};

/// TMDB account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credentials supplied by the external auth flow.
///
/// Never issued or refreshed here; only checked and forwarded with every
/// account-scoped request.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub account_id: AccountId,
    pub session_id: String,
}

impl Session {
    pub fn new(account_id: u64, session_id: impl Into<String>) -> Self {
        Self {
            account_id: AccountId(account_id),
            session_id: session_id.into(),
        }
    }

    /// Fails fast when the credentials cannot possibly authenticate
    pub fn ensure_valid(&self) -> AppResult<()> {
        if self.account_id.0 == 0 || self.session_id.trim().is_empty() {
            return Err(AppError::Unauthorized);
        }
        Ok(())
    }

    /// Turns optional credentials into a usable session or `Unauthorized`
    pub fn require(session: Option<&Session>) -> AppResult<&Session> {
        let session = session.ok_or(AppError::Unauthorized)?;
        session.ensure_valid()?;
        Ok(session)
    }
}

// Keeps the session token out of logs
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("account_id", &self.account_id)
            .field("session_id", &"<redacted>")
            .finish()
    }
}
