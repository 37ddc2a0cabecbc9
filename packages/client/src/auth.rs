//! Access tokens and the refresh collaborator.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use scribe_editor::Permission;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Tokens are treated as expired slightly before their stated expiry
const EXPIRY_SKEW_SECS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub access: String,
    pub refresh: String,
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

/// Who is editing, passed explicitly into the session
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
    pub tokens: Tokens,
    pub permission: Permission,
}

/// Exchanges a refresh token for a new token pair
pub trait AuthProvider: Send + Sync {
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<Tokens, AuthError>> + Send;
}
