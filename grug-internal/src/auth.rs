//! Session lookup against the hosted auth backend.
//!
//! The auth frontend (out of scope here) writes session records to Redis at
//! `session:{sha256("grug-" + token)}` as JSON `{user_id, is_admin}`. The
//! gateway only ever reads them. Lookup failures of any kind degrade to
//! anonymous rather than rejecting the request.

use axum::http::HeaderMap;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{Error, ErrorDetails};

const SESSION_KEY_PREFIX: &str = "session:";
const SESSION_COOKIE_NAME: &str = "grug_session";

/// The authenticated account behind a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Represents the authentication state of the gateway
#[derive(Clone)]
pub enum AuthenticationInfo {
    Enabled(SessionStore),
    Disabled,
}

// Hash session tokens before lookup so raw tokens are never used as keys
// (matching how the auth frontend stores them).
fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"grug-");
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The session token carried by the request, if any: `Authorization: Bearer`
/// first, then the `grug_session` cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(authorization) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let authorization = authorization.trim();
        if let Some(token) = authorization.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    let cookies = headers.get("cookie").and_then(|v| v.to_str().ok())?;
    for pair in cookies.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        if parts.next() == Some(SESSION_COOKIE_NAME) {
            let value = parts.next().unwrap_or("").trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[derive(Clone)]
pub struct SessionStore {
    conn: MultiplexedConnection,
    lookup_timeout: Duration,
}

impl SessionStore {
    pub async fn connect(url: &str, lookup_timeout_ms: u64) -> Result<Self, Error> {
        let client = redis::Client::open(url).map_err(|e| {
            Error::new(ErrorDetails::Config {
                message: format!("Failed to create Redis client for sessions: {e}"),
            })
        })?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                Error::new(ErrorDetails::Config {
                    message: format!("Failed to get Redis connection for sessions: {e}"),
                })
            })?;
        Ok(Self {
            conn,
            lookup_timeout: Duration::from_millis(lookup_timeout_ms),
        })
    }

    /// The authenticated account for this request, if any. Never errors:
    /// missing tokens, missing records, timeouts, and parse failures all
    /// resolve to `None`.
    pub async fn lookup(&self, headers: &HeaderMap) -> Option<SessionUser> {
        let token = session_token(headers)?;
        let key = format!("{SESSION_KEY_PREFIX}{}", hash_session_token(&token));

        let mut conn = self.conn.clone();
        let result = timeout(
            self.lookup_timeout,
            conn.get::<_, Option<String>>(&key),
        )
        .await;

        match result {
            Ok(Ok(Some(data))) => match serde_json::from_str::<SessionUser>(&data) {
                Ok(user) => {
                    debug!(user_id = %user.user_id, "Resolved session");
                    Some(user)
                }
                Err(e) => {
                    warn!("Failed to parse session record: {e}");
                    None
                }
            },
            Ok(Ok(None)) => {
                debug!("No session record for presented token");
                None
            }
            Ok(Err(e)) => {
                warn!("Redis error during session lookup: {e}");
                None
            }
            Err(_) => {
                warn!("Redis timeout during session lookup");
                None
            }
        }
    }
}
