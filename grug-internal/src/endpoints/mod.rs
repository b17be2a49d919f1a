use axum::http::HeaderMap;

use crate::auth::AuthenticationInfo;
use crate::gateway_util::AppStateData;
use crate::identity::{self, CallerIdentity};

pub mod chat;
pub mod fallback;
pub mod status;
pub mod usage;

/// Resolve the caller's identity for this request: session lookup when
/// authentication is wired up, salted IP hash otherwise. Never fails.
pub async fn resolve_caller(app_state: &AppStateData, headers: &HeaderMap) -> CallerIdentity {
    let session = match &app_state.authentication_info {
        AuthenticationInfo::Enabled(store) => store.lookup(headers).await,
        AuthenticationInfo::Disabled => None,
    };
    identity::resolve(headers, session.as_ref(), &app_state.ip_hash_salt)
}
