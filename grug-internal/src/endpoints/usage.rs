//! Read-only usage query backing the client's message counter.
//!
//! Advisory UI state, not an enforcement point: every fallback is
//! permissive, and the handler never errors or mutates the ledger.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::gateway_util::AppState;
use crate::ledger::{self, QuotaEnforcement};
use crate::quota::{self, UNLIMITED};

// Shown when enforcement is disabled: effectively-unlimited advisory state
// without the admin sentinel.
const DISABLED_MODE_LIMIT: i64 = 99;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UsageResponse {
    pub remaining: i64,
    pub limit: i64,
    pub used: u64,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

pub async fn usage_handler(
    State(app_state): AppState,
    headers: HeaderMap,
) -> Json<UsageResponse> {
    let QuotaEnforcement::Enforced(usage_ledger) = &app_state.quota else {
        return Json(UsageResponse {
            remaining: DISABLED_MODE_LIMIT,
            limit: DISABLED_MODE_LIMIT,
            used: 0,
            is_admin: false,
        });
    };

    let identity = super::resolve_caller(&app_state, &headers).await;
    if identity.is_admin {
        return Json(UsageResponse {
            remaining: UNLIMITED,
            limit: UNLIMITED,
            used: 0,
            is_admin: true,
        });
    }

    let date = ledger::today_utc();
    let used = usage_ledger
        .read(&identity.identifier, identity.identifier_type, &date)
        .await;
    let decision = quota::decide(
        identity.identifier_type,
        false,
        used,
        &app_state.config.quota.limits,
    );

    Json(UsageResponse {
        remaining: decision.remaining,
        limit: decision.limit,
        used,
        is_admin: false,
    })
}
