//! Per-(identifier, type, UTC date) message counters in Redis.
//!
//! Reads fail open (a transient read failure counts as 0); increments are
//! best-effort and never unwind the response they account for. The only
//! mutation path is a single atomic `SET NX EX` + `INCR` pipeline, so
//! concurrent same-identity requests cannot lose updates.

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, ErrorDetails};
use crate::quota::IdentifierType;

const USAGE_KEY_PREFIX: &str = "chat_usage:";

// Two full UTC days: long enough that the current date's record can never
// expire mid-day, short enough that stale dates prune themselves.
const USAGE_KEY_TTL_SECONDS: u64 = 172_800;

/// Today's UTC calendar date, `YYYY-MM-DD`.
pub fn today_utc() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Redis key for one (identifier, type, date) usage record.
pub fn usage_key(identifier: &str, identifier_type: IdentifierType, date: &str) -> String {
    format!("{USAGE_KEY_PREFIX}{identifier_type}:{identifier}:{date}")
}

/// Lock-free counters for ledger traffic.
#[derive(Debug, Default)]
pub struct LedgerMetrics {
    pub reads: AtomicU64,
    pub read_errors: AtomicU64,
    pub increments: AtomicU64,
    pub increment_errors: AtomicU64,
    pub allowed_requests: AtomicU64,
    pub denied_requests: AtomicU64,
}

impl LedgerMetrics {
    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_increment(&self) {
        self.increments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_increment_error(&self) {
        self.increment_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_allowed(&self) {
        self.allowed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_denied(&self) {
        self.denied_requests.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Clone)]
pub struct UsageLedger {
    conn: MultiplexedConnection,
    op_timeout: Duration,
    metrics: Arc<LedgerMetrics>,
}

impl UsageLedger {
    pub async fn connect(url: &str, op_timeout_ms: u64) -> Result<Self, Error> {
        let client = redis::Client::open(url).map_err(|e| {
            Error::new(ErrorDetails::Config {
                message: format!("Failed to create Redis client for usage ledger: {e}"),
            })
        })?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                Error::new(ErrorDetails::Config {
                    message: format!("Failed to get Redis connection for usage ledger: {e}"),
                })
            })?;
        Ok(Self {
            conn,
            op_timeout: Duration::from_millis(op_timeout_ms),
            metrics: Arc::new(LedgerMetrics::default()),
        })
    }

    pub fn metrics(&self) -> &LedgerMetrics {
        &self.metrics
    }

    /// Served-message count for this identity today. A missing record is 0,
    /// and so is any read failure: under-blocking costs a few extra upstream
    /// calls, while blocking on a ledger hiccup costs a user-visible outage.
    pub async fn read(&self, identifier: &str, identifier_type: IdentifierType, date: &str) -> u64 {
        self.metrics.record_read();
        let key = usage_key(identifier, identifier_type, date);
        let mut conn = self.conn.clone();

        let result = timeout(self.op_timeout, conn.get::<_, Option<u64>>(&key)).await;
        match result {
            Ok(Ok(count)) => count.unwrap_or(0),
            Ok(Err(e)) => {
                self.metrics.record_read_error();
                let _ = Error::new(ErrorDetails::Ledger {
                    message: format!("read failed, treating count as 0: {e}"),
                });
                0
            }
            Err(_) => {
                self.metrics.record_read_error();
                let _ = Error::new(ErrorDetails::Ledger {
                    message: "read timed out, treating count as 0".to_string(),
                });
                0
            }
        }
    }

    /// Count one served message: atomically create the record at 0 (with its
    /// TTL) if absent, then increment. Failures are logged and swallowed —
    /// the response this accounts for has already been delivered.
    pub async fn increment(&self, identifier: &str, identifier_type: IdentifierType, date: &str) {
        self.metrics.record_increment();
        let key = usage_key(identifier, identifier_type, date);
        let mut conn = self.conn.clone();

        let pipeline_result: Result<Result<(u64,), redis::RedisError>, tokio::time::error::Elapsed> =
            timeout(
                self.op_timeout,
                redis::pipe()
                    .atomic()
                    .cmd("SET")
                    .arg(&key)
                    .arg(0)
                    .arg("EX")
                    .arg(USAGE_KEY_TTL_SECONDS)
                    .arg("NX")
                    .ignore()
                    .cmd("INCR")
                    .arg(&key)
                    .query_async(&mut conn),
            )
            .await;

        match pipeline_result {
            Ok(Ok((count,))) => {
                debug!(%identifier_type, count, "Recorded served message");
            }
            Ok(Err(e)) => {
                self.metrics.record_increment_error();
                let _ = Error::new(ErrorDetails::Ledger {
                    message: format!("increment failed, undercounting: {e}"),
                });
            }
            Err(_) => {
                self.metrics.record_increment_error();
                let _ = Error::new(ErrorDetails::Ledger {
                    message: "increment timed out, undercounting".to_string(),
                });
            }
        }
    }
}

/// Whether quota enforcement is active, resolved once at startup. Disabled is
/// the local/dev fallback when no ledger backend is configured — requests
/// proceed as if unlimited.
#[derive(Clone)]
pub enum QuotaEnforcement {
    Enforced(UsageLedger),
    Disabled,
}

impl QuotaEnforcement {
    pub fn is_enabled(&self) -> bool {
        matches!(self, QuotaEnforcement::Enforced(_))
    }
}
