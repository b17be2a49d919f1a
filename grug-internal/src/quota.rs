//! Daily message quota policy.
//!
//! A pure decision function over (identifier kind, admin flag, current count).
//! The ledger read happens before the request is served and the increment
//! after, so the count reflects served messages, not attempted ones.

use serde::Deserialize;

/// Sentinel for "unbounded" in limit/remaining fields.
pub const UNLIMITED: i64 = -1;

/// What kind of identity a usage record is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierType {
    /// Authenticated account, keyed by its stable user id.
    User,
    /// Anonymous caller, keyed by a salted hash of the client IP.
    Ip,
}

impl IdentifierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierType::User => "user",
            IdentifierType::Ip => "ip",
        }
    }
}

impl std::fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily limits, loaded from the config file.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct QuotaLimits {
    /// Max accepted messages/day for anonymous (ip-identified) callers.
    #[serde(default = "default_free_daily_messages")]
    pub free_daily_messages: u32,
    /// Max accepted messages/day for signed-in non-admin callers.
    /// Strictly greater than the free limit.
    #[serde(default = "default_signed_in_daily_messages")]
    pub signed_in_daily_messages: u32,
}

fn default_free_daily_messages() -> u32 {
    5
}

fn default_signed_in_daily_messages() -> u32 {
    25
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            free_daily_messages: default_free_daily_messages(),
            signed_in_daily_messages: default_signed_in_daily_messages(),
        }
    }
}

impl QuotaLimits {
    pub fn limit_for(&self, identifier_type: IdentifierType) -> u32 {
        match identifier_type {
            IdentifierType::User => self.signed_in_daily_messages,
            IdentifierType::Ip => self.free_daily_messages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    /// The daily limit, or [`UNLIMITED`] for admins.
    pub limit: i64,
    /// Messages left today, or [`UNLIMITED`] for admins. Never negative.
    pub remaining: i64,
}

/// Decide whether a caller with `current_count` served messages today may
/// send another. Admins bypass the quota entirely; everyone else is checked
/// with strict less-than against their limit.
pub fn decide(
    identifier_type: IdentifierType,
    is_admin: bool,
    current_count: u64,
    limits: &QuotaLimits,
) -> QuotaDecision {
    if is_admin {
        return QuotaDecision {
            allowed: true,
            limit: UNLIMITED,
            remaining: UNLIMITED,
        };
    }

    let limit = u64::from(limits.limit_for(identifier_type));
    QuotaDecision {
        allowed: current_count < limit,
        limit: limit as i64,
        remaining: limit.saturating_sub(current_count) as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_limit_boundary() {
        let limits = QuotaLimits::default();

        let under = decide(IdentifierType::Ip, false, 4, &limits);
        assert!(under.allowed);
        assert_eq!(under.limit, 5);
        assert_eq!(under.remaining, 1);

        // 5 served messages exhaust a limit of 5: strict less-than.
        let at = decide(IdentifierType::Ip, false, 5, &limits);
        assert!(!at.allowed);
        assert_eq!(at.remaining, 0);
    }

    #[test]
    fn test_signed_in_limit_is_larger() {
        let limits = QuotaLimits::default();
        assert!(limits.signed_in_daily_messages > limits.free_daily_messages);

        let fresh = decide(IdentifierType::User, false, 0, &limits);
        assert!(fresh.allowed);
        assert_eq!(fresh.limit, 25);
        assert_eq!(fresh.remaining, 25);
    }

    #[test]
    fn test_policy_is_monotonic_in_count() {
        let limits = QuotaLimits::default();
        for identifier_type in [IdentifierType::User, IdentifierType::Ip] {
            let mut denied_seen = false;
            for count in 0..=u64::from(limits.limit_for(identifier_type)) + 5 {
                let decision = decide(identifier_type, false, count, &limits);
                // Once denied at some count, denied at every higher count.
                if denied_seen {
                    assert!(!decision.allowed, "policy not monotonic at count {count}");
                }
                if !decision.allowed {
                    denied_seen = true;
                }
            }
            assert!(denied_seen);
        }
    }

    #[test]
    fn test_admin_bypass() {
        let limits = QuotaLimits::default();
        for count in [0, 1, 1000, u64::MAX] {
            let decision = decide(IdentifierType::User, true, count, &limits);
            assert!(decision.allowed);
            assert_eq!(decision.limit, UNLIMITED);
            assert_eq!(decision.remaining, UNLIMITED);
        }
    }

    #[test]
    fn test_remaining_never_negative() {
        let limits = QuotaLimits::default();
        let decision = decide(IdentifierType::Ip, false, 5000, &limits);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }
}
