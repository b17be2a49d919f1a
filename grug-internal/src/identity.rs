//! Caller identity resolution for quota accounting.
//!
//! Authenticated callers are keyed by their stable user id. Anonymous callers
//! are keyed by a salted SHA-256 hash of the best-effort client IP, so raw
//! IPs never reach the ledger or the logs. Resolution never fails: a request
//! with no identity information degrades to a shared "unknown" bucket.

use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::auth::SessionUser;
use crate::quota::IdentifierType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub identifier: String,
    pub identifier_type: IdentifierType,
    pub is_admin: bool,
}

/// Best-effort client IP: first entry of `x-forwarded-for`, else `x-real-ip`,
/// else the literal `"unknown"`.
pub fn client_ip(headers: &HeaderMap) -> &str {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first;
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
}

/// Hex-encoded SHA-256 of the IP concatenated with a server-side salt.
pub fn hash_ip(ip: &str, salt: &SecretString) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hasher.update(salt.expose_secret().as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolve the caller's rate-limit identity from the request headers and an
/// optional authenticated session.
pub fn resolve(
    headers: &HeaderMap,
    session: Option<&SessionUser>,
    salt: &SecretString,
) -> CallerIdentity {
    match session {
        Some(user) => CallerIdentity {
            identifier: user.user_id.clone(),
            identifier_type: IdentifierType::User,
            is_admin: user.is_admin,
        },
        None => CallerIdentity {
            identifier: hash_ip(client_ip(headers), salt),
            identifier_type: IdentifierType::Ip,
            is_admin: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn salt() -> SecretString {
        SecretString::from("test-salt")
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1, 10.0.0.2"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(client_ip(&headers), "198.51.100.1");
    }

    #[test]
    fn test_client_ip_unknown_bucket() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), "unknown");
    }

    #[test]
    fn test_distinct_ips_hash_to_distinct_identifiers() {
        let a = hash_ip("203.0.113.7", &salt());
        let b = hash_ip("203.0.113.8", &salt());
        assert_ne!(a, b);
    }

    #[test]
    fn test_identifier_never_contains_raw_ip() {
        let ip = "203.0.113.7";
        let identifier = hash_ip(ip, &salt());
        assert!(!identifier.contains(ip));
        assert!(!identifier.contains("203"));
        // 64 hex chars of SHA-256.
        assert_eq!(identifier.len(), 64);
        assert!(identifier.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_salt_changes_the_identifier() {
        let with_a = hash_ip("203.0.113.7", &SecretString::from("salt-a"));
        let with_b = hash_ip("203.0.113.7", &SecretString::from("salt-b"));
        assert_ne!(with_a, with_b);
    }

    #[test]
    fn test_resolve_session_wins_over_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        let user = SessionUser {
            user_id: "user-42".to_string(),
            is_admin: true,
        };

        let identity = resolve(&headers, Some(&user), &salt());
        assert_eq!(identity.identifier, "user-42");
        assert_eq!(identity.identifier_type, IdentifierType::User);
        assert!(identity.is_admin);
    }

    #[test]
    fn test_resolve_anonymous() {
        let headers = HeaderMap::new();
        let identity = resolve(&headers, None, &salt());
        assert_eq!(identity.identifier_type, IdentifierType::Ip);
        assert!(!identity.is_admin);
        assert_eq!(identity.identifier, hash_ip("unknown", &salt()));
    }
}
