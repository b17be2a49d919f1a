//! Application state and request-extraction utilities for the gateway.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{rejection::JsonRejection, FromRequest, Json, Request};
use reqwest::Client;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::auth::{AuthenticationInfo, SessionStore};
use crate::config_parser::Config;
use crate::error::{Error, ErrorDetails};
use crate::inference::provider::{CompletionProvider, ProviderInfo};
use crate::ledger::{QuotaEnforcement, UsageLedger};

pub const PROVIDER_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const PROVIDER_MODEL_ENV: &str = "OPENAI_MODEL";
pub const REDIS_URL_ENV: &str = "GRUG_REDIS_URL";
pub const IP_HASH_SALT_ENV: &str = "GRUG_IP_HASH_SALT";

// Matches what the original deployment degraded to when no dedicated salt
// was provisioned. Only ever used after a startup warning.
const FALLBACK_IP_HASH_SALT: &str = "salt";

/// State for the API
#[derive(Clone)]
pub struct AppStateData {
    pub config: Arc<Config>,
    pub http_client: Client,
    pub authentication_info: AuthenticationInfo,
    pub provider: ProviderInfo,
    pub quota: QuotaEnforcement,
    pub ip_hash_salt: Arc<SecretString>,
}

pub type AppState = axum::extract::State<AppStateData>;

impl AppStateData {
    pub async fn new(config: Arc<Config>) -> Result<Self, Error> {
        let http_client = setup_http_client()?;
        let provider = setup_provider(&config);

        let redis_url = std::env::var(REDIS_URL_ENV).ok();
        let quota = setup_quota(&config, redis_url.as_deref()).await;
        let authentication_info = setup_authentication(&config, redis_url.as_deref()).await;
        let ip_hash_salt = Arc::new(setup_ip_hash_salt());

        Ok(Self {
            config,
            http_client,
            authentication_info,
            provider,
            quota,
            ip_hash_salt,
        })
    }
}

fn setup_provider(config: &Config) -> ProviderInfo {
    match std::env::var(PROVIDER_API_KEY_ENV) {
        Ok(key) if !key.is_empty() => {
            let model = std::env::var(PROVIDER_MODEL_ENV)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| config.provider.model.clone());
            tracing::info!("Completion provider configured (model: {model})");
            ProviderInfo::Connected(CompletionProvider::new(
                config.provider.api_base.clone(),
                model,
                SecretString::from(key),
            ))
        }
        _ => {
            tracing::warn!(
                "{PROVIDER_API_KEY_ENV} is not set; chat requests will be answered with 503"
            );
            ProviderInfo::Unconfigured
        }
    }
}

/// Resolve quota enforcement once at startup. Disabled mode is the local/dev
/// fallback when no ledger backend is reachable, not a production boundary.
async fn setup_quota(config: &Config, redis_url: Option<&str>) -> QuotaEnforcement {
    if !config.quota.enabled {
        tracing::warn!("Quota enforcement disabled by config");
        return QuotaEnforcement::Disabled;
    }
    let Some(url) = redis_url else {
        tracing::warn!("{REDIS_URL_ENV} is not set; quota enforcement disabled");
        return QuotaEnforcement::Disabled;
    };
    match UsageLedger::connect(url, config.quota.redis_timeout_ms).await {
        Ok(ledger) => {
            tracing::info!("Quota enforcement enabled");
            QuotaEnforcement::Enforced(ledger)
        }
        Err(e) => {
            tracing::warn!("Failed to connect usage ledger, quota enforcement disabled: {e}");
            QuotaEnforcement::Disabled
        }
    }
}

async fn setup_authentication(config: &Config, redis_url: Option<&str>) -> AuthenticationInfo {
    let Some(url) = redis_url else {
        return AuthenticationInfo::Disabled;
    };
    match SessionStore::connect(url, config.quota.redis_timeout_ms).await {
        Ok(store) => AuthenticationInfo::Enabled(store),
        Err(e) => {
            tracing::warn!("Failed to connect session store, treating all callers as anonymous: {e}");
            AuthenticationInfo::Disabled
        }
    }
}

fn setup_ip_hash_salt() -> SecretString {
    match std::env::var(IP_HASH_SALT_ENV) {
        Ok(salt) if !salt.is_empty() => SecretString::from(salt),
        _ => {
            tracing::warn!("{IP_HASH_SALT_ENV} is not set; falling back to a static salt");
            SecretString::from(FALLBACK_IP_HASH_SALT)
        }
    }
}

// The streaming phase can dwarf any sane per-request timeout, so this bounds
// only the slowest plausible completion, not typical requests.
pub const DEFAULT_HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub fn setup_http_client() -> Result<Client, Error> {
    Client::builder()
        .timeout(DEFAULT_HTTP_CLIENT_TIMEOUT)
        .build()
        .map_err(|e| {
            Error::new(ErrorDetails::AppState {
                message: format!("Failed to build HTTP client: {e}"),
            })
        })
}

#[derive(Debug)]
pub struct StructuredJson<T>(pub T);

impl<S, T> FromRequest<S> for StructuredJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
    T: Send + Sync + DeserializeOwned,
{
    type Rejection = Error;

    #[instrument(skip_all, level = "trace", name = "StructuredJson::from_request")]
    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // Retrieve the request body as Bytes before deserializing it
        let bytes = axum::body::Bytes::from_request(req, state)
            .await
            .map_err(|e| {
                Error::new(ErrorDetails::JsonRequest {
                    message: format!("{e} ({})", e.status()),
                })
            })?;

        // Convert the entire body into `serde_json::Value`
        let value = Json::<serde_json::Value>::from_bytes(&bytes)
            .map_err(|e| {
                Error::new(ErrorDetails::JsonRequest {
                    message: format!("{e} ({})", e.status()),
                })
            })?
            .0;

        // Now use `serde_path_to_error::deserialize` to attempt deserialization into `T`
        let deserialized: T = serde_path_to_error::deserialize(&value).map_err(|e| {
            Error::new(ErrorDetails::JsonRequest {
                message: e.to_string(),
            })
        })?;

        Ok(StructuredJson(deserialized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct TestParams {
        name: String,
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_structured_json_happy_path() {
        let request = json_request(r#"{"name": "grug"}"#);
        let StructuredJson(params) = StructuredJson::<TestParams>::from_request(request, &())
            .await
            .unwrap();
        assert_eq!(params.name, "grug");
    }

    #[tokio::test]
    async fn test_structured_json_invalid_json_is_400() {
        let request = json_request("{not json");
        let error = StructuredJson::<TestParams>::from_request(request, &())
            .await
            .unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_structured_json_reports_the_failing_path() {
        let request = json_request(r#"{"name": 42}"#);
        let error = StructuredJson::<TestParams>::from_request(request, &())
            .await
            .unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert!(error.to_string().contains("name"));
    }
}
