use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};
use std::fmt::{Debug, Display};
use tokio::sync::OnceCell;

use crate::persona;

/// Controls whether to include raw provider response details in error output.
///
/// When true, raw response payloads are logged for completion provider errors.
/// Caller-facing bodies never include them either way.
static DEBUG: OnceCell<bool> = OnceCell::const_new();

pub fn set_debug(debug: bool) -> Result<(), Error> {
    DEBUG.set(debug).map_err(|_| {
        Error::new(ErrorDetails::Config {
            message: "Failed to set debug mode".to_string(),
        })
    })
}

/// Chooses between a `Debug` or `Display` representation based on the gateway-level `DEBUG` flag.
pub struct DisplayOrDebugGateway<T: Debug + Display> {
    val: T,
}

impl<T: Debug + Display> DisplayOrDebugGateway<T> {
    pub fn new(val: T) -> Self {
        Self { val }
    }
}

impl<T: Debug + Display> Display for DisplayOrDebugGateway<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *DEBUG.get().unwrap_or(&false) {
            write!(f, "{:?}", self.val)
        } else {
            write!(f, "{}", self.val)
        }
    }
}

#[derive(Debug, PartialEq)]
// As long as the struct member is private, we force people to use the `new` method and log the error.
// We box `ErrorDetails` per the `clippy::result_large_err` lint
pub struct Error(Box<ErrorDetails>);

impl Error {
    pub fn new(details: ErrorDetails) -> Self {
        details.log();
        Error(Box::new(details))
    }

    pub fn new_without_logging(details: ErrorDetails) -> Self {
        Error(Box::new(details))
    }

    pub fn status_code(&self) -> StatusCode {
        self.0.status_code()
    }

    pub fn get_details(&self) -> &ErrorDetails {
        &self.0
    }

    pub fn get_owned_details(self) -> ErrorDetails {
        *self.0
    }

    pub fn log(&self) {
        self.0.log();
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for Error {}

impl From<ErrorDetails> for Error {
    fn from(details: ErrorDetails) -> Self {
        Error::new(details)
    }
}

#[derive(Debug, PartialEq)]
pub enum ErrorDetails {
    AppState {
        message: String,
    },
    Config {
        message: String,
    },
    FileRead {
        message: String,
        file_path: String,
    },
    /// Failure reaching the completion provider (request never produced a response).
    InferenceClient {
        message: String,
        status_code: Option<StatusCode>,
        raw_response: Option<String>,
    },
    /// The completion provider responded, but with an error or an unparseable payload.
    InferenceServer {
        message: String,
        raw_response: Option<String>,
    },
    InvalidRequest {
        message: String,
    },
    JsonRequest {
        message: String,
    },
    /// Usage ledger read/increment failure. Contained: never surfaced to callers.
    Ledger {
        message: String,
    },
    Observability {
        message: String,
    },
    ProviderNotConfigured,
    /// Not a failure: a policy decision to deny the request.
    QuotaExceeded {
        message: String,
        limit: i64,
    },
    Serialization {
        message: String,
    },
}

impl ErrorDetails {
    /// Defines the log level for the error
    fn level(&self) -> tracing::Level {
        match self {
            ErrorDetails::AppState { .. } => tracing::Level::ERROR,
            ErrorDetails::Config { .. } => tracing::Level::ERROR,
            ErrorDetails::FileRead { .. } => tracing::Level::ERROR,
            ErrorDetails::InferenceClient { .. } => tracing::Level::ERROR,
            ErrorDetails::InferenceServer { .. } => tracing::Level::ERROR,
            ErrorDetails::InvalidRequest { .. } => tracing::Level::WARN,
            ErrorDetails::JsonRequest { .. } => tracing::Level::WARN,
            ErrorDetails::Ledger { .. } => tracing::Level::WARN,
            ErrorDetails::Observability { .. } => tracing::Level::ERROR,
            ErrorDetails::ProviderNotConfigured => tracing::Level::WARN,
            ErrorDetails::QuotaExceeded { .. } => tracing::Level::INFO,
            ErrorDetails::Serialization { .. } => tracing::Level::ERROR,
        }
    }

    /// Defines the HTTP status code for responses involving this error
    fn status_code(&self) -> StatusCode {
        match self {
            ErrorDetails::AppState { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetails::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetails::FileRead { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            // The provider's own status code is logged, never propagated: callers
            // always see a generic 500 for upstream failures.
            ErrorDetails::InferenceClient { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetails::InferenceServer { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetails::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ErrorDetails::JsonRequest { .. } => StatusCode::BAD_REQUEST,
            ErrorDetails::Ledger { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetails::Observability { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetails::ProviderNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ErrorDetails::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ErrorDetails::Serialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn log(&self) {
        match self.level() {
            tracing::Level::ERROR => tracing::error!("{self}"),
            tracing::Level::WARN => tracing::warn!("{self}"),
            tracing::Level::INFO => tracing::info!("{self}"),
            tracing::Level::DEBUG => tracing::debug!("{self}"),
            tracing::Level::TRACE => tracing::trace!("{self}"),
        }
    }

    /// The caller-facing response body for this error.
    ///
    /// Always a short human-readable string plus machine-checkable fields;
    /// provider payloads and internal detail stay in the logs.
    pub fn to_response_json(&self) -> (StatusCode, Value) {
        let body = match self {
            ErrorDetails::QuotaExceeded { message, .. } => json!({
                "error": message,
                "rateLimited": true,
                "remaining": 0,
            }),
            ErrorDetails::ProviderNotConfigured => json!({
                "error": persona::NOT_CONNECTED_MESSAGE,
            }),
            ErrorDetails::InferenceClient { .. } | ErrorDetails::InferenceServer { .. } => json!({
                "error": persona::BRAIN_HURT_MESSAGE,
            }),
            ErrorDetails::InvalidRequest { message } | ErrorDetails::JsonRequest { message } => {
                json!({ "error": message })
            }
            _ => json!({ "error": persona::BRAIN_HURT_MESSAGE }),
        };
        (self.status_code(), body)
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorDetails::AppState { message } => {
                write!(f, "Error initializing application state: {message}")
            }
            ErrorDetails::Config { message } => write!(f, "{message}"),
            ErrorDetails::FileRead { message, file_path } => {
                write!(f, "Error reading file {file_path}: {message}")
            }
            ErrorDetails::InferenceClient {
                message,
                status_code,
                raw_response,
            } => {
                write!(f, "Error from completion provider client: {message}")?;
                if let Some(status_code) = status_code {
                    write!(f, " (status: {status_code})")?;
                }
                if *DEBUG.get().unwrap_or(&false) {
                    if let Some(raw_response) = raw_response {
                        write!(f, "\nRaw response: {raw_response}")?;
                    }
                }
                Ok(())
            }
            ErrorDetails::InferenceServer {
                message,
                raw_response,
            } => {
                write!(f, "Error from completion provider server: {message}")?;
                if *DEBUG.get().unwrap_or(&false) {
                    if let Some(raw_response) = raw_response {
                        write!(f, "\nRaw response: {raw_response}")?;
                    }
                }
                Ok(())
            }
            ErrorDetails::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
            ErrorDetails::JsonRequest { message } => write!(f, "{message}"),
            ErrorDetails::Ledger { message } => write!(f, "Usage ledger error: {message}"),
            ErrorDetails::Observability { message } => write!(f, "{message}"),
            ErrorDetails::ProviderNotConfigured => {
                write!(f, "Completion provider API key is not configured")
            }
            ErrorDetails::QuotaExceeded { message, limit } => {
                write!(f, "Daily message quota exhausted (limit {limit}): {message}")
            }
            ErrorDetails::Serialization { message } => write!(f, "{message}"),
        }
    }
}

impl IntoResponse for Error {
    /// Log the error and convert it into an Axum response
    fn into_response(self) -> Response {
        let (status_code, body) = self.get_details().to_response_json();
        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_exceeded_response_shape() {
        let error = Error::new_without_logging(ErrorDetails::QuotaExceeded {
            message: persona::QUOTA_ANONYMOUS_MESSAGE.to_string(),
            limit: 5,
        });

        assert_eq!(error.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let (status, body) = error.get_details().to_response_json();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["rateLimited"], json!(true));
        assert_eq!(body["remaining"], json!(0));
        assert_eq!(body["error"], json!(persona::QUOTA_ANONYMOUS_MESSAGE));
    }

    #[test]
    fn test_provider_not_configured_is_503() {
        let error = Error::new_without_logging(ErrorDetails::ProviderNotConfigured);
        let (status, body) = error.get_details().to_response_json();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], json!(persona::NOT_CONNECTED_MESSAGE));
    }

    #[test]
    fn test_upstream_errors_are_generic_500s() {
        let error = Error::new_without_logging(ErrorDetails::InferenceClient {
            message: "connection refused".to_string(),
            status_code: Some(StatusCode::BAD_GATEWAY),
            raw_response: Some("{\"code\": \"upstream_exploded\"}".to_string()),
        });

        let (status, body) = error.get_details().to_response_json();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        // Provider detail must not leak into the caller-facing body.
        assert_eq!(body["error"], json!(persona::BRAIN_HURT_MESSAGE));
        assert!(!body.to_string().contains("upstream_exploded"));
    }

    #[test]
    fn test_invalid_request_keeps_its_message() {
        let error = Error::new_without_logging(ErrorDetails::InvalidRequest {
            message: persona::EMPTY_MESSAGE.to_string(),
        });
        let (status, body) = error.get_details().to_response_json();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!(persona::EMPTY_MESSAGE));
    }

    #[test]
    fn test_ledger_error_level_is_warn() {
        let details = ErrorDetails::Ledger {
            message: "redis timeout".to_string(),
        };
        assert_eq!(details.level(), tracing::Level::WARN);
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_error_construction_logs_once() {
        let _ = Error::new(ErrorDetails::Ledger {
            message: "redis fell over".to_string(),
        });
        assert!(logs_contain("Usage ledger error: redis fell over"));
    }

    #[test]
    fn test_display_quota_exceeded() {
        let details = ErrorDetails::QuotaExceeded {
            message: "no more words".to_string(),
            limit: 25,
        };
        assert_eq!(
            details.to_string(),
            "Daily message quota exhausted (limit 25): no more words"
        );
    }
}
