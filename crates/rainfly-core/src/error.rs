// ── Core error types ──
//
// User-facing errors from rainfly-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<rainfly_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connectivity ─────────────────────────────────────────────────
    #[error("Network unreachable -- not issuing cloud request")]
    Offline,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Cloud connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Node not found: {identifier}")]
    NodeNotFound { identifier: String },

    #[error("Schedule not found: {key}")]
    ScheduleNotFound { key: String },

    #[error("Scene not found: {key}")]
    SceneNotFound { key: String },

    /// A wire value did not match its declared data type.
    #[error("Invalid value for param '{param}': expected {expected}, got {got}")]
    InvalidParamValue {
        param: String,
        expected: String,
        got: String,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Cloud API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Persistence ──────────────────────────────────────────────────
    #[error("Storage error: {message}")]
    Storage { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<rainfly_api::Error> for CoreError {
    fn from(err: rainfly_api::Error) -> Self {
        match err {
            rainfly_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            rainfly_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired -- re-authentication required".into(),
            },
            rainfly_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            rainfly_api::Error::InvalidUrl(e) => CoreError::ValidationFailed {
                message: format!("Invalid URL: {e}"),
            },
            rainfly_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            rainfly_api::Error::Tls(message) => CoreError::ConnectionFailed {
                reason: format!("TLS error: {message}"),
            },
            rainfly_api::Error::Cloud { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            rainfly_api::Error::ApiFailure { message } => CoreError::Api {
                message,
                status: None,
            },
            rainfly_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Storage {
            message: err.to_string(),
        }
    }
}
