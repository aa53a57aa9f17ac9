//! CLI error types with miette diagnostics.
//!
//! Maps core/api/config errors into user-facing errors with actionable
//! help text.

use miette::Diagnostic;
use thiserror::Error;

use rainfly_core::{ClaimError, CoreError, LocalError};

/// Exit codes per the CLI conventions.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the cloud backend: {reason}")]
    #[diagnostic(
        code(rainfly::connection_failed),
        help("Check your network connection and the configured base_url.")
    )]
    ConnectionFailed { reason: String },

    #[error("Network unreachable")]
    #[diagnostic(
        code(rainfly::offline),
        help("The operation was not sent; reconnect and retry.")
    )]
    Offline,

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(rainfly::timeout),
        help("Increase --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(rainfly::auth_failed),
        help("Refresh your access token (RAINFLY_TOKEN or the profile's token_env).")
    )]
    AuthFailed { message: String },

    #[error("No access token configured for profile '{profile}'")]
    #[diagnostic(
        code(rainfly::no_credentials),
        help("Set RAINFLY_TOKEN, or add token/token_env to the profile.")
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(rainfly::not_found),
        help("Run: rainfly {list_command} to see available entries")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Operations ───────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(rainfly::operation_failed))]
    OperationFailed { message: String },

    /// Batched operation applied on some nodes only.
    #[error("{message}")]
    #[diagnostic(
        code(rainfly::partial_failure),
        help("The operation succeeded on the remaining nodes.")
    )]
    PartialFailure { message: String },

    #[error("Claiming failed: {0}")]
    #[diagnostic(code(rainfly::claim_failed))]
    Claim(#[from] ClaimError),

    #[error("Local control failed: {0}")]
    #[diagnostic(code(rainfly::local_failed))]
    Local(#[from] LocalError),

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(rainfly::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(rainfly::no_config),
        help(
            "Create one at {path}, or pass --base-url and --token.\n\
             Minimal profile:\n\n\
             [profiles.default]\n\
             base_url = \"https://api.example.com/v1/\"\n\
             token_env = \"RAINFLY_TOKEN\""
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(rainfly::config))]
    Config(#[from] rainfly_config::ConfigError),

    // ── API / IO ─────────────────────────────────────────────────────
    #[error("Cloud API error: {message}")]
    #[diagnostic(code(rainfly::api_error))]
    ApiError { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(rainfly::json), help("Check the JSON and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Offline => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Json(_) => exit_code::USAGE,
            Self::PartialFailure { .. } => exit_code::PARTIAL,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Offline => CliError::Offline,

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NodeNotFound { identifier } => CliError::NotFound {
                resource_type: "node".into(),
                identifier,
                list_command: "nodes list".into(),
            },

            CoreError::ScheduleNotFound { key } => CliError::NotFound {
                resource_type: "schedule".into(),
                identifier: key,
                list_command: "schedules list".into(),
            },

            CoreError::SceneNotFound { key } => CliError::NotFound {
                resource_type: "scene".into(),
                identifier: key,
                list_command: "scenes list".into(),
            },

            CoreError::InvalidParamValue {
                param,
                expected,
                got,
            } => CliError::Validation {
                field: param,
                reason: format!("expected {expected}, got {got}"),
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api { message, .. } => CliError::ApiError { message },

            CoreError::Storage { message } => CliError::OperationFailed { message },

            CoreError::Internal(message) => CliError::ApiError { message },
        }
    }
}

impl From<rainfly_api::Error> for CliError {
    fn from(err: rainfly_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
