//! Shared configuration for the rainfly CLI.
//!
//! TOML profiles, access-token resolution (env + plaintext), and
//! translation to `rainfly-api` client settings.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rainfly_api::{AccessToken, TlsMode, TransportConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no access token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            profiles: HashMap::new(),
        }
    }
}

/// A named backend profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Cloud API base URL (e.g. "https://api.example.com/v1/").
    pub base_url: String,

    /// Claiming service base URL. Defaults to `base_url` when unset.
    pub claim_base_url: Option<String>,

    /// Access token (plaintext — prefer token_env).
    pub token: Option<String>,

    /// Environment variable name containing the access token.
    pub token_env: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification (development backends only).
    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,

    /// Override the local snapshot-store directory.
    pub store_dir: Option<PathBuf>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "rainfly", "rainfly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("rainfly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit path (tests, `--config` overrides).
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("RAINFLY_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the access token from the credential chain.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<AccessToken, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(AccessToken::from(SecretString::from(val)));
        }
    }

    // 2. Generic env var
    if let Ok(val) = std::env::var("RAINFLY_TOKEN") {
        return Ok(AccessToken::from(SecretString::from(val)));
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(AccessToken::from(SecretString::from(token.clone())));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Parsed connection settings for building an `ApiClient`.
pub struct ResolvedProfile {
    pub base_url: url::Url,
    pub claim_base_url: url::Url,
    pub token: AccessToken,
    pub transport: TransportConfig,
    pub store_dir: Option<PathBuf>,
}

/// Validate and resolve a profile into client-ready settings.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
) -> Result<ResolvedProfile, ConfigError> {
    let base_url: url::Url = profile
        .base_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {}", profile.base_url),
        })?;

    let claim_base_url: url::Url = match &profile.claim_base_url {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Validation {
            field: "claim_base_url".into(),
            reason: format!("invalid URL: {raw}"),
        })?,
        None => base_url.clone(),
    };

    let token = resolve_token(profile, profile_name)?;

    let tls = if profile.insecure {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    Ok(ResolvedProfile {
        base_url,
        claim_base_url,
        token,
        transport: TransportConfig {
            tls,
            timeout: Duration::from_secs(profile.timeout.unwrap_or(30)),
        },
        store_dir: profile.store_dir.clone(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            base_url: "https://api.example.com/v1/".into(),
            claim_base_url: None,
            token: Some("tok".into()),
            token_env: None,
            ca_cert: None,
            insecure: false,
            timeout: Some(10),
            store_dir: None,
        }
    }

    #[test]
    fn claim_base_defaults_to_api_base() {
        let resolved = resolve_profile(&profile(), "default").unwrap();
        assert_eq!(resolved.base_url, resolved.claim_base_url);
        assert_eq!(resolved.transport.timeout, Duration::from_secs(10));
    }

    #[test]
    fn invalid_url_is_a_validation_error() {
        let mut p = profile();
        p.base_url = "not a url".into();
        assert!(matches!(
            resolve_profile(&p, "default"),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn missing_token_is_reported_per_profile() {
        let mut p = profile();
        p.token = None;
        p.token_env = Some("RAINFLY_TEST_TOKEN_UNSET".into());
        // Plaintext absent and env var unset → NoCredentials (unless a
        // global RAINFLY_TOKEN happens to be exported).
        if std::env::var("RAINFLY_TOKEN").is_err() {
            assert!(matches!(
                resolve_token(&p, "staging"),
                Err(ConfigError::NoCredentials { .. })
            ));
        }
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "prod"

[profiles.prod]
base_url = "https://api.example.com/v1/"
token = "secret"
timeout = 5
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("prod"));
        assert_eq!(cfg.profiles["prod"].timeout, Some(5));
    }
}
