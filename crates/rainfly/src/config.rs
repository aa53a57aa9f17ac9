//! Profile resolution with CLI flag overrides.

use rainfly_config::{Config, Profile, ResolvedProfile};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The profile name to use: `--profile`, else the config default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Resolve connection settings from the config file, profile, and CLI
/// overrides. Flags win over profile values; a missing profile can be
/// fully substituted by `--base-url` + `--token`.
pub fn resolve(global: &GlobalOpts) -> Result<ResolvedProfile, CliError> {
    let cfg = rainfly_config::load_config_or_default();
    let name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&name) {
        Some(profile) => profile.clone(),
        None => {
            let Some(base_url) = global.base_url.clone() else {
                return Err(CliError::NoConfig {
                    path: rainfly_config::config_path().display().to_string(),
                });
            };
            Profile {
                base_url,
                claim_base_url: None,
                token: None,
                token_env: None,
                ca_cert: None,
                insecure: false,
                timeout: None,
                store_dir: None,
            }
        }
    };

    // CLI flag overrides
    if let Some(ref base_url) = global.base_url {
        profile.base_url.clone_from(base_url);
    }
    if let Some(ref token) = global.token {
        profile.token = Some(token.clone());
    }
    if global.insecure {
        profile.insecure = true;
    }
    profile.timeout = Some(global.timeout);
    if let Some(ref dir) = global.store_dir {
        profile.store_dir = Some(dir.clone());
    }

    rainfly_config::resolve_profile(&profile, &name).map_err(|err| match err {
        rainfly_config::ConfigError::NoCredentials { profile } => {
            CliError::NoCredentials { profile }
        }
        other => CliError::Config(other),
    })
}
