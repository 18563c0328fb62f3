//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatekeeperConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `rate_limit.window_ms`.
pub const ENV_WINDOW_MS: &str = "RATE_LIMIT_WINDOW_MS";
/// Environment variable overriding `rate_limit.max`.
pub const ENV_MAX: &str = "RATE_LIMIT_MAX";

/// Error type for configuration loading. All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply env overrides, and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatekeeperConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Same as [`load_config`] for an in-memory document.
pub fn parse_config(content: &str) -> Result<GatekeeperConfig, ConfigError> {
    let mut config: GatekeeperConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Defaults plus env overrides, for running without a config file.
pub fn from_env() -> Result<GatekeeperConfig, ConfigError> {
    parse_config("")
}

/// Apply `RATE_LIMIT_WINDOW_MS` / `RATE_LIMIT_MAX` using `lookup` to read
/// variables. Unparseable values are validation errors, not silently ignored.
pub fn apply_env_overrides<F>(config: &mut GatekeeperConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    if let Some(raw) = lookup(ENV_WINDOW_MS) {
        match raw.trim().parse::<u64>() {
            Ok(v) => config.rate_limit.window_ms = v,
            Err(_) => errors.push(ValidationError::new(ENV_WINDOW_MS, format!("not an integer: {raw:?}"))),
        }
    }
    if let Some(raw) = lookup(ENV_MAX) {
        match raw.trim().parse::<u32>() {
            Ok(v) => config.rate_limit.max = v,
            Err(_) => errors.push(ValidationError::new(ENV_MAX, format!("not an integer: {raw:?}"))),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors))
    }
}
