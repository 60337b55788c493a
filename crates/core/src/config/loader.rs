use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable holding the API key, as used by the web tools.
pub const API_KEY_ENV: &str = "RUNNINGHUB_API_KEY";

/// Load configuration from file with environment variable overrides.
///
/// Nested keys use a double underscore, e.g. `RUNNINGHUB_POLL__INTERVAL_SECS`.
/// The bare `RUNNINGHUB_API_KEY` always maps to `api.api_key`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(
            Env::prefixed("RUNNINGHUB_")
                .ignore(&["API_KEY", "CONFIG"])
                .split("__"),
        )
        .merge(Env::raw().only(&[API_KEY_ENV]).map(|_| "api.api_key".into()))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
