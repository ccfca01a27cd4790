//! Access-token sourcing.
//!
//! Resolution order: `HELIO_PAT` environment variable, then the
//! `~/.helio_config` file. Interactive prompting belongs to front-ends.

use std::path::{Path, PathBuf};

use crate::error::HelioError;

/// Environment variable holding the personal access token.
pub const TOKEN_ENV_VAR: &str = "HELIO_PAT";

/// Config file name, relative to the home directory.
pub const CONFIG_FILE_NAME: &str = ".helio_config";

/// Where a token was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    File(PathBuf),
}

/// Load the token from the environment or the home-directory config file.
pub fn load_token() -> Result<(String, TokenSource), HelioError> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    resolve_token(
        std::env::var(TOKEN_ENV_VAR).ok().as_deref(),
        home.map(|h| h.join(CONFIG_FILE_NAME)).as_deref(),
    )
}

/// Resolve a token from an optional env value and an optional config path.
///
/// Whitespace is trimmed; blank values fall through to the next source.
pub fn resolve_token(
    env_value: Option<&str>,
    config_path: Option<&Path>,
) -> Result<(String, TokenSource), HelioError> {
    if let Some(token) = env_value.map(str::trim).filter(|t| !t.is_empty()) {
        tracing::info!("Access token loaded from {TOKEN_ENV_VAR}");
        return Ok((token.to_string(), TokenSource::Environment));
    }

    if let Some(path) = config_path.filter(|p| p.is_file()) {
        let contents = std::fs::read_to_string(path)?;
        let token = contents.trim();
        if !token.is_empty() {
            tracing::info!(path = %path.display(), "Access token loaded from config file");
            return Ok((token.to_string(), TokenSource::File(path.to_path_buf())));
        }
    }

    Err(HelioError::Config(format!(
        "No access token found in {TOKEN_ENV_VAR} or ~/{CONFIG_FILE_NAME}"
    )))
}
