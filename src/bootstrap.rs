//! Bootstrap helpers for suichat.
//!
//! Credentials and endpoint overrides can live in `~/.suichat/.env`
//! (standard dotenvy format) in addition to the working directory `.env`.

use std::path::PathBuf;

/// Root directory for suichat state: `~/.suichat`.
pub fn suichat_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".suichat")
}

/// Path to the suichat-specific `.env` file: `~/.suichat/.env`.
pub fn suichat_env_path() -> PathBuf {
    suichat_home().join(".env")
}

/// Load env vars from `./.env` and then `~/.suichat/.env`.
///
/// dotenvy never overwrites existing vars, so the effective priority is:
///
///   explicit env vars > `./.env` > `~/.suichat/.env`
pub fn load_suichat_env() {
    let _ = dotenvy::dotenv();

    let path = suichat_env_path();
    if path.exists() {
        match dotenvy::from_path(&path) {
            Ok(()) => tracing::debug!("Loaded env overrides from {}", path.display()),
            Err(e) => tracing::warn!("Failed to load {}: {}", path.display(), e),
        }
    }
}
