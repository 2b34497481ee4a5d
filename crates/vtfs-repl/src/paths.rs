//! XDG Base Directory paths for the vtfs shell.
//!
//! | Purpose | XDG Variable | Default | vtfs Path |
//! |---------|--------------|---------|-----------|
//! | History | `$XDG_DATA_HOME` | `~/.local/share` | `$XDG_DATA_HOME/vtfs/history.txt` |
//! | Config | `$XDG_CONFIG_HOME` | `~/.config` | `$XDG_CONFIG_HOME/vtfs/config.json` |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use vtfs_core::StoreConfig;

/// Get the data directory for persistent shell state.
///
/// Uses `$XDG_DATA_HOME/vtfs` or falls back to `~/.local/share/vtfs`.
pub fn data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".local").join("share"))
        .join("vtfs")
}

/// Get the config directory.
///
/// Uses `$XDG_CONFIG_HOME/vtfs` or falls back to `~/.config/vtfs`.
pub fn config_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".config"))
        .join("vtfs")
}

pub fn history_file() -> PathBuf {
    data_dir().join("history.txt")
}

pub fn default_config_file() -> PathBuf {
    config_dir().join("config.json")
}

/// Load the store configuration.
///
/// An explicit path must exist. Without one, the default config file is read
/// if present, and built-in defaults are used otherwise. Missing fields take
/// their defaults either way.
pub fn load_config(explicit: Option<&Path>) -> Result<StoreConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_config_file();
            if !path.exists() {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(StoreConfig::default());
            }
            path
        }
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: StoreConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}

/// Fallback home directory when BaseDirs fails.
fn home_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
