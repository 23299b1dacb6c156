//! Configuration file management for trellis.
//!
//! Provides a TOML-based config file at `~/.config/trellis/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use trellis_core::conflict::ConflictMode;

pub const DEFAULT_BACKEND_BINARY: &str = "claude";
pub const DEFAULT_CONFLICT_MODE: &str = "ask";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub scaffold: ScaffoldSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BackendSection {
    /// Path or name of the `claude` binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ScaffoldSection {
    /// `ask`, `overwrite`, or anything else for skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_mode: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the trellis config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/trellis` or `~/.config/trellis`,
/// never the macOS `~/Library/Application Support` location.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("trellis");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("trellis")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Default)]
pub struct CliOverrides<'a> {
    pub backend_binary: Option<&'a str>,
    pub model: Option<&'a str>,
    pub conflict_mode: Option<&'a str>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, PartialEq, Eq)]
pub struct TrellisConfig {
    pub backend_binary: String,
    pub model: Option<String>,
    pub conflict_mode: ConflictMode,
}

impl TrellisConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Binary: `--backend-binary` > `TRELLIS_BACKEND_BINARY` > `backend.binary` > `claude`
    /// - Model: `--model` > `TRELLIS_MODEL` > `backend.model` > none
    /// - Conflict mode: `--conflict` > `TRELLIS_CONFLICT_MODE` > `scaffold.conflict_mode` > `ask`
    ///
    /// A missing config file is not an error; a malformed one is.
    pub fn resolve(cli: &CliOverrides<'_>) -> Result<Self> {
        let file_config = if config_path().exists() {
            load_config()?
        } else {
            ConfigFile::default()
        };

        let backend_binary = pick(
            cli.backend_binary,
            "TRELLIS_BACKEND_BINARY",
            file_config.backend.binary,
        )
        .unwrap_or_else(|| DEFAULT_BACKEND_BINARY.to_string());

        let model = pick(cli.model, "TRELLIS_MODEL", file_config.backend.model);

        let conflict_setting = pick(
            cli.conflict_mode,
            "TRELLIS_CONFLICT_MODE",
            file_config.scaffold.conflict_mode,
        )
        .unwrap_or_else(|| DEFAULT_CONFLICT_MODE.to_string());

        let conflict_mode = ConflictMode::from_setting(&conflict_setting);
        debug!(
            binary = %backend_binary,
            model = model.as_deref().unwrap_or("default"),
            conflict_mode = %conflict_mode,
            "configuration resolved"
        );

        Ok(Self {
            backend_binary,
            model,
            conflict_mode,
        })
    }
}

/// First non-empty value of flag, env var, file.
fn pick(cli: Option<&str>, env_var: &str, file: Option<String>) -> Option<String> {
    let non_blank = |v: &String| !v.trim().is_empty();
    cli.map(str::to_string)
        .filter(non_blank)
        .or_else(|| std::env::var(env_var).ok().filter(non_blank))
        .or_else(|| file.filter(non_blank))
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
