//! Configuration for content sync.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CONTENT_SYNC_DIR, CONTENT_SYNC_REMOTE,
//!    CONTENT_SYNC_INTERVAL_SECS)
//! 2. Config file (.content-sync/config.yaml)
//! 3. Defaults (./nextjs-repo, the college content repository, 60s)
//!
//! Config file discovery:
//! - Searches current directory and parents for .content-sync/config.yaml
//! - Falls back to <user config dir>/content-sync/config.yaml
//! - Paths in config file are relative to the project root (the parent of
//!   .content-sync/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::schema::SourceDefinition;
use crate::sync::{SyncSettings, DEFAULT_INTERVAL, DEFAULT_REMOTE_URL};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".content-sync";
const CONFIG_FILE: &str = "config.yaml";

pub const ENV_CONTENT_DIR: &str = "CONTENT_SYNC_DIR";
pub const ENV_REMOTE: &str = "CONTENT_SYNC_REMOTE";
pub const ENV_INTERVAL: &str = "CONTENT_SYNC_INTERVAL_SECS";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    /// Checkout directory (relative to the project root)
    pub content_dir: Option<String>,
    pub remote_url: Option<String>,
    pub interval_seconds: Option<u64>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Directory kept in sync with the remote
    pub content_dir: PathBuf,
    pub remote_url: String,
    /// Delay between background cycles
    pub interval: Duration,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Settings for the sync loop
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            remote_url: self.remote_url.clone(),
            interval: self.interval,
        }
    }

    /// The site's content source, pointed at the configured checkout
    pub fn source(&self) -> SourceDefinition {
        SourceDefinition {
            content_dir_path: self.content_dir.clone(),
            ..SourceDefinition::default()
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    dirs::config_dir()
        .map(|dir| dir.join("content-sync").join(CONFIG_FILE))
        .filter(|path| path.exists())
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to a base directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn parse_interval(value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid sync interval: {}", value))?;
    validate_interval(secs)
}

fn validate_interval(secs: u64) -> Result<Duration> {
    if secs == 0 {
        anyhow::bail!("Sync interval must be at least 1 second");
    }
    Ok(Duration::from_secs(secs))
}

/// Merge env vars, the config file and defaults
fn resolve(
    cwd: &Path,
    config_file: Option<(PathBuf, ConfigFile)>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let (base_dir, file_sync, config_path) = match config_file {
        Some((path, file)) => {
            // Base directory is the parent of .content-sync/
            let base = path
                .parent()
                .and_then(|p| p.parent())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.to_path_buf());
            (base, file.sync, Some(path))
        }
        None => (cwd.to_path_buf(), SyncConfig::default(), None),
    };

    let content_dir = if let Some(dir) = env(ENV_CONTENT_DIR) {
        resolve_path(cwd, &dir)
    } else if let Some(ref dir) = file_sync.content_dir {
        resolve_path(&base_dir, dir)
    } else {
        resolve_path(cwd, &SourceDefinition::default().content_dir_path.to_string_lossy())
    };

    let remote_url = env(ENV_REMOTE)
        .or(file_sync.remote_url)
        .unwrap_or_else(|| DEFAULT_REMOTE_URL.to_string());

    let interval = if let Some(value) = env(ENV_INTERVAL) {
        parse_interval(&value)?
    } else if let Some(secs) = file_sync.interval_seconds {
        validate_interval(secs)?
    } else {
        DEFAULT_INTERVAL
    };

    Ok(ResolvedConfig {
        content_dir,
        remote_url,
        interval,
        config_file: config_path,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;

    let config_file = match find_config_file(&cwd) {
        Some(path) => {
            let file = load_config_file(&path)?;
            Some((path, file))
        }
        None => None,
    };

    resolve(&cwd, config_file, |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
