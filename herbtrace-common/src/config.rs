//! Configuration loading and data folder resolution
//!
//! Bootstrap configuration comes from an optional TOML file. A missing file
//! is never fatal: a warning is logged and compiled defaults are used.
//!
//! Data folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the data folder
pub const ROOT_FOLDER_ENV: &str = "HERBTRACE_ROOT_FOLDER";

/// File name of the SQLite database inside the data folder
pub const DATABASE_FILE_NAME: &str = "herbtrace.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Data folder holding the database (optional)
    pub root_folder: Option<PathBuf>,

    /// Explicit database file path; overrides `<root_folder>/herbtrace.db`
    pub database_path: Option<PathBuf>,

    /// Interface to bind the HTTP server on
    pub host: String,

    /// HTTP server port
    pub port: u16,

    /// Tracing filter directive used when RUST_LOG is not set
    pub log_level: Option<String>,

    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,

    pub verification: VerificationConfig,
    pub pagination: PaginationConfig,
    pub database: DatabaseConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_path: None,
            host: "127.0.0.1".to_string(),
            port: 3000,
            log_level: None,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
                "http://localhost:5000".to_string(),
                "http://127.0.0.1:5500".to_string(),
            ],
            verification: VerificationConfig::default(),
            pagination: PaginationConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

/// Herb verification settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Simulated inference latency
    pub latency_ms: u64,
    /// Upper bound on a single verification call
    pub timeout_ms: u64,
    /// Probability that the simulated classifier reports a different herb
    pub mismatch_probability: f64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            latency_ms: 2000,
            timeout_ms: 10_000,
            mismatch_probability: 0.15,
        }
    }
}

/// Listing page size bounds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// Database tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Total time a write keeps retrying while SQLite reports a lock
    pub max_lock_wait_ms: u64,
    /// SQLite busy_timeout pragma
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_lock_wait_ms: 5000,
            busy_timeout_ms: 250,
        }
    }
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path or the platform default location
    ///
    /// A missing default file yields defaults with a warning. An explicit
    /// path that cannot be read or parsed is an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading configuration from {}", path.display());
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let p = self.verification.mismatch_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::Config(format!(
                "verification.mismatch_probability must be within [0, 1], got {}",
                p
            )));
        }
        if self.pagination.default_page_size == 0 || self.pagination.max_page_size == 0 {
            return Err(Error::Config("page sizes must be at least 1".to_string()));
        }
        if self.pagination.default_page_size > self.pagination.max_page_size {
            return Err(Error::Config(format!(
                "pagination.default_page_size ({}) exceeds max_page_size ({})",
                self.pagination.default_page_size, self.pagination.max_page_size
            )));
        }
        Ok(())
    }

    /// Database file location for a resolved data folder
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| root_folder.join(DATABASE_FILE_NAME))
    }
}

/// First existing config file in the platform search order
///
/// Linux checks `~/.config/herbtrace/config.toml` then `/etc/herbtrace/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("herbtrace").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/herbtrace/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve the data folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// OS-dependent default data folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("herbtrace"))
        .unwrap_or_else(|| PathBuf::from("./herbtrace_data"))
}

/// Create the data folder if it does not exist yet
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created data folder: {}", path.display());
    }
    Ok(())
}
