#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for spkg
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/spkg/config.toml)
//! - Environment variables
//! - CLI flags

pub mod constants;

use serde::{Deserialize, Serialize};
use spkg_errors::{ConfigError, Error};
use spkg_types::{ColorChoice, OutputFormat};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub install: InstallConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Prefix packages are installed under (`{prefix}`)
    pub install_root: Option<PathBuf>,
    /// Binary directory; defaults to `<install_root>/bin`
    pub bin_dir: Option<PathBuf>,
    /// Parent for per-run work directories; defaults to the system temp dir
    pub work_dir: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_build_jobs")]
    pub jobs: usize, // 0 = auto-detect
    #[serde(default)]
    pub keep_work_dir: bool,
    #[serde(default = "default_go_binary")]
    pub go_binary: String,
}

/// Install configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Replace an existing file at the install target
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: 0,
            keep_work_dir: false,
            go_binary: default_go_binary(),
        }
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    0
}

fn default_retry_delay() -> u64 {
    1 // 1 second
}

fn default_user_agent() -> String {
    format!("spkg/{}", env!("CARGO_PKG_VERSION"))
}

fn default_build_jobs() -> usize {
    0 // 0 = auto-detect
}

fn default_go_binary() -> String {
    "go".to_string()
}

fn default_overwrite() -> bool {
    true
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join(constants::APP_DIR)
            .join(constants::CONFIG_FILE))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(ConfigError::from)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Serialize to TOML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::SerializeError {
                error: e.to_string(),
            }
            .into()
        })
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // SPKG_OUTPUT
        if let Ok(output) = std::env::var("SPKG_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => return Err(invalid("SPKG_OUTPUT", output)),
            };
        }

        // SPKG_COLOR
        if let Ok(color) = std::env::var("SPKG_COLOR") {
            self.general.color = color
                .parse()
                .map_err(|_| invalid("SPKG_COLOR", color.clone()))?;
        }

        if let Some(root) = env_path("SPKG_INSTALL_ROOT") {
            self.paths.install_root = Some(root);
        }

        if let Some(bin) = env_path("SPKG_BIN_DIR") {
            self.paths.bin_dir = Some(bin);
        }

        // SPKG_HTTP_TIMEOUT
        if let Ok(timeout) = std::env::var("SPKG_HTTP_TIMEOUT") {
            self.network.timeout = timeout
                .parse()
                .map_err(|_| invalid("SPKG_HTTP_TIMEOUT", timeout.clone()))?;
        }

        // SPKG_RETRIES
        if let Ok(retries) = std::env::var("SPKG_RETRIES") {
            self.network.retries = retries
                .parse()
                .map_err(|_| invalid("SPKG_RETRIES", retries.clone()))?;
        }

        // SPKG_BUILD_JOBS
        if let Ok(jobs) = std::env::var("SPKG_BUILD_JOBS") {
            self.build.jobs = jobs
                .parse()
                .map_err(|_| invalid("SPKG_BUILD_JOBS", jobs.clone()))?;
        }

        // SPKG_KEEP_WORK_DIR
        if let Ok(keep) = std::env::var("SPKG_KEEP_WORK_DIR") {
            self.build.keep_work_dir = match keep.as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => return Err(invalid("SPKG_KEEP_WORK_DIR", keep)),
            };
        }

        Ok(())
    }

    /// Install prefix (with default)
    #[must_use]
    pub fn install_root(&self) -> PathBuf {
        self.paths.install_root.clone().unwrap_or_else(|| {
            dirs::home_dir().map_or_else(
                || PathBuf::from(constants::FALLBACK_INSTALL_ROOT),
                |home| home.join(".local"),
            )
        })
    }

    /// Directory installed binaries land in (with default)
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.paths
            .bin_dir
            .clone()
            .unwrap_or_else(|| self.install_root().join(constants::BIN_SUBDIR))
    }

    /// Parent directory for scoped work directories
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.paths
            .work_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Directory for debug log files
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.paths.logs_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(constants::APP_DIR)
                .join(constants::LOGS_SUBDIR)
        })
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.network.connect_timeout)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.network.retry_delay)
    }
}

fn invalid(field: &str, value: String) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value,
    }
    .into()
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Calculate build jobs based on CPU count
#[must_use]
pub fn calculate_build_jobs(config_value: usize) -> usize {
    if config_value > 0 {
        config_value // User override
    } else {
        // Use 75% of CPUs for builds, minimum 1
        let cpus = num_cpus::get();
        (cpus * 3 / 4).max(1)
    }
}
