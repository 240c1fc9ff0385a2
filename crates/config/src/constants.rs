//! Fallback filesystem locations for spkg
//!
//! Used when neither the configuration file nor the environment names a
//! location and the user's home directory cannot be determined.

pub const APP_DIR: &str = "spkg";
pub const CONFIG_FILE: &str = "config.toml";

pub const FALLBACK_INSTALL_ROOT: &str = "/usr/local";
pub const BIN_SUBDIR: &str = "bin";
pub const LOGS_SUBDIR: &str = "logs";
