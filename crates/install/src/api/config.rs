use spkg_builder::BuildConfig;
use spkg_net::NetConfig;
use std::path::{Path, PathBuf};

/// Installer configuration
#[derive(Clone, Debug)]
pub struct InstallConfig {
    /// Install prefix (`{prefix}` during verification)
    pub prefix: PathBuf,
    /// Directory the binary is installed into
    pub bin_dir: PathBuf,
    /// Parent of the per-run work directory
    pub work_root: PathBuf,
    /// Keep the work directory after the run
    pub keep_work_dir: bool,
    /// Replace an existing file at the install target
    pub overwrite: bool,
    pub network: NetConfig,
    pub build: BuildConfig,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self::from(&spkg_config::Config::default())
    }
}

impl From<&spkg_config::Config> for InstallConfig {
    fn from(config: &spkg_config::Config) -> Self {
        Self {
            prefix: config.install_root(),
            bin_dir: config.bin_dir(),
            work_root: config.work_dir(),
            keep_work_dir: config.build.keep_work_dir,
            overwrite: config.install.overwrite,
            network: NetConfig::from(config),
            build: BuildConfig::from(config),
        }
    }
}

impl InstallConfig {
    /// Install into `bin_dir` instead of the configured location
    #[must_use]
    pub fn with_bin_dir(mut self, bin_dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = bin_dir.into();
        self
    }

    /// Keep or discard the work directory after a run
    #[must_use]
    pub fn with_keep_work_dir(mut self, keep: bool) -> Self {
        self.keep_work_dir = keep;
        self
    }

    /// Set the overwrite policy
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }
}
