//! Command line interface definition

use clap::{Parser, Subcommand};
use spkg_types::ColorChoice;
use std::path::PathBuf;

/// spkg - Descriptor-driven source package installer
#[derive(Parser)]
#[command(name = "spkg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Descriptor-driven source package installer")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the logs directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, verify, build and install a package, then smoke test it
    #[command(alias = "i")]
    Install {
        /// Path to the package descriptor (.yml)
        descriptor: PathBuf,

        /// Install the binary into this directory
        #[arg(long, value_name = "DIR")]
        bin_dir: Option<PathBuf>,

        /// Skip the post-install smoke test
        #[arg(long)]
        no_test: bool,

        /// Keep the work directory for inspection
        #[arg(long)]
        keep_work_dir: bool,
    },

    /// Run the smoke test against an installed package
    Test {
        /// Path to the package descriptor (.yml)
        descriptor: PathBuf,

        /// Directory the binary was installed into
        #[arg(long, value_name = "DIR")]
        bin_dir: Option<PathBuf>,
    },

    /// Download the source archive and check its integrity
    Fetch {
        /// Path to the package descriptor (.yml)
        descriptor: PathBuf,

        /// Directory to store the archive in
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output_dir: PathBuf,
    },

    /// Show a descriptor, its resolved version and build plan
    Info {
        /// Path to the package descriptor (.yml)
        descriptor: PathBuf,
    },

    /// Validate a descriptor and check build dependencies
    Check {
        /// Path to the package descriptor (.yml)
        descriptor: PathBuf,

        /// Also check that the source URL is reachable
        #[arg(long)]
        online: bool,
    },
}

impl Commands {
    /// Descriptor path every command operates on
    pub fn descriptor(&self) -> &std::path::Path {
        match self {
            Self::Install { descriptor, .. }
            | Self::Test { descriptor, .. }
            | Self::Fetch { descriptor, .. }
            | Self::Info { descriptor }
            | Self::Check { descriptor, .. } => descriptor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_install_flags() {
        let cli = Cli::parse_from([
            "spkg",
            "--json",
            "install",
            "recipes/itsyhome.yml",
            "--bin-dir",
            "/tmp/bin",
            "--no-test",
        ]);
        assert!(cli.global.json);
        match cli.command {
            Commands::Install {
                descriptor,
                bin_dir,
                no_test,
                keep_work_dir,
            } => {
                assert_eq!(descriptor, PathBuf::from("recipes/itsyhome.yml"));
                assert_eq!(bin_dir, Some(PathBuf::from("/tmp/bin")));
                assert!(no_test);
                assert!(!keep_work_dir);
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_color_flag_after_subcommand() {
        let cli = Cli::parse_from(["spkg", "info", "x.yml", "--color", "never"]);
        assert_eq!(cli.global.color, Some(ColorChoice::Never));
        assert_eq!(cli.command.descriptor(), std::path::Path::new("x.yml"));
    }
}
