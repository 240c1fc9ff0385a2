#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Source building for spkg
//!
//! This crate unpacks source archives, checks that build tools are present,
//! and runs a descriptor's build instructions with the release version
//! substituted in.

pub mod archive;
mod builder;
pub mod dependencies;
pub mod execution;
pub mod go;

pub use archive::{extract, ArchiveFormat};
pub use builder::{BuildArtifact, BuildConfig, SourceBuilder};
pub use dependencies::DependencyProbe;
pub use execution::{run, run_checked, CommandOutput, CommandSpec};
pub use go::go_build_command;
