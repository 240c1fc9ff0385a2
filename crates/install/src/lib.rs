#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Package installation for spkg
//!
//! This crate drives a descriptor through the staged pipeline: fetch the
//! source archive, check its digest, probe build tools, build, move the
//! binary into place and smoke test it. Each stage is a plain async function
//! in [`stages`]; [`Installer`] composes them and tracks the run's state.

mod api;
mod installer;
mod pipeline;
pub mod stages;
mod workdir;

pub use api::config::InstallConfig;
pub use api::result::InstallOutcome;
pub use installer::Installer;
pub use stages::InstalledBinary;

// Re-export EventSender so callers can build an installer without naming spkg-events
pub use spkg_events::EventSender;
