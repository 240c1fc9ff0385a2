//! Build dependency error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("missing build dependencies: {}", missing.join(", "))]
pub struct MissingDependencyError {
    /// Tools that could not be found, in descriptor order
    pub missing: Vec<String>,
}

impl MissingDependencyError {
    #[must_use]
    pub fn new(missing: Vec<String>) -> Self {
        Self { missing }
    }
}

impl UserFacingError for MissingDependencyError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        Some("Install the listed tools with your system package manager and make sure they are on PATH.")
    }

    fn user_code(&self) -> Option<&'static str> {
        Some("dependency.missing")
    }
}
