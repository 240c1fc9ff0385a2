use spkg_errors::{Error, VerificationError};
use spkg_types::{InstallReport, InstallStage};

/// Result of installing and then testing a package
///
/// A failed smoke test does not undo the install, so the report is kept
/// alongside the verification error.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub report: InstallReport,
    /// Set when the installed binary failed its smoke test
    pub verification_error: Option<VerificationError>,
}

impl InstallOutcome {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verification_error.is_none() && self.report.stage == InstallStage::Verified
    }

    /// Collapse into a plain result, dropping the report on verification failure
    ///
    /// # Errors
    ///
    /// Returns the verification error if the smoke test failed.
    pub fn into_result(self) -> Result<InstallReport, Error> {
        match self.verification_error {
            Some(err) => Err(err.into()),
            None => Ok(self.report),
        }
    }
}
