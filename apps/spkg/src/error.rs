//! CLI error handling

use std::fmt;

use spkg_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(spkg_errors::Error),
    /// Pipeline or descriptor error
    Ops(spkg_errors::Error),
    /// The binary was installed but its smoke test failed
    Verification(spkg_errors::VerificationError),
    /// `check` found problems
    CheckFailed(Vec<String>),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {}", e.user_message()),
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Verification(e) => {
                write!(f, "{}", e.user_message())?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                Ok(())
            }
            CliError::CheckFailed(problems) => {
                write!(f, "Check failed:")?;
                for problem in problems {
                    write!(f, "\n  - {problem}")?;
                }
                Ok(())
            }
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) | CliError::Ops(e) => Some(e),
            CliError::Verification(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::CheckFailed(_) => None,
        }
    }
}

impl CliError {
    /// Machine-readable form for `--json` output
    pub fn to_json(&self) -> serde_json::Value {
        let (kind, code, hint) = match self {
            CliError::Config(e) | CliError::Ops(e) => {
                (e.kind().to_string(), e.user_code(), e.user_hint())
            }
            CliError::Verification(e) => ("VerificationError".to_string(), e.user_code(), e.user_hint()),
            CliError::CheckFailed(_) => ("CheckFailed".to_string(), Some("check.failed"), None),
            CliError::Io(_) => ("IoError".to_string(), Some("error.io"), None),
        };
        serde_json::json!({
            "success": false,
            "kind": kind,
            "code": code,
            "message": self.to_string(),
            "hint": hint,
        })
    }
}

impl From<spkg_errors::Error> for CliError {
    fn from(e: spkg_errors::Error) -> Self {
        match e {
            spkg_errors::Error::Config(_) => CliError::Config(e),
            spkg_errors::Error::Verification(inner) => CliError::Verification(inner),
            other => CliError::Ops(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spkg_errors::{Error, IntegrityError};

    #[test]
    fn test_ops_error_lists_code_and_hint() {
        let err = CliError::from(Error::from(IntegrityError::Mismatch {
            file: "v0.3.0.tar.gz".into(),
            algorithm: "sha256".into(),
            expected: "aa".into(),
            actual: "bb".into(),
        }));
        let text = err.to_string();
        assert!(text.starts_with("sha256 mismatch for v0.3.0.tar.gz"));
        assert!(text.contains("\n  Code: integrity.mismatch"));
        assert!(text.contains("\n  Hint: "));
    }

    #[test]
    fn test_verification_error_is_kept_apart() {
        let err = CliError::from(Error::from(spkg_errors::VerificationError::PatternNotFound {
            command: "itsyhome --help".into(),
            pattern: "itsyhome".into(),
            output: String::new(),
        }));
        assert!(matches!(err, CliError::Verification(_)));
        assert_eq!(err.to_json()["kind"], "VerificationError");
    }
}
