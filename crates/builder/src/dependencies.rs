//! Build tool presence checks

use spkg_errors::{Error, MissingDependencyError};
use spkg_events::{AppEvent, BuildEvent, EventEmitter};
use std::ffi::OsString;
use std::path::PathBuf;

/// Looks up build tools on a search path
#[derive(Debug, Clone, Default)]
pub struct DependencyProbe {
    /// Overrides `PATH` when set
    search_path: Option<OsString>,
}

impl DependencyProbe {
    /// Probe the process `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe an explicit `PATH`-style list instead of the environment
    #[must_use]
    pub fn with_search_path(path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(path.into()),
        }
    }

    /// Resolve one tool to its executable path
    #[must_use]
    pub fn locate(&self, tool: &str) -> Option<PathBuf> {
        match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().ok()?;
                which::which_in(tool, Some(paths), cwd).ok()
            }
            None => which::which(tool).ok(),
        }
    }

    /// Check every tool and report all that are missing at once
    ///
    /// Nothing is installed; this only inspects the search path.
    ///
    /// # Errors
    ///
    /// Returns `MissingDependencyError` listing each absent tool in order.
    pub fn ensure<E: EventEmitter>(&self, tools: &[String], emitter: &E) -> Result<Vec<PathBuf>, Error> {
        let mut found = Vec::with_capacity(tools.len());
        let mut missing = Vec::new();

        for tool in tools {
            let path = self.locate(tool);
            emitter.emit(AppEvent::Build(BuildEvent::DependencyChecked {
                tool: tool.clone(),
                path: path.clone(),
            }));
            match path {
                Some(path) => found.push(path),
                None => missing.push(tool.clone()),
            }
        }

        if missing.is_empty() {
            Ok(found)
        } else {
            Err(MissingDependencyError::new(missing).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spkg_events::EventSender;

    #[test]
    fn test_present_tool_found() {
        let probe = DependencyProbe::new();
        let none: Option<EventSender> = None;
        let found = probe.ensure(&["sh".to_string()], &none).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_reports_every_missing_tool() {
        let probe = DependencyProbe::new();
        let none: Option<EventSender> = None;
        let tools = vec![
            "spkg-missing-one".to_string(),
            "sh".to_string(),
            "spkg-missing-two".to_string(),
        ];
        match probe.ensure(&tools, &none).unwrap_err() {
            Error::MissingDependency(err) => {
                assert_eq!(err.missing, vec!["spkg-missing-one", "spkg-missing-two"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_search_path_finds_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let probe = DependencyProbe::with_search_path(temp.path());
        assert!(probe.locate("sh").is_none());
    }
}
