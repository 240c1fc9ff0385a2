//! Event handling and progress display

use console::{style, StyledObject, Term};
use spkg_events::{AppEvent, BuildEvent, DownloadEvent, GeneralEvent, InstallEvent};

/// Renders pipeline events as terminal status lines
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    /// Suppress all terminal output (JSON mode)
    quiet: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            quiet,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        crate::logging::log_event_with_tracing(&event);
        if self.quiet {
            return;
        }
        if let Some(line) = self.format_event(&event) {
            self.show(&line);
        }
    }

    /// Status line for an event, if it is one the user should see
    fn format_event(&self, event: &AppEvent) -> Option<String> {
        match event {
            AppEvent::Download(DownloadEvent::Started { url, .. }) => {
                Some(format!("{} {url}", self.accent("Fetching")))
            }
            AppEvent::Download(DownloadEvent::Completed {
                final_size,
                total_time,
                ..
            }) => Some(format!(
                "{} {} in {}ms",
                self.ok("Fetched"),
                format_size(*final_size),
                total_time.as_millis()
            )),
            AppEvent::Download(DownloadEvent::Retrying {
                attempt,
                max_attempts,
                reason,
                ..
            }) => Some(format!(
                "{} attempt {attempt}/{max_attempts}: {reason}",
                self.warn("Retrying")
            )),
            AppEvent::Download(DownloadEvent::Failed { url, error, .. }) => {
                Some(format!("{} {url}: {error}", self.err("Fetch failed")))
            }

            AppEvent::Build(BuildEvent::DependencyChecked { tool, path }) => match path {
                Some(path) if self.debug_enabled => {
                    Some(format!("{} {tool} -> {}", self.dim("found"), path.display()))
                }
                Some(_) => None,
                None => Some(format!("{} {tool}", self.err("missing"))),
            },
            AppEvent::Build(BuildEvent::Started {
                package,
                version,
                steps,
            }) => Some(format!(
                "{} {package} {version} ({steps} step{})",
                self.accent("Building"),
                if *steps == 1 { "" } else { "s" }
            )),
            AppEvent::Build(BuildEvent::StepStarted {
                step,
                total_steps,
                command,
                ..
            }) => Some(format!("  [{step}/{total_steps}] {}", self.dim(command))),
            AppEvent::Build(BuildEvent::Completed {
                package, duration, ..
            }) => Some(format!(
                "{} {package} in {:.1}s",
                self.ok("Built"),
                duration.as_secs_f64()
            )),
            AppEvent::Build(BuildEvent::Failed { package, .. }) => {
                Some(format!("{} {package}", self.err("Build failed")))
            }
            AppEvent::Build(BuildEvent::SourceExtracted { source_root, .. })
                if self.debug_enabled =>
            {
                Some(format!("{} {}", self.dim("extracted"), source_root.display()))
            }

            AppEvent::Install(InstallEvent::Started {
                package,
                version,
                bin_dir,
            }) => Some(format!(
                "{} {package} {version} into {}",
                self.accent("Installing"),
                bin_dir.display()
            )),
            AppEvent::Install(InstallEvent::StageReached { stage, .. }) if self.debug_enabled => {
                Some(format!("{} {stage}", self.dim("stage")))
            }
            AppEvent::Install(InstallEvent::StageFailed {
                reached, failed_at, ..
            }) => Some(format!(
                "{} at {failed_at} (reached {reached})",
                self.err("Failed")
            )),
            AppEvent::Install(InstallEvent::BinaryInstalled { path, replaced, .. }) => {
                Some(format!(
                    "{} {}{}",
                    self.ok("Installed"),
                    path.display(),
                    if *replaced { " (replaced)" } else { "" }
                ))
            }
            AppEvent::Install(InstallEvent::VerificationStarted { command, .. }) => {
                Some(format!("{} {}", self.accent("Testing"), self.dim(command)))
            }
            AppEvent::Install(InstallEvent::VerificationPassed { .. }) => {
                Some(format!("{} smoke test", self.ok("Passed")))
            }
            AppEvent::Install(InstallEvent::WorkDirKept { path, .. }) => Some(format!(
                "{} work directory kept at {}",
                self.warn("Note:"),
                path.display()
            )),

            AppEvent::General(GeneralEvent::Warning { message, context }) => Some(match context {
                Some(context) => format!("{} {message}: {context}", self.warn("Warning:")),
                None => format!("{} {message}", self.warn("Warning:")),
            }),
            AppEvent::General(GeneralEvent::Error { message, details }) => Some(match details {
                Some(details) => format!("{} {message}: {details}", self.err("Error:")),
                None => format!("{} {message}", self.err("Error:")),
            }),
            AppEvent::General(GeneralEvent::DebugLog { message, .. }) if self.debug_enabled => {
                Some(self.dim(message))
            }

            // not shown unless logged
            _ => None,
        }
    }

    fn show(&self, line: &str) {
        let _ = self.term.write_line(line);
    }

    fn paint(&self, text: &str, painter: fn(StyledObject<&str>) -> StyledObject<&str>) -> String {
        if self.colors_enabled {
            painter(style(text)).to_string()
        } else {
            text.to_string()
        }
    }

    fn accent(&self, text: &str) -> String {
        self.paint(text, |s| s.cyan().bold())
    }

    fn ok(&self, text: &str) -> String {
        self.paint(text, |s| s.green().bold())
    }

    fn warn(&self, text: &str) -> String {
        self.paint(text, |s| s.yellow().bold())
    }

    fn err(&self, text: &str) -> String {
        self.paint(text, |s| s.red().bold())
    }

    fn dim(&self, text: &str) -> String {
        self.paint(text, |s| s.dim())
    }
}

/// Format byte size in human readable format
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{size:.0} {}", UNITS[unit_index])
    } else {
        format!("{size:.1} {}", UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spkg_types::InstallStage;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_plain_status_lines() {
        let handler = EventHandler::new(false, false, false);

        let line = handler
            .format_event(&AppEvent::Install(InstallEvent::BinaryInstalled {
                package: "itsyhome".into(),
                path: PathBuf::from("/usr/local/bin/itsyhome"),
                replaced: true,
            }))
            .unwrap();
        assert_eq!(line, "Installed /usr/local/bin/itsyhome (replaced)");

        let line = handler
            .format_event(&AppEvent::Build(BuildEvent::DependencyChecked {
                tool: "go".into(),
                path: None,
            }))
            .unwrap();
        assert_eq!(line, "missing go");
    }

    #[test]
    fn test_stage_lines_only_in_debug() {
        let event = AppEvent::Install(InstallEvent::StageReached {
            package: "itsyhome".into(),
            stage: InstallStage::Built,
            elapsed: Duration::from_millis(5),
        });
        assert!(EventHandler::new(false, false, false)
            .format_event(&event)
            .is_none());
        assert_eq!(
            EventHandler::new(false, true, false).format_event(&event),
            Some("stage Built".to_string())
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
