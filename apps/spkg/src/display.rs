//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use serde::Serialize;
use spkg_types::{ColorChoice, FetchReport, InstallReport, InstallStage};
use std::io;
use std::path::PathBuf;

/// Descriptor summary rendered by `info`
#[derive(Debug, Clone, Serialize)]
pub struct DescriptorInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub homepage: String,
    pub license: String,
    pub source_url: String,
    pub integrity: String,
    pub build_dependencies: Vec<String>,
    /// Build commands with source and staging paths left symbolic
    pub build_plan: Vec<String>,
    pub test_command: String,
    pub expect: String,
    pub installed_path: PathBuf,
}

/// Presence of one build tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub tool: String,
    pub path: Option<PathBuf>,
}

/// Result of `check`
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub name: String,
    pub version: String,
    pub tools: Vec<ToolStatus>,
    /// Only probed with `--online`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_reachable: Option<bool>,
}

impl CheckReport {
    /// Human-readable problems, empty when the check passed
    pub fn problems(&self) -> Vec<String> {
        let mut problems: Vec<String> = self
            .tools
            .iter()
            .filter(|t| t.path.is_none())
            .map(|t| format!("build dependency `{}` not found on PATH", t.tool))
            .collect();
        if self.source_reachable == Some(false) {
            problems.push("source URL is not reachable".to_string());
        }
        problems
    }
}

/// Result of `test`
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub name: String,
    pub version: String,
    pub installed_path: PathBuf,
    pub passed: bool,
}

/// Everything a command can print on success
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CommandResult {
    Install(InstallReport),
    Test(TestReport),
    Fetch(FetchReport),
    Info(Box<DescriptorInfo>),
    Check(CheckReport),
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            Self::render_json(result)
        } else {
            self.render_text(result)
        }
    }

    /// Render as JSON
    fn render_json(result: &CommandResult) -> io::Result<()> {
        let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    fn render_text(&self, result: &CommandResult) -> io::Result<()> {
        match result {
            CommandResult::Install(report) => self.render_install_report(report),
            CommandResult::Test(report) => self.render_test_report(report),
            CommandResult::Fetch(report) => self.render_fetch_report(report),
            CommandResult::Info(info) => self.render_descriptor_info(info),
            CommandResult::Check(report) => self.render_check_report(report),
        }
    }

    fn render_install_report(&self, report: &InstallReport) -> io::Result<()> {
        println!("Installation Summary");
        println!();
        println!(
            "Package:  {} {}",
            self.style_package_name(&report.name),
            report.version
        );
        println!("Binary:   {}", report.installed_path.display());
        println!("BLAKE3:   {}", report.binary_hash);
        println!("Source:   {}", report.source_hash);
        println!("Stage:    {}", self.style_stage(report.stage));
        println!();

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Stage").add_attribute(Attribute::Bold),
            Cell::new("Duration").add_attribute(Attribute::Bold),
        ]);
        for timing in &report.timings {
            table.add_row(vec![
                Cell::new(timing.stage),
                Cell::new(format!("{}ms", timing.duration_ms)),
            ]);
        }
        println!("{table}");
        println!("Completed in {}ms", report.duration_ms);
        Ok(())
    }

    fn render_test_report(&self, report: &TestReport) -> io::Result<()> {
        println!(
            "{} {} {}: smoke test passed",
            self.style_package_name(&report.name),
            report.version,
            report.installed_path.display()
        );
        Ok(())
    }

    fn render_fetch_report(&self, report: &FetchReport) -> io::Result<()> {
        println!("Fetch Summary");
        println!();
        println!(
            "Package:  {} {}",
            self.style_package_name(&report.name),
            report.version
        );
        println!("Archive:  {}", report.archive_path.display());
        println!("Size:     {}", crate::events::format_size(report.size));
        println!("Digest:   {}", report.source_hash);
        println!("Duration: {}ms", report.duration_ms);
        Ok(())
    }

    fn render_descriptor_info(&self, info: &DescriptorInfo) -> io::Result<()> {
        println!("{}", self.style_package_name(&info.name));
        println!();

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        let deps = if info.build_dependencies.is_empty() {
            "-".to_string()
        } else {
            info.build_dependencies.join(", ")
        };
        let rows: [(&str, String); 10] = [
            ("Version", info.version.clone()),
            ("Description", info.description.clone()),
            ("Homepage", info.homepage.clone()),
            ("License", info.license.clone()),
            ("Source", info.source_url.clone()),
            ("Integrity", info.integrity.clone()),
            ("Build deps", deps),
            ("Test", info.test_command.clone()),
            ("Expect", info.expect.clone()),
            ("Installs to", info.installed_path.display().to_string()),
        ];
        for (field, value) in rows {
            table.add_row(vec![Cell::new(field), Cell::new(value)]);
        }
        println!("{table}");

        println!();
        println!("Build plan:");
        for (index, command) in info.build_plan.iter().enumerate() {
            println!("  {}. {command}", index + 1);
        }
        Ok(())
    }

    fn render_check_report(&self, report: &CheckReport) -> io::Result<()> {
        println!(
            "{} {}",
            self.style_package_name(&report.name),
            report.version
        );
        println!();

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Tool").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Path").add_attribute(Attribute::Bold),
        ]);
        for tool in &report.tools {
            let (status, path) = match &tool.path {
                Some(path) => (
                    Cell::new("Found").fg(Color::Green),
                    path.display().to_string(),
                ),
                None => (Cell::new("Missing").fg(Color::Red), "-".to_string()),
            };
            table.add_row(vec![Cell::new(&tool.tool), status, Cell::new(path)]);
        }
        if !report.tools.is_empty() {
            println!("{table}");
        }

        match report.source_reachable {
            Some(true) => println!("Source URL reachable"),
            Some(false) => println!("Source URL NOT reachable"),
            None => {}
        }
        if report.problems().is_empty() {
            println!("Descriptor OK");
        }
        Ok(())
    }

    fn style_stage(&self, stage: InstallStage) -> String {
        if self.supports_color() {
            let style = if stage == InstallStage::Verified {
                Style::new().green().bold()
            } else {
                Style::new().yellow().bold()
            };
            style.apply_to(stage).to_string()
        } else {
            stage.to_string()
        }
    }

    /// Style package name
    fn style_package_name(&self, name: &str) -> String {
        if self.supports_color() {
            Style::new().bold().apply_to(name).to_string()
        } else {
            name.to_string()
        }
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}
