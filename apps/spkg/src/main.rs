//! spkg - Descriptor-driven source package installer
//!
//! This is the CLI application that drives descriptors through the install
//! pipeline in `spkg-install` and renders events and reports.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::display::{
    CheckReport, CommandResult, DescriptorInfo, OutputRenderer, TestReport, ToolStatus,
};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use spkg_builder::{BuildConfig, DependencyProbe, SourceBuilder};
use spkg_config::Config;
use spkg_events::{EventReceiver, EventSender};
use spkg_install::{stages, InstallConfig, Installer};
use spkg_net::{NetClient, NetConfig};
use spkg_types::{BuildOptions, ColorChoice, OutputExpectation, OutputFormat, PackageDescriptor};
use std::path::{Path, PathBuf};
use std::process;
use tokio::select;
use tracing::{debug, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    if let Err(e) = run(cli).await {
        debug!("Application error: {}", e);
        if json_mode {
            println!("{}", e.to_json());
        } else {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    // 1. File config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Environment
    config.merge_env()?;

    // 3. CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.global, &cli.command);

    let json_mode = cli.global.json || config.general.default_output == OutputFormat::Json;
    logging::init_tracing(json_mode, cli.global.debug, &config.logs_dir());
    info!("Starting spkg v{}", env!("CARGO_PKG_VERSION"));

    let (event_sender, event_receiver) = spkg_events::channel();

    let renderer = OutputRenderer::new(json_mode, config.general.color);
    let colors_enabled = match config.general.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug, json_mode);

    let is_install = matches!(cli.command, Commands::Install { .. });
    let (result, deferred) = execute_command_with_events(
        cli.command,
        config.clone(),
        event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    renderer.render_result(&result)?;

    if let Some(err) = deferred {
        return Err(err);
    }

    if is_install && !json_mode {
        show_path_reminder_if_needed(&config.bin_dir());
    }

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    config: Config,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<(CommandResult, Option<CliError>), CliError> {
    let mut command_future = Box::pin(execute_command(command, config, event_sender));

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    event_handler.handle_event(event);
                }
            }
        }
    }
}

/// Execute the specified command
///
/// The second element carries a failure that is reported after the result
/// is rendered, such as a smoke test failing after a successful install.
async fn execute_command(
    command: Commands,
    config: Config,
    tx: EventSender,
) -> Result<(CommandResult, Option<CliError>), CliError> {
    let descriptor = PackageDescriptor::load(command.descriptor()).await?;

    match command {
        Commands::Install { no_test, .. } => {
            let installer = Installer::new(InstallConfig::from(&config), tx)?;
            if no_test {
                let report = installer.install(&descriptor).await?;
                Ok((CommandResult::Install(report), None))
            } else {
                let outcome = installer.install_and_test(&descriptor).await?;
                let deferred = outcome.verification_error.map(CliError::Verification);
                Ok((CommandResult::Install(outcome.report), deferred))
            }
        }

        Commands::Test { .. } => {
            let installer = Installer::new(InstallConfig::from(&config), tx)?;
            installer.test(&descriptor).await?;
            Ok((
                CommandResult::Test(TestReport {
                    name: descriptor.name.clone(),
                    version: descriptor.version.to_string(),
                    installed_path: descriptor.installed_path(installer.config().bin_dir()),
                    passed: true,
                }),
                None,
            ))
        }

        Commands::Fetch { output_dir, .. } => {
            let installer = Installer::new(InstallConfig::from(&config), tx)?;
            let report = installer.fetch(&descriptor, &output_dir).await?;
            Ok((CommandResult::Fetch(report), None))
        }

        Commands::Info { .. } => {
            let info = describe(&descriptor, &config)?;
            Ok((CommandResult::Info(Box::new(info)), None))
        }

        Commands::Check { online, .. } => {
            let report = check(&descriptor, &config, online).await?;
            let problems = report.problems();
            let deferred = (!problems.is_empty()).then(|| CliError::CheckFailed(problems));
            Ok((CommandResult::Check(report), deferred))
        }
    }
}

/// Resolve a descriptor into the summary shown by `info`
fn describe(descriptor: &PackageDescriptor, config: &Config) -> Result<DescriptorInfo, CliError> {
    let source = PathBuf::from("$SOURCE");
    let build_opts = BuildOptions::for_build(
        descriptor.name.clone(),
        descriptor.version.clone(),
        source.clone(),
        PathBuf::from("$STAGE"),
    );
    let plan = SourceBuilder::new(BuildConfig::from(config)).plan(descriptor, &build_opts, &source)?;

    let bin_dir = config.bin_dir();
    let installed_opts = BuildOptions::for_installed(
        descriptor.name.clone(),
        descriptor.version.clone(),
        config.install_root(),
        bin_dir.clone(),
    );
    let test_command = stages::verification_command(&descriptor.verification, &installed_opts)?;

    let expect = match &descriptor.verification.expectation {
        OutputExpectation::Contains(needle) => needle.clone(),
        OutputExpectation::Matches(re) => format!("/{}/", re.as_str()),
    };

    Ok(DescriptorInfo {
        name: descriptor.name.clone(),
        version: descriptor.version.to_string(),
        description: descriptor.description.clone(),
        homepage: descriptor.homepage.clone(),
        license: descriptor.license.clone(),
        source_url: descriptor.source_url.clone(),
        integrity: descriptor.integrity_hash.to_string(),
        build_dependencies: descriptor.build_dependencies.clone(),
        build_plan: plan.iter().map(spkg_builder::CommandSpec::display).collect(),
        test_command: test_command.display(),
        expect,
        installed_path: descriptor.installed_path(&bin_dir),
    })
}

/// Probe build tools and, when asked, the source URL
async fn check(
    descriptor: &PackageDescriptor,
    config: &Config,
    online: bool,
) -> Result<CheckReport, CliError> {
    let probe = DependencyProbe::new();
    let tools = descriptor
        .build_dependencies
        .iter()
        .map(|tool| ToolStatus {
            tool: tool.clone(),
            path: probe.locate(tool),
        })
        .collect();

    let source_reachable = if online {
        let client = NetClient::new(NetConfig::from(config))?;
        Some(spkg_net::check_url(&client, &descriptor.source_url).await?)
    } else {
        None
    };

    Ok(CheckReport {
        name: descriptor.name.clone(),
        version: descriptor.version.to_string(),
        tools,
        source_reachable,
    })
}

/// Apply CLI configuration overrides
fn apply_cli_config(config: &mut Config, global: &GlobalArgs, command: &Commands) {
    if let Some(color) = global.color {
        config.general.color = color;
    }
    if global.json {
        config.general.default_output = OutputFormat::Json;
    }

    match command {
        Commands::Install {
            bin_dir,
            keep_work_dir,
            ..
        } => {
            if let Some(dir) = bin_dir {
                config.paths.bin_dir = Some(dir.clone());
            }
            if *keep_work_dir {
                config.build.keep_work_dir = true;
            }
        }
        Commands::Test {
            bin_dir: Some(dir), ..
        } => {
            config.paths.bin_dir = Some(dir.clone());
        }
        _ => {}
    }
}

/// Show PATH reminder if the bin directory is not in PATH
fn show_path_reminder_if_needed(bin_dir: &Path) {
    let on_path = std::env::var_os("PATH")
        .is_some_and(|path| std::env::split_paths(&path).any(|entry| entry == bin_dir));

    if !on_path {
        eprintln!();
        eprintln!("Note: {} is not in your PATH", bin_dir.display());
        eprintln!("Add it to your shell profile to run installed binaries:");
        eprintln!("  export PATH=\"{}:$PATH\"", bin_dir.display());
    }
}
