//! recsync CLI - Command-line interface for recsync
//!
//! Provides commands for:
//! - Running the import of a configured preset
//! - Pruning every record of a preset's target
//! - Checking that a preset is ready to run
//! - Listing and showing configured presets

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod observer;
mod output;
mod registry;

use commands::{
    preset::PresetCommand, presets::PresetsCommand, prune::PruneCommand, run::RunCommand,
    setup::SetupCommand, CommandContext,
};
use output::{get_formatter, OutputFormat};
use recsync_core::Config;

#[derive(Debug, Parser)]
#[command(name = "recsync", version, about = "Reconcile records of a source into a target")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import the records of a preset
    Run(RunCommand),
    /// Remove every record of a preset's target
    Prune(PruneCommand),
    /// Check that a preset is ready to run
    Setup(SetupCommand),
    /// List configured presets
    Presets(PresetsCommand),
    /// Show the configuration of a preset
    Preset(PresetCommand),
}

/// Log level from the command line, falling back to the configured level
fn log_level(verbose: u8, quiet: bool, configured: Option<&str>) -> String {
    match (verbose, quiet) {
        (0, true) => "warn".to_string(),
        (0, false) => configured.unwrap_or("info").to_string(),
        (1, _) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Load the configuration file
///
/// An explicitly given file must exist; a missing default file yields the
/// default configuration.
fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = Config::default_path();
            if !path.exists() {
                return Ok(Config::default());
            }
            path
        }
    };
    let config = Config::load(&path)?;

    let errors = config.validate();
    if let Some(first) = errors.first() {
        return Err(anyhow::anyhow!("{}", first))
            .with_context(|| format!("Invalid configuration file {}", path.display()));
    }
    Ok(config)
}

async fn execute(command: &Commands, ctx: &CommandContext) -> Result<()> {
    match command {
        Commands::Run(cmd) => cmd.execute(ctx).await,
        Commands::Prune(cmd) => cmd.execute(ctx).await,
        Commands::Setup(cmd) => cmd.execute(ctx).await,
        Commands::Presets(cmd) => cmd.execute(ctx).await,
        Commands::Preset(cmd) => cmd.execute(ctx).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let formatter = get_formatter(format);

    let config = load_config(cli.config.as_deref());

    // Setup tracing
    let configured = config.as_ref().ok().map(|c| c.logging.level.as_str());
    let level = log_level(cli.verbose, cli.quiet, configured);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match config {
        Ok(config) => {
            let ctx = CommandContext {
                format,
                quiet: cli.quiet,
                config,
            };
            execute(&cli.command, &ctx).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            formatter.error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "recsync",
            "run",
            "products",
            "--force-updates",
            "--override-target-options",
            r#"{"batch_size": 10}"#,
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run(run) => {
                assert_eq!(run.preset, "products");
                assert!(run.force_updates);
                assert!(!run.from_fixture);
                let overrides = run.override_target_options.unwrap();
                assert_eq!(overrides.get("batch_size"), Some(&serde_json::json!(10)));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_fixture_conflicts_with_source_overrides() {
        let result = Cli::try_parse_from([
            "recsync",
            "run",
            "products",
            "--from-fixture",
            "--override-source-options",
            "{}",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_override_rejected() {
        let result = Cli::try_parse_from([
            "recsync",
            "run",
            "products",
            "--override-target-options",
            "[1, 2]",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level_selection() {
        assert_eq!(log_level(0, false, None), "info");
        assert_eq!(log_level(0, false, Some("error")), "error");
        assert_eq!(log_level(0, true, Some("debug")), "warn");
        assert_eq!(log_level(1, false, Some("error")), "debug");
        assert_eq!(log_level(3, true, None), "trace");
    }

    #[test]
    fn test_load_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"presets:\n  a: {}\n").unwrap();
        file.flush().unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.preset_names(), vec!["a"]);

        assert!(load_config(Some(Path::new("/nonexistent/recsync.yaml"))).is_err());

        let mut invalid = tempfile::NamedTempFile::new().unwrap();
        invalid.write_all(b"logging:\n  level: loud\n").unwrap();
        invalid.flush().unwrap();
        let err = load_config(Some(invalid.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("logging.level"));
    }
}
