pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use propline_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "propline",
    about = "Propline prop scoring CLI",
    long_about = "Score player prop snapshots, run what-if simulations, and inspect engine configuration.",
    after_help = "Examples:\n  propline analyze snapshot.json --pretty\n  propline simulate snapshot.json mods.json\n  propline batch slate.json\n  propline config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a propline.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the log level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Override the log format (compact|pretty|json)")]
    log_format: Option<String>,
    #[arg(long, global = true, help = "Override the league size used for defensive tiers")]
    league_size: Option<u32>,
    #[arg(long, global = true, help = "Override the batch result cache TTL in seconds")]
    cache_ttl_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Score one snapshot and print the full prop report")]
    Analyze {
        snapshot: PathBuf,
        #[arg(long, help = "Number of recent games shown in the heat ring")]
        max_games: Option<usize>,
        #[arg(long, help = "Pretty-print the JSON payload")]
        pretty: bool,
    },
    #[command(about = "Apply hypothetical modifications to a snapshot and diff the verdicts")]
    Simulate {
        snapshot: PathBuf,
        modifications: PathBuf,
        #[arg(long, help = "Pretty-print the JSON payload")]
        pretty: bool,
    },
    #[command(about = "Measure how teammates produce when a player sits")]
    Impact {
        input: PathBuf,
        #[arg(long, help = "Pretty-print the JSON payload")]
        pretty: bool,
    },
    #[command(about = "Score a list of snapshots, reusing results for identical inputs")]
    Batch {
        snapshots: PathBuf,
        #[arg(long, help = "Pretty-print the JSON payload")]
        pretty: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Analyze { .. } => "analyze",
            Self::Simulate { .. } => "simulate",
            Self::Impact { .. } => "impact",
            Self::Batch { .. } => "batch",
            Self::Config => "config",
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = execute(cli);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn execute(cli: Cli) -> CommandResult {
    let command_name = cli.command.name();

    let log_format = match cli.log_format.as_deref().map(str::parse::<LogFormat>).transpose() {
        Ok(format) => format,
        Err(error) => {
            return CommandResult::failure(
                command_name,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let max_games = match &cli.command {
        Command::Analyze { max_games, .. } => *max_games,
        _ => None,
    };

    let overrides = ConfigOverrides {
        log_level: cli.log_level.clone(),
        log_format,
        heat_ring_games: max_games,
        league_size: cli.league_size,
        cache_ttl_secs: cli.cache_ttl_secs,
    };
    let options = LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        overrides: overrides.clone(),
    };

    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command_name,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config.logging);

    match cli.command {
        Command::Analyze { snapshot, pretty, .. } => {
            commands::analyze::run(&config, &snapshot, pretty)
        }
        Command::Simulate { snapshot, modifications, pretty } => {
            commands::simulate::run(&config, &snapshot, &modifications, pretty)
        }
        Command::Impact { input, pretty } => commands::impact::run(&config, &input, pretty),
        Command::Batch { snapshots, pretty } => commands::batch::run(&config, &snapshots, pretty),
        Command::Config => commands::config::run(&config, cli.config.as_deref(), &overrides),
    }
}

/// Logs go to stderr so stdout carries only the JSON payload.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder =
        tracing_subscriber::fmt().with_target(false).with_env_filter(filter).with_writer(std::io::stderr);

    // A subscriber may already be installed when commands run in-process.
    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
