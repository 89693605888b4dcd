pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use selector_core::config::LoadOptions;

#[derive(Debug, Parser)]
#[command(
    name = "selector",
    about = "Selector operator CLI",
    long_about = "Inspect configuration, check secret readiness, and sign test requests for the /select webhook.",
    after_help = "Examples:\n  selector doctor --json\n  selector config\n  selector sign --body 'command=%2Fselect&text=notes'"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a selector.toml file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, secret readiness, and the Slack API base URL")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print signature headers for a form body using the configured signing secret")]
    Sign {
        #[arg(long, help = "Raw application/x-www-form-urlencoded body")]
        body: String,
        #[arg(long, help = "Unix timestamp in seconds (defaults to now)")]
        timestamp: Option<i64>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config, ..LoadOptions::default() };

    let result = match cli.command {
        Command::Config => commands::CommandResult {
            exit_code: 0,
            output: commands::config::run(options),
        },
        Command::Doctor { json } => commands::doctor::run(options, json),
        Command::Sign { body, timestamp } => commands::sign::run(options, &body, timestamp),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
