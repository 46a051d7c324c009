pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "premia",
    about = "Premia quote aggregation operator CLI",
    long_about = "Drive quote aggregation sessions against the configured backend, inspect \
                  effective configuration, and list product vertical presets.",
    after_help = "Examples:\n  premia poll --proposal prop-42 --vertical motor_comprehensive\n  \
                  premia config\n  premia verticals"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Poll one proposal to settlement, streaming result snapshots as JSON lines"
    )]
    Poll {
        #[arg(long, help = "Proposal id to poll")]
        proposal: String,
        #[arg(long, default_value = "motor_comprehensive", help = "Product vertical preset")]
        vertical: String,
        #[arg(long, help = "Path to a premia.toml config file")]
        config: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config {
        #[arg(long, help = "Path to a premia.toml config file")]
        config: Option<PathBuf>,
    },
    #[command(about = "List the built-in product vertical presets as JSON")]
    Verticals,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Poll { proposal, vertical, config } => {
            commands::poll::run(commands::poll::PollArgs { proposal, vertical, config })
        }
        Command::Config { config } => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(config) }
        }
        Command::Verticals => {
            commands::CommandResult { exit_code: 0, output: commands::verticals::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
