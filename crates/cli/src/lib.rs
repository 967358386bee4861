pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "lotbridge",
    about = "Lotbridge operator CLI",
    long_about = "Inspect configuration, check readiness, list tools, and run one-off coffee lot queries.",
    after_help = "Examples:\n  lotbridge doctor --json\n  lotbridge config\n  lotbridge ask \"show me lot 7\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM credentials, backend reachability, and transport setup")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print the tool catalogue advertised to the language model")]
    Tools,
    #[command(about = "Answer one coffee lot question through the configured LLM and backend")]
    Ask {
        #[arg(help = "Natural-language question, e.g. \"what is the status of lot 7?\"")]
        query: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Tools => commands::tools::run(),
        Command::Ask { query } => commands::ask::run(&query),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
