use clap::Parser;
use colored::Colorize;
use infrastructure::config::Config;
use presentation::cli::{Cli, CliApp, Command};
use shared::telemetry::init_tracing;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(match cli.command {
        Command::Serve { .. } => "info",
        _ => "warn",
    });

    let result = match Config::load() {
        Ok(config) => CliApp::new(config).run(cli).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
