//! Bughound CLI entry point.

use clap::Parser;
use std::path::Path;

use bughound::cli::{Cli, Commands};
use bughound::infrastructure::config::ConfigLoader;
use bughound::infrastructure::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    };

    // The log directory only exists after init; skip file logging until then
    let log_dir = Path::new(&config.state_dir).join("logs");
    let log_dir = log_dir.exists().then_some(log_dir);
    let _logger = match logging::init(&config.logging, log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Init { force } => {
            bughound::cli::commands::init::execute(force, config, cli.json).await
        }
        Commands::Hunt(args) => bughound::cli::commands::hunt::execute(args, config, cli.json).await,
        Commands::Status => bughound::cli::commands::status::execute(config, cli.json).await,
        Commands::Clear { yes } => {
            bughound::cli::commands::clear::execute(yes, config, cli.json).await
        }
    };

    if let Err(err) = result {
        bughound::cli::handle_error(err, cli.json);
    }
}
