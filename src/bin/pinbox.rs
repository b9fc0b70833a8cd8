//! Pinbox CLI Binary
//!
//! Command-line interface for the content-addressed file repository.

use clap::Parser;
use pinbox::config::ConfigLoader;
use pinbox::logging::init_logging;
use pinbox::tooling::cli::{Cli, CliContext};
use std::process;

fn main() {
    let cli = Cli::parse();

    let mut config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };
    if let Some(level) = cli.log_level.clone() {
        config.logging.level = level;
    }
    if let Err(e) = init_logging(Some(&config.logging)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let context = match CliContext::new(cli.store.clone(), &config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error opening repository: {:#}", e);
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
