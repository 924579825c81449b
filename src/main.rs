mod cli;
mod config;
mod diagnostics;
mod history;
mod model;
mod projects;

use std::{io, process};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use config::Config;

/// Environment variable holding the log filter (e.g. `debug`).
const LOG_ENV: &str = "CCHISTORY_LOG";

fn main() {
    init_tracing();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(&config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}
