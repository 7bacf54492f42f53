use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod render;

use cli::Args;
use commands::execute_command;

fn init_logging(debug: bool) {
    let default_filter = if debug { "osvm=debug,debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = execute_command(args) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
