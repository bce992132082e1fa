//! procview CLI - render XML procedures to HTML.
//!
//! Provides commands for:
//! - `render`: Print the HTML page for the configured procedure
//! - `status`: Show whether the cached render is fresh

mod commands;
mod error;
mod output;
mod page;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{RenderArgs, StatusArgs};
use output::Output;

/// procview - render XML procedures to HTML through XSLT.
#[derive(Parser)]
#[command(name = "pv", version, about)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the procedure and write the HTML page.
    Render(RenderArgs),
    /// Report whether the cached render is fresh.
    Status(StatusArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables DEBUG level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // stdout carries the rendered page
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Status(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
