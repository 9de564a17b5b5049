//! Folio CLI.
//!
//! Provides commands for:
//! - `render`: Parse a document and print its render tree as JSON or HTML
//! - `scene`: Decode a diagram scene and print it as SVG or JSON primitives
//! - `assets`: Allocate asset tokens and print the updated manifest block

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{AssetsArgs, RenderArgs, SceneArgs};
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Folio - hybrid markup and diagram renderer.
#[derive(Parser)]
#[command(name = "folio", version, about)]
struct Cli {
    /// Enable verbose output (info-level logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document.
    Render(RenderArgs),
    /// Decode and draw a diagram scene.
    Scene(SceneArgs),
    /// Allocate asset tokens for URLs.
    Assets(AssetsArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(&output, VERSION),
        Commands::Scene(args) => args.execute(&output),
        Commands::Assets(args) => args.execute(&output),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
