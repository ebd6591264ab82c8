//! merklechain CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "merklechain")]
#[command(about = "A proof-of-work ledger with Merkle inclusion proofs", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: commands::GlobalArgs,

    #[command(subcommand)]
    command: Option<commands::Commands>,
}

/// Log to stderr so stdout carries only command output.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("merklechain=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(&cli.global, cmd) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("merklechain - A proof-of-work ledger with Merkle inclusion proofs");
            println!("Run 'merklechain --help' for usage information.");
        }
    }
}
