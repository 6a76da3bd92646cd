#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::{Parser, Subcommand};
use pfxsync::*;
use tracing::Level;

mod commands;

use commands::config::ConfigArgs;
use commands::list::ListArgs;
use commands::serve::ServeArgs;
use commands::status::StatusArgs;
use commands::sync::SyncArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.pfxsync/pfxsync.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long, global = true)]
    debug: bool,

    /// Output format: table (default), markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true)]
    format: Option<OutputFormat>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the announced prefixes of an ASN and reconcile them into the database.
    Sync(SyncArgs),

    /// Serve the /update endpoint and run scheduled updates.
    Serve(ServeArgs),

    /// List stored prefixes of an ASN.
    List(ListArgs),

    /// Show record counts and the last run of stored ASNs.
    Status(StatusArgs),

    /// Show configuration and database information.
    Config(ConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let config = match PfxsyncConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let output_format = cli.format.unwrap_or_default();

    match cli.command {
        Commands::Sync(args) => commands::sync::run(&config, args, output_format),
        Commands::Serve(args) => commands::serve::run(&config, args),
        Commands::List(args) => commands::list::run(&config, args, output_format),
        Commands::Status(args) => commands::status::run(&config, args, output_format),
        Commands::Config(args) => commands::config::run(&config, args, output_format),
    }
}
