//! Profile matrix worker main executable

pub mod catalog;
pub mod common;
pub mod err;
pub mod profile;
pub mod store;

use clap::{Args, Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Genomic profile matrix import",
    long_about = "This tool imports, prunes, and exports positionally aligned genomic profile matrices"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Catalog-related commands.
    Catalog(Catalog),
    /// Profile-related commands.
    Profile(Profile),
}

/// Parsing of "catalog *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Catalog {
    /// The sub command to run
    #[command(subcommand)]
    command: CatalogCommands,
}

/// Enum supporting the parsing of "catalog *" sub commands.
#[derive(Debug, Subcommand)]
enum CatalogCommands {
    Load(catalog::Args),
}

/// Parsing of "profile *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Profile {
    /// The sub command to run
    #[command(subcommand)]
    command: ProfileCommands,
}

/// Enum supporting the parsing of "profile *" sub commands.
#[derive(Debug, Subcommand)]
enum ProfileCommands {
    Import(profile::import::Args),
    RemoveSamples(profile::remove::Args),
    Export(profile::export::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Catalog(catalog) => match &catalog.command {
                CatalogCommands::Load(args) => catalog::run(&cli.common, args)?,
            },
            Commands::Profile(profile) => match &profile.command {
                ProfileCommands::Import(args) => profile::import::run(&cli.common, args)?,
                ProfileCommands::RemoveSamples(args) => profile::remove::run(&cli.common, args)?,
                ProfileCommands::Export(args) => profile::export::run(&cli.common, args)?,
            },
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}
