//! Command-line front end for carve.
//!
//! `carve shared` previews the variable split of a decomposition manifest;
//! `carve decompose` builds the sub-machines and writes them to disk.

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub(crate) use commands::helpers::{
    join_or_dash, load_manifest, load_project, parse_context_mode, parse_output_format,
};

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decompose {
            project,
            manifest,
            out,
            context_mode,
            separate_projects,
            format,
        } => commands::decompose::run_decompose_command(
            &project,
            &manifest,
            &out,
            context_mode.as_deref(),
            separate_projects,
            &format,
        ),
        Commands::Shared {
            project,
            manifest,
            format,
        } => commands::shared::run_shared_command(&project, &manifest, &format),
    }
}
