//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Split an Event-B machine into sub-machines that communicate through shared variables.\n\n\
    Inputs are a JSON project (machines and contexts) and a JSON manifest naming the\n\
    machine and the events each sub-model owns.\n\n  \
    1. carve shared project.json manifest.json\n  \
    2. carve decompose project.json manifest.json --out decomposed/";

#[derive(Parser)]
#[command(name = "carve")]
#[command(about = "Shared-variable decomposition of Event-B machines")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Build one sub-machine per sub-model and write them under --out
    Decompose {
        /// Project file (JSON)
        project: PathBuf,

        /// Decomposition manifest (JSON)
        manifest: PathBuf,

        /// Output directory; one sub-directory per target project
        #[arg(long)]
        out: PathBuf,

        /// Context mode, overriding the manifest: copy | flattened
        #[arg(long)]
        context_mode: Option<String>,

        /// Write each sub-machine to a project of its own
        #[arg(long, default_value_t = false)]
        separate_projects: bool,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print the accessed and shared variables of each sub-model
    Shared {
        /// Project file (JSON)
        project: PathBuf,

        /// Decomposition manifest (JSON)
        manifest: PathBuf,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}
