//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs,
    export::ExportArgs,
    import::ImportArgs,
    init::InitArgs,
    part::PartCommands,
    schema::SchemaCommands,
    search::SearchArgs,
};

#[derive(Parser)]
#[command(name = "dmt")]
#[command(author, version, about = "DMT Parts Inventory")]
#[command(
    long_about = "Catalog electronic components under DMTUID classification codes, \
with template-driven attributes and CSV bulk import."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Project root (default: auto-detect by finding .dmt/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new DMT project
    Init(InitArgs),

    /// Part management (create, show, list, update, delete)
    #[command(subcommand)]
    Part(PartCommands),

    /// Import parts from a CSV file
    Import(ImportArgs),

    /// Export parts to CSV
    Export(ExportArgs),

    /// Classification scheme inspection and validation
    #[command(subcommand)]
    Schema(SchemaCommands),

    /// Search across part fields
    Search(SearchArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON (for programming)
    Json,
    /// Just identifiers, one per line
    Id,
}
