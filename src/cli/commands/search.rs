//! `dmt search` command - substring search across part fields

use miette::Result;

use crate::cli::commands::part::print_parts;
use crate::cli::helpers::{open_store, resolve_project};
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Search term (matched against identifier, MPN, manufacturer,
    /// value, description, and notes)
    pub query: String,

    /// Limit number of results
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Show only the number of matches
    #[arg(long)]
    pub count: bool,
}

pub fn run(args: SearchArgs, global: &GlobalOpts) -> Result<()> {
    let project = resolve_project(global)?;
    let store = open_store(&project)?;

    let results = store
        .search_parts(&args.query, args.limit)
        .map_err(|e| miette::miette!("{}", e))?;

    if args.count {
        println!("{}", results.len());
        return Ok(());
    }

    print_parts(&results, global)
}
