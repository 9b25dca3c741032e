//! `dmt import` command - CSV bulk import
//!
//! Each data row is one input record. Column headers are
//! case-sensitive: `DMTUID` (or the four segment columns TT/FF/CC/SS),
//! the direct-column names, and any attribute names. All rows run as
//! one batch - one sequence allocator, one transaction - so a storage
//! failure rolls everything back, while per-row rejections never stop
//! their siblings.

use console::style;
use csv::ReaderBuilder;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::cli::helpers::{load_catalog, open_store, resolve_project};
use crate::cli::GlobalOpts;
use crate::core::assembler::{import_batch, RecordInput, RowOutcome};
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file to import
    pub file: PathBuf,

    /// Replace existing parts when identifiers collide
    #[arg(long)]
    pub replace: bool,

    /// Resolve and report every row without persisting anything
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let project = resolve_project(global)?;
    let catalog = load_catalog(&project)?;
    let store = open_store(&project)?;
    let config = Config::load();

    let file = File::open(&args.file).into_diagnostic()?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let headers = rdr.headers().into_diagnostic()?.clone();

    // Read failures (unparseable CSV lines) are collected alongside
    // the assembler's rejections; neither stops the batch.
    let mut rows: Vec<RecordInput> = Vec::new();
    let mut row_numbers: Vec<usize> = Vec::new();
    let mut read_failures: Vec<(usize, String)> = Vec::new();

    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2; // header is row 1
        match result {
            Ok(record) => {
                let mut input = RecordInput::new();
                for (i, header) in headers.iter().enumerate() {
                    if header.is_empty() {
                        continue;
                    }
                    if let Some(value) = record.get(i) {
                        input.insert(header.to_string(), value.to_string());
                    }
                }
                rows.push(input);
                row_numbers.push(row_num);
            }
            Err(e) => read_failures.push((row_num, format!("CSV parse error: {}", e))),
        }
    }

    let report = match import_batch(
        &store,
        &catalog,
        config.prefix(),
        &rows,
        args.replace,
        args.dry_run,
    ) {
        Ok(report) => report,
        Err(e) => {
            return Err(miette::miette!(
                "import aborted, nothing was committed: {}",
                e
            ))
        }
    };

    let mut failed = read_failures.clone();
    for (position, outcome) in report.outcomes.iter().enumerate() {
        let row_num = row_numbers[position];
        match outcome {
            RowOutcome::Created(id) => {
                if !global.quiet {
                    let verb = if args.dry_run { "Would create" } else { "Created" };
                    println!(
                        "{} Row {}: {} {}",
                        style("✓").green(),
                        row_num,
                        verb,
                        style(id).cyan()
                    );
                }
            }
            RowOutcome::Replaced(id) => {
                if !global.quiet {
                    let verb = if args.dry_run { "Would replace" } else { "Replaced" };
                    println!(
                        "{} Row {}: {} {}",
                        style("↻").yellow(),
                        row_num,
                        verb,
                        style(id).cyan()
                    );
                }
            }
            RowOutcome::Rejected(reason) => failed.push((row_num, reason.to_string())),
            RowOutcome::Updated(_) => unreachable!("import never updates in place"),
        }
    }

    failed.sort_by_key(|(row, _)| *row);
    for (row_num, reason) in &failed {
        eprintln!("{} Row {}: {}", style("✗").red(), row_num, reason);
    }

    let total = report.total() + read_failures.len();
    println!();
    println!(
        "{} {} row(s): {} created, {} replaced, {} failed{}",
        style("→").blue(),
        total,
        report.created(),
        report.replaced(),
        failed.len(),
        if args.dry_run { " (dry run)" } else { "" }
    );

    Ok(())
}
