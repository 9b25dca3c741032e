//! `dmt export` command - CSV export
//!
//! Writes rows in the same column vocabulary the importer reads
//! (`DMTUID`, segment columns, direct columns, attribute names), so an
//! exported file can be re-imported with `--replace` to round a
//! project's inventory through a spreadsheet.

use console::style;
use csv::Writer;
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::cli::helpers::{open_store, resolve_project};
use crate::cli::GlobalOpts;
use crate::core::classid::{ID_KEY, SEGMENT_KEYS};
use crate::core::PartFilter;
use crate::entities::part::DirectField;

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Filter by domain code
    #[arg(long, short = 'd')]
    pub domain: Option<String>,

    /// Filter by family code
    #[arg(long)]
    pub family: Option<String>,
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let project = resolve_project(global)?;
    let store = open_store(&project)?;

    let filter = PartFilter {
        domain: args.domain.clone(),
        family: args.family.clone(),
        ..Default::default()
    };
    let parts = store
        .list_parts(&filter)
        .map_err(|e| miette::miette!("{}", e))?;

    // Attribute and overflow names vary per part; the header is the
    // union, sorted, after the fixed columns.
    let mut extra_names: BTreeSet<String> = BTreeSet::new();
    let mut attributes = Vec::with_capacity(parts.len());
    for part in &parts {
        let attrs = store
            .attributes_for(&part.id)
            .map_err(|e| miette::miette!("{}", e))?;
        for attr in &attrs {
            extra_names.insert(attr.name.clone());
        }
        for key in part.overflow.keys() {
            extra_names.insert(key.clone());
        }
        attributes.push(attrs);
    }

    let mut header: Vec<String> = vec![ID_KEY.to_string()];
    header.extend(SEGMENT_KEYS.iter().map(|k| k.to_string()));
    header.extend(DirectField::all().iter().map(|f| f.key().to_string()));
    header.extend(extra_names.iter().cloned());

    let mut wtr: Writer<Box<dyn std::io::Write>> = match &args.output {
        Some(path) => Writer::from_writer(Box::new(
            std::fs::File::create(path).into_diagnostic()?,
        )),
        None => Writer::from_writer(Box::new(std::io::stdout())),
    };

    wtr.write_record(&header).into_diagnostic()?;
    for (part, attrs) in parts.iter().zip(&attributes) {
        let mut row: Vec<String> = vec![
            part.id.clone(),
            part.domain.clone(),
            part.family.clone(),
            part.class.clone(),
            part.style.clone(),
        ];
        for field in DirectField::all() {
            row.push(field.get(part));
        }
        for name in &extra_names {
            let value = attrs
                .iter()
                .find(|a| &a.name == name)
                .map(|a| a.value.clone())
                .or_else(|| part.overflow.get(name).cloned())
                .unwrap_or_default();
            row.push(value);
        }
        wtr.write_record(&row).into_diagnostic()?;
    }
    wtr.flush().into_diagnostic()?;

    if let Some(path) = &args.output {
        if !global.quiet {
            eprintln!(
                "{} Exported {} part(s) to {}",
                style("✓").green(),
                parts.len(),
                style(path.display()).cyan()
            );
        }
    }

    Ok(())
}
