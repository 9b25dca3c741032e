//! `dmt part` commands - single-part CRUD
//!
//! `new` runs the same assembler pipeline as bulk import, so identifier
//! synthesis, duplicate policy, and attribute routing behave
//! identically whether a part arrives one at a time or by CSV.

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};
use serde_json::json;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{
    load_catalog, open_store, parse_attr_flags, resolve_project, truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::assembler::{import_batch, update_record, RecordInput, RowOutcome};
use crate::core::classid::{ClassCode, ID_KEY, SEGMENT_KEYS};
use crate::core::{Config, PartFilter, PartStore};
use crate::entities::part::{AttributeRow, DirectField, PartRecord};
use crate::schema::SchemaCatalog;

#[derive(clap::Subcommand, Debug)]
pub enum PartCommands {
    /// Catalog a new part
    New(NewArgs),

    /// Show one part in full
    Show(ShowArgs),

    /// List parts
    List(ListArgs),

    /// Update fields and attributes of an existing part
    Update(UpdateArgs),

    /// Delete a part (its identifier is never reused)
    Delete(DeleteArgs),
}

/// Direct-column flags shared by `new` and `update`. Passing an empty
/// string to `update` clears the field.
#[derive(clap::Args, Debug, Default)]
pub struct FieldOpts {
    /// Manufacturer part number
    #[arg(long)]
    pub mpn: Option<String>,

    #[arg(long)]
    pub manufacturer: Option<String>,

    /// Primary value (e.g. "10K", "100nF")
    #[arg(long)]
    pub value: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Stock on hand
    #[arg(long)]
    pub quantity: Option<String>,

    /// Storage location (bin, drawer, shelf)
    #[arg(long)]
    pub location: Option<String>,

    /// Datasheet path or URL
    #[arg(long)]
    pub datasheet: Option<String>,

    #[arg(long)]
    pub distributor: Option<String>,

    /// Distributor's order number
    #[arg(long = "distributor-pn")]
    pub distributor_pn: Option<String>,

    /// KiCad symbol reference (LIB:Name)
    #[arg(long)]
    pub symbol: Option<String>,

    /// KiCad footprint reference (LIB:Name)
    #[arg(long)]
    pub footprint: Option<String>,

    /// 3D model path
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Additional attribute, repeatable: -a KEY=VALUE
    #[arg(short = 'a', long = "attr")]
    pub attrs: Vec<String>,
}

impl FieldOpts {
    fn collect(&self, input: &mut RecordInput) -> Result<()> {
        let flags: [(&DirectField, &Option<String>); 13] = [
            (&DirectField::Mpn, &self.mpn),
            (&DirectField::Manufacturer, &self.manufacturer),
            (&DirectField::Value, &self.value),
            (&DirectField::Description, &self.description),
            (&DirectField::Quantity, &self.quantity),
            (&DirectField::Location, &self.location),
            (&DirectField::Datasheet, &self.datasheet),
            (&DirectField::Distributor, &self.distributor),
            (&DirectField::DistributorPn, &self.distributor_pn),
            (&DirectField::Symbol, &self.symbol),
            (&DirectField::Footprint, &self.footprint),
            (&DirectField::Model, &self.model),
            (&DirectField::Notes, &self.notes),
        ];

        for (field, value) in flags {
            if let Some(value) = value {
                input.insert(field.key().to_string(), value.clone());
            }
        }
        for (key, value) in parse_attr_flags(&self.attrs)? {
            input.insert(key, value);
        }
        Ok(())
    }
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Catalog under an existing full identifier instead of allocating
    /// a sequence number
    #[arg(long)]
    pub id: Option<String>,

    /// Domain code (TT)
    #[arg(long, short = 'd')]
    pub domain: Option<String>,

    /// Family code (FF)
    #[arg(long)]
    pub family: Option<String>,

    /// Class code (CC)
    #[arg(long, default_value = "00")]
    pub class: String,

    /// Style code (SS)
    #[arg(long, default_value = "00")]
    pub style: String,

    /// Overwrite an existing part with the same identifier
    #[arg(long)]
    pub replace: bool,

    #[command(flatten)]
    pub fields: FieldOpts,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Full part identifier
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by domain code
    #[arg(long, short = 'd')]
    pub domain: Option<String>,

    /// Filter by family code
    #[arg(long)]
    pub family: Option<String>,

    /// Filter by storage location (exact match)
    #[arg(long)]
    pub location: Option<String>,

    /// Filter by manufacturer (exact match)
    #[arg(long)]
    pub manufacturer: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Full part identifier
    pub id: String,

    #[command(flatten)]
    pub fields: FieldOpts,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Full part identifier
    pub id: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(cmd: PartCommands, global: &GlobalOpts) -> Result<()> {
    let project = resolve_project(global)?;
    let catalog = load_catalog(&project)?;
    let store = open_store(&project)?;
    let config = Config::load();

    match cmd {
        PartCommands::New(args) => new(&store, &catalog, &config, args, global),
        PartCommands::Show(args) => show(&store, &catalog, args, global),
        PartCommands::List(args) => list(&store, args, global),
        PartCommands::Update(args) => update(&store, &catalog, args, global),
        PartCommands::Delete(args) => delete(&store, args, global),
    }
}

fn new(
    store: &PartStore,
    catalog: &SchemaCatalog,
    config: &Config,
    args: NewArgs,
    global: &GlobalOpts,
) -> Result<()> {
    let mut input = RecordInput::new();

    if let Some(id) = &args.id {
        input.insert(ID_KEY.to_string(), id.clone());
    } else {
        let (Some(domain), Some(family)) = (&args.domain, &args.family) else {
            return Err(miette::miette!(
                "provide --id, or --domain and --family (with optional --class/--style)"
            ));
        };
        input.insert(SEGMENT_KEYS[0].to_string(), domain.clone());
        input.insert(SEGMENT_KEYS[1].to_string(), family.clone());
        input.insert(SEGMENT_KEYS[2].to_string(), args.class.clone());
        input.insert(SEGMENT_KEYS[3].to_string(), args.style.clone());
    }
    args.fields.collect(&mut input)?;

    let report = import_batch(store, catalog, config.prefix(), &[input], args.replace, false)
        .map_err(|e| miette::miette!("{}", e))?;

    match &report.outcomes[0] {
        RowOutcome::Created(id) | RowOutcome::Replaced(id) => {
            if !global.quiet {
                let classification = ClassCode::decode(config.prefix(), id)
                    .map(|code| {
                        let segments = code.segments;
                        format!(
                            " - {} / {}",
                            catalog.domain_name(&segments.domain_code()),
                            catalog.family_name(&segments.domain_code(), &segments.family_code())
                        )
                    })
                    .unwrap_or_default();
                println!(
                    "{} Created {}{}",
                    style("✓").green(),
                    style(id).cyan(),
                    classification
                );
            }
            Ok(())
        }
        RowOutcome::Rejected(reason) => Err(miette::miette!("{}", reason)),
        RowOutcome::Updated(_) => unreachable!("new never updates"),
    }
}

fn show(
    store: &PartStore,
    catalog: &SchemaCatalog,
    args: ShowArgs,
    global: &GlobalOpts,
) -> Result<()> {
    let part = store
        .get_part(&args.id)
        .map_err(|e| miette::miette!("{}", e))?
        .ok_or_else(|| miette::miette!("no part with identifier {}", args.id))?;
    let attrs = store
        .attributes_for(&part.id)
        .map_err(|e| miette::miette!("{}", e))?;
    let attrs = ordered_attributes(catalog, &part, attrs);

    match global.format {
        OutputFormat::Json => {
            let doc = json!({ "part": part, "attributes": attrs });
            println!("{}", serde_json::to_string_pretty(&doc).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", part.id),
        OutputFormat::Table => {
            println!(
                "{}  {} / {}",
                style(&part.id).cyan().bold(),
                catalog.domain_name(&part.domain),
                catalog.family_name(&part.domain, &part.family)
            );
            println!(
                "  class {}  style {}  seq {:03}",
                part.class, part.style, part.sequence
            );
            println!();

            for field in DirectField::all() {
                let value = field.get(&part);
                if !value.is_empty() {
                    println!("  {:<15} {}", field.key(), value);
                }
            }

            if !attrs.is_empty() {
                println!();
                println!("  {}", style("Attributes").bold());
                for attr in &attrs {
                    println!("    {:<15} {}", attr.name, attr.value);
                }
            }

            if !part.overflow.is_empty() {
                println!();
                println!("  {}", style("Other").bold());
                for (key, value) in &part.overflow {
                    println!("    {:<15} {}", key, value);
                }
            }
        }
    }
    Ok(())
}

/// Attribute rows in template order, with any non-template leftovers
/// (from template edits after import) appended alphabetically
fn ordered_attributes(
    catalog: &SchemaCatalog,
    part: &PartRecord,
    mut attrs: Vec<AttributeRow>,
) -> Vec<AttributeRow> {
    let Some(template) = catalog.template_for(&part.family_key()) else {
        return attrs;
    };

    let mut ordered = Vec::with_capacity(attrs.len());
    for name in template {
        if let Some(pos) = attrs.iter().position(|a| &a.name == name) {
            ordered.push(attrs.remove(pos));
        }
    }
    ordered.extend(attrs);
    ordered
}

fn list(store: &PartStore, args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let filter = PartFilter {
        domain: args.domain.clone(),
        family: args.family.clone(),
        location: args.location.clone(),
        manufacturer: args.manufacturer.clone(),
        limit: args.limit,
    };
    let parts = store
        .list_parts(&filter)
        .map_err(|e| miette::miette!("{}", e))?;

    print_parts(&parts, global)
}

pub(super) fn print_parts(parts: &[PartRecord], global: &GlobalOpts) -> Result<()> {
    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(parts).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for part in parts {
                println!("{}", part.id);
            }
        }
        OutputFormat::Table => {
            if parts.is_empty() {
                println!("No parts found.");
                return Ok(());
            }

            let mut builder = Builder::default();
            builder.push_record(["ID", "MPN", "Value", "Description", "Qty", "Location"]);
            for part in parts {
                builder.push_record([
                    part.id.clone(),
                    truncate_str(&part.mpn, 24),
                    truncate_str(&part.value, 12),
                    truncate_str(&part.description, 32),
                    part.quantity.to_string(),
                    truncate_str(&part.location, 12),
                ]);
            }
            println!("{}", builder.build().with(Style::sharp()));

            if !global.quiet {
                println!();
                println!("{} part(s)", parts.len());
            }
        }
    }
    Ok(())
}

fn update(
    store: &PartStore,
    catalog: &SchemaCatalog,
    args: UpdateArgs,
    global: &GlobalOpts,
) -> Result<()> {
    let mut input = RecordInput::new();
    args.fields.collect(&mut input)?;
    if input.is_empty() {
        return Err(miette::miette!("nothing to update: pass field flags or -a KEY=VALUE"));
    }

    let outcome =
        update_record(store, catalog, &args.id, &input).map_err(|e| miette::miette!("{}", e))?;

    match outcome {
        RowOutcome::Updated(id) => {
            if !global.quiet {
                println!("{} Updated {}", style("✓").green(), style(&id).cyan());
            }
            Ok(())
        }
        RowOutcome::Rejected(reason) => Err(miette::miette!("{}", reason)),
        _ => unreachable!("update never creates"),
    }
}

fn delete(store: &PartStore, args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    if !store
        .part_exists(&args.id)
        .map_err(|e| miette::miette!("{}", e))?
    {
        return Err(miette::miette!("no part with identifier {}", args.id));
    }

    if !args.yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Delete {}? Its identifier will never be reused.",
                args.id
            ))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    store
        .delete_part(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!("{} Deleted {}", style("✓").green(), style(&args.id).cyan());
    }
    Ok(())
}
