//! `dmt schema` commands - classification scheme inspection

use console::style;
use miette::Result;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{load_catalog, open_store, resolve_project};
use crate::cli::GlobalOpts;
use crate::schema::{DocumentKind, DocumentValidator, SchemaCatalog};

#[derive(clap::Subcommand, Debug)]
pub enum SchemaCommands {
    /// List domains
    Domains,

    /// List families of a domain
    Families(FamiliesArgs),

    /// Show the attribute template for a family
    Template(TemplateArgs),

    /// Show advisory class/style guidelines for a family
    Guideline(GuidelineArgs),

    /// Validate the project's classification documents
    Check,

    /// Catalog and inventory statistics
    Stats,
}

#[derive(clap::Args, Debug)]
pub struct FamiliesArgs {
    /// Domain code
    pub domain: String,
}

#[derive(clap::Args, Debug)]
pub struct TemplateArgs {
    /// Domain code
    pub domain: String,
    /// Family code
    pub family: String,
}

#[derive(clap::Args, Debug)]
pub struct GuidelineArgs {
    /// Domain code
    pub domain: String,
    /// Family code
    pub family: String,
}

pub fn run(cmd: SchemaCommands, global: &GlobalOpts) -> Result<()> {
    let project = resolve_project(global)?;

    // `check` reads raw documents and must not require them to load
    if let SchemaCommands::Check = cmd {
        return check(&project);
    }

    let catalog = load_catalog(&project)?;
    match cmd {
        SchemaCommands::Domains => domains(&project, &catalog, global),
        SchemaCommands::Families(args) => families(&catalog, args),
        SchemaCommands::Template(args) => template(&catalog, args),
        SchemaCommands::Guideline(args) => guideline(&catalog, args),
        SchemaCommands::Stats => stats(&project, &catalog),
        SchemaCommands::Check => unreachable!("handled above"),
    }
}

fn pad2(code: &str) -> String {
    match code.parse::<u8>() {
        Ok(n) if code.len() <= 2 => format!("{:02}", n),
        _ => code.to_string(),
    }
}

fn domains(
    project: &crate::core::Project,
    catalog: &SchemaCatalog,
    global: &GlobalOpts,
) -> Result<()> {
    let store = open_store(project)?;
    let counts = store
        .count_by_domain()
        .map_err(|e| miette::miette!("{}", e))?;

    let mut builder = Builder::default();
    builder.push_record(["Code", "Name", "Parts"]);
    for (code, name) in catalog.domains() {
        let count = counts
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        builder.push_record([code.to_string(), name.to_string(), count.to_string()]);
    }
    println!("{}", builder.build().with(Style::sharp()));

    if !global.quiet {
        println!();
        println!("{} domain(s)", catalog.domains().count());
    }
    Ok(())
}

fn families(catalog: &SchemaCatalog, args: FamiliesArgs) -> Result<()> {
    let domain = pad2(&args.domain);
    println!(
        "{} {} - {}",
        style("Domain").bold(),
        domain,
        catalog.domain_name(&domain)
    );
    println!();

    let mut builder = Builder::default();
    builder.push_record(["Code", "Name", "Template"]);
    let mut found = false;
    for (code, name) in catalog.families_of(&domain) {
        found = true;
        let key = format!("{}{}", domain, code);
        let template = if catalog.template_for(&key).is_some() {
            "yes"
        } else {
            "-"
        };
        builder.push_record([code, name, template]);
    }
    if !found {
        println!("No families declared for domain {}.", domain);
        return Ok(());
    }
    println!("{}", builder.build().with(Style::sharp()));
    Ok(())
}

fn template(catalog: &SchemaCatalog, args: TemplateArgs) -> Result<()> {
    let key = format!("{}{}", pad2(&args.domain), pad2(&args.family));
    match catalog.template_for(&key) {
        Some(names) => {
            println!(
                "{} {} ({} / {})",
                style("Template").bold(),
                key,
                catalog.domain_name(&pad2(&args.domain)),
                catalog.family_name(&pad2(&args.domain), &pad2(&args.family))
            );
            for (i, name) in names.iter().enumerate() {
                println!("  {:>2}. {}", i + 1, name);
            }
        }
        None => {
            println!(
                "No template for {} - imported attributes for this family go to the overflow map.",
                key
            );
        }
    }
    Ok(())
}

fn guideline(catalog: &SchemaCatalog, args: GuidelineArgs) -> Result<()> {
    let key = format!("{}{}", pad2(&args.domain), pad2(&args.family));
    let entry = catalog.guidelines_for(&key);

    if entry.class.is_empty() && entry.style.is_empty() {
        println!("No guidelines for {}.", key);
    } else {
        if !entry.class.is_empty() {
            println!("{}", style("Class codes").bold());
            for (code, meaning) in &entry.class {
                println!("  {}  {}", code, meaning);
            }
        }
        if !entry.style.is_empty() {
            println!("{}", style("Style codes").bold());
            for (code, meaning) in &entry.style {
                println!("  {}  {}", code, meaning);
            }
        }
    }

    // Cross-cutting class codes (90-99) apply to every family
    let cross_codes: Vec<String> = (90u8..=99)
        .map(|n| n.to_string())
        .filter(|code| catalog.cross_class_meaning(code).is_some())
        .collect();
    if !cross_codes.is_empty() {
        println!("{}", style("Cross-cutting class codes").bold());
        for code in cross_codes {
            if let Some(meaning) = catalog.cross_class_meaning(&code) {
                println!("  {}  {}", code, meaning);
            }
        }
    }
    Ok(())
}

fn check(project: &crate::core::Project) -> Result<()> {
    let validator = DocumentValidator::new().map_err(|e| miette::miette!("{}", e))?;
    let documents = [
        (DocumentKind::Schema, project.read_schema_document()),
        (DocumentKind::Templates, project.read_template_document()),
    ];

    let mut total_issues = 0;
    for (kind, content) in documents {
        let content = content.map_err(|e| miette::miette!("{}", e))?;
        match validator.check(kind, &content) {
            Ok(issues) if issues.is_empty() => {
                println!("{} {}", style("✓").green(), kind.file_name());
            }
            Ok(issues) => {
                println!(
                    "{} {} ({} issue(s))",
                    style("✗").red(),
                    kind.file_name(),
                    issues.len()
                );
                for issue in &issues {
                    let path = if issue.path.is_empty() {
                        "document root"
                    } else {
                        &issue.path
                    };
                    println!("    {}: {}", style(path).yellow(), issue.message);
                }
                total_issues += issues.len();
            }
            Err(e) => {
                println!("{} {}: {}", style("✗").red(), kind.file_name(), e);
                total_issues += 1;
            }
        }
    }

    if total_issues > 0 {
        Err(miette::miette!(
            "{} issue(s) in classification documents",
            total_issues
        ))
    } else {
        Ok(())
    }
}

fn stats(project: &crate::core::Project, catalog: &SchemaCatalog) -> Result<()> {
    let store = open_store(project)?;
    let total = store.count_parts().map_err(|e| miette::miette!("{}", e))?;
    let by_domain = store
        .count_by_domain()
        .map_err(|e| miette::miette!("{}", e))?;

    println!("{}", style("Catalog").bold());
    println!("  domains:   {}", catalog.domains().count());
    println!("  templates: {}", catalog.template_keys().count());
    println!();
    println!("{}", style("Inventory").bold());
    println!("  parts: {}", total);
    for (code, count) in by_domain {
        println!("    {} {:<24} {}", code, catalog.domain_name(&code), count);
    }

    // A group nearing the 3-digit ceiling is worth surfacing here
    // before imports start failing with exhaustion errors.
    let mut crowded: Vec<String> = store
        .list_parts(&crate::core::PartFilter::default())
        .map_err(|e| miette::miette!("{}", e))?
        .iter()
        .filter(|part| part.sequence >= 900)
        .map(|part| part.group_key())
        .collect();
    crowded.sort();
    crowded.dedup();
    if !crowded.is_empty() {
        println!();
        println!(
            "{} group(s) above sequence 900: {}",
            style("!").yellow(),
            crowded.join(", ")
        );
    }

    Ok(())
}
