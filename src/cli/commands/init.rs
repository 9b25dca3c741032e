//! `dmt init` command - Initialize a new DMT project

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::core::project::{Project, ProjectError};
use crate::core::PartStore;
use crate::schema::SchemaCatalog;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Force initialization even if .dmt/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    let project = match project {
        Ok(project) => project,
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} DMT project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("dmt init --force").yellow());
            return Ok(());
        }
        Err(e) => return Err(miette::miette!("{}", e)),
    };

    // Prove the seeded documents load and create the database up front,
    // so the first real command does not fail at startup.
    let schema = project
        .read_schema_document()
        .map_err(|e| miette::miette!("{}", e))?;
    let templates = project
        .read_template_document()
        .map_err(|e| miette::miette!("{}", e))?;
    let (_, stats) =
        SchemaCatalog::load(&schema, &templates).map_err(|e| miette::miette!("{}", e))?;
    PartStore::open(&project.db_path()).map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Initialized DMT project at {}",
        style("✓").green(),
        style(project.root().display()).cyan()
    );
    println!();
    println!(
        "Classification scheme: {} domains, {} families, {} templates",
        stats.domains, stats.families, stats.templates
    );
    println!();
    println!("Created project structure:");
    println!("  .dmt/");
    println!("  .dmt/config.yaml");
    println!("  .dmt/schema.yaml");
    println!("  .dmt/templates.yaml");
    println!("  .dmt/parts.db");
    println!();
    println!("Next steps:");
    println!(
        "  {} Catalog your first part",
        style("dmt part new --domain 1 --family 1 --mpn <MPN>").yellow()
    );
    println!(
        "  {} Bulk import from CSV",
        style("dmt import parts.csv").yellow()
    );
    println!(
        "  {} Browse the classification scheme",
        style("dmt schema domains").yellow()
    );

    Ok(())
}
