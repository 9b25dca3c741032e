//! Shared helper functions for CLI commands

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::{PartStore, Project};
use crate::schema::SchemaCatalog;

/// Resolve the project from `--project` or by walking up from the
/// current directory
pub fn resolve_project(global: &GlobalOpts) -> Result<Project> {
    let result = match &global.project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    };
    result.map_err(|e| miette::miette!("{}", e))
}

/// Load the catalog from the project's documents. A missing or
/// unparseable document aborts the command here, before any store
/// access.
pub fn load_catalog(project: &Project) -> Result<SchemaCatalog> {
    let schema = project
        .read_schema_document()
        .map_err(|e| miette::miette!("{}", e))?;
    let templates = project
        .read_template_document()
        .map_err(|e| miette::miette!("{}", e))?;

    let (catalog, _) =
        SchemaCatalog::load(&schema, &templates).map_err(|e| miette::miette!("{}", e))?;
    Ok(catalog)
}

/// Open the project's part database
pub fn open_store(project: &Project) -> Result<PartStore> {
    PartStore::open(&project.db_path()).map_err(|e| miette::miette!("{}", e))
}

/// Truncate a string to max_len, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

/// Parse repeated `-a KEY=VALUE` flags into (key, value) pairs
pub fn parse_attr_flags(flags: &[String]) -> Result<Vec<(String, String)>> {
    flags
        .iter()
        .map(|flag| {
            flag.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| miette::miette!("invalid attribute '{}': expected KEY=VALUE", flag))
        })
        .collect()
}
