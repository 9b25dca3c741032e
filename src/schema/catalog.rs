//! In-memory classification catalog
//!
//! The catalog is an immutable value built once from the two YAML
//! documents and passed by reference to everything that needs a
//! lookup. Name lookups are advisory/display-only and never block
//! persistence, so unrecognized codes resolve to the `"Unknown"`
//! sentinel instead of failing. A missing or unparseable document is
//! fatal: every routing decision depends on the catalog, so commands
//! refuse to run without one.

use std::collections::BTreeMap;
use thiserror::Error;

use super::documents::{GuidelineEntry, SchemaDocument, TemplateDocument};
use crate::core::classid::ClassSegments;

/// Display sentinel for unrecognized domain/family codes
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse schema document: {0}")]
    SchemaDocument(#[source] serde_yml::Error),

    #[error("failed to parse template document: {0}")]
    TemplateDocument(#[source] serde_yml::Error),

    #[error("schema document defines no domains")]
    NoDomains,

    #[error("invalid {kind} code '{code}': must be one or two digits")]
    BadCode { kind: &'static str, code: String },
}

/// Load statistics, reported by `dmt schema stats` and after init
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub domains: usize,
    pub families: usize,
    pub templates: usize,
}

/// Immutable lookup structure over the classification scheme
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    domains: BTreeMap<String, String>,
    families: BTreeMap<String, String>,
    guidelines: BTreeMap<String, GuidelineEntry>,
    templates: BTreeMap<String, Vec<String>>,
    cross_classes: BTreeMap<String, String>,
}

impl SchemaCatalog {
    /// Parse both documents fully and build the catalog. Replaces
    /// nothing in place - callers hold the previous value if they had
    /// one. Not incremental; a reload means constructing a new value.
    pub fn load(schema_text: &str, template_text: &str) -> Result<(Self, LoadStats), CatalogError> {
        let schema: SchemaDocument =
            serde_yml::from_str(schema_text).map_err(CatalogError::SchemaDocument)?;
        let template_doc: TemplateDocument =
            serde_yml::from_str(template_text).map_err(CatalogError::TemplateDocument)?;

        if schema.domains.is_empty() {
            return Err(CatalogError::NoDomains);
        }

        let mut domains = BTreeMap::new();
        let mut families = BTreeMap::new();

        for domain in &schema.domains {
            let dd = normalize_code("domain", &domain.code)?;
            domains.insert(dd.clone(), domain.name.clone());

            for family in &domain.families {
                let ff = normalize_code("family", &family.code)?;
                families.insert(format!("{}{}", dd, ff), family.name.clone());
            }
        }

        let mut templates = BTreeMap::new();
        for (key, names) in template_doc {
            templates.insert(key, names);
        }

        let stats = LoadStats {
            domains: domains.len(),
            families: families.len(),
            templates: templates.len(),
        };

        Ok((
            Self {
                domains,
                families,
                guidelines: schema.guidelines,
                templates,
                cross_classes: schema.cross_classes,
            },
            stats,
        ))
    }

    /// Display name for a domain code, `"Unknown"` when unrecognized
    pub fn domain_name(&self, code: &str) -> &str {
        self.domains.get(code).map_or(UNKNOWN_NAME, String::as_str)
    }

    /// Display name for a (domain, family) pair, `"Unknown"` when
    /// unrecognized
    pub fn family_name(&self, domain: &str, family: &str) -> &str {
        let key = format!("{}{}", domain, family);
        self.families.get(&key).map_or(UNKNOWN_NAME, String::as_str)
    }

    pub fn is_known_domain(&self, code: &str) -> bool {
        self.domains.contains_key(code)
    }

    /// Ordered attribute template for a family key (`DDFF`). `None`
    /// signals "no template" - the router then bypasses attribute rows
    /// entirely.
    pub fn template_for(&self, family_key: &str) -> Option<&[String]> {
        self.templates.get(family_key).map(Vec::as_slice)
    }

    /// Template lookup from parsed segments
    pub fn template_for_segments(&self, segments: &ClassSegments) -> Option<&[String]> {
        self.template_for(&segments.family_key())
    }

    /// Best-effort guideline lookup: the longest guideline key that is
    /// a prefix of the family key wins. Empty guideline when nothing
    /// matches.
    pub fn guidelines_for(&self, family_key: &str) -> GuidelineEntry {
        self.guidelines
            .iter()
            .filter(|(key, _)| family_key.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, entry)| entry.clone())
            .unwrap_or_default()
    }

    /// Meaning of a cross-cutting class code (90-99), if declared
    pub fn cross_class_meaning(&self, code: &str) -> Option<&str> {
        self.cross_classes.get(code).map(String::as_str)
    }

    /// All domains, sorted by code
    pub fn domains(&self) -> impl Iterator<Item = (&str, &str)> {
        self.domains.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// All families of one domain, sorted by family code
    pub fn families_of<'a>(&'a self, domain: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.families.iter().filter_map(move |(key, name)| {
            key.strip_prefix(domain)
                .filter(|ff| ff.len() == 2)
                .map(|ff| (ff, name.as_str()))
        })
    }

    /// All template keys, sorted
    pub fn template_keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

fn normalize_code(kind: &'static str, code: &str) -> Result<String, CatalogError> {
    let trimmed = code.trim();
    let numeric = !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit());
    if !numeric || trimmed.len() > 2 {
        return Err(CatalogError::BadCode {
            kind,
            code: code.to_string(),
        });
    }
    Ok(format!("{:02}", trimmed.parse::<u8>().unwrap_or(0)))
}
