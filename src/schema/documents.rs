//! Declarative document shapes for the classification scheme
//!
//! Two YAML documents feed the catalog: the schema document (domains,
//! families, advisory guidelines, cross-cutting class codes) and the
//! template document (ordered attribute names per domain+family key).
//! Both live under `.dmt/` in a project and are seeded by `dmt init`.

use rust_embed::Embed;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Embedded default documents and their JSON Schemas
#[derive(Embed)]
#[folder = "assets/"]
pub struct Assets;

/// File name of the schema document within `.dmt/`
pub const SCHEMA_FILE: &str = "schema.yaml";

/// File name of the template document within `.dmt/`
pub const TEMPLATES_FILE: &str = "templates.yaml";

/// Top-level shape of the schema document
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaDocument {
    pub domains: Vec<DomainEntry>,

    /// Advisory class/style meanings, keyed by a domain+family prefix
    /// namespace (a key may be a bare domain code or a full `DDFF`)
    #[serde(default)]
    pub guidelines: BTreeMap<String, GuidelineEntry>,

    /// Class codes 90-99, reserved for meanings that apply across all
    /// domains
    #[serde(default)]
    pub cross_classes: BTreeMap<String, String>,
}

/// One domain with its families
#[derive(Debug, Clone, Deserialize)]
pub struct DomainEntry {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub families: Vec<FamilyEntry>,
}

/// One family within a domain
#[derive(Debug, Clone, Deserialize)]
pub struct FamilyEntry {
    pub code: String,
    pub name: String,
}

/// Advisory class/style meaning maps. Never enforced - display only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuidelineEntry {
    #[serde(default)]
    pub class: BTreeMap<String, String>,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
}

/// The template document: `DDFF` key to ordered attribute-name list
pub type TemplateDocument = BTreeMap<String, Vec<String>>;

impl Assets {
    /// Default schema document text shipped with the binary
    pub fn default_schema() -> String {
        Self::embedded("schema.yaml")
    }

    /// Default template document text shipped with the binary
    pub fn default_templates() -> String {
        Self::embedded("templates.yaml")
    }

    /// JSON Schema for the schema document
    pub fn schema_json_schema() -> String {
        Self::embedded("schema.schema.json")
    }

    /// JSON Schema for the template document
    pub fn templates_json_schema() -> String {
        Self::embedded("templates.schema.json")
    }

    fn embedded(name: &str) -> String {
        // Embedded at compile time; absence is a build defect
        let file = Self::get(name).unwrap_or_else(|| panic!("missing embedded asset: {}", name));
        String::from_utf8_lossy(file.data.as_ref()).into_owned()
    }
}
