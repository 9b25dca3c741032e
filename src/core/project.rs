//! Project discovery and structure
//!
//! A project is a directory with a `.dmt/` folder holding the part
//! database, the two classification documents, and an optional
//! project-level config file.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schema::{Assets, SCHEMA_FILE, TEMPLATES_FILE};

/// Database file name within `.dmt/`
const DB_FILE: &str = "parts.db";

/// Represents a DMT project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .dmt/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(".dmt").is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project at the given path, seeding the default
    /// classification documents
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(".dmt").exists() {
            return Err(ProjectError::AlreadyExists(root));
        }
        Self::init_force(&root)
    }

    /// Initialize even if `.dmt/` exists; existing classification
    /// documents are overwritten with the defaults
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let dmt_dir = root.join(".dmt");

        std::fs::create_dir_all(&dmt_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(dmt_dir.join(SCHEMA_FILE), Assets::default_schema())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(dmt_dir.join(TEMPLATES_FILE), Assets::default_templates())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        let config_path = dmt_dir.join("config.yaml");
        if !config_path.exists() {
            std::fs::write(&config_path, Self::default_config())
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# DMT project configuration

# Identifier prefix (3 letters). Changing this after parts exist makes
# previously assigned identifiers undecodable - pick once.
# prefix: "DMT"

# Default output format (table, json, id)
# default_format: table
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .dmt configuration directory
    pub fn dmt_dir(&self) -> PathBuf {
        self.root.join(".dmt")
    }

    /// Path of the part database
    pub fn db_path(&self) -> PathBuf {
        self.dmt_dir().join(DB_FILE)
    }

    /// Path of the schema document
    pub fn schema_path(&self) -> PathBuf {
        self.dmt_dir().join(SCHEMA_FILE)
    }

    /// Path of the template document
    pub fn templates_path(&self) -> PathBuf {
        self.dmt_dir().join(TEMPLATES_FILE)
    }

    /// Read the schema document text. A missing document is fatal:
    /// every routing decision depends on the catalog.
    pub fn read_schema_document(&self) -> Result<String, ProjectError> {
        let path = self.schema_path();
        std::fs::read_to_string(&path).map_err(|_| ProjectError::MissingDocument(path))
    }

    /// Read the template document text
    pub fn read_template_document(&self) -> Result<String, ProjectError> {
        let path = self.templates_path();
        std::fs::read_to_string(&path).map_err(|_| ProjectError::MissingDocument(path))
    }
}

/// Errors related to project structure
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a DMT project (no .dmt/ found searching up from {searched_from})")]
    NotFound { searched_from: PathBuf },

    #[error("DMT project already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("classification document missing or unreadable: {0}")]
    MissingDocument(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

impl ProjectError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProjectError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_and_discover() {
        let tmp = TempDir::new().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        assert!(project.dmt_dir().is_dir());
        assert!(project.schema_path().is_file());
        assert!(project.templates_path().is_file());

        let sub = project.root().join("a/b");
        std::fs::create_dir_all(&sub).unwrap();
        let found = Project::discover_from(&sub).unwrap();
        assert_eq!(found.root(), project.root());
    }

    #[test]
    fn test_init_twice_fails_without_force() {
        let tmp = TempDir::new().unwrap();
        Project::init(tmp.path()).unwrap();
        assert!(matches!(
            Project::init(tmp.path()),
            Err(ProjectError::AlreadyExists(_))
        ));
        Project::init_force(tmp.path()).unwrap();
    }

    #[test]
    fn test_discover_outside_project_fails() {
        let tmp = TempDir::new().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_seeded_documents_load() {
        let tmp = TempDir::new().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let schema = project.read_schema_document().unwrap();
        let templates = project.read_template_document().unwrap();
        crate::schema::SchemaCatalog::load(&schema, &templates).unwrap();
    }
}
