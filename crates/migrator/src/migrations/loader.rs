//! Changeset Loader - File system operations for changelogs
//!
//! Discovers changelog files, parses YAML or JSON documents, resolves
//! includes and produces one ordered, duplicate-free changeset collection.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use realmshift_core::{ChangeLog, ChangesetCollection, LoadError, LoadResult, MigratorConfig};

use super::definitions::ValidationResult;

const CHANGELOG_SCHEMA: &str = include_str!("../../schema/changelog.schema.json");

/// Loader that turns a directory of changelog files into a changeset collection
pub struct ChangesetLoader {
    validator: Option<jsonschema::Validator>,
    extensions: Vec<String>,
}

impl ChangesetLoader {
    /// Create a loader, compiling the embedded schema when validation is enabled
    pub fn new(validate_schema: bool) -> LoadResult<Self> {
        let validator = if validate_schema {
            Some(Self::compile_schema()?)
        } else {
            None
        };

        Ok(Self {
            validator,
            extensions: vec!["yaml".to_string(), "yml".to_string(), "json".to_string()],
        })
    }

    /// Create a loader following the migrator configuration
    pub fn with_config(config: &MigratorConfig) -> LoadResult<Self> {
        Ok(Self::new(*config.get_validate_schema())?
            .with_extensions(config.get_file_extensions().clone()))
    }

    /// Override the file extensions recognised as changelog files
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn validates_schema(&self) -> bool {
        self.validator.is_some()
    }

    fn compile_schema() -> LoadResult<jsonschema::Validator> {
        let schema: Value = serde_json::from_str(CHANGELOG_SCHEMA).map_err(|e| LoadError::Schema {
            message: format!("failed to parse embedded changelog schema: {}", e),
        })?;

        jsonschema::validator_for(&schema).map_err(|e| LoadError::Schema {
            message: format!("failed to compile embedded changelog schema: {}", e),
        })
    }

    /// Parse a single changelog file, following its includes
    pub fn load_file(&self, path: &Path) -> LoadResult<ChangeLog> {
        let mut chain = Vec::new();
        self.parse_changelog(path, &mut chain)
    }

    /// Load every changelog file under `directory` into one ordered collection
    ///
    /// Files are visited in path order, so changesets sharing a version are
    /// reported against the lexicographically first file.
    pub fn load_directory(&self, directory: &Path) -> LoadResult<ChangesetCollection> {
        tracing::info!("Scanning directory for changelog files: {}", directory.display());

        if !directory.is_dir() {
            return Err(LoadError::invalid_input(format!(
                "Not a directory: {}",
                directory.display()
            )));
        }

        let files = self.discover_files(directory)?;
        tracing::info!("Found {} changelog files", files.len());

        let mut changesets = Vec::new();
        for file in &files {
            let changelog = self.load_file(file)?;
            changesets.extend(changelog.changesets);
        }

        let collection = ChangesetCollection::new(changesets)?;
        tracing::info!("Total changesets found: {}", collection.len());
        Ok(collection)
    }

    /// Parse a single file and report the outcome without failing
    pub fn validate(&self, path: &Path) -> ValidationResult {
        match self.load_file(path) {
            Ok(_) => ValidationResult::valid(path),
            Err(e) => ValidationResult::invalid(path, e.to_string()),
        }
    }

    /// Validate every changelog file under `directory`
    pub fn validate_directory(&self, directory: &Path) -> LoadResult<Vec<ValidationResult>> {
        if !directory.is_dir() {
            return Err(LoadError::invalid_input(format!(
                "Not a directory: {}",
                directory.display()
            )));
        }

        Ok(self
            .discover_files(directory)?
            .iter()
            .map(|file| self.validate(file))
            .collect())
    }

    fn parse_changelog(&self, path: &Path, chain: &mut Vec<PathBuf>) -> LoadResult<ChangeLog> {
        let canonical = fs::canonicalize(path).map_err(|e| {
            LoadError::parse(path, format!("Failed to read changelog file: {}", e))
        })?;

        if chain.contains(&canonical) {
            let cycle: Vec<String> = chain
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|p| p.display().to_string())
                .collect();
            return Err(LoadError::CyclicInclude {
                chain: cycle.join(" -> "),
            });
        }

        tracing::debug!("Parsing changelog file: {}", path.display());
        let document = self.read_document(path)?;

        if let Some(validator) = &self.validator {
            let errors: Vec<String> = validator
                .iter_errors(&document)
                .map(|e| e.to_string())
                .collect();
            if !errors.is_empty() {
                return Err(LoadError::parse(
                    path,
                    format!("Schema validation failed: {}", errors.join("; ")),
                ));
            }
        }

        let mut changelog: ChangeLog = if document.is_null() {
            ChangeLog::default()
        } else {
            serde_json::from_value(document).map_err(|e| LoadError::parse(path, e.to_string()))?
        };

        if let Some(changeset) = changelog.changesets.iter().find(|c| c.version() == 0) {
            return Err(LoadError::parse(
                path,
                format!(
                    "Changeset version must be a positive integer (author: {})",
                    changeset.author()
                ),
            ));
        }

        changelog.changesets = changelog
            .changesets
            .into_iter()
            .map(|c| c.with_source(path))
            .collect();

        chain.push(canonical);
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        for include in &changelog.includes {
            let include_path = include.resolve(base_dir);
            tracing::debug!("Processing include: {}", include_path.display());
            let included = self.parse_changelog(&include_path, chain)?;
            changelog.changesets.extend(included.changesets);
        }
        chain.pop();

        tracing::debug!(
            "Parsed {} changesets from {}",
            changelog.changesets.len(),
            path.display()
        );
        Ok(changelog)
    }

    fn read_document(&self, path: &Path) -> LoadResult<Value> {
        let content = fs::read_to_string(path).map_err(|e| {
            LoadError::parse(path, format!("Failed to read changelog file: {}", e))
        })?;

        if is_blank_document(&content) {
            return Ok(Value::Null);
        }

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content)
                .map_err(|e| LoadError::parse(path, format!("Invalid JSON: {}", e)))
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| LoadError::parse(path, format!("Invalid YAML: {}", e)))
        }
    }

    fn discover_files(&self, directory: &Path) -> LoadResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        self.collect_files(directory, &mut files)?;
        // whole-path string order, so "a-b.yaml" sorts before "a/b.yaml"
        files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        Ok(files)
    }

    fn collect_files(&self, directory: &Path, files: &mut Vec<PathBuf>) -> LoadResult<()> {
        let entries = fs::read_dir(directory).map_err(|e| {
            LoadError::invalid_input(format!(
                "Failed to read directory {}: {}",
                directory.display(),
                e
            ))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                LoadError::invalid_input(format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();
            let is_dir = entry.file_type().map_or(false, |t| t.is_dir());

            if is_dir {
                self.collect_files(&path, files)?;
            } else if path.is_file() && self.is_changelog_file(&path) {
                files.push(path);
            }
        }

        Ok(())
    }

    fn is_changelog_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|known| *known == ext)
            })
    }
}

/// Empty or comment-only documents count as an empty changelog
fn is_blank_document(content: &str) -> bool {
    content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}
