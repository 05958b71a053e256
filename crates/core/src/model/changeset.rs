//! Changesets and changelog documents

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::operations::Operation;

fn default_true() -> bool {
    true
}

/// One versioned migration unit containing an ordered list of operations
///
/// Built by the loader and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changeset {
    version: u32,
    author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    #[serde(default = "default_true")]
    fail_on_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(default)]
    operations: Vec<Operation>,
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl Changeset {
    pub fn new(version: u32, author: impl Into<String>) -> Self {
        Self {
            version,
            author: author.into(),
            context: None,
            fail_on_error: true,
            comment: None,
            operations: Vec::new(),
            source: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_fail_on_error(mut self, fail_on_error: bool) -> Self {
        self.fail_on_error = fail_on_error;
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Remember the file this changeset was declared in
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Informational tag; never used to filter changesets
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn fail_on_error(&self) -> bool {
        self.fail_on_error
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Human-readable identifier, `"{version}:{author}"`
    pub fn id(&self) -> String {
        format!("{}:{}", self.version, self.author)
    }
}

impl std::fmt::Display for Changeset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Changeset{{version={}, author='{}', operations={}}}",
            self.version,
            self.author,
            self.operations.len()
        )
    }
}

/// Reference from one changelog document to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Include {
    pub file: PathBuf,
    #[serde(default = "default_true")]
    pub relative_to_changelog_file: bool,
}

impl Include {
    /// Resolve the include target against the directory of the including file
    pub fn resolve(&self, base_dir: &Path) -> PathBuf {
        if self.relative_to_changelog_file {
            base_dir.join(&self.file)
        } else {
            self.file.clone()
        }
    }
}

/// Contents of a single changelog document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLog {
    #[serde(default)]
    pub changesets: Vec<Changeset>,
    #[serde(default)]
    pub includes: Vec<Include>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::operations::RealmRef;

    #[test]
    fn test_changeset_defaults() {
        let document: serde_json::Value = serde_yaml::from_str(
            "version: 3\nauthor: alice\noperations:\n  - deleteRealm:\n      name: demo\n",
        )
        .unwrap();
        let changeset: Changeset = serde_json::from_value(document).unwrap();

        assert_eq!(changeset.version(), 3);
        assert_eq!(changeset.author(), "alice");
        assert!(changeset.fail_on_error());
        assert_eq!(changeset.context(), None);
        assert_eq!(changeset.comment(), None);
        assert_eq!(changeset.operations().len(), 1);
        assert_eq!(changeset.source(), None);
        assert_eq!(changeset.id(), "3:alice");
    }

    #[test]
    fn test_changeset_builder() {
        let changeset = Changeset::new(2, "bob")
            .with_context("dev")
            .with_comment("drop demo realm")
            .with_fail_on_error(false)
            .with_operation(Operation::DeleteRealm(RealmRef {
                name: "demo".to_string(),
            }))
            .with_source("changelog/002.yaml");

        assert_eq!(changeset.context(), Some("dev"));
        assert_eq!(changeset.comment(), Some("drop demo realm"));
        assert!(!changeset.fail_on_error());
        assert_eq!(changeset.source(), Some(Path::new("changelog/002.yaml")));
        assert_eq!(
            changeset.to_string(),
            "Changeset{version=2, author='bob', operations=1}"
        );
    }

    #[test]
    fn test_include_resolution() {
        let relative = Include {
            file: PathBuf::from("shared/roles.yaml"),
            relative_to_changelog_file: true,
        };
        assert_eq!(
            relative.resolve(Path::new("/srv/changelog")),
            PathBuf::from("/srv/changelog/shared/roles.yaml")
        );

        let explicit = Include {
            file: PathBuf::from("/opt/common.yaml"),
            relative_to_changelog_file: false,
        };
        assert_eq!(
            explicit.resolve(Path::new("/srv/changelog")),
            PathBuf::from("/opt/common.yaml")
        );
    }
}
