//! Ordered, duplicate-free changeset sequence

use std::ops::Deref;

use super::changeset::Changeset;
use crate::error::{LoadError, LoadResult};

/// Changesets sorted strictly ascending by version
///
/// Built once per run and immutable afterwards. An empty collection is a
/// valid no-op run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangesetCollection {
    changesets: Vec<Changeset>,
}

impl ChangesetCollection {
    /// Sort by version and enforce global version uniqueness
    ///
    /// The sort is stable, so changesets sharing a version keep their input
    /// order and the first duplicate pair reported is deterministic.
    pub fn new(mut changesets: Vec<Changeset>) -> LoadResult<Self> {
        changesets.sort_by_key(|c| c.version());

        if let Some(pair) = changesets
            .windows(2)
            .find(|pair| pair[0].version() == pair[1].version())
        {
            return Err(LoadError::DuplicateVersion {
                version: pair[1].version(),
                first_author: pair[0].author().to_string(),
                first_file: pair[0].source().map(|p| p.to_path_buf()),
                second_author: pair[1].author().to_string(),
                second_file: pair[1].source().map(|p| p.to_path_buf()),
            });
        }

        Ok(Self { changesets })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Highest version in the collection, 0 when empty
    pub fn max_version(&self) -> u32 {
        self.changesets.last().map_or(0, |c| c.version())
    }
}

impl Deref for ChangesetCollection {
    type Target = [Changeset];

    fn deref(&self) -> &Self::Target {
        &self.changesets
    }
}

impl<'a> IntoIterator for &'a ChangesetCollection {
    type Item = &'a Changeset;
    type IntoIter = std::slice::Iter<'a, Changeset>;

    fn into_iter(self) -> Self::IntoIter {
        self.changesets.iter()
    }
}
