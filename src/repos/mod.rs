/*!
 * Contracts with the version-control read layer.
 *
 * The indexing core never talks to a repository directly. It consumes:
 * - `ContentSource`: file content and versioned properties at a revision
 * - `ChangesetSource`: the changed items and metadata of a revision
 *
 * Both are synchronous and fallible; retries belong to the implementor.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::errors::ReadError;

pub mod resolver;

pub use resolver::{ContentBuffer, ContentBufferResolver};

/// Versioned properties of an item, key to value
pub type PropertyMap = HashMap<String, String>;

/// File content and properties at a revision
pub trait ContentSource: Send + Sync {
    /// Read file content, `ReadError::NotFound` if the path does not exist
    fn read_content(&self, repository: &str, revision: u64, path: &str) -> Result<Vec<u8>, ReadError>;

    /// Read versioned properties, `ReadError::NotFound` if the path does not exist
    fn read_properties(&self, repository: &str, revision: u64, path: &str) -> Result<PropertyMap, ReadError>;
}

/// Changesets of a repository
pub trait ChangesetSource: Send + Sync {
    /// The changed items of one revision
    fn changeset(&self, repository: &str, revision: u64) -> Result<Changeset, ReadError>;
}

/// Kind of change applied to an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Replaced,
    Deleted,
}

impl ChangeKind {
    /// Whether the item has content at the changed revision
    pub fn has_content(&self) -> bool {
        !matches!(self, ChangeKind::Deleted)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Replaced => write!(f, "replaced"),
            ChangeKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// Where an item was last changed before this revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousChange {
    pub revision: u64,
    /// Path at that revision, differs from the current path after a move
    pub path: String,
}

/// One changed item in a changeset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedItem {
    pub path: String,
    pub kind: ChangeKind,
    #[serde(default)]
    pub previous_change: Option<PreviousChange>,
}

impl ChangedItem {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            previous_change: None,
        }
    }

    pub fn with_previous(mut self, revision: u64, path: impl Into<String>) -> Self {
        self.previous_change = Some(PreviousChange {
            revision,
            path: path.into(),
        });
        self
    }
}

/// Commit metadata recorded by the history ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMetadata {
    pub revision: u64,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl RevisionMetadata {
    /// Metadata with only the revision number known
    pub fn bare(revision: u64) -> Self {
        Self {
            revision,
            author: None,
            date: None,
            comment: None,
        }
    }
}

/// Changed items and metadata of one revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    pub metadata: RevisionMetadata,
    pub items: Vec<ChangedItem>,
}
