/*!
 * Database entity models.
 *
 * These structures map directly to the `revision_progress` table.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::StateError;
use crate::repos::RevisionMetadata;

/// Progress of one revision in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    /// Indexing started, not known to have finished
    Begun,
    /// Every item of the revision was handed to the index
    Completed,
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressState::Begun => write!(f, "begun"),
            ProgressState::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for ProgressState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "begun" => Ok(ProgressState::Begun),
            "completed" => Ok(ProgressState::Completed),
            _ => Err(anyhow::anyhow!("Invalid progress state: {}", s)),
        }
    }
}

/// One ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionProgressRecord {
    pub repository: String,
    pub revision: i64,
    pub state: ProgressState,
    pub author: Option<String>,
    /// Commit date, RFC 3339
    pub committed_at: Option<String>,
    pub comment: Option<String>,
    /// RFC 3339
    pub begun_at: String,
    /// RFC 3339
    pub completed_at: Option<String>,
}

impl RevisionProgressRecord {
    /// A fresh `Begun` row for a revision
    pub fn begun(repository: &str, metadata: &RevisionMetadata) -> Result<Self, StateError> {
        let revision = i64::try_from(metadata.revision).map_err(|_| StateError::RevisionOutOfRange {
            repository: repository.to_string(),
            revision: metadata.revision,
        })?;
        Ok(Self {
            repository: repository.to_string(),
            revision,
            state: ProgressState::Begun,
            author: metadata.author.clone(),
            committed_at: metadata.date.map(|d| d.to_rfc3339()),
            comment: metadata.comment.clone(),
            begun_at: Utc::now().to_rfc3339(),
            completed_at: None,
        })
    }

    pub fn revision(&self) -> u64 {
        self.revision as u64
    }

    pub fn is_completed(&self) -> bool {
        self.state == ProgressState::Completed
    }

    /// Commit date parsed back into a timestamp
    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        self.committed_at
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc))
    }
}
