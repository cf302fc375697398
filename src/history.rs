/*!
 * Per-repository indexing history.
 *
 * Every revision is bracketed by `begin` and `end`, each committed in its own
 * transaction. A revision left `Begun` after a crash is reported by
 * `is_incomplete` and must be indexed again before the history advances.
 */

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::fmt;

use crate::database::{LedgerRepository, RevisionProgressRecord};
use crate::errors::{LedgerError, StateError};
use crate::repos::RevisionMetadata;

/// Where the history of a repository stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "revision", rename_all = "snake_case")]
pub enum HistoryState {
    /// Nothing indexed yet
    Empty,
    /// A revision was begun and not completed
    Begun(u64),
    /// The last begun revision was completed
    Completed(u64),
}

impl fmt::Display for HistoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryState::Empty => write!(f, "empty"),
            HistoryState::Begun(r) => write!(f, "begun r{}", r),
            HistoryState::Completed(r) => write!(f, "completed r{}", r),
        }
    }
}

/// One ledger entry as seen by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionProgress {
    pub revision: u64,
    pub begun: bool,
    pub completed: bool,
    pub author: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

impl From<RevisionProgressRecord> for RevisionProgress {
    fn from(record: RevisionProgressRecord) -> Self {
        Self {
            revision: record.revision(),
            begun: true,
            completed: record.is_completed(),
            date: record.committed_at(),
            author: record.author,
            comment: record.comment,
        }
    }
}

/// Indexing history of one repository
#[derive(Clone)]
pub struct IndexingHistory {
    store: LedgerRepository,
    repository: String,
}

impl IndexingHistory {
    pub fn new(store: LedgerRepository, repository: impl Into<String>) -> Self {
        Self {
            store,
            repository: repository.into(),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Record the start of a revision
    ///
    /// Restarting the revision that is currently incomplete is allowed.
    pub async fn begin(&self, metadata: &RevisionMetadata) -> Result<(), LedgerError> {
        let record = RevisionProgressRecord::begun(&self.repository, metadata)?;
        let repository = self.repository.clone();
        let revision = metadata.revision;

        let restarted = self
            .store
            .connection()
            .transaction_async(move |tx| {
                let head = LedgerRepository::head_completed_sync(tx, &repository)?;
                if let Some(head) = head {
                    if record.revision <= head {
                        return Err(StateError::NotMonotonic {
                            repository,
                            revision,
                            head: head as u64,
                        }
                        .into());
                    }
                }

                let pending = LedgerRepository::pending_sync(tx, &repository)?;
                match (pending, head) {
                    (Some(pending), _) if pending != record.revision => {
                        return Err(StateError::PendingIncomplete {
                            repository,
                            revision,
                            pending: pending as u64,
                        }
                        .into());
                    }
                    (None, Some(head)) if record.revision != head + 1 => {
                        return Err(StateError::NotContiguous {
                            repository,
                            revision,
                            expected: head as u64 + 1,
                        }
                        .into());
                    }
                    _ => {}
                }

                LedgerRepository::upsert_begun_sync(tx, &record)?;
                Ok(pending.is_some())
            })
            .await
            .map_err(LedgerError::from_storage)?;

        if restarted {
            warn!(
                "Restarting incomplete r{} of repository '{}'",
                revision, self.repository
            );
        } else {
            info!("Begun r{} of repository '{}'", revision, self.repository);
        }
        Ok(())
    }

    /// Record the completion of the begun revision
    pub async fn end(&self, revision: u64) -> Result<(), LedgerError> {
        let repository = self.repository.clone();

        self.store
            .connection()
            .transaction_async(move |tx| {
                match LedgerRepository::pending_sync(tx, &repository)? {
                    None => Err(StateError::EndWithoutBegin {
                        repository,
                        revision,
                    }
                    .into()),
                    Some(begun) if begun as u64 != revision => Err(StateError::RevisionMismatch {
                        repository,
                        begun: begun as u64,
                        requested: revision,
                    }
                    .into()),
                    Some(begun) => {
                        LedgerRepository::mark_completed_sync(tx, &repository, begun)?;
                        Ok(())
                    }
                }
            })
            .await
            .map_err(LedgerError::from_storage)?;

        info!("Completed r{} of repository '{}'", revision, self.repository);
        Ok(())
    }

    /// Whether the last begun revision never completed
    pub async fn is_incomplete(&self) -> Result<bool, LedgerError> {
        Ok(matches!(self.state().await?, HistoryState::Begun(_)))
    }

    /// Highest completed revision
    pub async fn head_completed(&self) -> Result<Option<u64>, LedgerError> {
        let repository = self.repository.clone();
        let head = self
            .store
            .connection()
            .execute_async(move |conn| LedgerRepository::head_completed_sync(conn, &repository))
            .await
            .map_err(LedgerError::from_storage)?;
        Ok(head.map(|h| h as u64))
    }

    pub async fn state(&self) -> Result<HistoryState, LedgerError> {
        let latest = self
            .store
            .latest_entry(&self.repository)
            .await
            .map_err(LedgerError::from_storage)?;
        Ok(match latest {
            None => HistoryState::Empty,
            Some(entry) if entry.is_completed() => HistoryState::Completed(entry.revision()),
            Some(entry) => HistoryState::Begun(entry.revision()),
        })
    }

    /// All ledger entries, oldest first
    pub async fn entries(&self) -> Result<Vec<RevisionProgress>, LedgerError> {
        let records = self
            .store
            .list_entries(&self.repository)
            .await
            .map_err(LedgerError::from_storage)?;
        Ok(records.into_iter().map(RevisionProgress::from).collect())
    }
}
