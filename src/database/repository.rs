/*!
 * Repository layer for ledger operations.
 *
 * The synchronous helpers take a plain `Connection` so that the history
 * layer can compose them inside a single transaction. The async methods
 * are read-only views for reporting.
 */

use anyhow::Result;
use chrono::Utc;
use log::debug;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::connection::DatabaseConnection;
use super::models::{ProgressState, RevisionProgressRecord};

const SELECT_COLUMNS: &str = "SELECT repository, revision, state, author, committed_at, comment, begun_at, completed_at FROM revision_progress";

/// Repository for ledger rows
#[derive(Clone)]
pub struct LedgerRepository {
    /// Database connection
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    /// Underlying connection, for composing transactions
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Get the newest ledger row of a repository
    pub async fn latest_entry(&self, repository: &str) -> Result<Option<RevisionProgressRecord>> {
        let repository = repository.to_string();
        self.db
            .execute_async(move |conn| Self::latest_entry_sync(conn, &repository))
            .await
    }

    /// Every ledger row of a repository, oldest first
    pub async fn list_entries(&self, repository: &str) -> Result<Vec<RevisionProgressRecord>> {
        let repository = repository.to_string();
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE repository = ?1 ORDER BY revision ASC",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([&repository], Self::map_record)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Get the newest ledger row (synchronous version for use within transactions)
    pub(crate) fn latest_entry_sync(
        conn: &Connection,
        repository: &str,
    ) -> Result<Option<RevisionProgressRecord>> {
        let record = conn
            .query_row(
                &format!(
                    "{} WHERE repository = ?1 ORDER BY revision DESC LIMIT 1",
                    SELECT_COLUMNS
                ),
                [repository],
                Self::map_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Highest completed revision of a repository
    pub(crate) fn head_completed_sync(conn: &Connection, repository: &str) -> Result<Option<i64>> {
        let head: Option<i64> = conn.query_row(
            "SELECT MAX(revision) FROM revision_progress WHERE repository = ?1 AND state = ?2",
            params![repository, ProgressState::Completed.to_string()],
            |row| row.get(0),
        )?;
        Ok(head)
    }

    /// The revision left `Begun`, if any
    pub(crate) fn pending_sync(conn: &Connection, repository: &str) -> Result<Option<i64>> {
        let pending = conn
            .query_row(
                "SELECT revision FROM revision_progress WHERE repository = ?1 AND state = ?2 ORDER BY revision DESC LIMIT 1",
                params![repository, ProgressState::Begun.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(pending)
    }

    /// Insert a `Begun` row, restarting it if the revision was begun before
    pub(crate) fn upsert_begun_sync(conn: &Connection, record: &RevisionProgressRecord) -> Result<()> {
        debug!(
            "Recording begin of {} r{}",
            record.repository, record.revision
        );
        conn.execute(
            r#"
            INSERT INTO revision_progress (
                repository, revision, state, author, committed_at, comment, begun_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)
            ON CONFLICT(repository, revision) DO UPDATE SET
                state = excluded.state,
                author = excluded.author,
                committed_at = excluded.committed_at,
                comment = excluded.comment,
                begun_at = excluded.begun_at,
                completed_at = NULL
            "#,
            params![
                record.repository,
                record.revision,
                ProgressState::Begun.to_string(),
                record.author,
                record.committed_at,
                record.comment,
                record.begun_at,
            ],
        )?;
        Ok(())
    }

    /// Mark a begun revision completed, returns whether a row changed
    pub(crate) fn mark_completed_sync(conn: &Connection, repository: &str, revision: i64) -> Result<bool> {
        debug!("Recording completion of {} r{}", repository, revision);
        let updated = conn.execute(
            "UPDATE revision_progress SET state = ?1, completed_at = ?2 WHERE repository = ?3 AND revision = ?4 AND state = ?5",
            params![
                ProgressState::Completed.to_string(),
                Utc::now().to_rfc3339(),
                repository,
                revision,
                ProgressState::Begun.to_string(),
            ],
        )?;
        Ok(updated > 0)
    }

    fn map_record(row: &Row<'_>) -> rusqlite::Result<RevisionProgressRecord> {
        Ok(RevisionProgressRecord {
            repository: row.get(0)?,
            revision: row.get(1)?,
            state: row
                .get::<_, String>(2)?
                .parse::<ProgressState>()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?,
            author: row.get(3)?,
            committed_at: row.get(4)?,
            comment: row.get(5)?,
            begun_at: row.get(6)?,
            completed_at: row.get(7)?,
        })
    }
}
