/*!
 * Error types for the reposxml indexing core.
 *
 * Errors are grouped the way callers need to react to them:
 * - malformed input (`WalkError`, `SchemeError`) fails a single item
 * - state misuse (`StateError`) is a caller defect and always propagates
 * - read failures (`ReadError`) distinguish a missing path from a broken backend
 * - ledger failures (`LedgerError`) must reach the caller of `sync`
 */

use thiserror::Error;

/// Errors raised while walking an XML document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalkError {
    /// The input bytes could not be decoded as text
    #[error("Unsupported or invalid character encoding: {0}")]
    Encoding(String),

    /// The input is not well-formed XML
    #[error("XML is not well-formed at byte {position}: {message}")]
    Malformed {
        /// Byte offset in the newline-normalised text
        position: usize,
        /// Description of the problem
        message: String,
    },

    /// The input contains no element at all
    #[error("Document has no root element")]
    NoRoot,
}

impl WalkError {
    pub(crate) fn malformed(position: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            position,
            message: message.into(),
        }
    }
}

/// Errors caused by calling the core in the wrong state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Identity or location requested for a node of another walk
    #[error("Identity assigner was started for walk {expected} but received a node of walk {actual}")]
    ForeignDocument {
        /// Walk the assigner was started for
        expected: u64,
        /// Walk the node belongs to
        actual: u64,
    },

    /// Node index does not exist in the document
    #[error("Node {0} does not exist in this document")]
    UnknownNode(usize),

    /// `end` called while no revision is begun
    #[error("Cannot end r{revision} for repository '{repository}': no revision is begun")]
    EndWithoutBegin {
        /// Repository name
        repository: String,
        /// Revision passed to `end`
        revision: u64,
    },

    /// `end` called for a revision other than the begun one
    #[error("Cannot end r{requested} for repository '{repository}': r{begun} is the begun revision")]
    RevisionMismatch {
        /// Repository name
        repository: String,
        /// Revision currently begun
        begun: u64,
        /// Revision passed to `end`
        requested: u64,
    },

    /// `begin` called for a revision not after the head completed one
    #[error("Cannot begin r{revision} for repository '{repository}': r{head} is already completed")]
    NotMonotonic {
        /// Repository name
        repository: String,
        /// Revision passed to `begin`
        revision: u64,
        /// Highest completed revision
        head: u64,
    },

    /// `begin` called for a revision past the one after the head
    #[error("Cannot begin r{revision} for repository '{repository}': r{expected} is the next revision")]
    NotContiguous {
        /// Repository name
        repository: String,
        /// Revision passed to `begin`
        revision: u64,
        /// Revision following the head completed one
        expected: u64,
    },

    /// The revision number does not fit the ledger column
    #[error("Revision r{revision} of repository '{repository}' is out of range")]
    RevisionOutOfRange {
        /// Repository name
        repository: String,
        /// Revision passed to `begin`
        revision: u64,
    },

    /// `begin` called for a new revision while another is incomplete
    #[error("Cannot begin r{revision} for repository '{repository}': r{pending} is still incomplete")]
    PendingIncomplete {
        /// Repository name
        repository: String,
        /// Revision passed to `begin`
        revision: u64,
        /// Revision left incomplete
        pending: u64,
    },

    /// A second sync was started for a repository already syncing
    #[error("Repository '{0}' is already being synced")]
    SyncInProgress(String),
}

/// Errors from the version-control read layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The path does not exist at that revision
    #[error("Path '{path}' not found at r{revision}")]
    NotFound {
        /// Repository-relative path
        path: String,
        /// Revision that was read
        revision: u64,
    },

    /// The backend failed to produce the content
    #[error("Failed to read '{path}' at r{revision}: {message}")]
    Failed {
        /// Repository-relative path
        path: String,
        /// Revision that was read
        revision: u64,
        /// Backend error message
        message: String,
    },
}

impl ReadError {
    /// Whether this is the not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReadError::NotFound { .. })
    }
}

/// Errors in a reuse scheme properties document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemeError {
    /// A line could not be parsed
    #[error("Malformed reuse scheme '{path}' at line {line}: {message}")]
    Malformed {
        /// Path of the scheme document
        path: String,
        /// 1-based line number
        line: usize,
        /// Description of the problem
        message: String,
    },
}

/// Failure of one changed item, always carrying the item identity
#[derive(Error, Debug)]
pub enum ItemError {
    /// The item content is not well-formed XML
    #[error("Skipping {item}: {source}")]
    Malformed {
        /// Item identity (`repo^path?p=rev`)
        item: String,
        /// Walker failure
        #[source]
        source: WalkError,
    },

    /// The reuse scheme that applies to the item is malformed
    #[error("Reuse enrichment aborted for {item}: {source}")]
    Scheme {
        /// Item identity (`repo^path?p=rev`)
        item: String,
        /// Scheme failure
        #[source]
        source: SchemeError,
    },

    /// Content or properties of the item could not be read
    #[error("Content unreadable for {item}: {source}")]
    Unreadable {
        /// Item identity (`repo^path?p=rev`)
        item: String,
        /// Read failure
        #[source]
        source: ReadError,
    },

    /// Identity assignment was misused
    #[error("Identity assignment failed for {item}: {source}")]
    State {
        /// Item identity (`repo^path?p=rev`)
        item: String,
        /// State failure
        #[source]
        source: StateError,
    },
}

impl ItemError {
    /// Whether the failure must abort the whole revision
    pub fn is_revision_fatal(&self) -> bool {
        matches!(self, ItemError::Unreadable { .. } | ItemError::State { .. })
    }

    /// Identity of the failed item
    pub fn item(&self) -> &str {
        match self {
            ItemError::Malformed { item, .. }
            | ItemError::Scheme { item, .. }
            | ItemError::Unreadable { item, .. }
            | ItemError::State { item, .. } => item,
        }
    }
}

/// Errors from the indexing history ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The ledger was driven out of order
    #[error("History ledger misuse: {0}")]
    State(#[from] StateError),

    /// The ledger could not be persisted
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    /// Split an anyhow error coming out of the storage layer back into its kind
    pub(crate) fn from_storage(error: anyhow::Error) -> Self {
        match error.downcast::<StateError>() {
            Ok(state) => LedgerError::State(state),
            Err(other) => LedgerError::Storage(other),
        }
    }
}

/// Errors that abort a `sync` run
#[derive(Error, Debug)]
pub enum SyncError {
    /// Ledger failure, the resume point may not have advanced
    #[error("Ledger failure: {0}")]
    Ledger(#[from] LedgerError),

    /// The changeset of a revision could not be read
    #[error("Changeset r{revision} of '{repository}' unreadable: {source}")]
    Changeset {
        /// Repository name
        repository: String,
        /// Revision being indexed
        revision: u64,
        /// Read failure
        #[source]
        source: ReadError,
    },

    /// An item failure that leaves the revision incomplete
    #[error("Revision r{revision} of '{repository}' failed: {source}")]
    Revision {
        /// Repository name
        repository: String,
        /// Revision being indexed
        revision: u64,
        /// Item failure
        #[source]
        source: ItemError,
    },

    /// The index sink rejected fields
    #[error("Index sink failed at r{revision}: {message}")]
    Sink {
        /// Revision being indexed
        revision: u64,
        /// Sink error message
        message: String,
    },

    /// A blocking enrichment task panicked or was cancelled
    #[error("Enrichment task failed: {0}")]
    Task(String),
}
