/*!
 * # reposxml - element-level reuse indexing for versioned XML
 *
 * A Rust library that turns versioned XML documents into per-element index
 * fields while tracking whether translated content can be reused across
 * revisions.
 *
 * ## Features
 *
 * - Verbatim, position-aware XML walking with independently parseable
 *   element sources
 * - Deterministic element identities and tree locations
 * - Bottom-up reuse qualification and translation master linkage
 * - Crash-resumable, per-revision indexing history in SQLite
 * - Concurrent per-item enrichment behind a sequential revision driver
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `xml`: Tree walker and document arena
 * - `identity`: Element identities and locations
 * - `reuse`: Reuse qualification, reuse schemes and translation linkage
 * - `repos`: Version-control read contracts and the content buffer resolver
 * - `database`: SQLite persistence of the history ledger
 * - `history`: Per-repository indexing history
 * - `indexing`: Item enrichment and revision sync
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

pub mod app_config;
pub mod database;
pub mod errors;
pub mod history;
pub mod identity;
pub mod indexing;
pub mod repos;
pub mod reuse;
pub mod xml;

pub use app_config::Config;
pub use errors::{ItemError, LedgerError, ReadError, StateError, SyncError, WalkError};
pub use history::{HistoryState, IndexingHistory, RevisionProgress};
pub use identity::{ElementIdentity, IdentityAssigner, ItemContext, Location};
pub use indexing::{FieldMap, IndexSink, Indexer, ItemEnricher, SyncReport};
pub use xml::{walk, XmlDocument};
