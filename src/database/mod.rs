/*!
 * Database module for the indexing history ledger.
 *
 * This module provides SQLite-based persistence for:
 * - One progress row per repository revision
 * - Crash detection through rows left `Begun`
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{ProgressState, RevisionProgressRecord};
pub use repository::LedgerRepository;
