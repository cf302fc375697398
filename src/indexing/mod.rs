/*!
 * Indexing of changed items.
 *
 * - `fields`: the field maps handed to the index
 * - `enricher`: one item to its element field maps
 * - `sync`: revision-by-revision driver bracketed by the history ledger
 */

pub mod enricher;
pub mod fields;
pub mod sync;

pub use enricher::{build_fields, EnrichedItem, ItemEnricher, ReuseInputs};
pub use fields::FieldMap;
pub use sync::{IndexSink, Indexer, SyncReport};
