/*!
 * Revision-by-revision synchronisation of a repository into the index.
 *
 * Revisions are processed strictly in order. Each one is bracketed by the
 * history ledger; items inside a revision are enriched concurrently on the
 * blocking pool and their field maps handed to the `IndexSink`.
 */

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, error, info};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use super::enricher::{EnrichedItem, ItemEnricher};
use super::fields::FieldMap;
use crate::app_config::Config;
use crate::database::LedgerRepository;
use crate::errors::{ItemError, LedgerError, StateError, SyncError};
use crate::history::{HistoryState, IndexingHistory};
use crate::repos::{
    ChangedItem, Changeset, ChangesetSource, ContentBufferResolver, ContentSource, RevisionMetadata,
};

/// External write path of the search index
#[async_trait]
pub trait IndexSink: Send + Sync {
    /// Add or replace the document of one element
    async fn add_or_update(&self, fields: FieldMap) -> anyhow::Result<()>;
}

/// Outcome of one `sync` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub repository: String,
    /// Revisions completed by this call, in order
    pub revisions: Vec<u64>,
    pub items_indexed: usize,
    /// Deleted items and non-XML paths
    pub items_skipped: usize,
    /// Items dropped because of a non-fatal error
    pub items_failed: usize,
    pub elements_indexed: usize,
    /// Head completed revision after the call
    pub head: Option<u64>,
}

/// Drives indexing of repositories
pub struct Indexer {
    config: Config,
    store: LedgerRepository,
    changesets: Arc<dyn ChangesetSource>,
    content: Arc<dyn ContentSource>,
    sink: Arc<dyn IndexSink>,
    in_flight: Mutex<HashSet<String>>,
}

struct SyncGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    repository: String,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.repository);
    }
}

impl Indexer {
    pub fn new(
        config: Config,
        store: LedgerRepository,
        changesets: Arc<dyn ChangesetSource>,
        content: Arc<dyn ContentSource>,
        sink: Arc<dyn IndexSink>,
    ) -> Self {
        Self {
            config,
            store,
            changesets,
            content,
            sink,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// History ledger of a repository
    pub fn history(&self, repository: &str) -> IndexingHistory {
        IndexingHistory::new(self.store.clone(), repository)
    }

    /// Highest fully indexed revision of a repository
    pub async fn get_head_indexed(&self, repository: &str) -> Result<Option<u64>, LedgerError> {
        self.history(repository).head_completed().await
    }

    /// Index every revision after the head completed one up to `head`
    ///
    /// A revision left incomplete by an earlier run is indexed again first.
    pub async fn sync(&self, repository: &str, head: u64) -> Result<SyncReport, SyncError> {
        let _guard = self.claim(repository)?;
        let history = self.history(repository);

        let start = match history.state().await? {
            HistoryState::Begun(pending) => {
                info!(
                    "Repository '{}' has incomplete r{}, indexing it again",
                    repository, pending
                );
                pending
            }
            HistoryState::Completed(completed) => completed + 1,
            HistoryState::Empty => self.config.indexing.first_revision,
        };

        let mut report = SyncReport {
            repository: repository.to_string(),
            ..Default::default()
        };

        if start > head {
            info!("Repository '{}' is up to date at r{}", repository, head);
        } else {
            info!("Syncing repository '{}' r{}..=r{}", repository, start, head);
        }

        let enricher = Arc::new(ItemEnricher::new(
            ContentBufferResolver::new(self.content.clone(), repository),
            self.config.reuse.clone(),
        ));

        for revision in start..=head {
            let changeset = self.read_changeset(repository, revision).await?;
            let metadata = RevisionMetadata {
                revision,
                ..changeset.metadata
            };

            history.begin(&metadata).await?;
            self.index_revision(&enricher, revision, changeset.items, &mut report)
                .await?;
            history.end(revision).await?;
            report.revisions.push(revision);
        }

        report.head = history.head_completed().await?;
        info!(
            "Synced repository '{}': {} revisions, {} items indexed, {} skipped, {} failed",
            repository,
            report.revisions.len(),
            report.items_indexed,
            report.items_skipped,
            report.items_failed
        );
        Ok(report)
    }

    fn claim(&self, repository: &str) -> Result<SyncGuard<'_>, SyncError> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(repository.to_string()) {
            return Err(LedgerError::from(StateError::SyncInProgress(repository.to_string())).into());
        }
        Ok(SyncGuard {
            in_flight: &self.in_flight,
            repository: repository.to_string(),
        })
    }

    async fn read_changeset(&self, repository: &str, revision: u64) -> Result<Changeset, SyncError> {
        let source = self.changesets.clone();
        let name = repository.to_string();
        tokio::task::spawn_blocking(move || source.changeset(&name, revision))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
            .map_err(|source| SyncError::Changeset {
                repository: repository.to_string(),
                revision,
                source,
            })
    }

    async fn index_revision(
        &self,
        enricher: &Arc<ItemEnricher>,
        revision: u64,
        items: Vec<ChangedItem>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let mut selected = Vec::with_capacity(items.len());
        for item in items {
            if !item.kind.has_content() {
                debug!("Skipping {} item {} at r{}", item.kind, item.path, revision);
                report.items_skipped += 1;
            } else if !self.config.indexing.is_xml_path(&item.path) {
                debug!("Skipping non-XML item {} at r{}", item.path, revision);
                report.items_skipped += 1;
            } else {
                selected.push(item);
            }
        }

        let mut results = stream::iter(selected.into_iter().map(|item| {
            let enricher = enricher.clone();
            async move {
                tokio::task::spawn_blocking(move || enricher.enrich_at(revision, &item)).await
            }
        }))
        .buffer_unordered(self.config.indexing.concurrent_items.max(1));

        while let Some(joined) = results.next().await {
            let outcome = joined.map_err(|e| SyncError::Task(e.to_string()))?;
            match outcome {
                Ok(enriched) => self.hand_off(revision, enriched, report).await?,
                Err(e) => self.item_failed(revision, e, report)?,
            }
        }

        Ok(())
    }

    async fn hand_off(
        &self,
        revision: u64,
        enriched: EnrichedItem,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let count = enriched.elements.len();
        for fields in enriched.elements {
            self.sink
                .add_or_update(fields)
                .await
                .map_err(|e| SyncError::Sink {
                    revision,
                    message: format!("{:#}", e),
                })?;
        }
        debug!("Indexed {} elements of {}", count, enriched.context);
        report.items_indexed += 1;
        report.elements_indexed += count;
        Ok(())
    }

    fn item_failed(
        &self,
        revision: u64,
        failure: ItemError,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        if failure.is_revision_fatal() {
            error!("Aborting r{}: {}", revision, failure);
            return Err(SyncError::Revision {
                repository: report.repository.clone(),
                revision,
                source: failure,
            });
        }
        error!("{}", failure);
        report.items_failed += 1;
        Ok(())
    }
}
