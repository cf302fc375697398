/*!
 * Integration tests for revision sync and crash recovery
 */

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;

use reposxml::app_config::Config;
use reposxml::database::LedgerRepository;
use reposxml::errors::{ItemError, LedgerError, StateError, SyncError};
use reposxml::history::HistoryState;
use reposxml::indexing::{fields, FieldMap, IndexSink, Indexer};
use crate::common::{self, Change, FakeRepository, RecordingSink};

const REPO: &str = "demo1";

fn config() -> Config {
    let mut config = Config::default();
    config.indexing.first_revision = 1;
    config.indexing.concurrent_items = 2;
    config
}

fn indexer(repo: &Arc<FakeRepository>, sink: Arc<dyn IndexSink>) -> Indexer {
    Indexer::new(
        config(),
        LedgerRepository::new_in_memory().unwrap(),
        repo.clone(),
        repo.clone(),
        sink,
    )
}

/// Three revisions: two documents, an image, a deletion
fn seeded_repository() -> Arc<FakeRepository> {
    let repo = FakeRepository::new();
    repo.commit(
        1,
        "writer",
        vec![
            Change::add("/vvab/xml/a.xml", "<doc><p>one</p></doc>"),
            Change::add("/vvab/xml/b.xml", "<doc><p>two</p><p>three</p></doc>"),
            Change::add("/vvab/img/logo.png", "PNG"),
        ],
    );
    repo.commit(
        2,
        "writer",
        vec![Change::modify("/vvab/xml/a.xml", "<doc><p>one</p><p>more</p></doc>", 1)],
    );
    repo.commit(3, "writer", vec![Change::delete("/vvab/xml/b.xml")]);
    repo
}

#[tokio::test]
async fn test_sync_fromEmptyLedger_shouldIndexEveryRevision() -> Result<()> {
    common::init_logging();
    let repo = seeded_repository();
    let sink = RecordingSink::new();
    let indexer = indexer(&repo, sink.clone());

    let report = indexer.sync(REPO, 3).await?;

    assert_eq!(report.revisions, vec![1, 2, 3]);
    assert_eq!(report.items_indexed, 3);
    assert_eq!(report.items_skipped, 2);
    assert_eq!(report.items_failed, 0);
    assert_eq!(report.elements_indexed, 2 + 3 + 3);
    assert_eq!(report.head, Some(3));
    assert_eq!(indexer.get_head_indexed(REPO).await?, Some(3));

    let a2 = sink.documents_of("/vvab/xml/a.xml", 2);
    assert_eq!(a2.len(), 3);
    assert_eq!(a2[2].get_str(fields::ID), Some("demo1^/vvab/xml/a.xml?p=2#2"));
    assert_eq!(a2[2].get_str(fields::TEXT), Some("more"));

    let entries = indexer.history(REPO).entries().await?;
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.completed));
    assert_eq!(entries[0].author.as_deref(), Some("writer"));
    Ok(())
}

#[tokio::test]
async fn test_sync_whenUpToDate_shouldDoNothing() -> Result<()> {
    let repo = seeded_repository();
    let sink = RecordingSink::new();
    let indexer = indexer(&repo, sink.clone());

    indexer.sync(REPO, 2).await?;
    let before = sink.documents().len();

    let report = indexer.sync(REPO, 2).await?;
    assert!(report.revisions.is_empty());
    assert_eq!(report.head, Some(2));
    assert_eq!(sink.documents().len(), before);

    let report = indexer.sync(REPO, 3).await?;
    assert_eq!(report.revisions, vec![3]);
    Ok(())
}

#[tokio::test]
async fn test_sync_withUnreadableItem_shouldLeaveRevisionIncompleteAndResume() -> Result<()> {
    let repo = seeded_repository();
    repo.break_path(2, "/vvab/xml/a.xml");
    let sink = RecordingSink::new();
    let indexer = indexer(&repo, sink.clone());

    let err = indexer.sync(REPO, 3).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Revision {
            revision: 2,
            source: ItemError::Unreadable { .. },
            ..
        }
    ));

    let history = indexer.history(REPO);
    assert!(history.is_incomplete().await?);
    assert_eq!(history.state().await?, HistoryState::Begun(2));
    assert_eq!(indexer.get_head_indexed(REPO).await?, Some(1));

    repo.repair_path(2, "/vvab/xml/a.xml");
    let report = indexer.sync(REPO, 3).await?;

    assert_eq!(report.revisions, vec![2, 3]);
    assert!(!history.is_incomplete().await?);
    assert_eq!(indexer.get_head_indexed(REPO).await?, Some(3));
    assert_eq!(sink.documents_of("/vvab/xml/a.xml", 2).len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_sync_withMalformedItem_shouldSkipItAndCompleteRevision() -> Result<()> {
    let repo = FakeRepository::new();
    repo.commit(
        1,
        "writer",
        vec![
            Change::add("/p/good.xml", "<doc/>"),
            Change::add("/p/bad.xml", "<doc><p></doc>"),
        ],
    );
    let sink = RecordingSink::new();
    let indexer = indexer(&repo, sink.clone());

    let report = indexer.sync(REPO, 1).await?;

    assert_eq!(report.revisions, vec![1]);
    assert_eq!(report.items_indexed, 1);
    assert_eq!(report.items_failed, 1);
    assert!(sink.documents_of("/p/bad.xml", 1).is_empty());
    assert_eq!(indexer.get_head_indexed(REPO).await?, Some(1));
    Ok(())
}

#[tokio::test]
async fn test_sync_withFailingSink_shouldAbortRevision() -> Result<()> {
    let repo = seeded_repository();
    let sink = RecordingSink::new();
    sink.set_rejecting(true);
    let indexer = indexer(&repo, sink.clone());

    let err = indexer.sync(REPO, 3).await.unwrap_err();
    assert!(matches!(err, SyncError::Sink { revision: 1, .. }));
    assert_eq!(indexer.history(REPO).state().await?, HistoryState::Begun(1));

    sink.set_rejecting(false);
    let report = indexer.sync(REPO, 3).await?;
    assert_eq!(report.revisions, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn test_sync_withOtherRepository_shouldKeepSeparateHistory() -> Result<()> {
    let repo = seeded_repository();
    let indexer = indexer(&repo, RecordingSink::new());

    indexer.sync(REPO, 3).await?;
    assert_eq!(indexer.get_head_indexed("demo2").await?, None);

    let report = indexer.sync("demo2", 1).await?;
    assert_eq!(report.revisions, vec![1]);
    assert_eq!(indexer.get_head_indexed(REPO).await?, Some(3));
    Ok(())
}

/// Sink that parks the first write until released
struct GatedSink {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl IndexSink for GatedSink {
    async fn add_or_update(&self, _fields: FieldMap) -> Result<()> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_sync_whileAlreadySyncing_shouldRejectSecondCall() -> Result<()> {
    let repo = FakeRepository::new();
    repo.commit(1, "writer", vec![Change::add("/p/doc.xml", "<doc/>")]);
    let sink = Arc::new(GatedSink {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let indexer = Arc::new(indexer(&repo, sink.clone()));

    let running = {
        let indexer = indexer.clone();
        tokio::spawn(async move { indexer.sync(REPO, 1).await })
    };
    sink.entered.notified().await;

    let err = indexer.sync(REPO, 1).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Ledger(LedgerError::State(StateError::SyncInProgress(_)))
    ));

    sink.release.notify_one();
    let report = running.await??;
    assert_eq!(report.revisions, vec![1]);
    Ok(())
}
