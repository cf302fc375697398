/*!
 * Tests for error types and conversions
 */

use reposxml::errors::{
    ItemError, LedgerError, ReadError, SchemeError, StateError, SyncError, WalkError,
};

fn item() -> String {
    "demo1^/vvab/xml/doc.xml?p=4".to_string()
}

#[test]
fn test_walkError_malformed_shouldDisplayPosition() {
    let error = WalkError::Malformed {
        position: 17,
        message: "expected </p>".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("17"));
    assert!(display.contains("expected </p>"));
}

#[test]
fn test_itemError_shouldAlwaysNameTheItem() {
    let errors = vec![
        ItemError::Malformed {
            item: item(),
            source: WalkError::NoRoot,
        },
        ItemError::Scheme {
            item: item(),
            source: SchemeError::Malformed {
                path: "/reuse-scheme.properties".to_string(),
                line: 2,
                message: "empty value".to_string(),
            },
        },
        ItemError::Unreadable {
            item: item(),
            source: ReadError::NotFound {
                path: "/vvab/xml/doc.xml".to_string(),
                revision: 4,
            },
        },
        ItemError::State {
            item: item(),
            source: StateError::UnknownNode(9),
        },
    ];

    for error in &errors {
        assert_eq!(error.item(), item());
        assert!(format!("{}", error).contains(&item()));
    }
}

#[test]
fn test_itemError_isRevisionFatal_shouldOnlyHoldForReadAndStateFailures() {
    let malformed = ItemError::Malformed {
        item: item(),
        source: WalkError::NoRoot,
    };
    let unreadable = ItemError::Unreadable {
        item: item(),
        source: ReadError::Failed {
            path: "/a.xml".to_string(),
            revision: 4,
            message: "timeout".to_string(),
        },
    };
    assert!(!malformed.is_revision_fatal());
    assert!(unreadable.is_revision_fatal());
}

#[test]
fn test_readError_isNotFound_shouldDistinguishFailure() {
    let missing = ReadError::NotFound {
        path: "/a.xml".to_string(),
        revision: 1,
    };
    let failed = ReadError::Failed {
        path: "/a.xml".to_string(),
        revision: 1,
        message: "io".to_string(),
    };
    assert!(missing.is_not_found());
    assert!(!failed.is_not_found());
}

#[test]
fn test_syncError_fromLedgerError_shouldWrapState() {
    let ledger = LedgerError::from(StateError::SyncInProgress("demo1".to_string()));
    let error = SyncError::from(ledger);

    assert!(matches!(
        error,
        SyncError::Ledger(LedgerError::State(StateError::SyncInProgress(_)))
    ));
    assert!(format!("{}", error).contains("demo1"));
}

#[test]
fn test_ledgerError_fromStorage_shouldBeTransparent() {
    let error = LedgerError::from(anyhow::anyhow!("disk I/O error"));
    assert_eq!(format!("{}", error), "disk I/O error");
}
