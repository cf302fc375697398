/*!
 * Integration tests for item enrichment against an in-memory repository
 */

use std::sync::Arc;

use reposxml::app_config::ReuseConfig;
use reposxml::errors::ItemError;
use reposxml::indexing::fields;
use reposxml::indexing::ItemEnricher;
use reposxml::repos::{ChangedItem, ChangesetSource, ContentBufferResolver, ContentSource};
use crate::common::{self, Change, FakeRepository};

const DOC: &str = "/vvab/xml/doc.xml";
const PROJECT_SCHEME: &str = "/vvab/reuse-scheme.properties";
const ROOT_SCHEME: &str = "/reuse-scheme.properties";

const REV1: &str = r#"<doc cms:rlogicalid="d" cms:rid="r0"><p cms:rlogicalid="a" cms:rid="r1">Hello</p><p cms:rlogicalid="b">World</p></doc>"#;
const REV2: &str = r#"<doc cms:rlogicalid="d" cms:rid="r0"><p cms:rlogicalid="a">Hello</p><p cms:rlogicalid="b">World</p></doc>"#;

fn enricher(repo: &Arc<FakeRepository>) -> ItemEnricher {
    let source: Arc<dyn ContentSource> = repo.clone();
    ItemEnricher::new(ContentBufferResolver::new(source, "demo1"), ReuseConfig::default())
}

fn changed(repo: &FakeRepository, revision: u64) -> ChangedItem {
    repo.changeset("demo1", revision).unwrap().items[0].clone()
}

fn translation_properties() -> Vec<(&'static str, &'static str)> {
    vec![
        ("cms:status", "Released"),
        (
            "abx:TranslationMaster",
            "x-svn:///svn/demo1^/vvab/xml/Docs/My%20First%20Novel.xml?p=6",
        ),
        ("abx:TranslationLocale", "nb-NO"),
    ]
}

#[test]
fn test_enrichAt_withProjectScheme_shouldEmitReuseAndTranslationFields() {
    common::init_logging();
    let repo = FakeRepository::new();
    repo.put_file(0, PROJECT_SCHEME, "reuse.status.released = Released\n");
    repo.commit(1, "editor", vec![Change::add(DOC, REV1).with_properties(&translation_properties())]);

    let enriched = enricher(&repo).enrich_at(1, &changed(&repo, 1)).unwrap();

    assert_eq!(enriched.scheme_path.as_deref(), Some(PROJECT_SCHEME));
    assert_eq!(enriched.elements.len(), 3);

    let root = &enriched.elements[0];
    assert_eq!(root.get_str(fields::ID), Some("demo1^/vvab/xml/doc.xml?p=1#0"));
    assert_eq!(root.get_str(fields::POS), Some("1"));
    assert_eq!(root.get_bool(fields::REUSE_READY), Some(true));
    assert_eq!(
        root.get_str(fields::TRANSLATION_MASTER),
        Some("x-svn:///svn/demo1^/vvab/xml/Docs/My First Novel.xml")
    );
    assert_eq!(root.get_i64(fields::TRANSLATION_MASTER_REV), Some(6));
    assert_eq!(root.get_str(fields::TRANSLATION_LOCALE_KEY), Some("1nb-NO"));

    // no reference version: the stamped root makes every marker expected
    let values: Vec<Option<i64>> = enriched
        .elements
        .iter()
        .map(|e| e.get_i64(fields::REUSE_VALUE))
        .collect();
    assert_eq!(values, vec![Some(-1), Some(1), Some(-2)]);
}

#[test]
fn test_enrichAt_withPreviousRevision_shouldOnlyDisqualifyLostMarkers() {
    let repo = FakeRepository::new();
    repo.put_file(0, ROOT_SCHEME, "# defaults only\n");
    repo.commit(1, "editor", vec![Change::add(DOC, REV1)]);
    repo.commit(2, "editor", vec![Change::modify(DOC, REV2, 1)]);

    let enriched = enricher(&repo).enrich_at(2, &changed(&repo, 2)).unwrap();

    assert_eq!(enriched.scheme_path.as_deref(), Some(ROOT_SCHEME));
    let values: Vec<Option<i64>> = enriched
        .elements
        .iter()
        .map(|e| e.get_i64(fields::REUSE_VALUE))
        .collect();
    // `a` lost its marker, `b` never had one
    assert_eq!(values, vec![Some(-1), Some(-2), Some(1)]);
    assert_eq!(enriched.elements[0].get_bool(fields::REUSE_READY), Some(false));
}

#[test]
fn test_enrichAt_withUnusablePreviousRevision_shouldFallBackToStampedExpectation() {
    let repo = FakeRepository::new();
    repo.put_file(0, ROOT_SCHEME, "reuse.status.released = Released\n");
    repo.commit(1, "editor", vec![Change::add(DOC, "<doc><unclosed></doc>")]);
    repo.commit(2, "editor", vec![Change::modify(DOC, REV2, 1)]);

    let enriched = enricher(&repo).enrich_at(2, &changed(&repo, 2)).unwrap();
    let values: Vec<Option<i64>> = enriched
        .elements
        .iter()
        .map(|e| e.get_i64(fields::REUSE_VALUE))
        .collect();
    assert_eq!(values, vec![Some(-2), Some(-2), Some(-2)]);
}

#[test]
fn test_enrichAt_withoutScheme_shouldSkipReuseFieldsOnly() {
    let repo = FakeRepository::new();
    repo.commit(1, "editor", vec![Change::add(DOC, REV1).with_properties(&translation_properties())]);

    let enriched = enricher(&repo).enrich_at(1, &changed(&repo, 1)).unwrap();

    assert!(enriched.scheme_path.is_none());
    for element in &enriched.elements {
        assert!(!element.contains(fields::REUSE_VALUE));
        assert!(!element.contains(fields::REUSE_READY));
        assert_eq!(element.get_str(fields::TRANSLATION_LOCALE_KEY), Some("1nb-NO"));
    }
}

#[test]
fn test_enrichAt_withMalformedScheme_shouldFailItemWithoutBeingFatal() {
    let repo = FakeRepository::new();
    repo.put_file(0, PROJECT_SCHEME, "reuse.status.released\n");
    repo.commit(1, "editor", vec![Change::add(DOC, REV1)]);

    let err = enricher(&repo).enrich_at(1, &changed(&repo, 1)).unwrap_err();

    assert!(matches!(err, ItemError::Scheme { .. }));
    assert!(!err.is_revision_fatal());
    assert_eq!(err.item(), "demo1^/vvab/xml/doc.xml?p=1");
}

#[test]
fn test_enrichAt_withMalformedXml_shouldFailItemWithoutBeingFatal() {
    let repo = FakeRepository::new();
    repo.commit(1, "editor", vec![Change::add(DOC, "<doc><p></doc>")]);

    let err = enricher(&repo).enrich_at(1, &changed(&repo, 1)).unwrap_err();
    assert!(matches!(err, ItemError::Malformed { .. }));
    assert!(!err.is_revision_fatal());
}

#[test]
fn test_enrichAt_withUnreadableContent_shouldBeRevisionFatal() {
    let repo = FakeRepository::new();
    repo.commit(1, "editor", vec![Change::add(DOC, REV1)]);
    repo.break_path(1, DOC);

    let err = enricher(&repo).enrich_at(1, &changed(&repo, 1)).unwrap_err();
    assert!(matches!(err, ItemError::Unreadable { .. }));
    assert!(err.is_revision_fatal());
}

#[test]
fn test_enrichAt_withEmptyContent_shouldReportMalformedNotMissing() {
    let repo = FakeRepository::new();
    repo.commit(1, "editor", vec![Change::add(DOC, "")]);

    let err = enricher(&repo).enrich_at(1, &changed(&repo, 1)).unwrap_err();
    assert!(matches!(err, ItemError::Malformed { .. }));
}
