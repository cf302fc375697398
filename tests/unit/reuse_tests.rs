/*!
 * Tests for reuse qualification and translation linkage
 */

use reposxml::app_config::ReuseConfig;
use reposxml::reuse::linkage::is_well_formed_locale;
use reposxml::reuse::{
    link_translation, qualify_document, MarkerExpectation, ReuseRules, ReuseScheme,
    REUSE_CONFIRMED, REUSE_DISQUALIFIED,
};
use reposxml::xml::walk;
use crate::common;

fn rules() -> ReuseRules {
    ReuseRules::from(&ReuseConfig::default())
}

#[test]
fn test_linkTranslation_withNovelScenario_shouldDecodeMasterAndBuildLocaleKey() {
    let props = common::properties(&[
        (
            "abx:TranslationMaster",
            "x-svn:///svn/demo1^/vvab/xml/Docs/My%20First%20Novel.xml?p=6",
        ),
        ("abx:TranslationLocale", "nb-NO"),
    ]);

    let linkage = link_translation(&props, &ReuseConfig::default()).expect("item is a translation");

    assert_eq!(
        linkage.master_path.as_deref(),
        Some("x-svn:///svn/demo1^/vvab/xml/Docs/My First Novel.xml")
    );
    assert_eq!(linkage.locale_key.as_deref(), Some("1nb-NO"));
}

#[test]
fn test_linkTranslation_withConfiguredPropertyNames_shouldUseThem() {
    let mut config = ReuseConfig::default();
    config.master_property = "x:master".to_string();
    config.locale_property = "x:locale".to_string();
    let props = common::properties(&[("x:master", "/m.xml"), ("x:locale", "fr")]);

    let linkage = link_translation(&props, &config).unwrap();
    assert_eq!(linkage.master_path.as_deref(), Some("/m.xml"));
    assert_eq!(linkage.master_revision, None);
    assert_eq!(linkage.locale_key.as_deref(), Some("1fr"));
}

#[test]
fn test_isWellFormedLocale_withThreeLetterLanguage_shouldAccept() {
    assert!(is_well_formed_locale("nob"));
    assert!(!is_well_formed_locale(""));
    assert!(!is_well_formed_locale("-NO"));
}

#[test]
fn test_qualifyDocument_withOneLostMarker_nearestAncestorShouldCountIt() {
    let xml = r#"<doc cms:rid="r0">
        <sec cms:rid="r1">
            <p cms:rid="r2"/>
            <p/>
            <p cms:rid="r4"/>
        </sec>
        <sec cms:rid="r5"><p cms:rid="r6"/></sec>
    </doc>"#;
    let doc = walk(xml.as_bytes()).unwrap();
    let values: Vec<i64> = qualify_document(&doc, &rules(), &MarkerExpectation::Stamped, None)
        .iter()
        .map(|q| q.reuse_value)
        .collect();

    assert_eq!(values, vec![-1, -1, 1, REUSE_DISQUALIFIED, 1, REUSE_CONFIRMED, 1]);
}

#[test]
fn test_qualifyDocument_withSeveralLostMarkers_shouldSumSubtreeCounts() {
    let xml = r#"<doc cms:rid="r0"><sec><p/><p cms:rid="r3"/></sec><sec cms:rid="r4"><p/></sec></doc>"#;
    let doc = walk(xml.as_bytes()).unwrap();
    let values: Vec<i64> = qualify_document(&doc, &rules(), &MarkerExpectation::Stamped, None)
        .iter()
        .map(|q| q.reuse_value)
        .collect();

    // the root counts the disqualified elements of both sections
    assert_eq!(values, vec![-3, -2, -2, 1, -1, -2]);
}

#[test]
fn test_qualifyDocument_reuseReady_shouldBeIndependentOfReuseValue() {
    let doc = walk(br#"<doc cms:rid="r0"><p/></doc>"#).unwrap();

    for (status, ready) in [(Some("Released"), true), (Some("released"), false), (None, false)] {
        let qualifications = qualify_document(&doc, &rules(), &MarkerExpectation::Stamped, status);
        assert!(qualifications.iter().all(|q| q.reuse_ready == ready), "status {:?}", status);
        assert_eq!(qualifications[1].reuse_value, REUSE_DISQUALIFIED);
    }
}

#[test]
fn test_qualifyDocument_withSchemeMarkers_shouldUseSchemeAttributes() {
    let scheme = ReuseScheme::parse(
        "/reuse-scheme.properties",
        b"reuse.marker.rid = x:id\nreuse.status.released = Approved\n",
    )
    .unwrap();
    let rules = rules().with_scheme(&scheme);
    let doc = walk(br#"<doc x:id="1"><p x:id="2"/><p cms:rid="3"/></doc>"#).unwrap();

    let qualifications = qualify_document(&doc, &rules, &MarkerExpectation::Stamped, Some("Approved"));
    let values: Vec<i64> = qualifications.iter().map(|q| q.reuse_value).collect();
    assert_eq!(values, vec![-1, 1, -2]);
    assert!(qualifications[0].reuse_ready);
}
