/*!
 * Tests for application configuration functionality
 */

use reposxml::app_config::{Config, LogLevel};
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.reuse.status_property, "cms:status");
    assert_eq!(config.reuse.release_status, "Released");
    assert_eq!(config.reuse.rid_attribute, "cms:rid");
    assert_eq!(config.reuse.logical_id_attribute, "cms:rlogicalid");
    assert_eq!(config.reuse.master_property, "abx:TranslationMaster");
    assert_eq!(config.reuse.locale_property, "abx:TranslationLocale");
    assert_eq!(config.indexing.concurrent_items, 4);
    assert_eq!(config.indexing.first_revision, 0);
    assert!(config.indexing.database_path.is_none());
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_deserialize_withPartialJson_shouldFillDefaults() {
    let json = r#"{ "reuse": { "release_status": "Approved" }, "indexing": { "first_revision": 3 }, "log_level": "debug" }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.reuse.release_status, "Approved");
    assert_eq!(config.reuse.rid_attribute, "cms:rid");
    assert_eq!(config.indexing.first_revision, 3);
    assert_eq!(config.indexing.concurrent_items, 4);
    assert_eq!(config.log_level, LogLevel::Debug);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    config.reuse.release_status = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.reuse.logical_id_attribute = config.reuse.rid_attribute.clone();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.reuse.scheme_file_name = "conf/reuse.properties".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.indexing.concurrent_items = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.indexing.xml_extensions.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_isXmlPath_shouldMatchConfiguredExtensions() {
    let config = Config::default();
    assert!(config.indexing.is_xml_path("/vvab/xml/doc.xml"));
    assert!(config.indexing.is_xml_path("/vvab/map.DITAMAP"));
    assert!(!config.indexing.is_xml_path("/vvab/image.png"));
    assert!(!config.indexing.is_xml_path("/vvab.xml/README"));
}

#[test]
fn test_fromFile_withValidFile_shouldLoad() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");
    std::fs::write(&path, r#"{ "indexing": { "concurrent_items": 2 } }"#)?;

    let config = Config::from_file(&path)?;
    assert_eq!(config.indexing.concurrent_items, 2);
    Ok(())
}

#[test]
fn test_fromFile_withInvalidJson_shouldFail() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json")?;

    assert!(Config::from_file(&path).is_err());
    assert!(Config::from_file(dir.path().join("missing.json")).is_err());
    Ok(())
}

#[test]
fn test_logLevel_shouldMapToLevelFilter() {
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}
