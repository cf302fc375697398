use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Application configuration module
/// This module handles loading and validating the indexing configuration.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Reuse and translation linkage settings
    #[serde(default)]
    pub reuse: ReuseConfig,

    /// Revision indexing settings
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Property and attribute names used by the reuse computation
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReuseConfig {
    /// Item property holding the release status
    #[serde(default = "default_status_property")]
    pub status_property: String,

    /// Status value that makes an item reuse-ready
    #[serde(default = "default_release_status")]
    pub release_status: String,

    /// Element attribute carrying the reuse id marker
    #[serde(default = "default_rid_attribute")]
    pub rid_attribute: String,

    /// Element attribute carrying the logical id
    #[serde(default = "default_logical_id_attribute")]
    pub logical_id_attribute: String,

    /// Item property referencing the translation master
    #[serde(default = "default_master_property")]
    pub master_property: String,

    /// Item property holding the translation locale
    #[serde(default = "default_locale_property")]
    pub locale_property: String,

    /// File name of the per-project and repository-root reuse scheme
    #[serde(default = "default_scheme_file_name")]
    pub scheme_file_name: String,
}

impl Default for ReuseConfig {
    fn default() -> Self {
        Self {
            status_property: default_status_property(),
            release_status: default_release_status(),
            rid_attribute: default_rid_attribute(),
            logical_id_attribute: default_logical_id_attribute(),
            master_property: default_master_property(),
            locale_property: default_locale_property(),
            scheme_file_name: default_scheme_file_name(),
        }
    }
}

/// Settings for revision-by-revision indexing
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IndexingConfig {
    /// Items enriched concurrently within one revision
    #[serde(default = "default_concurrent_items")]
    pub concurrent_items: usize,

    /// Revision to start from when nothing has been indexed yet
    #[serde(default)]
    pub first_revision: u64,

    /// History ledger database file, platform data directory when unset
    #[serde(default)]
    pub database_path: Option<String>,

    /// File extensions treated as XML
    #[serde(default = "default_xml_extensions")]
    pub xml_extensions: Vec<String>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            concurrent_items: default_concurrent_items(),
            first_revision: 0,
            database_path: None,
            xml_extensions: default_xml_extensions(),
        }
    }
}

impl IndexingConfig {
    /// Whether a path has one of the configured XML extensions
    pub fn is_xml_path(&self, path: &str) -> bool {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((_, extension)) => self
                .xml_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(extension)),
            None => false,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_status_property() -> String {
    "cms:status".to_string()
}

fn default_release_status() -> String {
    "Released".to_string()
}

fn default_rid_attribute() -> String {
    "cms:rid".to_string()
}

fn default_logical_id_attribute() -> String {
    "cms:rlogicalid".to_string()
}

fn default_master_property() -> String {
    "abx:TranslationMaster".to_string()
}

fn default_locale_property() -> String {
    "abx:TranslationLocale".to_string()
}

fn default_scheme_file_name() -> String {
    "reuse-scheme.properties".to_string()
}

fn default_concurrent_items() -> usize {
    4
}

fn default_xml_extensions() -> Vec<String> {
    vec!["xml".to_string(), "dita".to_string(), "ditamap".to_string()]
}

impl Config {
    /// Load a configuration file, applying defaults for missing fields
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let reuse = &self.reuse;
        let required = [
            ("reuse.status_property", &reuse.status_property),
            ("reuse.release_status", &reuse.release_status),
            ("reuse.rid_attribute", &reuse.rid_attribute),
            ("reuse.logical_id_attribute", &reuse.logical_id_attribute),
            ("reuse.master_property", &reuse.master_property),
            ("reuse.locale_property", &reuse.locale_property),
            ("reuse.scheme_file_name", &reuse.scheme_file_name),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(anyhow!("Configuration value {} must not be empty", name));
            }
        }

        if reuse.rid_attribute == reuse.logical_id_attribute {
            return Err(anyhow!(
                "Reuse id and logical id attributes must differ (both '{}')",
                reuse.rid_attribute
            ));
        }

        if reuse.scheme_file_name.contains('/') {
            return Err(anyhow!(
                "Scheme file name must be a plain file name: {}",
                reuse.scheme_file_name
            ));
        }

        if self.indexing.concurrent_items == 0 {
            return Err(anyhow!("indexing.concurrent_items must be at least 1"));
        }

        if self.indexing.xml_extensions.is_empty() {
            return Err(anyhow!("indexing.xml_extensions must list at least one extension"));
        }

        Ok(())
    }
}
