/*!
 * Reuse scheme: a properties document that overrides the reuse rules for a
 * project or a whole repository.
 *
 * ```text
 * # reuse-scheme.properties
 * reuse.status.property = cms:status
 * reuse.status.released = Released
 * reuse.marker.rid = cms:rid
 * reuse.marker.logicalid = cms:rlogicalid
 * ```
 */

use log::debug;

use crate::app_config::ReuseConfig;
use crate::errors::SchemeError;

const KEY_STATUS_PROPERTY: &str = "reuse.status.property";
const KEY_STATUS_RELEASED: &str = "reuse.status.released";
const KEY_MARKER_RID: &str = "reuse.marker.rid";
const KEY_MARKER_LOGICAL_ID: &str = "reuse.marker.logicalid";

/// Effective rules for computing reuse fields of one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReuseRules {
    pub status_property: String,
    pub release_status: String,
    pub rid_attribute: String,
    pub logical_id_attribute: String,
}

impl From<&ReuseConfig> for ReuseRules {
    fn from(config: &ReuseConfig) -> Self {
        Self {
            status_property: config.status_property.clone(),
            release_status: config.release_status.clone(),
            rid_attribute: config.rid_attribute.clone(),
            logical_id_attribute: config.logical_id_attribute.clone(),
        }
    }
}

impl ReuseRules {
    /// Apply the values a scheme sets on top of these rules
    pub fn with_scheme(mut self, scheme: &ReuseScheme) -> Self {
        if let Some(v) = &scheme.status_property {
            self.status_property = v.clone();
        }
        if let Some(v) = &scheme.release_status {
            self.release_status = v.clone();
        }
        if let Some(v) = &scheme.rid_attribute {
            self.rid_attribute = v.clone();
        }
        if let Some(v) = &scheme.logical_id_attribute {
            self.logical_id_attribute = v.clone();
        }
        self
    }
}

/// A parsed reuse scheme document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReuseScheme {
    /// Path the scheme was read from
    pub path: String,
    pub status_property: Option<String>,
    pub release_status: Option<String>,
    pub rid_attribute: Option<String>,
    pub logical_id_attribute: Option<String>,
}

impl ReuseScheme {
    /// Parse a scheme document
    pub fn parse(path: &str, content: &[u8]) -> Result<Self, SchemeError> {
        let text = std::str::from_utf8(content).map_err(|e| SchemeError::Malformed {
            path: path.to_string(),
            line: 0,
            message: format!("not valid UTF-8: {}", e),
        })?;

        let mut scheme = ReuseScheme {
            path: path.to_string(),
            ..Default::default()
        };

        for (index, line) in text.lines().enumerate() {
            let malformed = |message: &str| SchemeError::Malformed {
                path: path.to_string(),
                line: index + 1,
                message: message.to_string(),
            };

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let Some(split) = line.find(['=', ':']) else {
                return Err(malformed("expected 'key = value'"));
            };
            let key = line[..split].trim();
            let value = line[split + 1..].trim();
            if key.is_empty() {
                return Err(malformed("empty key"));
            }
            if value.is_empty() {
                return Err(malformed("empty value"));
            }

            let slot = match key {
                KEY_STATUS_PROPERTY => &mut scheme.status_property,
                KEY_STATUS_RELEASED => &mut scheme.release_status,
                KEY_MARKER_RID => &mut scheme.rid_attribute,
                KEY_MARKER_LOGICAL_ID => &mut scheme.logical_id_attribute,
                _ => {
                    debug!("Ignoring unknown key '{}' in reuse scheme {}", key, path);
                    continue;
                }
            };
            *slot = Some(value.to_string());
        }

        Ok(scheme)
    }
}

/// Candidate scheme paths for an item, most specific first
pub fn scheme_candidates(item_path: &str, file_name: &str) -> Vec<String> {
    let mut candidates = Vec::with_capacity(2);
    let trimmed = item_path.trim_start_matches('/');
    if let Some((project, _)) = trimmed.split_once('/') {
        if !project.is_empty() {
            candidates.push(format!("/{}/{}", project, file_name));
        }
    }
    candidates.push(format!("/{}", file_name));
    candidates
}
