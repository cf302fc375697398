/*!
 * Field maps handed to the index write path.
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const ID: &str = "id";
pub const REPO: &str = "repo";
pub const PATH: &str = "path";
pub const REV: &str = "rev";
pub const NAME: &str = "name";
pub const POS: &str = "pos";
pub const DEPTH: &str = "depth";
pub const POSITION: &str = "position";
pub const ID_PARENT: &str = "id_parent";
pub const ID_PRECEDING: &str = "id_preceding";
pub const SOURCE: &str = "source";
pub const SOURCE_SHA256: &str = "source_sha256";
pub const TEXT: &str = "text";
pub const REUSE_VALUE: &str = "reusevalue";
pub const REUSE_READY: &str = "reuseready";
pub const TRANSLATION_MASTER: &str = "translation_master";
pub const TRANSLATION_MASTER_REV: &str = "translation_master_rev";
pub const TRANSLATION_LOCALE: &str = "translation_locale";
pub const TRANSLATION_LOCALE_KEY: &str = "translation_locale_key";

const ATTRIBUTE_PREFIX: &str = "a_";
const NAMESPACE_PREFIX: &str = "ns_";
const DEFAULT_NAMESPACE: &str = "ns";

/// Field name of an element attribute
pub fn attribute_field(name: &str) -> String {
    format!("{}{}", ATTRIBUTE_PREFIX, name)
}

/// Field name of an in-scope namespace binding, empty prefix for the default namespace
pub fn namespace_field(prefix: &str) -> String {
    if prefix.is_empty() {
        DEFAULT_NAMESPACE.to_string()
    } else {
        format!("{}{}", NAMESPACE_PREFIX, prefix)
    }
}

/// Ordered field name to value map of one element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, Value>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Insert only when a value is present
    pub fn insert_opt<V: Into<Value>>(&mut self, name: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}
