/*!
 * Content buffer resolution on top of a `ContentSource`.
 *
 * A missing path resolves to `None`; an existing but empty file resolves to
 * an empty buffer. Any other read failure is returned to the caller.
 */

use log::debug;
use std::sync::Arc;

use super::{ChangedItem, ContentSource, PropertyMap};
use crate::errors::ReadError;

/// Content of one path at one revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBuffer {
    pub path: String,
    pub revision: u64,
    bytes: Vec<u8>,
}

impl ContentBuffer {
    pub fn new(path: impl Into<String>, revision: u64, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            revision,
            bytes,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Resolves buffers of one repository
#[derive(Clone)]
pub struct ContentBufferResolver {
    source: Arc<dyn ContentSource>,
    repository: String,
}

impl ContentBufferResolver {
    pub fn new(source: Arc<dyn ContentSource>, repository: impl Into<String>) -> Self {
        Self {
            source,
            repository: repository.into(),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Resolve a path at a revision
    pub fn resolve(&self, revision: u64, path: &str) -> Result<Option<ContentBuffer>, ReadError> {
        match self.source.read_content(&self.repository, revision, path) {
            Ok(bytes) => Ok(Some(ContentBuffer::new(path, revision, bytes))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve the item as it was at its previous change, if it has one
    pub fn resolve_previous(&self, item: &ChangedItem) -> Result<Option<ContentBuffer>, ReadError> {
        match &item.previous_change {
            Some(previous) => self.resolve(previous.revision, &previous.path),
            None => Ok(None),
        }
    }

    /// Resolve the first candidate path that exists at the revision
    pub fn resolve_first(&self, revision: u64, candidates: &[String]) -> Result<Option<ContentBuffer>, ReadError> {
        for candidate in candidates {
            if let Some(buffer) = self.resolve(revision, candidate)? {
                return Ok(Some(buffer));
            }
            debug!("No '{}' at r{}, trying next candidate", candidate, revision);
        }
        Ok(None)
    }

    /// Versioned properties of a path
    pub fn properties(&self, revision: u64, path: &str) -> Result<Option<PropertyMap>, ReadError> {
        match self.source.read_properties(&self.repository, revision, path) {
            Ok(properties) => Ok(Some(properties)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
