/*!
 * Element identity and tree location.
 *
 * An `IdentityAssigner` is the per-document context: it is started for one
 * walked document and one `{repository, item_path, revision}` and can only
 * answer for nodes of that walk.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::StateError;
use crate::xml::{ElementNode, XmlDocument};

/// The versioned item a document was read from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemContext {
    /// Repository name
    pub repository: String,
    /// Repository-relative path, starting with '/'
    pub item_path: String,
    /// Revision the content was read at
    pub revision: u64,
}

impl ItemContext {
    pub fn new(repository: impl Into<String>, item_path: impl Into<String>, revision: u64) -> Self {
        Self {
            repository: repository.into(),
            item_path: item_path.into(),
            revision,
        }
    }
}

impl fmt::Display for ItemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}^{}?p={}", self.repository, self.item_path, self.revision)
    }
}

/// Dot-separated sibling positions from the root, e.g. `1.2.1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location(String);

impl Location {
    fn root() -> Self {
        Location("1".to_string())
    }

    fn child(&self, position: u32) -> Self {
        Location(format!("{}.{}", self.0, position))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of levels, 1 for the root
    pub fn depth(&self) -> usize {
        self.0.split('.').count()
    }

    /// Location of the parent, `None` for the root
    pub fn parent(&self) -> Option<Location> {
        self.0.rfind('.').map(|i| Location(self.0[..i].to_string()))
    }

    /// Strict ancestry by location prefix
    pub fn is_ancestor_of(&self, other: &Location) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'.'
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Globally addressable element identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementIdentity {
    pub repository: String,
    pub item_path: String,
    pub revision: u64,
    /// Zero-based depth-first visitation index
    pub ordinal: usize,
}

impl fmt::Display for ElementIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}^{}?p={}#{}",
            self.repository, self.item_path, self.revision, self.ordinal
        )
    }
}

impl FromStr for ElementIdentity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || anyhow::anyhow!("Invalid element identity: {}", s);

        let (repository, rest) = s.split_once('^').ok_or_else(invalid)?;
        let (rest, ordinal) = rest.rsplit_once('#').ok_or_else(invalid)?;
        let (item_path, revision) = rest.rsplit_once("?p=").ok_or_else(invalid)?;
        if repository.is_empty() || item_path.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            repository: repository.to_string(),
            item_path: item_path.to_string(),
            revision: revision.parse().map_err(|_| invalid())?,
            ordinal: ordinal.parse().map_err(|_| invalid())?,
        })
    }
}

/// Identity and location assignment for one walked document
pub struct IdentityAssigner<'d> {
    context: ItemContext,
    document: &'d XmlDocument,
    locations: Vec<Location>,
}

impl<'d> IdentityAssigner<'d> {
    /// Start assignment for a document, resetting the ordinal counter
    pub fn start(context: ItemContext, document: &'d XmlDocument) -> Self {
        let mut locations: Vec<Location> = Vec::with_capacity(document.len());
        for node in document.nodes() {
            // parents precede their children in the arena
            let location = match node.parent {
                Some(parent) => locations[parent].child(node.position),
                None => Location::root(),
            };
            locations.push(location);
        }

        Self {
            context,
            document,
            locations,
        }
    }

    pub fn context(&self) -> &ItemContext {
        &self.context
    }

    /// Tree location of a node of this document
    pub fn location_of(&self, node: &ElementNode) -> Result<&Location, StateError> {
        self.check(node)?;
        Ok(&self.locations[node.id])
    }

    /// Element identity of a node of this document
    pub fn id_of(&self, node: &ElementNode) -> Result<ElementIdentity, StateError> {
        self.check(node)?;
        Ok(ElementIdentity {
            repository: self.context.repository.clone(),
            item_path: self.context.item_path.clone(),
            revision: self.context.revision,
            ordinal: node.id,
        })
    }

    fn check(&self, node: &ElementNode) -> Result<(), StateError> {
        if node.walk_id() != self.document.walk_id() {
            return Err(StateError::ForeignDocument {
                expected: self.document.walk_id(),
                actual: node.walk_id(),
            });
        }
        if node.id >= self.locations.len() {
            return Err(StateError::UnknownNode(node.id));
        }
        Ok(())
    }
}
