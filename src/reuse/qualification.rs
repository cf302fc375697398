/*!
 * Element-level reuse qualification.
 *
 * Every element starts out reusable (`1`). An element whose reuse id marker
 * is expected but missing is disqualified (`-2`). An element with
 * disqualified descendants gets the negative count of disqualified elements
 * in its subtree, itself included. Values are folded bottom-up over the
 * arena in reverse document order, so no recursion is involved.
 */

use log::warn;
use serde::Serialize;
use std::collections::HashSet;

use super::scheme::ReuseRules;
use crate::xml::{walk, ElementNode, XmlDocument};

/// Element confirmed reusable
pub const REUSE_CONFIRMED: i64 = 1;

/// Element lost its own reuse id marker
pub const REUSE_DISQUALIFIED: i64 = -2;

/// Reuse fields of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReuseQualification {
    pub reuse_value: i64,
    /// Item status equals the release-approved value
    pub reuse_ready: bool,
}

/// Result of qualifying one node from its children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReuseOutcome {
    pub reuse_value: i64,
    /// Disqualified elements in the subtree, the node included
    pub tally: u32,
}

/// Qualify a node once all of its children are resolved
pub fn compute_reuse(node_disqualified: bool, child_tallies: &[u32]) -> ReuseOutcome {
    outcome(node_disqualified, child_tallies.iter().sum())
}

fn outcome(node_disqualified: bool, below: u32) -> ReuseOutcome {
    let tally = below + u32::from(node_disqualified);
    let reuse_value = if below > 0 {
        -i64::from(tally)
    } else if node_disqualified {
        REUSE_DISQUALIFIED
    } else {
        REUSE_CONFIRMED
    };
    ReuseOutcome { reuse_value, tally }
}

/// Which elements are expected to carry a reuse id marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MarkerExpectation {
    /// Logical ids whose element carried a reuse id in the reference version
    Reference(HashSet<String>),
    /// No reference version: all elements are expected to carry a marker
    /// when the document root carries one
    #[default]
    Stamped,
}

impl MarkerExpectation {
    /// Collect the marked logical ids of a reference version
    pub fn from_reference(reference: &XmlDocument, rules: &ReuseRules) -> Self {
        let ids = reference
            .nodes()
            .iter()
            .filter(|n| marker(n, &rules.rid_attribute).is_some())
            .filter_map(|n| marker(n, &rules.logical_id_attribute))
            .map(str::to_string)
            .collect();
        MarkerExpectation::Reference(ids)
    }

    /// Expectation from the raw bytes of a reference version
    ///
    /// A reference that does not walk falls back to `Stamped`, it never fails
    /// the item being indexed. `origin` names the reference in the warning.
    pub fn from_reference_bytes(origin: &str, reference: &[u8], rules: &ReuseRules) -> Self {
        match walk(reference) {
            Ok(document) => Self::from_reference(&document, rules),
            Err(e) => {
                warn!("{} is unusable as reuse reference: {}", origin, e);
                MarkerExpectation::Stamped
            }
        }
    }

    fn expects(&self, node: &ElementNode, root_marked: bool, rules: &ReuseRules) -> bool {
        match self {
            MarkerExpectation::Reference(ids) => {
                marker(node, &rules.logical_id_attribute).is_some_and(|id| ids.contains(id))
            }
            MarkerExpectation::Stamped => root_marked,
        }
    }
}

fn marker<'n>(node: &'n ElementNode, attribute: &str) -> Option<&'n str> {
    node.attribute(attribute).filter(|v| !v.trim().is_empty())
}

/// Whether an item status makes it reuse-ready
pub fn is_reuse_ready(status: Option<&str>, rules: &ReuseRules) -> bool {
    status == Some(rules.release_status.as_str())
}

/// Qualify every element of a document, indexed like the arena
pub fn qualify_document(
    document: &XmlDocument,
    rules: &ReuseRules,
    expectation: &MarkerExpectation,
    status: Option<&str>,
) -> Vec<ReuseQualification> {
    let reuse_ready = is_reuse_ready(status, rules);
    let root_marked = marker(document.root(), &rules.rid_attribute).is_some();

    let mut below = vec![0u32; document.len()];
    let mut qualifications = vec![
        ReuseQualification {
            reuse_value: REUSE_CONFIRMED,
            reuse_ready,
        };
        document.len()
    ];

    // descendants sit after their ancestors in the arena
    for node in document.nodes().iter().rev() {
        let disqualified = expectation.expects(node, root_marked, rules)
            && marker(node, &rules.rid_attribute).is_none();
        let resolved = outcome(disqualified, below[node.id]);
        qualifications[node.id].reuse_value = resolved.reuse_value;
        if let Some(parent) = node.parent {
            below[parent] += resolved.tally;
        }
    }

    qualifications
}
