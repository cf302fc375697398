/*!
 * Element arena produced by the tree walker.
 *
 * Nodes are stored in document order (preorder, depth-first). Parent and
 * sibling links are arena indices, so the tree owns no cycles and the
 * descendants of a node always occupy the contiguous range after it.
 */

use std::ops::Range;

/// Index of an element in its document arena
pub type NodeId = usize;

/// One attribute as written in the start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name, prefix preserved
    pub name: String,
    /// Unescaped value
    pub value: String,
}

/// One element occurrence
#[derive(Debug, Clone)]
pub struct ElementNode {
    /// Arena index, equal to the depth-first visitation order
    pub id: NodeId,
    /// Qualified tag name
    pub name: String,
    /// Attributes in document order, namespace declarations included
    pub attributes: Vec<Attribute>,
    /// Exact markup of the element and its subtree
    pub source: String,
    /// 1 for the root
    pub depth: u32,
    /// 1-based index among element siblings
    pub position: u32,
    /// Parent element, `None` iff `depth == 1`
    pub parent: Option<NodeId>,
    /// Preceding element sibling, `None` iff `position == 1`
    pub preceding_sibling: Option<NodeId>,
    /// Namespace bindings in scope on this element, `(prefix, uri)`, empty prefix for the default namespace
    pub namespaces: Vec<(String, String)>,
    pub(crate) walk_id: u64,
    pub(crate) subtree_end: NodeId,
    pub(crate) text: Range<usize>,
}

impl ElementNode {
    /// Value of an attribute by qualified name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Whether this is the document root
    pub fn is_root(&self) -> bool {
        self.depth == 1
    }

    /// Token of the walk that produced this node
    pub fn walk_id(&self) -> u64 {
        self.walk_id
    }
}

/// A walked document: the element arena plus the decoded character data
#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub(crate) walk_id: u64,
    pub(crate) nodes: Vec<ElementNode>,
    pub(crate) text: String,
}

impl XmlDocument {
    /// Token identifying this walk, unique within the process
    pub fn walk_id(&self) -> u64 {
        self.walk_id
    }

    /// The root element
    pub fn root(&self) -> &ElementNode {
        // walk() never builds an empty document
        &self.nodes[0]
    }

    /// All elements in document order
    pub fn nodes(&self) -> &[ElementNode] {
        &self.nodes
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a walked document, present for API symmetry
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Element by arena index
    pub fn node(&self, id: NodeId) -> Option<&ElementNode> {
        self.nodes.get(id)
    }

    /// Parent of an element
    pub fn parent(&self, id: NodeId) -> Option<&ElementNode> {
        self.nodes.get(id)?.parent.map(|p| &self.nodes[p])
    }

    /// Direct element children in document order
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let end = self.nodes.get(id).map_or(id, |n| n.subtree_end);
        Children {
            document: self,
            next: id + 1,
            end,
        }
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &ElementNode> {
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        std::iter::from_fn(move || {
            let node = &self.nodes[current?];
            current = node.parent;
            Some(node)
        })
    }

    /// Strict ancestry: `ancestor` is on the parent chain of `node`
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a.id == ancestor)
    }

    /// Strict descent: `node` is below `ancestor`
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        self.is_ancestor_of(ancestor, node)
    }

    /// Attribute value of an element
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(id)?.attribute(name)
    }

    /// Unescaped character data of the element's subtree
    pub fn text_of(&self, id: NodeId) -> &str {
        self.nodes
            .get(id)
            .map_or("", |n| &self.text[n.text.clone()])
    }
}

/// Iterator over the element children of a node
pub struct Children<'a> {
    document: &'a XmlDocument,
    next: NodeId,
    end: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a ElementNode;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let node = &self.document.nodes[self.next];
        self.next = node.subtree_end;
        Some(node)
    }
}
