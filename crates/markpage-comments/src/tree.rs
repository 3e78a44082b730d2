//! Arena tree representation for storage-format documents.
//!
//! Both document revisions are parsed into a [`Tree`]: a flat arena of
//! [`Node`]s addressed by [`NodeId`]. Ids are assigned in document pre-order
//! during parsing, so sorting ids recovers document order. All cross-tree
//! bookkeeping (the match mapping, marker transfer) works on ids instead of
//! node references, which keeps marker splicing a local mutation.

use std::ops::{Index, IndexMut};

/// Confluence `ac:` namespace URI.
pub const AC_NAMESPACE: &str = "http://www.atlassian.com/schema/confluence/4/ac/";

/// Confluence `ri:` namespace URI.
pub const RI_NAMESPACE: &str = "http://www.atlassian.com/schema/confluence/4/ri/";

/// Unqualified tag of an inline comment marker element.
const MARKER_TAG: &str = "inline-comment-marker";

/// Prefixed form of the marker reference attribute.
const MARKER_REF_ATTR: &str = "ac:ref";

/// Handle to a node inside a [`Tree`].
///
/// Only valid for the tree that allocated it; carries no meaning across
/// `preserve` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A single element: tag, direct text, tail text, attributes and children.
///
/// `text` is the character data immediately inside the element before its
/// first child; `tail` is the character data after the element's closing tag
/// but before the next sibling. The split matters: markers are spliced either
/// into a parent's leading text or between two siblings.
#[derive(Debug, Clone, Default)]
pub struct Node {
    /// Element tag, possibly carrying a namespace prefix.
    pub tag: String,
    /// Direct text content.
    pub text: String,
    /// Text between this element's end tag and the next sibling.
    pub tail: String,
    /// Attributes in document order.
    pub attrs: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<NodeId>,
}

impl Node {
    /// Create a node with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Set direct text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set all attributes at once.
    #[must_use]
    pub fn with_attrs(mut self, attrs: Vec<(String, String)>) -> Self {
        self.attrs = attrs;
        self
    }

    /// Look up an attribute value by exact name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether this element is an inline comment marker.
    ///
    /// Matches the unqualified tag as a suffix, which covers the bare,
    /// prefixed (`ac:`) and URI-expanded (`{...}`) spellings.
    #[must_use]
    pub fn is_comment_marker(&self) -> bool {
        self.tag.ends_with(MARKER_TAG)
    }

    /// The marker's reference id, from the prefixed or URI-expanded attribute.
    #[must_use]
    pub fn marker_ref(&self) -> Option<&str> {
        self.attr(MARKER_REF_ATTR).or_else(|| {
            self.attrs
                .iter()
                .find(|(key, _)| key.ends_with("}ref"))
                .map(|(_, value)| value.as_str())
        })
    }
}

/// Owning arena for one parsed document.
///
/// The node allocated first (id 0) is the synthetic wrapper element added by
/// the parser; it never appears in serialized output.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a detached node and return its id.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Allocate a node and attach it as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.alloc(node);
        self[parent].children.push(id);
        id
    }

    /// Id of the synthetic root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        debug_assert!(!self.nodes.is_empty(), "tree has no root");
        NodeId(0)
    }

    /// Normalized text of a node and all its descendants, used for matching.
    ///
    /// Each text and tail segment is trimmed, empty segments are dropped, and
    /// the remainder is joined with single spaces. The node's own tail is
    /// included, mirroring how the similarity comparison sees sibling flow.
    #[must_use]
    pub fn text_signature(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        self.signature_parts(id, &mut parts);
        parts.join(" ")
    }

    fn signature_parts<'a>(&'a self, id: NodeId, parts: &mut Vec<&'a str>) {
        let node = &self[id];

        let text = node.text.trim();
        if !text.is_empty() {
            parts.push(text);
        }
        for &child in &node.children {
            self.signature_parts(child, parts);
        }
        let tail = node.tail.trim();
        if !tail.is_empty() {
            parts.push(tail);
        }
    }

    /// Untrimmed content of a node excluding its own tail: direct text plus
    /// the signatures of its children. Used as the gate before descending
    /// during marker insertion.
    #[must_use]
    pub fn content_text(&self, id: NodeId) -> String {
        let node = &self[id];
        let mut content = node.text.clone();
        for &child in &node.children {
            content.push_str(&self.text_signature(child));
        }
        content
    }

    /// Ids of the comment-marker children directly under `id`.
    #[must_use]
    pub fn marker_children(&self, id: NodeId) -> Vec<NodeId> {
        self[id]
            .children
            .iter()
            .copied()
            .filter(|&child| self[child].is_comment_marker())
            .collect()
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}
