//! Marker transfer from matched old nodes onto the new tree.

use std::collections::HashMap;

use crate::tree::{Node, NodeId, Tree};

/// Annotation whose anchor text could not be located in the new document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UnplacedComment {
    /// Marker reference id (`ac:ref`).
    pub ref_id: String,
    /// Trimmed text span the marker wrapped.
    pub text: String,
}

/// Moves comment markers onto matched new nodes, recording failures.
///
/// Matched pairs are processed in document order of the old tree, and the
/// markers under one old node independently in the order they occur. An
/// insertion does not account for text consumed by a previous one, so
/// overlapping anchor text under the same parent can behave unpredictably;
/// known limitation. Markers whose old parent has no mapping entry are never
/// visited here and are silently lost.
pub struct MarkerTransfer {
    unplaced: Vec<UnplacedComment>,
}

impl MarkerTransfer {
    /// Create a transfer tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            unplaced: Vec::new(),
        }
    }

    /// Transfer markers for every matched pair.
    pub fn transfer(&mut self, matches: &HashMap<NodeId, NodeId>, old: &Tree, new: &mut Tree) {
        // Old ids are assigned in document pre-order, so sorting the pairs
        // makes both placement and the unplaced list deterministic.
        let mut pairs: Vec<_> = matches.iter().map(|(&o, &n)| (o, n)).collect();
        pairs.sort_unstable();

        let mut transferred = 0usize;
        for (old_id, new_id) in pairs {
            let markers = old.marker_children(old_id);
            if markers.is_empty() {
                continue;
            }
            tracing::debug!(count = markers.len(), tag = %old[old_id].tag, "Transferring markers");

            for marker_id in markers {
                if self.transfer_one(&old[marker_id], new, new_id) {
                    transferred += 1;
                }
            }
        }
        tracing::info!(count = transferred, "Transferred comment markers");
    }

    /// Markers that could not be placed, in old-document order.
    #[must_use]
    pub fn into_unplaced(self) -> Vec<UnplacedComment> {
        self.unplaced
    }

    fn transfer_one(&mut self, marker: &Node, new: &mut Tree, target: NodeId) -> bool {
        let anchor = marker.text.trim();
        if anchor.is_empty() {
            tracing::debug!(tag = %marker.tag, "Marker has no anchor text, skipping");
            return false;
        }

        let ref_id = marker.marker_ref().unwrap_or("");
        if !ref_id.is_empty() && subtree_has_marker(new, target, ref_id) {
            // Identical revisions: the new document already carries this
            // marker, so there is nothing to move.
            tracing::debug!(marker_ref = %ref_id, "Marker already present in target");
            return true;
        }

        let clone = new.alloc(detached_marker(marker));
        if insert_at_anchor(new, target, clone, anchor) {
            return true;
        }

        let preview: String = anchor.chars().take(50).collect();
        tracing::warn!(marker_text = %preview, "Could not place marker");
        self.unplaced.push(UnplacedComment {
            ref_id: ref_id.to_owned(),
            text: anchor.to_owned(),
        });
        false
    }
}

impl Default for MarkerTransfer {
    fn default() -> Self {
        Self::new()
    }
}

/// Clone tag, attributes and direct text; tail and children start empty.
fn detached_marker(marker: &Node) -> Node {
    Node::new(marker.tag.clone())
        .with_text(marker.text.clone())
        .with_attrs(marker.attrs.clone())
}

/// Whether the subtree under `node` already contains a marker with `ref_id`.
fn subtree_has_marker(tree: &Tree, node: NodeId, ref_id: &str) -> bool {
    let n = &tree[node];
    if n.is_comment_marker() && n.marker_ref() == Some(ref_id) {
        return true;
    }
    n.children
        .iter()
        .any(|&child| subtree_has_marker(tree, child, ref_id))
}

/// Depth-first pre-order insertion of `marker` at the first occurrence of
/// `anchor`: the node's direct text first, then each non-marker child's tail
/// (splicing between siblings), then the child's subtree. A failed descent
/// falls through to later siblings.
fn insert_at_anchor(tree: &mut Tree, node: NodeId, marker: NodeId, anchor: &str) -> bool {
    if let Some((before, after)) = split_once_at(&tree[node].text, anchor) {
        tree[node].text = before;
        tree[marker].tail = after;
        tree[node].children.insert(0, marker);
        tracing::debug!(tag = %tree[node].tag, "Inserted marker in direct text");
        return true;
    }

    let mut i = 0;
    while i < tree[node].children.len() {
        let child = tree[node].children[i];
        if tree[child].is_comment_marker() {
            i += 1;
            continue;
        }

        if let Some((before, after)) = split_once_at(&tree[child].tail, anchor) {
            tree[child].tail = before;
            tree[marker].tail = after;
            tree[node].children.insert(i + 1, marker);
            tracing::debug!(tag = %tree[child].tag, "Inserted marker after sibling");
            return true;
        }

        if tree.content_text(child).contains(anchor) && insert_at_anchor(tree, child, marker, anchor)
        {
            return true;
        }

        i += 1;
    }

    false
}

/// Split at the first occurrence of `anchor`, returning the text before and
/// after it.
fn split_once_at(text: &str, anchor: &str) -> Option<(String, String)> {
    text.find(anchor)
        .map(|idx| (text[..idx].to_owned(), text[idx + anchor.len()..].to_owned()))
}
