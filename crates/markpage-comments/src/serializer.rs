//! Storage-format serializer with verbatim body handling.

use std::fmt::Write;

use crate::tree::{NodeId, Tree};

/// Tag suffix of elements whose text content must stay literal.
const VERBATIM_TAG: &str = "plain-text-body";

/// Render the tree back to storage format.
///
/// The synthetic root never appears in the output; its leading text and its
/// children are emitted directly. Verbatim bodies (`ac:plain-text-body`)
/// write their text as a CDATA block, so reserved characters inside code or
/// macro source come back exactly as they went in.
#[must_use]
pub fn serialize(tree: &Tree) -> String {
    let mut out = String::with_capacity(4096);
    let root = tree.root();

    if !tree[root].text.is_empty() {
        out.push_str(&escape_text(&tree[root].text));
    }
    for &child in &tree[root].children {
        serialize_node(tree, child, &mut out);
    }
    out
}

fn serialize_node(tree: &Tree, id: NodeId, out: &mut String) {
    let node = &tree[id];

    out.push('<');
    out.push_str(&node.tag);
    for (key, value) in &node.attrs {
        write!(out, r#" {key}="{}""#, escape_attr(value)).unwrap();
    }

    if node.text.is_empty() && node.children.is_empty() {
        out.push_str(" />");
    } else {
        out.push('>');
        if !node.text.is_empty() {
            if node.tag.ends_with(VERBATIM_TAG) {
                write!(out, "<![CDATA[{}]]>", node.text).unwrap();
            } else {
                out.push_str(&escape_text(&node.text));
            }
        }
        for &child in &node.children {
            serialize_node(tree, child, out);
        }
        write!(out, "</{}>", node.tag).unwrap();
    }

    if !node.tail.is_empty() {
        out.push_str(&escape_text(&node.tail));
    }
}

fn escape_text(text: &str) -> String {
    escape_xml(text, false)
}

fn escape_attr(text: &str) -> String {
    escape_xml(text, true)
}

fn escape_xml(text: &str, escape_quotes: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if escape_quotes => escaped.push_str("&quot;"),
            '\'' if escape_quotes => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::tree::{Node, Tree};

    #[test]
    fn serializes_simple_element() {
        let mut tree = Tree::new();
        let root = tree.alloc(Node::new("root"));
        tree.add_child(root, Node::new("p").with_text("Hello"));

        assert_eq!(serialize(&tree), "<p>Hello</p>");
    }

    #[test]
    fn serializes_children_and_tails() {
        let mut tree = Tree::new();
        let root = tree.alloc(Node::new("root"));
        let p = tree.add_child(root, Node::new("p"));
        let strong = tree.add_child(p, Node::new("strong").with_text("Bold"));
        tree[strong].tail = " text".to_owned();

        assert_eq!(serialize(&tree), "<p><strong>Bold</strong> text</p>");
    }

    #[test]
    fn serializes_empty_elements_self_closed() {
        let mut tree = Tree::new();
        let root = tree.alloc(Node::new("root"));
        let p = tree.add_child(root, Node::new("p").with_text("Before"));
        let br = tree.add_child(p, Node::new("br"));
        tree[br].tail = "After".to_owned();

        assert_eq!(serialize(&tree), "<p>Before<br />After</p>");
    }

    #[test]
    fn serializes_attributes_in_order() {
        let mut tree = Tree::new();
        let root = tree.alloc(Node::new("root"));
        tree.add_child(
            root,
            Node::new("ac:inline-comment-marker")
                .with_text("marked")
                .with_attrs(vec![("ac:ref".to_owned(), "abc".to_owned())]),
        );

        assert_eq!(
            serialize(&tree),
            r#"<ac:inline-comment-marker ac:ref="abc">marked</ac:inline-comment-marker>"#
        );
    }

    #[test]
    fn escapes_reserved_characters() {
        let mut tree = Tree::new();
        let root = tree.alloc(Node::new("root"));
        tree.add_child(
            root,
            Node::new("p")
                .with_text("a < b & c > d")
                .with_attrs(vec![("title".to_owned(), r#"say "hi""#.to_owned())]),
        );

        assert_eq!(
            serialize(&tree),
            r#"<p title="say &quot;hi&quot;">a &lt; b &amp; c &gt; d</p>"#
        );
    }

    #[test]
    fn verbatim_body_emits_cdata() {
        let mut tree = Tree::new();
        let root = tree.alloc(Node::new("root"));
        tree.add_child(
            root,
            Node::new("ac:plain-text-body").with_text("if (a < b && c > d) { echo \"x\"; }"),
        );

        assert_eq!(
            serialize(&tree),
            "<ac:plain-text-body><![CDATA[if (a < b && c > d) { echo \"x\"; }]]></ac:plain-text-body>"
        );
    }

    #[test]
    fn roundtrips_parsed_fragment() {
        let html = r#"<h1>Title</h1><p>Some <em>styled</em> text</p><ac:structured-macro ac:name="code"><ac:plain-text-body><![CDATA[x < y]]></ac:plain-text-body></ac:structured-macro>"#;
        let tree = parser::parse(html).unwrap();
        assert_eq!(serialize(&tree), html);
    }
}
