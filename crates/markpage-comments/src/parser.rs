//! Storage-format parser with Confluence namespace handling.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::entities::expand_entities;
use crate::error::PreserveError;
use crate::tree::{AC_NAMESPACE, Node, NodeId, RI_NAMESPACE, Tree};

/// Tag of the synthetic wrapper element.
const SYNTHETIC_ROOT: &str = "root";

/// Parse a storage-format fragment into a [`Tree`].
///
/// The fragment is wrapped in a synthetic root that declares the `ac:` and
/// `ri:` prefixes, so prefixed tags parse without per-document namespace
/// declarations. Named HTML entities outside the XML base set are expanded
/// first; fragments need not have a single root element.
///
/// # Errors
///
/// Returns [`PreserveError`] if the fragment is not well-formed XML after
/// entity expansion and wrapping.
pub fn parse(html: &str) -> Result<Tree, PreserveError> {
    let html = expand_entities(html);
    let wrapped = format!(
        r#"<{SYNTHETIC_ROOT} xmlns:ac="{AC_NAMESPACE}" xmlns:ri="{RI_NAMESPACE}">{html}</{SYNTHETIC_ROOT}>"#
    );

    let mut reader = Reader::from_str(&wrapped);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = true;

    let mut tree = Tree::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let node = element_node(&reader, &e)?;
                let id = match stack.last() {
                    Some(&parent) => tree.add_child(parent, node),
                    None => tree.alloc(node),
                };
                stack.push(id);
            }
            Event::Empty(e) => {
                let node = element_node(&reader, &e)?;
                if let Some(&parent) = stack.last() {
                    tree.add_child(parent, node);
                } else {
                    tree.alloc(node);
                }
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                append_text(&mut tree, &stack, &text);
            }
            Event::GeneralRef(e) => {
                let name = reader.decoder().decode(&e)?;
                let text = resolve_reference(&name);
                append_text(&mut tree, &stack, &text);
            }
            Event::CData(e) => {
                // Verbatim content: no unescaping of any kind.
                let text = String::from_utf8_lossy(&e).into_owned();
                append_text(&mut tree, &stack, &text);
            }
            Event::End(_) => {
                stack.pop();
                if stack.is_empty() {
                    break; // synthetic root closed
                }
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }

    Ok(tree)
}

/// Build a node from a start or empty-element event.
fn element_node<R: BufRead>(reader: &Reader<R>, e: &BytesStart) -> Result<Node, PreserveError> {
    let tag = reader.decoder().decode(e.name().as_ref())?.into_owned();
    let mut node = Node::new(tag);

    for attr in e.attributes() {
        let attr = attr?;
        let key = reader.decoder().decode(attr.key.as_ref())?.into_owned();
        if key.starts_with("xmlns") {
            continue; // wrapper-level declarations, not document data
        }
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            std::borrow::Cow::into_owned,
        );
        node.attrs.push((key, value));
    }

    Ok(node)
}

/// Character data lands in the open element's text, or in the tail of its
/// most recent child once one exists.
fn append_text(tree: &mut Tree, stack: &[NodeId], text: &str) {
    let Some(&parent) = stack.last() else {
        return;
    };
    if let Some(&last) = tree[parent].children.last() {
        tree[last].tail.push_str(text);
    } else {
        tree[parent].text.push_str(text);
    }
}

/// Resolve a general entity reference event to literal text.
///
/// The base five and numeric character references resolve here; anything
/// else survives as literal `&name;` text.
fn resolve_reference(name: &str) -> String {
    match name {
        "amp" => "&".to_owned(),
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "quot" => "\"".to_owned(),
        "apos" => "'".to_owned(),
        numeric if numeric.starts_with('#') => {
            let code = if let Some(hex) = numeric[1..].strip_prefix(['x', 'X']) {
                u32::from_str_radix(hex, 16).ok()
            } else {
                numeric[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{name};"), String::from)
        }
        other => format!("&{other};"),
    }
}
