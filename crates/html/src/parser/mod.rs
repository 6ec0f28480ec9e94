//! HTML5 parsing using html5ever.
//!
//! html5ever builds an `RcDom`, which is then copied into the arena
//! [`Document`]. Whitespace-only text is kept so that empty-looking sections
//! and serialization both behave like a browser DOM.

use crate::dom::{Document, NodeKind};
use anyhow::{Context as _, Error};
use html5ever::tendril::TendrilSink as _;
use html5ever::{ParseOpts, parse_document as parse_rc_document};
use indextree::NodeId;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

/// Parses a complete HTML document.
///
/// # Errors
/// Returns an error if the input cannot be read by the parser or the arena
/// rejects an insertion.
pub fn parse_document(html: &str) -> Result<Document, Error> {
    let dom: RcDom = parse_rc_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .context("failed to parse HTML document")?;

    let mut document = Document::new();
    let root = document.root();
    convert_children(&mut document, &dom.document, root)?;
    Ok(document)
}

fn convert_children(doc: &mut Document, rc_node: &Handle, parent: NodeId) -> Result<(), Error> {
    for child in rc_node.children.borrow().iter() {
        convert_node(doc, child, parent)?;
    }
    Ok(())
}

/// Copies one html5ever node (and its subtree) under `parent`.
fn convert_node(doc: &mut Document, rc_node: &Handle, parent: NodeId) -> Result<(), Error> {
    match &rc_node.data {
        RcNodeData::Document => convert_children(doc, rc_node, parent),
        RcNodeData::Doctype { name, .. } => {
            let node = doc.create_node(NodeKind::Doctype {
                name: name.to_string(),
            });
            doc.append_child(parent, node)
        }
        RcNodeData::Text { contents } => {
            let node = doc.create_text(&contents.borrow());
            doc.append_child(parent, node)
        }
        RcNodeData::Comment { contents } => {
            let node = doc.create_node(NodeKind::Comment {
                text: contents.to_string(),
            });
            doc.append_child(parent, node)
        }
        RcNodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let node = doc.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                doc.set_attr(node, &attr.name.local, &attr.value);
            }
            doc.append_child(parent, node)?;
            convert_children(doc, rc_node, node)?;
            // `<template>` children live in a separate fragment.
            if let Some(contents) = template_contents.borrow().as_ref() {
                convert_children(doc, contents, node)?;
            }
            Ok(())
        }
        // Processing instructions have no meaning in HTML documents.
        RcNodeData::ProcessingInstruction { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_into_html_head_body() {
        let doc = parse_document("<!DOCTYPE html><title>x</title><main><div>a</div></main>").unwrap();
        let head = doc.head().unwrap();
        let body = doc.body().unwrap();
        assert_eq!(doc.tag(doc.element_children(head)[0]), Some("title"));
        assert_eq!(doc.tag(doc.element_children(body)[0]), Some("main"));
    }

    #[test]
    fn keeps_attributes_and_whitespace_text() {
        let doc = parse_document("<main><div class=\"hero--large\"> </div></main>").unwrap();
        let div = doc.find_first(doc.root(), |data| data.is_element("div")).unwrap();
        assert_eq!(doc.attr(div, "class"), Some("hero--large"));
        assert!(doc.has_child_nodes(div));
    }

    #[test]
    fn round_trips_body_markup() {
        let source = "<main><div><p>One &amp; two</p><img src=\"/a.png\"></div></main>";
        let doc = parse_document(source).unwrap();
        let main = doc.first_by_tag("main").unwrap();
        assert_eq!(doc.outer_html(main), source);
    }

    #[test]
    fn keeps_template_contents() {
        let source = "<main><template><div class=\"card\">x</div></template></main>";
        let doc = parse_document(source).unwrap();
        let main = doc.first_by_tag("main").unwrap();
        assert_eq!(doc.outer_html(main), source);
        let template = doc.first_by_tag("template").unwrap();
        assert_eq!(doc.class_list(doc.element_children(template)[0]), vec!["card"]);
    }
}
