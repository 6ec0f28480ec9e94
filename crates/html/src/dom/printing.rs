use core::fmt;

use super::{Document, DomNode, NodeKind};
use html_escape::{encode_double_quoted_attribute, encode_text};
use indextree::NodeId;

/// Elements that never have children or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is written verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe", "xmp"];

// -----------------------
// Module-scope helpers
// -----------------------

fn write_attrs(out: &mut String, data: &DomNode) {
    for (name, value) in &data.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(value));
        out.push('"');
    }
}

fn write_node(doc: &Document, id: NodeId, out: &mut String, raw_text: bool) {
    let Some(data) = doc.node(id) else {
        return;
    };
    match &data.kind {
        NodeKind::Document => write_children(doc, id, out, false),
        NodeKind::Doctype { name } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeKind::Element { tag } => {
            out.push('<');
            out.push_str(tag);
            write_attrs(out, data);
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            write_children(doc, id, out, RAW_TEXT_ELEMENTS.contains(&tag.as_str()));
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        NodeKind::Text { text } => {
            if raw_text {
                out.push_str(text);
            } else {
                out.push_str(&encode_text(text));
            }
        }
        NodeKind::Comment { text } => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    }
}

fn write_children(doc: &Document, id: NodeId, out: &mut String, raw_text: bool) {
    for child in doc.children(id) {
        write_node(doc, child, out, raw_text);
    }
}

impl Document {
    /// Serializes the whole document.
    pub fn to_html(&self) -> String {
        self.outer_html(self.root())
    }

    /// Serializes `node` including its own tags.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        write_node(self, node, &mut out, false);
        out
    }

    /// Serializes the children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        let raw = self
            .tag(node)
            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
        write_children(self, node, &mut out, raw);
        out
    }
}

impl fmt::Display for Document {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.to_html())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_indent(formatter: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
            for _ in 0..depth {
                formatter.write_str("  ")?;
            }
            Ok(())
        }

        fn fmt_node(
            doc: &Document,
            id: NodeId,
            formatter: &mut fmt::Formatter<'_>,
            depth: usize,
        ) -> fmt::Result {
            let Some(data) = doc.node(id) else {
                return Ok(());
            };
            match &data.kind {
                NodeKind::Document => {
                    write_indent(formatter, depth)?;
                    writeln!(formatter, "#document")?;
                }
                NodeKind::Doctype { name } => {
                    write_indent(formatter, depth)?;
                    writeln!(formatter, "<!DOCTYPE {name}>")?;
                }
                NodeKind::Element { tag } => {
                    write_indent(formatter, depth)?;
                    write!(formatter, "<{tag}")?;
                    for (name, value) in &data.attrs {
                        write!(formatter, " {name}={value:?}")?;
                    }
                    writeln!(formatter, ">")?;
                }
                NodeKind::Text { text } => {
                    // Skip pure-whitespace text nodes for cleaner output
                    if text.trim().is_empty() {
                        return Ok(());
                    }
                    write_indent(formatter, depth)?;
                    writeln!(formatter, "{text:?}")?;
                }
                NodeKind::Comment { text } => {
                    write_indent(formatter, depth)?;
                    writeln!(formatter, "<!--{text}-->")?;
                }
            }
            for child in doc.children(id) {
                fmt_node(doc, child, formatter, depth + 1)?;
            }
            Ok(())
        }

        fmt_node(self, self.root(), formatter, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_attributes_and_void_elements() {
        let mut doc = Document::new();
        let link = doc.create_element("link");
        doc.set_attr(link, "rel", "stylesheet");
        doc.set_attr(link, "href", "/a.css?x=\"1\"");
        doc.append_child(doc.root(), link).unwrap();
        assert_eq!(
            doc.to_html(),
            "<link rel=\"stylesheet\" href=\"/a.css?x=&quot;1&quot;\">"
        );
    }

    #[test]
    fn escapes_text_but_not_script_bodies() {
        let mut doc = Document::new();
        let para = doc.create_element("p");
        let script = doc.create_element("script");
        let text = doc.create_text("a < b & c");
        let code = doc.create_text("if (a < b) {}");
        doc.append_child(doc.root(), para).unwrap();
        doc.append_child(doc.root(), script).unwrap();
        doc.append_child(para, text).unwrap();
        doc.append_child(script, code).unwrap();
        assert_eq!(
            doc.to_html(),
            "<p>a &lt; b &amp; c</p><script>if (a < b) {}</script>"
        );
        assert_eq!(doc.inner_html(script), "if (a < b) {}");
    }
}
