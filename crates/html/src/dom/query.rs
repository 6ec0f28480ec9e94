//! Class list manipulation and the handful of tree queries the decorator
//! needs (`closest`, first/all matching descendants, well known elements).

use super::{Document, DomNode};
use anyhow::Error;
use indextree::NodeId;

impl Document {
    /// Class tokens of `node` in attribute order.
    pub fn class_list(&self, node: NodeId) -> Vec<String> {
        self.node(node)
            .map(|data| data.classes().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node).is_some_and(|data| data.has_class(class))
    }

    /// Appends `class` to the class list unless already present. Empty or
    /// whitespace-containing tokens are ignored.
    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if class.is_empty() || class.contains(char::is_whitespace) || self.has_class(node, class) {
            return;
        }
        let joined = match self.attr(node, "class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {class}", existing.trim_end())
            }
            _ => class.to_owned(),
        };
        self.set_attr(node, "class", &joined);
    }

    pub fn add_classes<'name>(&mut self, node: NodeId, classes: impl IntoIterator<Item = &'name str>) {
        for class in classes {
            self.add_class(node, class);
        }
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let remaining: Vec<String> = self
            .class_list(node)
            .into_iter()
            .filter(|token| token != class)
            .collect();
        self.set_attr(node, "class", &remaining.join(" "));
    }

    /// First of `node` and its ancestors matching `pred`.
    pub fn closest(&self, node: NodeId, pred: impl Fn(&DomNode) -> bool) -> Option<NodeId> {
        self.ancestors(node)
            .into_iter()
            .find(|candidate| self.node(*candidate).is_some_and(&pred))
    }

    /// First descendant of `scope` (document order) matching `pred`.
    pub fn find_first(&self, scope: NodeId, pred: impl Fn(&DomNode) -> bool) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|candidate| self.node(*candidate).is_some_and(&pred))
    }

    /// Every descendant of `scope` matching `pred`, in document order.
    pub fn find_all(&self, scope: NodeId, pred: impl Fn(&DomNode) -> bool) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|candidate| self.node(*candidate).is_some_and(&pred))
            .collect()
    }

    /// First element with the given tag anywhere in the document.
    pub fn first_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find_first(self.root(), |data| data.is_element(tag))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.first_by_tag("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.first_by_tag("body")
    }

    /// Returns `<head>`, creating it (and `<html>` if needed) when the tree
    /// was built by hand.
    ///
    /// # Errors
    /// Returns an error if the new element cannot be attached.
    pub fn ensure_head(&mut self) -> Result<NodeId, Error> {
        if let Some(head) = self.head() {
            return Ok(head);
        }
        let html = match self.first_by_tag("html") {
            Some(html) => html,
            None => {
                let html = self.create_element("html");
                self.append_child(self.root(), html)?;
                html
            }
        };
        let head = self.create_element("head");
        match self.children(html).first().copied() {
            Some(first) => self.insert_before(first, head)?,
            None => self.append_child(html, head)?,
        }
        Ok(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn div(doc: &mut Document, parent: NodeId, class: &str) -> NodeId {
        let node = doc.create_element("div");
        if !class.is_empty() {
            doc.set_attr(node, "class", class);
        }
        doc.append_child(parent, node).unwrap();
        node
    }

    #[test]
    fn add_class_skips_duplicates_and_empty_tokens() {
        let mut doc = Document::new();
        let root = doc.root();
        let node = div(&mut doc, root, "hero");
        doc.add_classes(node, ["hero", "", "large", "block"]);
        assert_eq!(doc.class_list(node), vec!["hero", "large", "block"]);
    }

    #[test]
    fn remove_class_keeps_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let node = div(&mut doc, root, "a b c");
        doc.remove_class(node, "b");
        assert_eq!(doc.attr(node, "class"), Some("a c"));
    }

    #[test]
    fn closest_includes_self() {
        let mut doc = Document::new();
        let root = doc.root();
        let outer = div(&mut doc, root, "wrapper");
        let inner = div(&mut doc, outer, "wrapper inner");
        assert_eq!(doc.closest(inner, |data| data.has_class("wrapper")), Some(inner));
        let leaf = div(&mut doc, inner, "");
        assert_eq!(doc.closest(leaf, |data| data.has_class("inner")), Some(inner));
        assert_eq!(doc.closest(leaf, |data| data.has_class("missing")), None);
    }

    #[test]
    fn find_all_is_document_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let first = div(&mut doc, root, "x");
        let nested = div(&mut doc, first, "x");
        let second = div(&mut doc, root, "x");
        assert_eq!(doc.find_all(root, |data| data.has_class("x")), vec![first, nested, second]);
        assert_eq!(doc.find_first(first, |data| data.has_class("x")), Some(nested));
    }

    #[test]
    fn ensure_head_puts_head_first() {
        let mut doc = Document::new();
        let html = doc.create_element("html");
        let body = doc.create_element("body");
        doc.append_child(doc.root(), html).unwrap();
        doc.append_child(html, body).unwrap();

        let head = doc.ensure_head().unwrap();
        assert_eq!(doc.children(html), vec![head, body]);
        assert_eq!(doc.ensure_head().unwrap(), head);
    }
}
