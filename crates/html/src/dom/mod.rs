use anyhow::{Error, anyhow};
use indextree::{Arena, NodeId};
use smallvec::SmallVec;

mod printing;
mod query;
mod shared;

pub use shared::SharedDom;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Doctype { name: String },
    Element { tag: String },
    Text { text: String },
    Comment { text: String },
}

#[derive(Debug, Clone, Default)]
pub struct DomNode {
    pub kind: NodeKind,
    pub attrs: SmallVec<[(String, String); 4]>,
}

impl DomNode {
    pub fn element(tag: &str) -> Self {
        Self {
            kind: NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
            },
            attrs: SmallVec::new(),
        }
    }

    pub fn text(text: &str) -> Self {
        Self {
            kind: NodeKind::Text {
                text: text.to_owned(),
            },
            attrs: SmallVec::new(),
        }
    }

    /// Lowercase tag name for elements, `None` for every other node kind.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag),
            _ => None,
        }
    }

    pub fn is_element(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whitespace separated tokens of the `class` attribute, in order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|token| token == class)
    }
}

/// A mutable document tree. Node ids stay valid for the lifetime of the
/// document; removed nodes simply stop resolving through [`Document::node`].
#[derive(Clone)]
pub struct Document {
    arena: Arena<DomNode>,
    root: NodeId,
}

impl Document {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(DomNode::default());
        Self { arena, root }
    }

    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node data, or `None` when the id was removed.
    pub fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.arena
            .get(id)
            .filter(|node| !node.is_removed())
            .map(|node| node.get())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut DomNode> {
        self.arena
            .get_mut(id)
            .filter(|node| !node.is_removed())
            .map(|node| node.get_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.arena.new_node(DomNode::element(tag))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.arena.new_node(DomNode::text(text))
    }

    pub(crate) fn create_node(&mut self, kind: NodeKind) -> NodeId {
        self.arena.new_node(DomNode {
            kind,
            attrs: SmallVec::new(),
        })
    }

    /// Appends `child` as the last child of `parent`, detaching it from its
    /// previous position first.
    ///
    /// # Errors
    /// Returns an error if either node was removed or `child` is an ancestor
    /// of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        self.ensure_live(parent)?;
        self.ensure_live(child)?;
        parent.checked_append(child, &mut self.arena)?;
        Ok(())
    }

    /// Inserts `sibling` directly after `node`.
    ///
    /// # Errors
    /// Returns an error if either node was removed or the insertion would
    /// create a cycle.
    pub fn insert_after(&mut self, node: NodeId, sibling: NodeId) -> Result<(), Error> {
        self.ensure_live(node)?;
        self.ensure_live(sibling)?;
        node.checked_insert_after(sibling, &mut self.arena)?;
        Ok(())
    }

    /// Inserts `sibling` directly before `node`.
    ///
    /// # Errors
    /// Returns an error if either node was removed or the insertion would
    /// create a cycle.
    pub fn insert_before(&mut self, node: NodeId, sibling: NodeId) -> Result<(), Error> {
        self.ensure_live(node)?;
        self.ensure_live(sibling)?;
        node.checked_insert_before(sibling, &mut self.arena)?;
        Ok(())
    }

    /// Puts `replacement` where `node` was and detaches `node` (without
    /// dropping it, so it can be re-inserted elsewhere).
    ///
    /// # Errors
    /// Returns an error if either node was removed.
    pub fn replace_with(&mut self, node: NodeId, replacement: NodeId) -> Result<(), Error> {
        self.insert_after(node, replacement)?;
        node.detach(&mut self.arena);
        Ok(())
    }

    /// Removes `node` and its whole subtree from the document.
    pub fn remove(&mut self, node: NodeId) {
        if self.contains(node) && node != self.root {
            node.remove_subtree(&mut self.arena);
        }
    }

    fn ensure_live(&self, node: NodeId) -> Result<(), Error> {
        if self.contains(node) {
            Ok(())
        } else {
            Err(anyhow!("node {node:?} is not part of the document"))
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena
            .get(node)
            .filter(|entry| !entry.is_removed())
            .and_then(|entry| entry.parent())
    }

    /// Child nodes in order, including text and comments.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        if !self.contains(node) {
            return Vec::new();
        }
        node.children(&self.arena).collect()
    }

    /// Element children in order.
    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .into_iter()
            .filter(|child| self.node(*child).and_then(DomNode::tag).is_some())
            .collect()
    }

    pub fn has_child_nodes(&self, node: NodeId) -> bool {
        self.contains(node) && node.children(&self.arena).next().is_some()
    }

    /// All nodes below `node` in document order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        if !self.contains(node) {
            return Vec::new();
        }
        node.descendants(&self.arena).skip(1).collect()
    }

    /// `node` followed by its ancestors up to the document root.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        if !self.contains(node) {
            return Vec::new();
        }
        node.ancestors(&self.arena).collect()
    }

    /// Whether the node is reachable from the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.ancestors(node).last().copied() == Some(self.root)
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).and_then(DomNode::tag)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node).and_then(|data| data.attr(name))
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    /// Sets an attribute, replacing any previous value. Non-element nodes are
    /// left untouched.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(data) = self.node_mut(node) else {
            return;
        };
        if data.tag().is_none() {
            return;
        }
        if let Some(slot) = data.attrs.iter_mut().find(|(key, _)| key == name) {
            value.clone_into(&mut slot.1);
        } else {
            data.attrs.push((name.to_owned(), value.to_owned()));
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(data) = self.node_mut(node) {
            data.attrs.retain(|(key, _)| key != name);
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeKind::Text { text }) = self.node(node).map(|data| &data.kind) {
            out.push_str(text);
            return out;
        }
        for child in self.descendants(node) {
            if let Some(NodeKind::Text { text }) = self.node(child).map(|data| &data.kind) {
                out.push_str(text);
            }
        }
        out
    }

    /// Replaces all children of `node` with a single text node (or nothing,
    /// for an empty string).
    ///
    /// # Errors
    /// Returns an error if `node` was removed.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<(), Error> {
        self.ensure_live(node)?;
        for child in self.children(node) {
            self.remove(child);
        }
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(node, text_node)?;
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
