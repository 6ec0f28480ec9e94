//! Block classification and the per-node lifecycle marker.
//!
//! A block is a `div` whose first class token names it. Classification keeps
//! all of its state on the node itself (`block` class, `data-block-name`,
//! `data-block-status`), so the document stays the single source of truth
//! for every later pipeline stage.

use core::fmt;
use html::{Document, DomNode, NodeId};
use log::debug;

use crate::section::SECTION_WRAPPER_CLASS;

pub const BLOCK_CLASS: &str = "block";
pub const BLOCK_NAME_ATTR: &str = "data-block-name";
pub const BLOCK_STATUS_ATTR: &str = "data-block-status";

/// Separator between a block's base name and its variants.
const VARIANT_SEPARATOR: &str = "--";

/// Readiness of a block or section. Ordered: a status only ever moves to a
/// greater value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleStatus {
    #[default]
    Uninitialized,
    Initialized,
    Loading,
    Loaded,
}

impl LifecycleStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
        }
    }

    /// Reads a status attribute; a missing or unknown value means the node
    /// was never stamped.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("initialized") => Self::Initialized,
            Some("loading") => Self::Loading,
            Some("loaded") => Self::Loaded,
            _ => Self::Uninitialized,
        }
    }

    /// `initialized` or `loading`: work is still outstanding.
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Initialized | Self::Loading)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Writes `status` to `attr` unless that would move the node backwards.
/// Returns whether the attribute changed.
pub(crate) fn advance_status(
    doc: &mut Document,
    node: NodeId,
    attr: &str,
    status: LifecycleStatus,
) -> bool {
    let current = LifecycleStatus::from_attr(doc.attr(node, attr));
    if status <= current || status == LifecycleStatus::Uninitialized {
        return false;
    }
    doc.set_attr(node, attr, status.as_str());
    true
}

/// A parsed block identifier: `hero--large--` is base `hero`, variants `[large]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockName {
    pub base: String,
    pub variants: Vec<String>,
}

impl BlockName {
    /// Splits a raw identifier into base name and variants. Returns `None`
    /// when no base name survives trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut segments = raw.split(VARIANT_SEPARATOR).map(trim_dashes);
        let base = segments.next().filter(|base| !base.is_empty())?;
        Some(Self {
            base: base.to_owned(),
            variants: segments
                .filter(|variant| !variant.is_empty())
                .map(str::to_owned)
                .collect(),
        })
    }
}

/// Strips one leading and one trailing filler `-`, together with any
/// whitespace on the outer side of it.
pub fn trim_dashes(segment: &str) -> &str {
    let mut trimmed = segment;
    if let Some(rest) = trimmed.trim_start().strip_prefix('-') {
        trimmed = rest;
    }
    if let Some(rest) = trimmed.trim_end().strip_suffix('-') {
        trimmed = rest;
    }
    trimmed
}

/// Class put on a section wrapper to mark which block family it contains.
pub fn container_class(raw_name: &str) -> String {
    format!("{raw_name}-container").replace("--", "-")
}

/// Read view of a classified block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub node: NodeId,
    pub name: String,
    pub variants: Vec<String>,
    pub status: LifecycleStatus,
    /// Enclosing section wrapper; a back-reference, never ownership.
    pub section: Option<NodeId>,
}

impl Block {
    /// Returns `None` for nodes that were never classified.
    pub fn read(doc: &Document, node: NodeId) -> Option<Self> {
        let name = doc.attr(node, BLOCK_NAME_ATTR)?.to_owned();
        let variants = doc
            .class_list(node)
            .first()
            .and_then(|raw| BlockName::parse(raw))
            .map(|parsed| parsed.variants)
            .unwrap_or_default();
        Some(Self {
            node,
            name,
            variants,
            status: block_status(doc, node),
            section: doc.closest(node, |data| data.has_class(SECTION_WRAPPER_CLASS)),
        })
    }
}

pub fn block_status(doc: &Document, node: NodeId) -> LifecycleStatus {
    LifecycleStatus::from_attr(doc.attr(node, BLOCK_STATUS_ATTR))
}

pub(crate) fn advance_block_status(doc: &mut Document, node: NodeId, status: LifecycleStatus) -> bool {
    advance_status(doc, node, BLOCK_STATUS_ATTR, status)
}

/// `.block` selector.
pub fn is_block(data: &DomNode) -> bool {
    data.has_class(BLOCK_CLASS)
}

/// `div.block` selector.
pub fn is_block_div(data: &DomNode) -> bool {
    data.is_element("div") && is_block(data)
}

/// Classifies a single node. Nodes without a usable first class token are
/// left untouched and `None` is returned.
pub fn decorate_block(doc: &mut Document, node: NodeId) -> Option<BlockName> {
    let Some(raw) = doc.class_list(node).into_iter().next() else {
        debug!("skipping block candidate {node:?} without a class");
        return None;
    };
    let Some(parsed) = BlockName::parse(&raw) else {
        debug!("skipping block candidate {node:?}: no name in {raw:?}");
        return None;
    };

    if let Some(section) = doc.closest(node, |data| data.has_class(SECTION_WRAPPER_CLASS)) {
        doc.add_class(section, &container_class(&raw));
    }

    doc.add_class(node, &parsed.base);
    doc.add_classes(node, parsed.variants.iter().map(String::as_str));
    doc.add_class(node, BLOCK_CLASS);
    doc.set_attr(node, BLOCK_NAME_ATTR, &parsed.base);
    advance_block_status(doc, node, LifecycleStatus::Initialized);
    Some(parsed)
}

/// Classifies every block candidate in `main`: any `div` inside the content
/// group of a section wrapper. Returns the classified nodes in document order.
pub fn decorate_blocks(doc: &mut Document, main: NodeId) -> Vec<NodeId> {
    let candidates: Vec<NodeId> = doc
        .children(main)
        .into_iter()
        .filter(|child| {
            doc.node(*child)
                .is_some_and(|data| data.is_element("div") && data.has_class(SECTION_WRAPPER_CLASS))
        })
        .flat_map(|section| doc.element_children(section))
        .filter(|group| doc.node(*group).is_some_and(|data| data.is_element("div")))
        .flat_map(|group| doc.find_all(group, |data| data.is_element("div")))
        .collect();

    candidates
        .into_iter()
        .filter(|candidate| decorate_block(doc, *candidate).is_some())
        .collect()
}

/// Every `div.block` under `scope`, in document order.
pub fn blocks_in(doc: &Document, scope: NodeId) -> Vec<NodeId> {
    doc.find_all(scope, is_block_div)
}

#[cfg(test)]
mod tests {
    use super::*;
    use html::parse_document;

    #[test]
    fn parses_variants_and_trims_filler() {
        let name = BlockName::parse("hero--large--").unwrap();
        assert_eq!(name.base, "hero");
        assert_eq!(name.variants, vec!["large"]);

        let name = BlockName::parse("marquee--small--contained-").unwrap();
        assert_eq!(name.base, "marquee");
        assert_eq!(name.variants, vec!["small", "contained"]);

        assert_eq!(BlockName::parse("columns").unwrap().variants, Vec::<String>::new());
        assert!(BlockName::parse("-").is_none());
        assert!(BlockName::parse("--large").is_none());
    }

    #[test]
    fn trim_dashes_removes_one_dash_per_side() {
        assert_eq!(trim_dashes("large-"), "large");
        assert_eq!(trim_dashes(" -large- "), "large");
        assert_eq!(trim_dashes("large--"), "large-");
        assert_eq!(trim_dashes("-"), "");
        assert_eq!(trim_dashes("plain"), "plain");
    }

    #[test]
    fn container_class_collapses_double_dashes_once() {
        assert_eq!(container_class("columns"), "columns-container");
        assert_eq!(container_class("hero--large"), "hero-large-container");
        assert_eq!(container_class("hero--large--"), "hero-large--container");
    }

    #[test]
    fn status_order_is_monotonic() {
        assert!(LifecycleStatus::Uninitialized < LifecycleStatus::Initialized);
        assert!(LifecycleStatus::Initialized < LifecycleStatus::Loading);
        assert!(LifecycleStatus::Loading < LifecycleStatus::Loaded);
        assert_eq!(LifecycleStatus::from_attr(Some("bogus")), LifecycleStatus::Uninitialized);
        assert_eq!(LifecycleStatus::Loaded.to_string(), "loaded");
    }

    #[test]
    fn advance_never_moves_backwards() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        assert!(advance_block_status(&mut doc, node, LifecycleStatus::Loading));
        assert!(!advance_block_status(&mut doc, node, LifecycleStatus::Initialized));
        assert_eq!(block_status(&doc, node), LifecycleStatus::Loading);
        assert!(advance_block_status(&mut doc, node, LifecycleStatus::Loaded));
        assert!(!advance_block_status(&mut doc, node, LifecycleStatus::Loaded));
    }

    #[test]
    fn decorates_block_and_its_section() {
        let mut doc = parse_document(
            "<main><div class=\"section-wrapper\"><div><div class=\"hero--large--\"><div>x</div></div></div></div></main>",
        )
        .unwrap();
        let main = doc.first_by_tag("main").unwrap();
        let blocks = decorate_blocks(&mut doc, main);
        assert_eq!(blocks.len(), 1);

        let block = Block::read(&doc, blocks[0]).unwrap();
        assert_eq!(block.name, "hero");
        assert_eq!(block.variants, vec!["large"]);
        assert_eq!(block.status, LifecycleStatus::Initialized);
        assert_eq!(
            doc.class_list(block.node),
            vec!["hero--large--", "hero", "large", "block"]
        );
        let section = block.section.unwrap();
        assert!(doc.has_class(section, "hero-large--container"));
    }

    #[test]
    fn unclassifiable_nodes_are_untouched() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        doc.append_child(doc.root(), node).unwrap();
        assert!(decorate_block(&mut doc, node).is_none());
        assert!(Block::read(&doc, node).is_none());
        assert_eq!(doc.outer_html(node), "<div></div>");

        doc.set_attr(node, "class", "-");
        assert!(decorate_block(&mut doc, node).is_none());
        assert!(!doc.has_class(node, BLOCK_CLASS));
    }

    #[test]
    fn rows_without_classes_are_skipped() {
        let mut doc = parse_document(
            "<main><div class=\"section-wrapper\"><div><div class=\"cards\"><div><div>a</div></div></div><p>text</p></div></div></main>",
        )
        .unwrap();
        let main = doc.first_by_tag("main").unwrap();
        let blocks = decorate_blocks(&mut doc, main);
        assert_eq!(blocks.len(), 1);
        assert_eq!(doc.attr(blocks[0], BLOCK_NAME_ATTR), Some("cards"));
    }
}
