//! Section segmentation and the section readiness wave.

use anyhow::Error;
use html::{Document, NodeId};
use log::debug;

use crate::block::{self, LifecycleStatus, advance_status};

pub const SECTION_WRAPPER_CLASS: &str = "section-wrapper";
pub const SECTION_STATUS_ATTR: &str = "data-section-status";

/// `main > div` children, in order.
fn top_level_divs(doc: &Document, main: NodeId) -> Vec<NodeId> {
    doc.element_children(main)
        .into_iter()
        .filter(|child| doc.node(*child).is_some_and(|data| data.is_element("div")))
        .collect()
}

/// Removes empty top-level groups and wraps every group without an `id` in a
/// new `div.section-wrapper` appended to `main`.
///
/// Groups are visited left to right and each wrapper is appended at the end,
/// so wrapped groups keep their relative order.
///
/// # Errors
/// Returns an error if a wrapper cannot be attached.
pub fn wrap_sections(doc: &mut Document, main: NodeId) -> Result<(), Error> {
    for section in top_level_divs(doc, main) {
        if !doc.has_child_nodes(section) {
            debug!("removing empty section {section:?}");
            doc.remove(section);
        } else if doc.attr(section, "id").is_none_or(str::is_empty) {
            let wrapper = doc.create_element("div");
            doc.set_attr(wrapper, "class", SECTION_WRAPPER_CLASS);
            doc.append_child(main, wrapper)?;
            doc.append_child(wrapper, section)?;
        }
    }
    Ok(())
}

/// Wraps the top-level groups of `main` and stamps every wrapper
/// `initialized`. Returns the wrappers in document order.
///
/// # Errors
/// Returns an error if wrapping fails.
pub fn decorate_sections(doc: &mut Document, main: NodeId) -> Result<Vec<NodeId>, Error> {
    wrap_sections(doc, main)?;
    let sections = sections(doc, main);
    for section in &sections {
        advance_status(doc, *section, SECTION_STATUS_ATTR, LifecycleStatus::Initialized);
    }
    Ok(sections)
}

/// `main > div.section-wrapper`, in document order.
pub fn sections(doc: &Document, main: NodeId) -> Vec<NodeId> {
    top_level_divs(doc, main)
        .into_iter()
        .filter(|section| doc.has_class(*section, SECTION_WRAPPER_CLASS))
        .collect()
}

pub fn section_status(doc: &Document, section: NodeId) -> LifecycleStatus {
    LifecycleStatus::from_attr(doc.attr(section, SECTION_STATUS_ATTR))
}

/// Blocks owned by a section, in document order.
pub fn section_blocks(doc: &Document, section: NodeId) -> Vec<NodeId> {
    doc.find_all(section, block::is_block)
}

fn has_pending_block(doc: &Document, section: NodeId) -> bool {
    section_blocks(doc, section)
        .into_iter()
        .any(|node| block::block_status(doc, node).is_pending())
}

/// Recomputes section readiness left to right.
///
/// Sections already `loaded` are skipped. The first section still holding an
/// `initialized` or `loading` block becomes `loading` and ends the pass; every
/// section before it that has no pending block becomes `loaded`. A later
/// section therefore never reports `loaded` ahead of an earlier one.
pub fn update_sections_status(doc: &mut Document, main: NodeId) {
    for section in sections(doc, main) {
        if section_status(doc, section) == LifecycleStatus::Loaded {
            continue;
        }
        if has_pending_block(doc, section) {
            advance_status(doc, section, SECTION_STATUS_ATTR, LifecycleStatus::Loading);
            break;
        }
        advance_status(doc, section, SECTION_STATUS_ATTR, LifecycleStatus::Loaded);
    }
}
