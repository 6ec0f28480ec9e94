//! Synthetic blocks built from page content rather than authored tables.

use anyhow::Error;
use html::{Document, NodeId};
use log::debug;
use rand::Rng as _;

use crate::caas;
use crate::context::PageContext;

/// One cell of a block row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockCell {
    /// Text content; an empty string leaves the cell empty.
    Text(String),
    /// An existing node, moved into the cell.
    Node(NodeId),
    /// Several nodes moved into the same cell, in order.
    Nodes(Vec<NodeId>),
}

/// How a built block is identified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BlockIdent {
    #[default]
    None,
    /// `<name>-<n>` with `n` drawn from `0..100000`.
    Random,
    Fixed(String),
}

/// Builds `div.<name>` with one `div` per row and one `div` per cell,
/// detached from the tree.
///
/// # Errors
/// Returns an error if a cell node cannot be moved into the block.
pub fn build_block(doc: &mut Document, name: &str, rows: Vec<Vec<BlockCell>>, ident: BlockIdent) -> Result<NodeId, Error> {
    let block = doc.create_element("div");
    doc.add_class(block, name);
    match ident {
        BlockIdent::None => {}
        BlockIdent::Random => {
            let suffix: u32 = rand::rng().random_range(0..100_000);
            doc.set_attr(block, "id", &format!("{name}-{suffix}"));
        }
        BlockIdent::Fixed(id) => doc.set_attr(block, "id", &id),
    }
    for row in rows {
        let row_node = doc.create_element("div");
        for cell in row {
            let cell_node = doc.create_element("div");
            match cell {
                BlockCell::Text(text) => {
                    if !text.is_empty() {
                        let text_node = doc.create_text(&text);
                        doc.append_child(cell_node, text_node)?;
                    }
                }
                BlockCell::Node(node) => doc.append_child(cell_node, node)?,
                BlockCell::Nodes(nodes) => {
                    for node in nodes {
                        doc.append_child(cell_node, node)?;
                    }
                }
            }
            doc.append_child(row_node, cell_node)?;
        }
        doc.append_child(block, row_node)?;
    }
    Ok(block)
}

/// Appends an empty `header` block to `<header>`. Pages without a header
/// are left as they are.
///
/// # Errors
/// Returns an error if the block cannot be attached.
pub fn build_header(doc: &mut Document) -> Result<Option<NodeId>, Error> {
    let Some(header) = doc.first_by_tag("header") else {
        debug!("page has no <header>, skipping header block");
        return Ok(None);
    };
    let block = build_block(doc, "header", vec![vec![BlockCell::Text(String::new())]], BlockIdent::None)?;
    doc.append_child(header, block)?;
    Ok(Some(block))
}

/// Builds every synthetic block: the header block, then the card-collection
/// embeds.
///
/// # Errors
/// Returns the first construction error; the caller decides how to report it.
pub fn build_auto_blocks(doc: &mut Document, ctx: &PageContext) -> Result<(), Error> {
    build_header(doc)?;
    caas::build_embeds(doc, ctx)?;
    Ok(())
}
