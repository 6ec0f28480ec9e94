//! Sequential block scheduling.
//!
//! Blocks are loaded one at a time in document order; the section wave is
//! recomputed before the first load and after every block settles.

use html::{NodeId, SharedDom};
use log::debug;

use crate::block::blocks_in;
use crate::context::PageContext;
use crate::loader::load_block;
use crate::section::update_sections_status;

/// Loads every `div.block` of `main`, one after the other.
pub async fn load_blocks(dom: &SharedDom, ctx: &PageContext, main: NodeId) {
    dom.write(|doc| update_sections_status(doc, main));
    let blocks = dom.read(|doc| blocks_in(doc, main));
    debug!("scheduling {} blocks", blocks.len());
    for block in blocks {
        load_block(dom, ctx, block, false).await;
        dom.write(|doc| update_sections_status(doc, main));
    }
}

/// Loads the priority block ahead of the main schedule.
pub async fn load_eager_block(dom: &SharedDom, ctx: &PageContext, block: NodeId) {
    load_block(dom, ctx, block, true).await;
}
