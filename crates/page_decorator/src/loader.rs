//! Per-block resource loading.

use futures::join;
use html::{NodeId, SharedDom};
use log::{debug, warn};

use crate::block::{self, BLOCK_NAME_ATTR, LifecycleStatus};
use crate::context::PageContext;
use crate::modules::BlockInit;
use crate::styles::load_style;

/// Resolves and runs the behavior module of a block. Returns whether a module
/// ran to completion.
async fn run_module(dom: &SharedDom, ctx: &PageContext, node: NodeId, name: &str, eager: bool) -> bool {
    let module = match ctx.resolver().resolve(name).await {
        Ok(Some(module)) => module,
        Ok(None) => {
            debug!("block {name} has no module");
            return false;
        }
        Err(err) => {
            warn!("failed to load module for {name}: {err}");
            return false;
        }
    };
    let init = BlockInit {
        block: node,
        name,
        dom,
        eager,
    };
    match module.decorate(init).await {
        Ok(()) => true,
        Err(err) => {
            warn!("failed to decorate block {name}: {err}");
            false
        }
    }
}

/// Loads the stylesheet and behavior module of one block and marks it
/// `loaded` once both have settled.
///
/// Blocks that are already `loading` or `loaded`, or were never classified,
/// are left alone. Every failure is logged and absorbed; the block still
/// reaches `loaded`.
pub async fn load_block(dom: &SharedDom, ctx: &PageContext, node: NodeId, eager: bool) {
    let claimed = dom.write(|doc| -> Option<String> {
        let name = doc.attr(node, BLOCK_NAME_ATTR).map(str::to_owned)?;
        if block::block_status(doc, node) >= LifecycleStatus::Loading {
            return None;
        }
        block::advance_block_status(doc, node, LifecycleStatus::Loading).then_some(name)
    });
    let Some(name) = claimed else {
        debug!("block {node:?} is not loadable, skipping");
        return;
    };

    let href = ctx.block_style_href(&name);
    let (style, decorated) = join!(
        load_style(dom, ctx, &href),
        run_module(dom, ctx, node, &name, eager)
    );
    debug!("block {name} settled (style: {style:?}, module ran: {decorated})");

    dom.write(|doc| block::advance_block_status(doc, node, LifecycleStatus::Loaded));
}
