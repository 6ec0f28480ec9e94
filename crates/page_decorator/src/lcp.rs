//! Largest-contentful-paint helpers: the priority block and the hero image.

use html::{Document, NodeId, SharedDom};
use log::debug;
use url::Url;

use crate::block::{self, BLOCK_NAME_ATTR};
use crate::config::DecoratorConfig;
use crate::context::PageContext;
use crate::fetch::fetch_bytes;
use crate::styles::LoadFuture;

/// Settles when an image has loaded or failed.
pub trait ImageSignal {
    fn wait<'signal>(&'signal self, url: &'signal Url) -> LoadFuture<'signal, ()>;
}

/// Treats the image as loaded once its bytes have been fetched.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchImageSignal;

impl ImageSignal for FetchImageSignal {
    fn wait<'signal>(&'signal self, url: &'signal Url) -> LoadFuture<'signal, ()> {
        Box::pin(async move {
            fetch_bytes(url).await?;
            Ok(())
        })
    }
}

/// Settles immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopImageSignal;

impl ImageSignal for NoopImageSignal {
    fn wait<'signal>(&'signal self, _url: &'signal Url) -> LoadFuture<'signal, ()> {
        Box::pin(async { Ok(()) })
    }
}

/// The first `.block` of the document, if its name is a configured LCP block.
pub fn lcp_candidate(doc: &Document, config: &DecoratorConfig) -> Option<NodeId> {
    let first = doc.find_first(doc.root(), block::is_block)?;
    let name = doc.attr(first, BLOCK_NAME_ATTR)?;
    config.is_lcp_block(name).then_some(first)
}

/// `src` of the first `img` inside `main`, when there is a non-empty one.
pub fn lcp_image(doc: &Document, main: NodeId) -> Option<String> {
    let img = doc.find_first(main, |data| data.is_element("img"))?;
    doc.attr(img, "src")
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_owned)
}

/// Waits for the first image of `main`. Load errors only end the wait.
pub async fn wait_for_image(dom: &SharedDom, ctx: &PageContext, main: NodeId) {
    let Some(src) = dom.read(|doc| lcp_image(doc, main)) else {
        return;
    };
    let url = match ctx.resolve(&src) {
        Ok(url) => url,
        Err(err) => {
            debug!("not waiting for LCP image: {err}");
            return;
        }
    };
    if let Err(err) = ctx.image_signal().wait(&url).await {
        debug!("LCP image {url} failed: {err}");
    }
}
