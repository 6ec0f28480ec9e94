//! Stylesheet attachment.
//!
//! A stylesheet is attached to `<head>` at most once per href; the attach
//! step is synchronous and the returned future only waits for the loader to
//! report that the resource arrived (or failed).

use anyhow::Error;
use core::pin::Pin;
use html::{Document, SharedDom};
use log::{debug, warn};
use url::Url;

use crate::context::PageContext;
use crate::fetch::fetch_bytes;

/// Boxed, single-threaded future returned by the pluggable loaders.
pub type LoadFuture<'future, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + 'future>>;

/// Fetches a stylesheet once its `<link>` has been attached.
pub trait StyleLoader {
    /// Settles when the stylesheet loaded or failed to load.
    fn load<'loader>(&'loader self, url: &'loader Url) -> LoadFuture<'loader, ()>;
}

/// Loads stylesheets through the fetch layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchStyleLoader;

impl StyleLoader for FetchStyleLoader {
    fn load<'loader>(&'loader self, url: &'loader Url) -> LoadFuture<'loader, ()> {
        Box::pin(async move {
            let body = fetch_bytes(url).await?;
            debug!("loaded stylesheet {url} ({} bytes)", body.len());
            Ok(())
        })
    }
}

/// Settles immediately without touching the network.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopStyleLoader;

impl StyleLoader for NoopStyleLoader {
    fn load<'loader>(&'loader self, _url: &'loader Url) -> LoadFuture<'loader, ()> {
        Box::pin(async { Ok(()) })
    }
}

/// How a [`load_style`] call settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleOutcome {
    Loaded,
    Failed,
    /// The stylesheet was already attached; nothing was loaded.
    AlreadyAttached,
}

/// Appends `<link rel="stylesheet" href>` to `<head>` unless a link with the
/// same href is already there. Returns whether a link was added.
///
/// # Errors
/// Returns an error if `<head>` cannot be created or the link attached.
pub fn attach_style(doc: &mut Document, href: &str) -> Result<bool, Error> {
    let head = doc.ensure_head()?;
    let present = doc
        .element_children(head)
        .into_iter()
        .any(|child| doc.tag(child) == Some("link") && doc.attr(child, "href") == Some(href));
    if present {
        return Ok(false);
    }
    let link = doc.create_element("link");
    doc.set_attr(link, "rel", "stylesheet");
    doc.set_attr(link, "href", href);
    doc.append_child(head, link)?;
    Ok(true)
}

/// Attaches a stylesheet and waits for the page's [`StyleLoader`].
///
/// Never fails: attach, resolution and load errors are logged and reported
/// as [`StyleOutcome::Failed`].
pub async fn load_style(dom: &SharedDom, ctx: &PageContext, href: &str) -> StyleOutcome {
    match dom.write(|doc| attach_style(doc, href)) {
        Ok(true) => {}
        Ok(false) => {
            debug!("stylesheet {href} already attached");
            return StyleOutcome::AlreadyAttached;
        }
        Err(err) => {
            warn!("could not attach stylesheet {href}: {err}");
            return StyleOutcome::Failed;
        }
    }
    let url = match ctx.resolve(href) {
        Ok(url) => url,
        Err(err) => {
            warn!("{err}");
            return StyleOutcome::Failed;
        }
    };
    match ctx.style_loader().load(&url).await {
        Ok(()) => StyleOutcome::Loaded,
        Err(err) => {
            warn!("failed to load stylesheet {url}: {err}");
            StyleOutcome::Failed
        }
    }
}
