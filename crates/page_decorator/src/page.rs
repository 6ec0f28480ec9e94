//! Page-level orchestration: eager, lazy and deferred phases.

use anyhow::Error;
use futures::join;
use html::{Document, NodeId, SharedDom};
use log::{debug, error, info};
use serde_json::Map;

use crate::anchors::decorate_anchors;
use crate::auto_blocks::build_auto_blocks;
use crate::block::{decorate_block, decorate_blocks};
use crate::context::PageContext;
use crate::lcp::{lcp_candidate, wait_for_image};
use crate::loader::load_block;
use crate::metadata::{add_fav_icon, set_template};
use crate::scheduler::{load_blocks, load_eager_block};
use crate::section::decorate_sections;
use crate::styles::attach_style;

/// Class added to `<body>` once the page may be revealed.
pub const APPEAR_CLASS: &str = "appear";

/// Last phase a [`PageDecorator`] completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    #[default]
    Pending,
    Eager,
    Lazy,
    Delayed,
}

/// Drives one document through the decoration phases.
pub struct PageDecorator {
    dom: SharedDom,
    ctx: PageContext,
    phase: Phase,
}

impl PageDecorator {
    pub fn new(document: Document, ctx: PageContext) -> Self {
        Self {
            dom: SharedDom::new(document),
            ctx,
            phase: Phase::Pending,
        }
    }

    pub const fn dom(&self) -> &SharedDom {
        &self.dom
    }

    pub const fn context(&self) -> &PageContext {
        &self.ctx
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs the eager, lazy and deferred phases in order, each to completion.
    ///
    /// # Errors
    /// Returns an error only if the document tree rejects a structural edit;
    /// block-level failures are logged and absorbed.
    pub async fn decorate_page(&mut self) -> Result<(), Error> {
        let main = self.load_eager().await?;
        self.load_lazy(main).await?;
        self.load_delayed();
        Ok(())
    }

    /// Everything needed before the largest contentful paint. Returns the
    /// page's `<main>`, if it has one.
    ///
    /// # Errors
    /// Returns an error if sections cannot be wrapped.
    pub async fn load_eager(&mut self) -> Result<Option<NodeId>, Error> {
        self.ctx.sample_rum("top", Map::new());
        if let Some(class) = self.dom.write(set_template) {
            debug!("applied template class {class}");
        }
        let main = self.decorate_main()?;
        self.wait_for_lcp(main).await;
        self.phase = Phase::Eager;
        info!("eager phase complete");
        Ok(main)
    }

    /// Synchronous decoration of `<main>`: anchors, synthetic blocks,
    /// sections and block classification.
    ///
    /// # Errors
    /// Returns an error if anchors or sections cannot be rewritten.
    pub fn decorate_main(&self) -> Result<Option<NodeId>, Error> {
        let ctx = &self.ctx;
        self.dom.write(|doc| -> Result<Option<NodeId>, Error> {
            let Some(main) = doc.first_by_tag("main") else {
                info!("document has no <main>, nothing to decorate");
                return Ok(None);
            };
            decorate_anchors(doc, main, ctx.page_url(), &ctx.config().project)?;
            if let Err(err) = build_auto_blocks(doc, ctx) {
                error!("Auto Blocking failed: {err:#}");
            }
            let sections = decorate_sections(doc, main)?;
            let blocks = decorate_blocks(doc, main);
            debug!("decorated {} sections and {} blocks", sections.len(), blocks.len());
            Ok(Some(main))
        })
    }

    /// Loads the priority block if the page starts with one, reveals the body
    /// and waits for the first image of `main`.
    pub async fn wait_for_lcp(&self, main: Option<NodeId>) {
        let candidate = self.dom.read(|doc| lcp_candidate(doc, self.ctx.config()));
        if let Some(block) = candidate {
            debug!("loading priority block {block:?}");
            load_eager_block(&self.dom, &self.ctx, block).await;
        }
        self.dom.write(|doc| {
            if let Some(body) = doc.body() {
                doc.add_class(body, APPEAR_CLASS);
            }
        });
        if let Some(main) = main {
            wait_for_image(&self.dom, &self.ctx, main).await;
        }
    }

    /// Loads the remaining blocks of `main` while the header block loads
    /// alongside, then attaches fonts and the favicon.
    ///
    /// # Errors
    /// Returns an error if the favicon or fonts cannot be attached.
    pub async fn load_lazy(&mut self, main: Option<NodeId>) -> Result<(), Error> {
        let Some(main) = main else {
            self.phase = Phase::Lazy;
            return Ok(());
        };
        join!(load_blocks(&self.dom, &self.ctx, main), self.load_header());

        let fonts = self.ctx.config().fonts_href.clone();
        let favicon = self.ctx.code_href(&self.ctx.config().favicon_path);
        self.dom.write(|doc| -> Result<(), Error> {
            attach_style(doc, &fonts)?;
            add_fav_icon(doc, &favicon)?;
            Ok(())
        })?;
        self.ctx.sample_rum("load", Map::new());
        self.phase = Phase::Lazy;
        info!("lazy phase complete");
        Ok(())
    }

    /// Classifies and loads the first `div` of `<header>`, independently of
    /// the section wave.
    async fn load_header(&self) {
        let header_block = self.dom.write(|doc| -> Option<NodeId> {
            let header = doc.first_by_tag("header")?;
            let block = doc
                .element_children(header)
                .into_iter()
                .find(|child| doc.tag(*child) == Some("div"))?;
            decorate_block(doc, block).map(|_| block)
        });
        match header_block {
            Some(block) => load_block(&self.dom, &self.ctx, block, false).await,
            None => debug!("no header block to load"),
        }
    }

    /// Work that can wait until everything else is done. Nothing by default.
    pub fn load_delayed(&mut self) {
        self.phase = Phase::Delayed;
        info!("page decoration complete");
    }

    /// Hands the decorated document back.
    ///
    /// # Errors
    /// Returns an error if a clone of the document handle is still alive.
    pub fn into_document(self) -> Result<Document, Error> {
        self.dom.into_document()
    }
}
