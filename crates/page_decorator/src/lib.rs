//! Progressive page decoration.
//!
//! This crate turns authored, semantically plain HTML into a decorated page.
//! Sections of `<main>` are wrapped and classified, blocks are discovered by
//! their class names, and each block's stylesheet and behavior module are
//! loaded one block at a time. Section readiness is recomputed after every
//! block so that the page fills in top to bottom. [`PageDecorator`] drives
//! the eager, lazy and deferred phases over a shared document.

#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

/// Anchor rewriting and variant class clean-up
pub mod anchors;
/// Synthetic blocks built from page content
pub mod auto_blocks;
pub mod block;
/// Card-collection widget embeds
pub mod caas;
pub mod config;
pub mod context;
/// Resource fetching for http, https and file URLs
pub mod fetch;
pub mod lcp;
/// Per-block style and module loading
pub mod loader;
pub mod metadata;
pub mod modules;
pub mod page;
pub mod scheduler;
pub mod section;
pub mod styles;
pub mod telemetry;

pub use block::{Block, BlockName, LifecycleStatus};
pub use config::DecoratorConfig;
pub use context::{PageContext, PageContextBuilder};
pub use lcp::{FetchImageSignal, ImageSignal, NoopImageSignal};
pub use modules::{BlockInit, BlockModule, BlockRegistry, FnModule, ModuleResolver};
pub use page::{PageDecorator, Phase};
pub use styles::{FetchStyleLoader, NoopStyleLoader, StyleLoader, StyleOutcome};
pub use telemetry::{BeaconSink, HttpBeaconSink, NoopBeaconSink, RumSampler};
