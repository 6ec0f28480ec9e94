//! Arena-backed DOM used by the page decorator.
//!
//! The tree is parsed with html5ever, edited in place through [`Document`],
//! serialized back to HTML, and shared between cooperating futures on a single
//! thread through [`SharedDom`].

#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

pub mod dom;
pub mod parser;

pub use dom::{Document, DomNode, NodeKind, SharedDom};
pub use indextree::NodeId;
pub use parser::parse_document;
