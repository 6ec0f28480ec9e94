use super::Document;
use anyhow::{Error, anyhow};
use core::cell::RefCell;
use std::rc::Rc;

/// Single-threaded shared handle to a [`Document`].
///
/// Every access goes through a closure, so a borrow can never be held across
/// an `.await`: futures that interleave on one thread each take the document
/// for a synchronous step and hand it back before suspending. Calling
/// [`SharedDom::write`] from inside another access panics like any nested
/// `RefCell` borrow would.
#[derive(Clone, Default)]
pub struct SharedDom {
    inner: Rc<RefCell<Document>>,
}

impl SharedDom {
    pub fn new(document: Document) -> Self {
        Self {
            inner: Rc::new(RefCell::new(document)),
        }
    }

    pub fn read<R>(&self, reader: impl FnOnce(&Document) -> R) -> R {
        reader(&self.inner.borrow())
    }

    pub fn write<R>(&self, writer: impl FnOnce(&mut Document) -> R) -> R {
        writer(&mut self.inner.borrow_mut())
    }

    /// Serialized HTML of the whole document.
    pub fn to_html(&self) -> String {
        self.read(Document::to_html)
    }

    /// Takes the document back once every other handle has been dropped.
    ///
    /// # Errors
    /// Returns an error if another clone of the handle is still alive.
    pub fn into_document(self) -> Result<Document, Error> {
        Rc::try_unwrap(self.inner)
            .map(RefCell::into_inner)
            .map_err(|_| anyhow!("document is still shared"))
    }
}
