//! Block behavior modules and their resolution by block name.
//!
//! A [`ModuleResolver`] maps a block name to an optional [`BlockModule`]. The
//! default resolver, [`BlockRegistry`], is filled at startup; a missing entry
//! simply means the block has no behavior and is not an error.

use anyhow::Error;
use core::pin::Pin;
use html::{Document, NodeId, SharedDom};
use std::collections::HashMap;
use std::rc::Rc;

/// Future returned by a block decorator.
pub type DecorateFuture<'future> = Pin<Box<dyn Future<Output = Result<(), Error>> + 'future>>;

/// Future returned by module resolution.
pub type ResolveFuture<'future> =
    Pin<Box<dyn Future<Output = Result<Option<Rc<dyn BlockModule>>, Error>> + 'future>>;

/// Everything a decorator receives for one block.
#[derive(Clone, Copy)]
pub struct BlockInit<'page> {
    pub block: NodeId,
    pub name: &'page str,
    pub dom: &'page SharedDom,
    /// Set only for the priority block loaded during the eager phase.
    pub eager: bool,
}

/// Behavior attached to a block family.
pub trait BlockModule {
    /// Decorates one block. Errors are logged by the caller and never stop
    /// the block from reaching `loaded`.
    fn decorate<'init>(&'init self, init: BlockInit<'init>) -> DecorateFuture<'init>;
}

/// Maps block names to behavior modules.
pub trait ModuleResolver {
    /// Resolves the module for `name`. `Ok(None)` means the block has no
    /// behavior.
    ///
    /// # Errors
    /// Returns an error if the module exists but could not be produced.
    fn resolve<'name>(&'name self, name: &'name str) -> ResolveFuture<'name>;
}

type SyncDecorator = dyn Fn(&mut Document, NodeId, &str, bool) -> Result<(), Error>;

/// Adapts a synchronous closure into a [`BlockModule`]. The closure runs with
/// the document borrowed for its whole duration.
pub struct FnModule {
    decorator: Box<SyncDecorator>,
}

impl FnModule {
    pub fn new(
        decorator: impl Fn(&mut Document, NodeId, &str, bool) -> Result<(), Error> + 'static,
    ) -> Self {
        Self {
            decorator: Box::new(decorator),
        }
    }
}

impl BlockModule for FnModule {
    fn decorate<'init>(&'init self, init: BlockInit<'init>) -> DecorateFuture<'init> {
        let result = init
            .dom
            .write(|doc| (self.decorator)(doc, init.block, init.name, init.eager));
        Box::pin(async move { result })
    }
}

/// Name-keyed table of block modules.
#[derive(Default)]
pub struct BlockRegistry {
    modules: HashMap<String, Rc<dyn BlockModule>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module` for `name`, replacing any earlier registration.
    pub fn register(&mut self, name: &str, module: Rc<dyn BlockModule>) -> &mut Self {
        self.modules.insert(name.to_owned(), module);
        self
    }

    /// Registers a synchronous decorator closure for `name`.
    pub fn register_fn(
        &mut self,
        name: &str,
        decorator: impl Fn(&mut Document, NodeId, &str, bool) -> Result<(), Error> + 'static,
    ) -> &mut Self {
        self.register(name, Rc::new(FnModule::new(decorator)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleResolver for BlockRegistry {
    fn resolve<'name>(&'name self, name: &'name str) -> ResolveFuture<'name> {
        let module = self.modules.get(name).cloned();
        Box::pin(async move { Ok(module) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use html::parse_document;

    #[tokio::test]
    async fn registry_resolves_registered_names_only() {
        let mut registry = BlockRegistry::new();
        registry.register_fn("hero", |doc, block, _name, _eager| {
            doc.set_attr(block, "data-decorated", "yes");
            Ok(())
        });
        assert!(registry.contains("hero"));
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("hero").await.unwrap().is_some());
        assert!(registry.resolve("cards").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fn_module_sees_block_and_flags() {
        let dom = SharedDom::new(parse_document("<main><div class=\"hero\"></div></main>").unwrap());
        let block = dom
            .read(|doc| doc.find_first(doc.root(), |data| data.has_class("hero")))
            .unwrap();
        let module = FnModule::new(|doc, node, name, eager| {
            doc.set_attr(node, "data-seen", &format!("{name}:{eager}"));
            Ok(())
        });
        module
            .decorate(BlockInit {
                block,
                name: "hero",
                dom: &dom,
                eager: true,
            })
            .await
            .unwrap();
        assert_eq!(
            dom.read(|doc| doc.attr(block, "data-seen").map(str::to_owned)),
            Some(String::from("hero:true"))
        );
    }

    #[tokio::test]
    async fn decorator_errors_are_returned() {
        let dom = SharedDom::default();
        let block = dom.write(|doc| doc.create_element("div"));
        let module = FnModule::new(|_doc, _node, _name, _eager| Err(anyhow!("broken")));
        let init = BlockInit {
            block,
            name: "broken",
            dom: &dom,
            eager: false,
        };
        assert!(module.decorate(init).await.is_err());
    }
}
