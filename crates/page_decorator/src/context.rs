//! Per-page environment shared by every pipeline stage.
//!
//! [`PageContext`] is built once before decoration starts and passed by
//! reference from then on. It carries the site configuration, the values
//! derived from the page URL and its script tag, the telemetry sampler, and
//! the pluggable collaborators (style loader, module resolver, image signal,
//! beacon sink).

use anyhow::{Error, anyhow};
use core::cell::RefCell;
use html::Document;
use log::debug;
use serde_json::{Map, Value};
use std::rc::Rc;
use url::Url;

use crate::config::DecoratorConfig;
use crate::lcp::{ImageSignal, NoopImageSignal};
use crate::modules::{BlockRegistry, ModuleResolver};
use crate::styles::{NoopStyleLoader, StyleLoader};
use crate::telemetry::{BeaconSink, NoopBeaconSink, RumSampler};

pub struct PageContext {
    config: DecoratorConfig,
    page_url: Url,
    /// Root that root-relative hrefs are resolved under.
    asset_base: Url,
    code_base_path: String,
    lighthouse: bool,
    rum: RumSampler,
    style_loader: Rc<dyn StyleLoader>,
    resolver: Rc<dyn ModuleResolver>,
    image_signal: Rc<dyn ImageSignal>,
    beacons: Rc<dyn BeaconSink>,
    dependencies: RefCell<Vec<String>>,
}

impl PageContext {
    pub fn builder(page_url: Url) -> PageContextBuilder {
        PageContextBuilder::new(page_url)
    }

    pub const fn config(&self) -> &DecoratorConfig {
        &self.config
    }

    pub const fn page_url(&self) -> &Url {
        &self.page_url
    }

    /// Path prefix of the code base, e.g. `/tools` for a page script at
    /// `/tools/scripts/scripts.js`. Empty when served from the root.
    pub fn code_base_path(&self) -> &str {
        &self.code_base_path
    }

    /// `?lighthouse=on` was present on the page URL.
    pub const fn lighthouse(&self) -> bool {
        self.lighthouse
    }

    pub const fn rum(&self) -> &RumSampler {
        &self.rum
    }

    pub fn style_loader(&self) -> &dyn StyleLoader {
        &*self.style_loader
    }

    pub fn resolver(&self) -> &dyn ModuleResolver {
        &*self.resolver
    }

    pub fn image_signal(&self) -> &dyn ImageSignal {
        &*self.image_signal
    }

    /// Stylesheet href of a block family.
    pub fn block_style_href(&self, name: &str) -> String {
        format!("{}/blocks/{name}/{name}.css", self.code_base_path)
    }

    /// Href of a resource under the code base path.
    pub fn code_href(&self, path: &str) -> String {
        format!("{}{path}", self.code_base_path)
    }

    /// Resolves an href the way the page would.
    ///
    /// Absolute URLs are kept; root-relative hrefs are placed under the asset
    /// base; anything else is relative to the page URL.
    ///
    /// # Errors
    /// Returns an error if the href cannot be joined into a URL.
    pub fn resolve(&self, href: &str) -> Result<Url, Error> {
        let joined = match href.strip_prefix('/') {
            Some(rest) if !rest.starts_with('/') => self.asset_base.join(rest),
            _ => self.page_url.join(href),
        };
        joined.map_err(|err| anyhow!("cannot resolve {href:?} against {}: {err}", self.page_url))
    }

    /// Sends a RUM checkpoint if this page view is sampled. Never fails.
    pub fn sample_rum(&self, checkpoint: &str, data: Map<String, Value>) {
        let Some((url, body)) = self.rum.beacon(
            &self.config.rum_endpoint,
            self.page_url.as_str(),
            &self.config.project,
            checkpoint,
            data,
        ) else {
            return;
        };
        debug!("rum checkpoint {checkpoint}");
        self.beacons.send(&url, body);
    }

    /// Records URLs the page depends on for publishing.
    pub fn add_publish_dependencies<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .borrow_mut()
            .extend(urls.into_iter().map(Into::into));
    }

    pub fn publish_dependencies(&self) -> Vec<String> {
        self.dependencies.borrow().clone()
    }
}

/// Derives the code base path from the page script tag: the pathname of the
/// first `script[src]` ending in `suffix`, cut at the suffix.
pub fn code_base_path(doc: &Document, page_url: &Url, suffix: &str) -> Option<String> {
    let script = doc.find_first(doc.root(), |data| {
        data.is_element("script") && data.attr("src").is_some_and(|src| src.ends_with(suffix))
    })?;
    let src = doc.attr(script, "src")?;
    let url = match page_url.join(src) {
        Ok(url) => url,
        Err(err) => {
            debug!("ignoring page script {src:?}: {err}");
            return None;
        }
    };
    url.path().split(suffix).next().map(str::to_owned)
}

pub struct PageContextBuilder {
    page_url: Url,
    asset_base: Option<Url>,
    config: DecoratorConfig,
    code_base_path: Option<String>,
    rum: Option<RumSampler>,
    style_loader: Rc<dyn StyleLoader>,
    resolver: Rc<dyn ModuleResolver>,
    image_signal: Rc<dyn ImageSignal>,
    beacons: Rc<dyn BeaconSink>,
}

impl PageContextBuilder {
    fn new(page_url: Url) -> Self {
        Self {
            page_url,
            asset_base: None,
            config: DecoratorConfig::default(),
            code_base_path: None,
            rum: None,
            style_loader: Rc::new(NoopStyleLoader),
            resolver: Rc::new(BlockRegistry::new()),
            image_signal: Rc::new(NoopImageSignal),
            beacons: Rc::new(NoopBeaconSink),
        }
    }

    #[must_use]
    pub fn config(mut self, config: DecoratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Root for root-relative hrefs. Defaults to the origin of the page URL.
    #[must_use]
    pub fn asset_base(mut self, base: Url) -> Self {
        self.asset_base = Some(base);
        self
    }

    #[must_use]
    pub fn code_base_path(mut self, path: &str) -> Self {
        self.code_base_path = Some(path.trim_end_matches('/').to_owned());
        self
    }

    /// Takes the code base path from the document's page script, if any.
    #[must_use]
    pub fn code_base_from(mut self, doc: &Document) -> Self {
        if let Some(path) = code_base_path(doc, &self.page_url, &self.config.script_suffix) {
            self.code_base_path = Some(path);
        }
        self
    }

    #[must_use]
    pub fn rum(mut self, sampler: RumSampler) -> Self {
        self.rum = Some(sampler);
        self
    }

    #[must_use]
    pub fn style_loader(mut self, loader: Rc<dyn StyleLoader>) -> Self {
        self.style_loader = loader;
        self
    }

    #[must_use]
    pub fn resolver(mut self, resolver: Rc<dyn ModuleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn image_signal(mut self, signal: Rc<dyn ImageSignal>) -> Self {
        self.image_signal = signal;
        self
    }

    #[must_use]
    pub fn beacon_sink(mut self, sink: Rc<dyn BeaconSink>) -> Self {
        self.beacons = sink;
        self
    }

    pub fn build(self) -> PageContext {
        let lighthouse = self
            .page_url
            .query_pairs()
            .any(|(key, value)| key == "lighthouse" && value == "on");
        let rum = self
            .rum
            .unwrap_or_else(|| RumSampler::new(&self.page_url, self.config.rum_weight));
        let asset_base = self.asset_base.unwrap_or_else(|| origin_root(&self.page_url));
        PageContext {
            lighthouse,
            rum,
            asset_base: with_trailing_slash(asset_base),
            code_base_path: self.code_base_path.unwrap_or_default(),
            config: self.config,
            page_url: self.page_url,
            style_loader: self.style_loader,
            resolver: self.resolver,
            image_signal: self.image_signal,
            beacons: self.beacons,
            dependencies: RefCell::new(Vec::new()),
        }
    }
}

fn origin_root(page_url: &Url) -> Url {
    let mut root = page_url.clone();
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    root
}

fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use html::parse_document;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[derive(Default)]
    struct CountingSink {
        sent: Cell<usize>,
    }

    impl BeaconSink for CountingSink {
        fn send(&self, _url: &str, _body: String) {
            self.sent.set(self.sent.get() + 1);
        }
    }

    #[test]
    fn code_base_path_comes_from_page_script() {
        let doc = parse_document(
            "<head><script src=\"/tools/scripts/scripts.js\" type=\"module\"></script></head><main></main>",
        )
        .unwrap();
        let page = url("https://main--site.hlx3.page/en/");
        assert_eq!(
            code_base_path(&doc, &page, "/scripts/scripts.js").as_deref(),
            Some("/tools")
        );

        let ctx = PageContext::builder(page).code_base_from(&doc).build();
        assert_eq!(ctx.block_style_href("hero"), "/tools/blocks/hero/hero.css");
    }

    #[test]
    fn code_base_path_defaults_to_empty() {
        let doc = parse_document("<main></main>").unwrap();
        let ctx = PageContext::builder(url("https://example.com/"))
            .code_base_from(&doc)
            .build();
        assert_eq!(ctx.code_base_path(), "");
        assert_eq!(ctx.block_style_href("cards"), "/blocks/cards/cards.css");
    }

    #[test]
    fn lighthouse_flag_reads_query() {
        let ctx = PageContext::builder(url("https://example.com/?lighthouse=on")).build();
        assert!(ctx.lighthouse());
        let ctx = PageContext::builder(url("https://example.com/?lighthouse=off")).build();
        assert!(!ctx.lighthouse());
    }

    #[test]
    fn resolves_root_relative_hrefs_under_asset_base() {
        let ctx = PageContext::builder(url("file:///site/pages/index.html"))
            .asset_base(url("file:///site"))
            .build();
        assert_eq!(
            ctx.resolve("/blocks/hero/hero.css").unwrap().as_str(),
            "file:///site/blocks/hero/hero.css"
        );
        assert_eq!(ctx.resolve("img/a.png").unwrap().as_str(), "file:///site/pages/img/a.png");
        assert_eq!(
            ctx.resolve("https://cdn.example/x.css").unwrap().as_str(),
            "https://cdn.example/x.css"
        );
    }

    #[test]
    fn default_asset_base_is_page_origin() {
        let ctx = PageContext::builder(url("https://example.com/en/page?x=1")).build();
        assert_eq!(
            ctx.resolve("/fonts/fonts.css").unwrap().as_str(),
            "https://example.com/fonts/fonts.css"
        );
    }

    #[test]
    fn beacons_only_for_sampled_views() {
        let page = url("https://example.com/?rum=on");
        let sink = Rc::new(CountingSink::default());
        let ctx = PageContext::builder(page.clone())
            .rum(RumSampler::with_random(&page, 100, 0.5, String::from("id")))
            .beacon_sink(Rc::clone(&sink) as Rc<dyn BeaconSink>)
            .build();
        ctx.sample_rum("top", Map::new());
        assert_eq!(sink.sent.get(), 1);

        let page = url("https://example.com/");
        let sink = Rc::new(CountingSink::default());
        let ctx = PageContext::builder(page.clone())
            .rum(RumSampler::with_random(&page, 100, 0.5, String::from("id")))
            .beacon_sink(Rc::clone(&sink) as Rc<dyn BeaconSink>)
            .build();
        ctx.sample_rum("top", Map::new());
        assert_eq!(sink.sent.get(), 0);
    }

    #[test]
    fn publish_dependencies_accumulate() {
        let ctx = PageContext::builder(url("https://example.com/")).build();
        ctx.add_publish_dependencies(["/a.json"]);
        ctx.add_publish_dependencies(vec![String::from("/b.json"), String::from("/c.json")]);
        assert_eq!(ctx.publish_dependencies(), vec!["/a.json", "/b.json", "/c.json"]);
    }
}
