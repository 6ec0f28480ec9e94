//! Card-collection ("CaaS") embeds.
//!
//! Authors place a link to the collection configurator in the page; its
//! query string carries the collection options. Each such link becomes a
//! `caas` block holding a mount point, the widget's stylesheets and scripts
//! are added to `<head>`, and a bootstrap script at the end of `<body>` hands
//! the generated configuration to `ConsonantCardCollection`.

use anyhow::{Context as _, Error};
use html::{Document, NodeId};
use log::debug;
use rand::Rng as _;
use serde_json::{Value, json};
use url::Url;
use url::form_urlencoded::{byte_serialize, parse as parse_query};

use crate::auto_blocks::{BlockCell, BlockIdent, build_block};
use crate::context::PageContext;
use crate::metadata::load_script;
use crate::styles::attach_style;

const APP_STYLESHEET: &str = "https://www.adobe.com/special/chimera/latest/dist/dexter/app.min.css";
const WIDGET_SCRIPTS: [&str; 3] = [
    "https://unpkg.com/react@17.0.2/umd/react.development.js",
    "https://unpkg.com/react-dom@17.0.2/umd/react-dom.development.js",
    "https://www.adobe.com/special/chimera/latest/dist/dexter/app.min.js",
];
const COLLECTION_ENDPOINT: &str = "https://www.adobe.com/chimera-api/collection";

/// Collection options read from the configurator link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionParams {
    /// `source`
    pub source: Option<String>,
    /// `cs`
    pub card_style: Option<String>,
    /// `c`
    pub container_size: Option<String>,
    /// `f`
    pub filter: Option<String>,
    /// `p`
    pub pagination: Option<String>,
    /// `pt`
    pub pagination_type: Option<String>,
    /// `s`
    pub search: Option<String>,
}

impl CollectionParams {
    /// Reads the options from the query string of `href`. Missing options
    /// stay `None` and reach the widget config as `null`.
    pub fn from_href(href: &str) -> Self {
        let query = href.split_once('?').map_or("", |(_, query)| query);
        let mut params = Self::default();
        for (key, value) in parse_query(query.as_bytes()) {
            let slot = match &*key {
                "source" => &mut params.source,
                "cs" => &mut params.card_style,
                "c" => &mut params.container_size,
                "f" => &mut params.filter,
                "p" => &mut params.pagination,
                "pt" => &mut params.pagination_type,
                "s" => &mut params.search,
                _ => continue,
            };
            // First occurrence wins.
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    fn endpoint(&self) -> String {
        let mut url = format!("{COLLECTION_ENDPOINT}?contentSource=&originSelection=");
        if let Some(source) = &self.source {
            url.extend(byte_serialize(source.as_bytes()));
        }
        url.push_str(
            "&contentTypeTags=&collectionTags=&excludeContentWithTags=caas%3Aevents\
             &language=en&country=us&complexQuery=&excludeIds=&featuredCards=\
             &environment=&draft=true&size=300",
        );
        url
    }
}

/// Widget configuration for one collection.
pub fn collection_config(params: &CollectionParams) -> Value {
    json!({
        "collection": {
            "mode": "lightest",
            "layout": {
                "type": "2up",
                "gutter": "4x",
                "container": params.container_size,
            },
            "button": { "style": "primary" },
            "resultsPerPage": "8",
            "endpoint": params.endpoint(),
            "fallbackEndpoint": "",
            "totalCardsToShow": "300",
            "cardStyle": params.card_style,
            "showTotalResults": "false",
            "i18n": {
                "prettyDateIntervalFormat": "{ddd}, {LLL} {dd} | {timeRange} {timeZone}",
                "totalResultsText": "{total} results",
                "title": "",
                "onErrorTitle": "Sorry there was a system error.",
                "onErrorDescription": "Please try reloading the page or try coming back to the page another time.",
            },
            "setCardBorders": "false",
            "useOverlayLinks": "false",
            "useLightText": "false",
            "disableBanners": "false",
            "reservoir": { "sample": "3", "pool": "1000" },
        },
        "filterPanel": {
            "enabled": params.filter,
            "eventFilter": "not-timed",
            "type": "left",
            "showEmptyFilters": "true",
            "filters": [],
            "filterLogic": "or",
        },
        "sort": {
            "enabled": "true",
            "defaultSort": "dateDesc",
            "options": [],
        },
        "pagination": {
            "animationStyle": "paged",
            "enabled": params.pagination,
            "resultsQuantityShown": "true",
            "loadMoreButton": { "style": "primary", "useThemeThree": "false" },
            "type": params.pagination_type,
            "i18n": {
                "loadMore": {
                    "btnText": "Load More",
                    "resultsQuantityText": "{start} of {end} displayed",
                },
                "paginator": {
                    "resultsQuantityText": "{start} - {end} of {total} results",
                    "prevLabel": "Prev",
                    "nextLabel": "Next",
                },
            },
        },
        "bookmarks": {
            "showOnCards": "false",
            "leftFilterPanel": {
                "bookmarkOnlyCollection": "false",
                "showBookmarksFilter": "false",
                "selectBookmarksIcon": "",
                "unselectBookmarksIcon": "",
            },
        },
        "search": {
            "enabled": params.search,
            "searchFields": [],
            "i18n": {
                "noResultsTitle": "No Results Found",
                "noResultsDescription": "Try checking your spelling or broadening your search.",
            },
        },
        "language": "en",
        "country": "US",
        "analytics": { "trackImpressions": "", "collectionIdentifier": "" },
        "target": { "enabled": "" },
    })
}

/// Inline script mounting one collection. `</` is escaped so the payload
/// cannot close the script element.
fn bootstrap_script(mount_id: &str, config: &Value) -> Result<String, Error> {
    let config = serde_json::to_string(config).context("failed to serialize collection config")?;
    let mount_id = serde_json::to_string(mount_id).context("failed to serialize mount id")?;
    Ok(format!(
        "function goCaas(randomId, caasConfig) {{ const consonantlinkCollection = new ConsonantCardCollection(caasConfig, document.getElementById(randomId)); }}\n\
         goCaas({mount_id}, {config});"
    )
    .replace("</", "<\\/"))
}

/// Replaces every configurator link in the document with a `caas` block and
/// wires up the widget. Pages without such links are left untouched.
/// Returns the new blocks in document order.
///
/// # Errors
/// Returns an error if the tree rejects one of the edits.
pub fn build_embeds(doc: &mut Document, ctx: &PageContext) -> Result<Vec<NodeId>, Error> {
    let prefix = ctx.config().caas_prefix.as_str();
    let links = doc.find_all(doc.root(), |data| {
        data.is_element("a") && data.attr("href").is_some_and(|href| is_collection_link(href, prefix))
    });
    if links.is_empty() {
        return Ok(Vec::new());
    }
    debug!("building {} card collection embeds", links.len());

    attach_style(doc, APP_STYLESHEET)?;
    attach_style(doc, &ctx.code_href("/blocks/caas/caas.css"))?;
    for script in WIDGET_SCRIPTS {
        load_script(doc, script, None)?;
    }

    let body = doc.body().unwrap_or_else(|| doc.root());
    let mut blocks = Vec::with_capacity(links.len());
    for link in links {
        let href = doc.attr(link, "href").unwrap_or_default().to_owned();
        let placeholder = doc.create_element("div");
        doc.replace_with(link, placeholder)?;
        let block = build_block(doc, "caas", vec![vec![BlockCell::Node(link)]], BlockIdent::Random)?;
        doc.replace_with(placeholder, block)?;
        doc.remove(placeholder);

        let mount_id = rand::rng().random_range(0..100_000_u32).to_string();
        let mount = doc.create_element("div");
        doc.set_attr(mount, "id", &mount_id);
        doc.append_child(block, mount)?;

        let config = collection_config(&CollectionParams::from_href(&href));
        let script = doc.create_element("script");
        doc.set_attr(script, "class", "class-name");
        let code = doc.create_text(&bootstrap_script(&mount_id, &config)?);
        doc.append_child(script, code)?;
        doc.append_child(body, script)?;
        blocks.push(block);
    }
    Ok(blocks)
}

/// Whether `href` points at the collection configurator.
pub fn is_collection_link(href: &str, prefix: &str) -> bool {
    Url::parse(href).is_ok() && href.starts_with(prefix)
}
