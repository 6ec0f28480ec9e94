//! Configuration settings for the page decorator.
//!
//! This module defines the site-level knobs of the decoration pipeline: which
//! blocks count as largest-contentful-paint candidates, where telemetry goes,
//! and the conventional paths of shared resources. Configuration can be loaded
//! from environment variables or constructed programmatically.

use std::env;

/// Project identifier used for telemetry and same-site link detection.
pub const DEFAULT_PROJECT: &str = "consonant--adobecom";
/// Collection endpoint for RUM beacons; the sampling weight is appended.
pub const DEFAULT_RUM_ENDPOINT: &str = "https://rum.hlx3.page/.rum";
/// One in this many page views is sampled unless `?rum=on` is present.
pub const DEFAULT_RUM_WEIGHT: u32 = 100;
/// Path suffix of the page script; everything before it is the code base path.
pub const DEFAULT_SCRIPT_SUFFIX: &str = "/scripts/scripts.js";
pub const DEFAULT_FONTS_HREF: &str = "/fonts/fonts.css";
pub const DEFAULT_FAVICON_PATH: &str = "/img/icon.svg";
/// Anchors whose href starts with this prefix become card-collection embeds.
pub const DEFAULT_CAAS_PREFIX: &str = "http://cmiqueo.corp.adobe.com/chimera/index.html";

/// Runtime configuration for the page decorator.
#[derive(Clone, Debug)]
pub struct DecoratorConfig {
    /// Project identifier (telemetry `generation`, preview/live host suffix)
    pub project: String,
    /// Block names eligible for the eager, prioritized load
    pub lcp_blocks: Vec<String>,
    /// RUM collection endpoint without the trailing weight
    pub rum_endpoint: String,
    /// Sampling weight used when the page URL does not force sampling
    pub rum_weight: u32,
    /// Suffix of the page script URL used to derive the code base path
    pub script_suffix: String,
    /// Stylesheet attached once the lazy phase has started
    pub fonts_href: String,
    /// Favicon path relative to the code base path
    pub favicon_path: String,
    /// Href prefix identifying card-collection anchors
    pub caas_prefix: String,
}

impl Default for DecoratorConfig {
    fn default() -> Self {
        Self {
            project: DEFAULT_PROJECT.to_owned(),
            lcp_blocks: vec![String::from("marquee")],
            rum_endpoint: DEFAULT_RUM_ENDPOINT.to_owned(),
            rum_weight: DEFAULT_RUM_WEIGHT,
            script_suffix: DEFAULT_SCRIPT_SUFFIX.to_owned(),
            fonts_href: DEFAULT_FONTS_HREF.to_owned(),
            favicon_path: DEFAULT_FAVICON_PATH.to_owned(),
            caas_prefix: DEFAULT_CAAS_PREFIX.to_owned(),
        }
    }
}

impl DecoratorConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables, falling back to the
    /// defaults for anything unset or unparsable:
    /// - `DECORATOR_PROJECT`: project identifier
    /// - `DECORATOR_LCP_BLOCKS`: comma separated block names
    /// - `DECORATOR_RUM_ENDPOINT`: RUM collection endpoint
    /// - `DECORATOR_RUM_WEIGHT`: sampling weight (minimum 1)
    /// - `DECORATOR_FONTS_HREF`: fonts stylesheet href
    /// - `DECORATOR_CAAS_PREFIX`: card-collection anchor prefix
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str| env::var(name).ok().filter(|value| !value.trim().is_empty());
        Self {
            project: var("DECORATOR_PROJECT").unwrap_or(defaults.project),
            lcp_blocks: var("DECORATOR_LCP_BLOCKS")
                .map(|list| parse_list(&list))
                .unwrap_or(defaults.lcp_blocks),
            rum_endpoint: var("DECORATOR_RUM_ENDPOINT").unwrap_or(defaults.rum_endpoint),
            rum_weight: var("DECORATOR_RUM_WEIGHT")
                .and_then(|value| value.trim().parse::<u32>().ok())
                .map_or(defaults.rum_weight, |weight| weight.max(1)),
            script_suffix: defaults.script_suffix,
            fonts_href: var("DECORATOR_FONTS_HREF").unwrap_or(defaults.fonts_href),
            favicon_path: defaults.favicon_path,
            caas_prefix: var("DECORATOR_CAAS_PREFIX").unwrap_or(defaults.caas_prefix),
        }
    }

    /// Whether a block of this name is loaded ahead of everything else.
    pub fn is_lcp_block(&self, name: &str) -> bool {
        self.lcp_blocks.iter().any(|block| block == name)
    }
}

fn parse_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_site_conventions() {
        let config = DecoratorConfig::default();
        assert!(config.is_lcp_block("marquee"));
        assert!(!config.is_lcp_block("hero"));
        assert_eq!(config.rum_weight, 100);
        assert_eq!(config.script_suffix, "/scripts/scripts.js");
    }

    #[test]
    fn parses_comma_lists() {
        assert_eq!(parse_list(" marquee, hero ,,"), vec!["marquee", "hero"]);
        assert!(parse_list(" , ").is_empty());
    }
}
