//! Offline page decoration.
//!
//! Reads an authored HTML file, runs the decoration pipeline against a code
//! base on disk or on the web, and returns the decorated markup.

#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

use anyhow::{Context as _, Error, anyhow};
use html::parse_document;
use log::info;
use page_decorator::{
    BeaconSink, BlockRegistry, DecoratorConfig, FetchStyleLoader, HttpBeaconSink, NoopBeaconSink,
    NoopImageSignal, PageContext, PageDecorator,
};
use std::env;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tokio::fs::read_to_string;
use tokio::runtime::Builder;
use url::Url;

pub const USAGE: &str = "usage: decorate <input.html> [--base <dir-or-url>] [--url <page-url>] [--rum]";

/// Command line options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub input: PathBuf,
    /// Code base root, as a directory or URL.
    pub base: Option<String>,
    /// URL the page is served at.
    pub url: Option<String>,
    /// Post telemetry beacons for sampled views.
    pub rum: bool,
}

/// Parses arguments (without the program name). Accepts `--flag value` and
/// `--flag=value`.
///
/// # Errors
/// Returns an error for unknown flags, missing values, or a missing input.
pub fn parse_args<I>(args: I) -> Result<Options, Error>
where
    I: IntoIterator<Item = String>,
{
    let mut input = None;
    let mut base = None;
    let mut url = None;
    let mut rum = false;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if let Some(rest) = arg.strip_prefix("--base=") {
            base = Some(rest.to_owned());
        } else if let Some(rest) = arg.strip_prefix("--url=") {
            url = Some(rest.to_owned());
        } else if arg == "--base" {
            base = Some(args.next().ok_or_else(|| anyhow!("--base needs a value"))?);
        } else if arg == "--url" {
            url = Some(args.next().ok_or_else(|| anyhow!("--url needs a value"))?);
        } else if arg == "--rum" {
            rum = true;
        } else if arg.starts_with("--") {
            return Err(anyhow!("unknown option {arg}\n{USAGE}"));
        } else if input.is_none() {
            input = Some(PathBuf::from(arg));
        } else {
            return Err(anyhow!("unexpected argument {arg}\n{USAGE}"));
        }
    }
    Ok(Options {
        input: input.ok_or_else(|| anyhow!("missing input file\n{USAGE}"))?,
        base,
        url,
        rum,
    })
}

fn absolute(path: &Path) -> Result<PathBuf, Error> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(env::current_dir()
        .context("cannot read the working directory")?
        .join(path))
}

/// A URL when `raw` has a scheme, otherwise a directory on disk.
fn base_url(raw: &str) -> Result<Url, Error> {
    if let Ok(url) = Url::parse(raw) {
        return Ok(url);
    }
    let dir = absolute(Path::new(raw))?;
    Url::from_directory_path(&dir).map_err(|()| anyhow!("invalid base directory {}", dir.display()))
}

/// Page URL and asset base for a run.
fn locations(options: &Options) -> Result<(Url, Option<Url>), Error> {
    let base = options.base.as_deref().map(base_url).transpose()?;
    if let Some(raw) = &options.url {
        let page_url = Url::parse(raw).with_context(|| format!("invalid page url {raw}"))?;
        return Ok((page_url, base));
    }
    let input = absolute(&options.input)?;
    let page_url =
        Url::from_file_path(&input).map_err(|()| anyhow!("invalid input path {}", input.display()))?;
    let base = match base {
        Some(base) => Some(base),
        None => input.parent().and_then(|dir| Url::from_directory_path(dir).ok()),
    };
    Ok((page_url, base))
}

/// Decorates the input file and returns the resulting HTML.
///
/// # Errors
/// Returns an error if the input cannot be read or parsed, or a URL is invalid.
pub async fn decorate_file(options: &Options) -> Result<String, Error> {
    let source = read_to_string(&options.input)
        .await
        .with_context(|| format!("cannot read {}", options.input.display()))?;
    let document = parse_document(&source)?;
    let (page_url, base) = locations(options)?;
    info!("decorating {page_url}");

    let http_beacons = options.rum.then(|| Rc::new(HttpBeaconSink::new()));
    let beacons: Rc<dyn BeaconSink> = match http_beacons.clone() {
        Some(sink) => sink,
        None => Rc::new(NoopBeaconSink),
    };
    let mut builder = PageContext::builder(page_url)
        .config(DecoratorConfig::from_env())
        .code_base_from(&document)
        .style_loader(Rc::new(FetchStyleLoader))
        .image_signal(Rc::new(NoopImageSignal))
        .resolver(Rc::new(BlockRegistry::new()))
        .beacon_sink(beacons);
    if let Some(base) = base {
        builder = builder.asset_base(base);
    }

    let mut page = PageDecorator::new(document, builder.build());
    page.decorate_page().await?;
    // The runtime is dropped right after this returns.
    if let Some(sink) = http_beacons {
        sink.flush().await;
    }
    Ok(page.into_document()?.to_html())
}

/// Runs [`decorate_file`] on a current-thread runtime.
///
/// # Errors
/// Returns an error if the runtime cannot start or decoration fails.
pub fn run(options: &Options) -> Result<String, Error> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(decorate_file(options))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| (*arg).to_owned()).collect()
    }

    #[test]
    fn parses_both_flag_forms() {
        let options = parse_args(args(&["page.html", "--base", "site", "--url=https://example.com/", "--rum"])).unwrap();
        assert_eq!(options.input, PathBuf::from("page.html"));
        assert_eq!(options.base.as_deref(), Some("site"));
        assert_eq!(options.url.as_deref(), Some("https://example.com/"));
        assert!(options.rum);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["a.html", "--base"])).is_err());
        assert!(parse_args(args(&["a.html", "--verbose"])).is_err());
        assert!(parse_args(args(&["a.html", "b.html"])).is_err());
    }

    #[test]
    fn base_accepts_urls_and_directories() {
        assert_eq!(base_url("https://cdn.example/site/").unwrap().as_str(), "https://cdn.example/site/");
        let dir = tempfile::tempdir().unwrap();
        let url = base_url(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with('/'));
    }
}
