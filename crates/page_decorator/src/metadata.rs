//! Page metadata and `<head>` resources.

use anyhow::{Error, anyhow};
use html::{Document, NodeId};

/// `content` of `<meta name=..>` in `<head>`, or of `<meta property=..>`
/// when the name contains a `:` (`og:title` and friends).
pub fn get_metadata(doc: &Document, name: &str) -> Option<String> {
    let head = doc.head()?;
    let key = if name.contains(':') { "property" } else { "name" };
    let meta = doc.find_first(head, |data| data.is_element("meta") && data.attr(key) == Some(name))?;
    doc.attr(meta, "content").map(str::to_owned)
}

/// Adds `<template>-template` to `<body>` when the page declares a template.
/// Returns the added class.
pub fn set_template(doc: &mut Document) -> Option<String> {
    let template = get_metadata(doc, "template").filter(|template| !template.is_empty())?;
    let body = doc.body()?;
    let class = format!("{template}-template");
    doc.add_class(body, &class);
    Some(class)
}

/// Installs `<link rel="icon" type="image/svg+xml" href>`, replacing the first
/// existing icon link in `<head>`.
///
/// # Errors
/// Returns an error if the link cannot be inserted.
pub fn add_fav_icon(doc: &mut Document, href: &str) -> Result<NodeId, Error> {
    let head = doc.ensure_head()?;
    let link = doc.create_element("link");
    doc.set_attr(link, "rel", "icon");
    doc.set_attr(link, "type", "image/svg+xml");
    doc.set_attr(link, "href", href);
    let existing = doc.find_first(head, |data| data.is_element("link") && data.attr("rel") == Some("icon"));
    match existing {
        Some(existing) => {
            doc.replace_with(existing, link)?;
            doc.remove(existing);
        }
        None => doc.append_child(head, link)?,
    }
    Ok(link)
}

/// Appends `<script src>` (with an optional `type`) to `<head>`.
///
/// # Errors
/// Returns an error if the document has no `<head>` and one cannot be made.
pub fn load_script(doc: &mut Document, src: &str, script_type: Option<&str>) -> Result<NodeId, Error> {
    if src.is_empty() {
        return Err(anyhow!("script without a source"));
    }
    let head = doc.ensure_head()?;
    let script = doc.create_element("script");
    doc.set_attr(script, "src", src);
    if let Some(script_type) = script_type {
        doc.set_attr(script, "type", script_type);
    }
    doc.append_child(head, script)?;
    Ok(script)
}
