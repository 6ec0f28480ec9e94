//! Anchor rewriting and variant class clean-up.

use anyhow::Error;
use html::{Document, NodeId};
use log::debug;
use url::Url;

/// Hosts `<anything>{project}.hlx3.page` and `<anything>{project}.hlx.live`
/// serve the project itself.
fn is_project_host(host: &str, project: &str) -> bool {
    host.ends_with(&format!("{project}.hlx3.page")) || host.ends_with(&format!("{project}.hlx.live"))
}

/// Rewrites links to the project's own preview and live hosts as
/// path + query + fragment; every other link opens in a new tab.
///
/// Returns the resulting href, or `None` for anchors without a resolvable
/// href, which are left untouched.
pub fn make_relative(doc: &mut Document, anchor: NodeId, page_url: &Url, project: &str) -> Option<String> {
    let href = doc.attr(anchor, "href")?.to_owned();
    let url = match page_url.join(&href) {
        Ok(url) => url,
        Err(err) => {
            debug!("skipping anchor with href {href:?}: {err}");
            return None;
        }
    };
    if url.host_str().is_some_and(|host| is_project_host(host, project)) {
        let mut relative = url.path().to_owned();
        if let Some(query) = url.query() {
            relative.push('?');
            relative.push_str(query);
        }
        if let Some(fragment) = url.fragment() {
            relative.push('#');
            relative.push_str(fragment);
        }
        doc.set_attr(anchor, "href", &relative);
        return Some(relative);
    }
    doc.set_attr(anchor, "target", "_blank");
    Some(url.into())
}

/// Turns an anchor whose text names an `.svg` file into an image: the image
/// replaces the anchor when the text is the href itself, otherwise it becomes
/// the anchor's only content.
///
/// Returns the inserted `img`, if any.
///
/// # Errors
/// Returns an error if the tree rejects the edit.
pub fn set_svg(doc: &mut Document, anchor: NodeId) -> Result<Option<NodeId>, Error> {
    let text = doc.text_content(anchor);
    let extension = text.rsplit_once('.').map_or(text.as_str(), |(_, ext)| ext);
    if extension != "svg" {
        return Ok(None);
    }
    let img = doc.create_element("img");
    doc.set_attr(img, "src", &text);
    if doc.attr(anchor, "href") == Some(text.as_str()) {
        doc.insert_after(anchor, img)?;
        doc.remove(anchor);
    } else {
        doc.set_text_content(anchor, "")?;
        doc.append_child(anchor, img)?;
    }
    Ok(Some(img))
}

/// Applies [`make_relative`] and [`set_svg`] to every anchor under `parent`.
/// Returns the anchors in document order.
///
/// # Errors
/// Returns an error if an SVG replacement fails.
pub fn decorate_anchors(
    doc: &mut Document,
    parent: NodeId,
    page_url: &Url,
    project: &str,
) -> Result<Vec<NodeId>, Error> {
    let anchors = doc.find_all(parent, |data| data.is_element("a"));
    for anchor in &anchors {
        make_relative(doc, *anchor, page_url, project);
        set_svg(doc, *anchor)?;
    }
    Ok(anchors)
}

/// Expands authored variant classes: `marquee--small--contained-` becomes
/// `marquee small contained`. Only elements whose `class` attribute ends in
/// `-` are touched. Returns them in document order.
pub fn clean_variations(doc: &mut Document, parent: NodeId) -> Vec<NodeId> {
    let variants = doc.find_all(parent, |data| data.attr("class").is_some_and(|class| class.ends_with('-')));
    for node in &variants {
        let Some(class_name) = doc.attr(*node, "class").map(str::to_owned) else {
            continue;
        };
        let clipped = class_name.strip_suffix('-').unwrap_or(&class_name);
        doc.remove_class(*node, &class_name);
        doc.add_classes(*node, clipped.split("--"));
    }
    variants
}
