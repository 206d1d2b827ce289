//! Locating and rewriting `<img>` references in rich-text fragments.
//!
//! Fragments are parsed into an owned tree, inspected or transformed, and
//! re-serialized. Serialization is normalized: attributes come out in
//! alphabetical order and void elements are self-closed. Element structure,
//! text, and attribute values are preserved verbatim.

use std::collections::HashMap;

use html_parser::{Dom, Element, ElementVariant, Node};
use imgrate_core::models::{ImageRef, Replacement};
use imgrate_core::AppError;

/// Attribute that keeps the pre-migration locator on rewritten images.
const PRESERVE_ATTR: &str = "src_ori";

#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("failed to parse markup: {0}")]
    Parse(String),
}

impl From<MarkupError> for AppError {
    fn from(err: MarkupError) -> Self {
        AppError::Markup(err.to_string())
    }
}

/// Collect the image references of a fragment in document order.
///
/// Only `<img>` elements with a non-empty `src` attribute are returned;
/// empty or whitespace-only input yields an empty list. The input is
/// never mutated.
pub fn extract_images(fragment: &str) -> Result<Vec<ImageRef>, MarkupError> {
    if fragment.trim().is_empty() {
        return Ok(Vec::new());
    }

    let dom = parse(fragment)?;
    let mut images = Vec::new();
    collect_images(&dom.children, &mut images);
    Ok(images)
}

/// Rewrite every `<img>` whose `src` exactly matches a replacement:
/// the original locator is kept in `src_ori` and `src` becomes the new
/// public URL. Unmatched elements keep their attributes untouched.
///
/// An already-present `src_ori` is preserved, which makes the rewrite
/// idempotent over repeated runs. If the same locator appears twice in
/// the replacement list, the last entry wins.
pub fn rewrite_images(
    fragment: &str,
    replacements: &[Replacement],
) -> Result<String, MarkupError> {
    if fragment.trim().is_empty() || replacements.is_empty() {
        return Ok(fragment.to_string());
    }

    let map: HashMap<&str, &str> = replacements
        .iter()
        .map(|r| (r.original_src.as_str(), r.new_url.as_str()))
        .collect();

    let mut dom = parse(fragment)?;
    rewrite_nodes(&mut dom.children, &map);

    let mut out = String::with_capacity(fragment.len());
    serialize_nodes(&dom.children, &mut out);
    Ok(out)
}

fn parse(fragment: &str) -> Result<Dom, MarkupError> {
    Dom::parse(fragment).map_err(|e| MarkupError::Parse(e.to_string()))
}

fn collect_images(nodes: &[Node], out: &mut Vec<ImageRef>) {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.name.eq_ignore_ascii_case("img") {
                if let Some(Some(src)) = el.attributes.get("src") {
                    if !src.is_empty() {
                        out.push(ImageRef { src: src.clone() });
                    }
                }
            }
            collect_images(&el.children, out);
        }
    }
}

fn rewrite_nodes(nodes: &mut [Node], map: &HashMap<&str, &str>) {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.name.eq_ignore_ascii_case("img") {
                let matched = el
                    .attributes
                    .get("src")
                    .and_then(|v| v.as_deref())
                    .and_then(|src| map.get(src).map(|new| (src.to_string(), new.to_string())));
                if let Some((original, new_url)) = matched {
                    el.attributes
                        .entry(PRESERVE_ATTR.to_string())
                        .or_insert(Some(original));
                    el.attributes.insert("src".to_string(), Some(new_url));
                }
            }
            rewrite_nodes(&mut el.children, map);
        }
    }
}

fn serialize_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::Element(el) => serialize_element(el, out),
        }
    }
}

fn serialize_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);

    // The parser splits id/class out of the attribute map; fold them back
    // in before normalizing the order.
    let mut attrs: Vec<(String, Option<String>)> = Vec::new();
    if let Some(id) = &el.id {
        attrs.push(("id".to_string(), Some(id.clone())));
    }
    if !el.classes.is_empty() {
        attrs.push(("class".to_string(), Some(el.classes.join(" "))));
    }
    attrs.extend(el.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
    attrs.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, value) in &attrs {
        out.push(' ');
        out.push_str(name);
        if let Some(value) = value {
            out.push_str("=\"");
            out.push_str(&value.replace('"', "&quot;"));
            out.push('"');
        }
    }

    match el.variant {
        ElementVariant::Void => out.push_str("/>"),
        ElementVariant::Normal => {
            out.push('>');
            serialize_nodes(&el.children, out);
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}
