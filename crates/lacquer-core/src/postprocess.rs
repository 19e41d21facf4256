//! Post-processing of rendered markup.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{MetaTag, RenderConfig};

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));
static BETWEEN_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("Invalid tag-gap regex"));

/// Apply the configured post-processing steps in fixed order: meta injection,
/// then minification.
pub fn apply(html: String, config: &RenderConfig) -> String {
    let html = if config.inject_meta.is_empty() {
        html
    } else {
        inject_meta(&html, &config.inject_meta)
    };

    if config.minify_html {
        minify_html(&html)
    } else {
        html
    }
}

/// Insert one `<meta>` tag per entry immediately after the opening `<head>`
/// tag. Documents without a head are left unchanged.
pub fn inject_meta(html: &str, tags: &[MetaTag]) -> String {
    let Some(offset) = head_insert_offset(html) else {
        return html.to_string();
    };

    let mut injected = String::with_capacity(html.len() + tags.len() * 48);
    injected.push_str(&html[..offset]);
    for tag in tags {
        injected.push_str("<meta name=\"");
        injected.push_str(&escape_attr(&tag.name));
        injected.push_str("\" content=\"");
        injected.push_str(&escape_attr(&tag.content));
        injected.push_str("\">");
    }
    injected.push_str(&html[offset..]);
    injected
}

/// Collapse whitespace runs to single spaces and drop whitespace between
/// adjacent tags.
pub fn minify_html(html: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(html, " ");
    BETWEEN_TAGS.replace_all(&collapsed, "><").trim().to_string()
}

/// Byte offset just past the `>` of the opening `<head>` tag.
fn head_insert_offset(html: &str) -> Option<usize> {
    for (idx, _) in html.match_indices("<head") {
        let rest = &html[idx + 5..];
        match rest.chars().next() {
            Some('>') => return Some(idx + 6),
            // <head lang="..."> and friends
            Some(c) if c.is_whitespace() => return rest.find('>').map(|i| idx + 5 + i + 1),
            // e.g. <header>, keep scanning
            _ => continue,
        }
    }
    None
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
