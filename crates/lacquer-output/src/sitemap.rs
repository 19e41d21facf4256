//! Sitemap generation.
//!
//! Produces a minimal `urlset` document from the successfully rendered
//! routes, resolved against the configured hostname:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/</loc>
//!   </url>
//! </urlset>
//! ```

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::OutputError;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Sitemap configuration. Presence of the `hostname` enables generation.
#[derive(Debug, Clone, Deserialize)]
pub struct SitemapConfig {
    /// Absolute origin routes are resolved against, e.g. `https://example.com`.
    pub hostname: String,

    /// Glob-style exclude patterns where `*` matches any substring.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Build the sitemap XML for the given routes, in order, dropping any route
/// matched by an exclude pattern.
pub fn build_sitemap(config: &SitemapConfig, routes: &[String]) -> String {
    let matchers: Vec<Regex> = config
        .exclude
        .iter()
        .filter_map(|p| glob_to_regex(p))
        .collect();

    let base = config.hostname.trim_end_matches('/');

    let mut xml = String::with_capacity(4096);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"");
    xml.push_str(SITEMAP_NS);
    xml.push_str("\">\n");

    for route in routes {
        if matchers.iter().any(|m| m.is_match(route)) {
            continue;
        }

        xml.push_str("  <url>\n    <loc>");
        xml.push_str(&escape_xml(&format!("{}{}", base, route)));
        xml.push_str("</loc>\n  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Write `sitemap.xml` into the output directory.
pub fn write_sitemap(
    output_dir: &Path,
    config: &SitemapConfig,
    routes: &[String],
) -> Result<(), OutputError> {
    let path = output_dir.join("sitemap.xml");
    let xml = build_sitemap(config, routes);

    fs::write(&path, xml).map_err(|e| OutputError::Write {
        path: path.clone(),
        message: e.to_string(),
    })?;

    tracing::info!("Wrote {}", path.display());
    Ok(())
}

/// Convert an exclude pattern into an anchored regex where `*` matches any
/// substring and every other character is literal.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut source = String::with_capacity(pattern.len() + 4);
    source.push('^');
    for part in pattern.split('*') {
        source.push_str(&regex::escape(part));
        source.push_str(".*");
    }
    // split always yields one trailing part, so the last ".*" is surplus
    source.truncate(source.len() - 2);
    source.push('$');

    match Regex::new(&source) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("Ignoring invalid exclude pattern '{pattern}': {e}");
            None
        }
    }
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}
