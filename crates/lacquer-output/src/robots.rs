//! robots.txt generation.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::OutputError;

/// robots.txt configuration. Presence enables generation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RobotsConfig {
    #[serde(default)]
    pub policies: Vec<RobotsPolicy>,
}

/// One `User-agent:` block.
#[derive(Debug, Clone, Deserialize)]
pub struct RobotsPolicy {
    pub user_agent: String,

    #[serde(default)]
    pub allow: Rules,

    #[serde(default)]
    pub disallow: Rules,
}

/// A single rule value or a list of them; every value becomes its own line.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Rules {
    One(String),
    Many(Vec<String>),
}

impl Default for Rules {
    fn default() -> Self {
        Rules::Many(Vec::new())
    }
}

impl Rules {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        match self {
            Rules::One(value) => std::slice::from_ref(value).iter(),
            Rules::Many(values) => values.iter(),
        }
        .map(String::as_str)
    }
}

/// Compose the robots.txt body: one block per policy in array order, with a
/// trailing `Sitemap:` line when a sitemap hostname is configured.
pub fn build_robots(config: &RobotsConfig, sitemap_hostname: Option<&str>) -> String {
    let mut out = String::new();

    for policy in &config.policies {
        out.push_str("User-agent: ");
        out.push_str(&policy.user_agent);
        out.push('\n');

        for rule in policy.allow.iter() {
            out.push_str("Allow: ");
            out.push_str(rule);
            out.push('\n');
        }

        for rule in policy.disallow.iter() {
            out.push_str("Disallow: ");
            out.push_str(rule);
            out.push('\n');
        }

        out.push('\n');
    }

    if let Some(hostname) = sitemap_hostname {
        out.push_str("Sitemap: ");
        out.push_str(hostname.trim_end_matches('/'));
        out.push_str("/sitemap.xml\n");
    }

    out.trim().to_string()
}

/// Write `robots.txt` into the output directory.
pub fn write_robots(
    output_dir: &Path,
    config: &RobotsConfig,
    sitemap_hostname: Option<&str>,
) -> Result<(), OutputError> {
    let path = output_dir.join("robots.txt");
    let body = build_robots(config, sitemap_hostname);

    fs::write(&path, body).map_err(|e| OutputError::Write {
        path: path.clone(),
        message: e.to_string(),
    })?;

    tracing::info!("Wrote {}", path.display());
    Ok(())
}
