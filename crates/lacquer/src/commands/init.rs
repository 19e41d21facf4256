//! Write a template config file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command.
pub fn run(force: bool) -> Result<()> {
    let config_path = Path::new("lacquer.config.toml");

    if config_path.exists() && !force {
        tracing::warn!("lacquer.config.toml already exists. Use --force to overwrite.");
        return Ok(());
    }

    fs::write(config_path, DEFAULT_CONFIG).context("Failed to write lacquer.config.toml")?;
    tracing::info!("Created lacquer.config.toml");
    tracing::info!("Build your app, then run 'lacquer generate'.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r##"# Lacquer configuration

# Directory containing the built application
input_dir = "dist"

# Directory the prerendered site is written to
output_dir = "static"

# Optional public assets directory, copied to <output_dir>/assets
# public_dir = "public"

# Routes to prerender
routes = ["/"]

# Shell command run before generating
# build_command = "npm run build"

# "nested" (/about -> about/index.html) or "flat" (/about -> about.html)
file_naming = "nested"

# Maximum concurrently rendered routes
parallel = 4

# Maximum render attempts per route
retries = 3

# Collapse whitespace in rendered HTML
minify_html = false

# Meta tags injected into every rendered page
# [[inject_meta]]
# name = "prerendered"
# content = "true"

[browser]
headless = true
timeout_ms = 30000

[browser.viewport]
width = 1280
height = 800

[wait_for]
load = true
network_idle = false
# selector = "#app"
timeout_ms = 30000

# [sitemap]
# hostname = "https://example.com"
# exclude = ["/admin/*"]

# [[robots.policies]]
# user_agent = "*"
# allow = "/"
"##;
