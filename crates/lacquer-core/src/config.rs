//! Configuration model and file discovery.
//!
//! A [`RenderConfig`] is a fully-defaulted snapshot consumed read-only by the
//! whole pipeline. It can be supplied programmatically or loaded from
//! `lacquer.config.{toml,json,yaml,yml}` in the working directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use lacquer_output::{RobotsConfig, RobotsPolicy, Rules, SitemapConfig};

/// Filenames probed, in order, when no explicit config path is given.
const CONFIG_CANDIDATES: [&str; 4] = [
    "lacquer.config.toml",
    "lacquer.config.json",
    "lacquer.config.yaml",
    "lacquer.config.yml",
];

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported config format: {0}")]
    Format(PathBuf),
}

/// Immutable configuration snapshot for one generation run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Directory containing the previously built application.
    pub input_dir: PathBuf,

    /// Directory the rendered site is written to.
    pub output_dir: PathBuf,

    /// Optional public assets directory, copied into `<output_dir>/assets`.
    pub public_dir: Option<PathBuf>,

    /// Local listen host for the ephemeral server.
    pub host: String,

    /// Local listen port; `0` means OS-assigned.
    pub port: u16,

    /// Static route list. Callbacks and generators are added via the
    /// [`Prerenderer`](crate::Prerenderer) API.
    pub routes: Vec<String>,

    /// On-disk naming scheme for rendered routes.
    pub file_naming: FileNaming,

    /// Maximum concurrently in-flight renders.
    pub parallel: usize,

    /// Maximum render attempts per route (the first attempt counts as one).
    pub retries: u32,

    /// Collapse whitespace in rendered HTML.
    pub minify_html: bool,

    /// Meta tags injected right after the opening `<head>` tag, in order.
    pub inject_meta: Vec<MetaTag>,

    pub browser: BrowserConfig,

    pub wait_for: WaitFor,

    /// Sitemap generation, enabled by presence.
    pub sitemap: Option<SitemapConfig>,

    /// robots.txt generation, enabled by presence.
    pub robots: Option<RobotsConfig>,

    /// Shell command the CLI runs before generating, e.g. `npm run build`.
    pub build_command: Option<String>,

    /// Declared by the config surface but not yet wired to any behavior.
    pub cache: bool,
    pub cache_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("dist"),
            output_dir: PathBuf::from("static"),
            public_dir: None,
            host: "127.0.0.1".to_string(),
            port: 0,
            routes: vec!["/".to_string()],
            file_naming: FileNaming::default(),
            parallel: 4,
            retries: 3,
            minify_html: false,
            inject_meta: Vec::new(),
            browser: BrowserConfig::default(),
            wait_for: WaitFor::default(),
            sitemap: None,
            robots: None,
            build_command: None,
            cache: false,
            cache_dir: None,
        }
    }
}

/// How a route maps to its output file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileNaming {
    /// `/about` -> `about/index.html`
    #[default]
    Nested,

    /// `/about/team` -> `about-team.html`
    Flat,
}

/// One injected `<meta name=... content=...>` tag.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaTag {
    pub name: String,
    pub content: String,
}

/// Browser engine launch options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub devtools: bool,

    /// Per-navigation timeout in milliseconds.
    pub timeout_ms: u64,

    pub viewport: Viewport,

    pub user_agent: Option<String>,

    /// Explicit Chrome/Chromium binary; auto-detected when absent.
    pub chrome_path: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            devtools: false,
            timeout_ms: 30_000,
            viewport: Viewport::default(),
            user_agent: None,
            chrome_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

/// Per-route readiness policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaitFor {
    /// Wait for the load event before extracting markup.
    pub load: bool,

    /// Wait for network activity to settle; takes precedence over the plain
    /// load wait as the completion signal.
    pub network_idle: bool,

    /// Additionally wait for this DOM selector to appear.
    pub selector: Option<String>,

    /// Upper bound for the wait conditions, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for WaitFor {
    fn default() -> Self {
        Self {
            load: true,
            network_idle: false,
            selector: None,
            timeout_ms: 30_000,
        }
    }
}

/// Load configuration from an explicit path, or discover it in the working
/// directory. Absence of any discoverable file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<RenderConfig, ConfigError> {
    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        return parse_file(path);
    }

    for candidate in CONFIG_CANDIDATES {
        let path = Path::new(candidate);
        if path.exists() {
            tracing::info!("Loaded config from {}", path.display());
            return parse_file(path);
        }
    }

    tracing::debug!("No config file found, using defaults");
    Ok(RenderConfig::default())
}

fn parse_file(path: &Path) -> Result<RenderConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parsed = match ext {
        "toml" => toml::from_str(&content).map_err(|e| e.to_string()),
        "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        _ => return Err(ConfigError::Format(path.to_path_buf())),
    };

    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}
