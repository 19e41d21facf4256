//! Render worker: drives one headless Chrome process.
//!
//! One [`ChromeRenderer`] is initialized per run and shared by every route;
//! each render attempt gets its own isolated page context (tab) which is
//! always closed, success or failure. The blocking DevTools calls run on the
//! blocking thread pool so the scheduler's batches stay cooperative.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use url::Url;

use crate::config::RenderConfig;
use crate::hooks::RenderHooks;
use crate::postprocess;

/// Errors raised while rendering a single route.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Browser not initialized")]
    NotInitialized,

    #[error("Failed to open page context: {0}")]
    Page(String),

    #[error("Navigation to {route} failed: {message}")]
    Navigation { route: String, message: String },

    #[error("Wait condition failed for {route}: {message}")]
    Wait { route: String, message: String },

    #[error("Hook failed for {route}: {message}")]
    Hook { route: String, message: String },

    #[error("Invalid route URL: {0}")]
    Url(String),

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("Render task failed: {0}")]
    Task(String),
}

/// Renders one route against the ephemeral server.
///
/// The scheduler and pipeline only depend on this seam, so retry, batching,
/// and teardown behavior can be exercised without a browser.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Acquire the backing process, if any. Called once, before the first
    /// render.
    fn initialize(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    async fn render(&self, server_url: &Url, route: &str) -> Result<String, RenderError>;

    /// Release the backing process. Idempotent.
    fn close(&mut self) {}
}

/// Renderer backed by a single headless Chrome process.
pub struct ChromeRenderer {
    config: Arc<RenderConfig>,
    hooks: Arc<dyn RenderHooks>,
    browser: Option<Browser>,
}

impl ChromeRenderer {
    pub fn new(config: Arc<RenderConfig>, hooks: Arc<dyn RenderHooks>) -> Self {
        Self {
            config,
            hooks,
            browser: None,
        }
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    /// Launch the browser process.
    fn initialize(&mut self) -> Result<(), RenderError> {
        let browser_config = &self.config.browser;

        let mut args: Vec<&std::ffi::OsStr> = Vec::new();
        if browser_config.devtools {
            args.push(std::ffi::OsStr::new("--auto-open-devtools-for-tabs"));
        }

        let options = LaunchOptions::default_builder()
            .headless(browser_config.headless)
            .args(args)
            .window_size(Some((
                browser_config.viewport.width,
                browser_config.viewport.height,
            )))
            .path(browser_config.chrome_path.clone())
            .idle_browser_timeout(Duration::from_millis(browser_config.timeout_ms.max(60_000)))
            .build()
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| RenderError::Launch(e.to_string()))?;

        tracing::debug!("Browser launched (headless: {})", browser_config.headless);
        self.browser = Some(browser);
        Ok(())
    }

    /// Tear the browser process down. Safe without a prior
    /// [`Renderer::initialize`].
    fn close(&mut self) {
        if self.browser.take().is_some() {
            tracing::debug!("Browser closed");
        }
    }

    async fn render(&self, server_url: &Url, route: &str) -> Result<String, RenderError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or(RenderError::NotInitialized)?
            .clone();

        let url = server_url
            .join(route)
            .map_err(|e| RenderError::Url(e.to_string()))?;

        let config = Arc::clone(&self.config);
        let hooks = Arc::clone(&self.hooks);
        let route_name = route.to_string();

        let result = tokio::task::spawn_blocking(move || {
            render_in_tab(&browser, &config, hooks.as_ref(), &route_name, &url)
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))?;

        if let Err(ref error) = result {
            self.hooks.on_error(route, error);
        }

        result
    }
}

/// Open a tab, drive it through the render sequence, and close it on every
/// exit path.
fn render_in_tab(
    browser: &Browser,
    config: &RenderConfig,
    hooks: &dyn RenderHooks,
    route: &str,
    url: &Url,
) -> Result<String, RenderError> {
    let tab = browser
        .new_tab()
        .map_err(|e| RenderError::Page(e.to_string()))?;

    let outcome = drive_tab(&tab, config, hooks, route, url);

    if let Err(e) = tab.close(true) {
        tracing::debug!("Failed to close page context for {}: {}", route, e);
    }

    outcome
}

fn drive_tab(
    tab: &Tab,
    config: &RenderConfig,
    hooks: &dyn RenderHooks,
    route: &str,
    url: &Url,
) -> Result<String, RenderError> {
    hooks.before_render(route).map_err(|e| RenderError::Hook {
        route: route.to_string(),
        message: e.to_string(),
    })?;

    tab.set_default_timeout(Duration::from_millis(config.browser.timeout_ms));

    if let Some(user_agent) = &config.browser.user_agent {
        tab.set_user_agent(user_agent, None, None)
            .map_err(|e| RenderError::Page(e.to_string()))?;
    }

    tab.navigate_to(url.as_str())
        .map_err(|e| RenderError::Navigation {
            route: route.to_string(),
            message: e.to_string(),
        })?;

    // Network idle supersedes the plain load wait as the completion signal.
    if config.wait_for.network_idle {
        tab.wait_until_navigated()
            .map_err(|e| RenderError::Navigation {
                route: route.to_string(),
                message: e.to_string(),
            })?;
        tab.evaluate(NETWORK_IDLE_SCRIPT, true)
            .map_err(|e| RenderError::Wait {
                route: route.to_string(),
                message: e.to_string(),
            })?;
    } else if config.wait_for.load {
        tab.wait_until_navigated()
            .map_err(|e| RenderError::Navigation {
                route: route.to_string(),
                message: e.to_string(),
            })?;
    }

    if let Some(selector) = &config.wait_for.selector {
        tab.wait_for_element_with_custom_timeout(
            selector,
            Duration::from_millis(config.wait_for.timeout_ms),
        )
        .map_err(|e| RenderError::Wait {
            route: route.to_string(),
            message: e.to_string(),
        })?;
    }

    let html = tab
        .get_content()
        .map_err(|e| RenderError::Page(e.to_string()))?;

    let html = postprocess::apply(html, config);

    hooks
        .after_render(route, html)
        .map_err(|e| RenderError::Hook {
            route: route.to_string(),
            message: e.to_string(),
        })
}

/// In-page promise that resolves once the resource-entry count has been
/// stable for 500ms and the document is complete. The DevTools protocol
/// bounds the evaluation with the tab's default timeout.
const NETWORK_IDLE_SCRIPT: &str = r#"
new Promise((resolve) => {
  let seen = performance.getEntriesByType('resource').length;
  let lastChange = Date.now();
  const tick = () => {
    const count = performance.getEntriesByType('resource').length;
    if (count !== seen) {
      seen = count;
      lastChange = Date.now();
    }
    if (document.readyState === 'complete' && Date.now() - lastChange >= 500) {
      resolve(true);
      return;
    }
    setTimeout(tick, 100);
  };
  tick();
})
"#;
