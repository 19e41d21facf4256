//! Generation pipeline.
//!
//! Orchestrates one run: resolve routes, prepare the output tree, start the
//! ephemeral server, launch the browser, schedule renders, assemble the
//! output, and tear resources down in reverse-acquisition order (browser
//! before server) on every path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use url::Url;

use lacquer_output::OutputError;
use lacquer_server::{ServerError, StaticServer};

use crate::config::RenderConfig;
use crate::hooks::{NoopHooks, RenderHooks};
use crate::naming::NamingStrategy;
use crate::renderer::{ChromeRenderer, RenderError, Renderer};
use crate::routes::{resolve_routes, RouteError, RouteSource};
use crate::scheduler::{self, RenderResult};

/// Errors that abort a generation run.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Routes(#[from] RouteError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("Failed to prepare output directory {path}: {message}")]
    Prepare { path: PathBuf, message: String },
}

/// Aggregate of one generation run.
#[derive(Debug)]
pub struct RenderStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub duration: Duration,
    pub results: Vec<RenderResult>,
}

/// Prerender the configured routes. One-call entry point over
/// [`Prerenderer`].
pub async fn generate(config: RenderConfig) -> Result<RenderStats, GenerateError> {
    Prerenderer::new(config).run().await
}

/// A configured generation run.
///
/// Route callbacks, generators, hooks, and custom naming are attached here;
/// everything data-shaped comes from the [`RenderConfig`].
pub struct Prerenderer {
    config: RenderConfig,
    sources: Vec<RouteSource>,
    hooks: Arc<dyn RenderHooks>,
    naming: NamingStrategy,
}

impl Prerenderer {
    pub fn new(config: RenderConfig) -> Self {
        let sources = vec![RouteSource::Static(config.routes.clone())];
        let naming = NamingStrategy::from(config.file_naming);

        Self {
            config,
            sources,
            hooks: Arc::new(NoopHooks),
            naming,
        }
    }

    /// Add a route callback or dynamic generator, resolved in declaration
    /// order after the static list.
    pub fn with_route_source(mut self, source: RouteSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn RenderHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Override the naming scheme; a custom strategy wins over the
    /// configured `file_naming`.
    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Run the full pipeline against headless Chrome.
    pub async fn run(self) -> Result<RenderStats, GenerateError> {
        let renderer = ChromeRenderer::new(
            Arc::new(self.config.clone()),
            Arc::clone(&self.hooks),
        );
        self.run_with_renderer(Box::new(renderer)).await
    }

    async fn run_with_renderer(
        self,
        mut renderer: Box<dyn Renderer>,
    ) -> Result<RenderStats, GenerateError> {
        let start = Instant::now();

        // Resolution failures abort before any resource is acquired.
        let routes = resolve_routes(&self.sources)?;
        tracing::info!("Resolved {} routes", routes.len());

        self.prepare_output().await?;

        let server = StaticServer::start(
            self.config.input_dir.clone(),
            &self.config.host,
            self.config.port,
        )
        .await?;
        tracing::info!("Serving {} at {}", self.config.input_dir.display(), server.url());

        let outcome = self
            .render_and_assemble(renderer.as_mut(), server.url(), &routes)
            .await;

        // Server teardown happens after renderer teardown, on every path.
        server.close().await;

        let results = outcome?;
        Ok(stats(results, start.elapsed()))
    }

    async fn render_and_assemble(
        &self,
        renderer: &mut dyn Renderer,
        server_url: &Url,
        routes: &[String],
    ) -> Result<Vec<RenderResult>, GenerateError> {
        renderer.initialize()?;

        let results = self.schedule(&*renderer, server_url, routes).await;

        renderer.close();

        self.assemble(&results)?;
        Ok(results)
    }

    async fn schedule(
        &self,
        renderer: &dyn Renderer,
        server_url: &Url,
        routes: &[String],
    ) -> Vec<RenderResult> {
        scheduler::render_routes(
            renderer,
            server_url,
            routes,
            &self.naming,
            &self.config.output_dir,
            self.config.parallel,
            self.config.retries,
        )
        .await
    }

    /// Copy assets and derive the SEO artifacts from the render results.
    fn assemble(&self, results: &[RenderResult]) -> Result<(), GenerateError> {
        // Asset copying is best-effort and never fails the run.
        match lacquer_output::copy_assets(&self.config.input_dir, &self.config.output_dir) {
            Ok(copied) => tracing::info!("Copied {} assets", copied),
            Err(e) => tracing::warn!("Asset copy failed: {}", e),
        }

        if let Some(public_dir) = &self.config.public_dir {
            if let Err(e) = lacquer_output::copy_public_dir(public_dir, &self.config.output_dir) {
                tracing::warn!("Public directory copy failed: {}", e);
            }
        }

        let successful: Vec<String> = results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.route.clone())
            .collect();

        if let Some(sitemap) = &self.config.sitemap {
            lacquer_output::write_sitemap(&self.config.output_dir, sitemap, &successful)?;
        }

        if let Some(robots) = &self.config.robots {
            let hostname = self.config.sitemap.as_ref().map(|s| s.hostname.as_str());
            lacquer_output::write_robots(&self.config.output_dir, robots, hostname)?;
        }

        Ok(())
    }

    async fn prepare_output(&self) -> Result<(), GenerateError> {
        lacquer_output::clean_output(&self.config.output_dir)?;

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| GenerateError::Prepare {
                path: self.config.output_dir.clone(),
                message: e.to_string(),
            })
    }
}

fn stats(results: Vec<RenderResult>, duration: Duration) -> RenderStats {
    let success = results.iter().filter(|r| r.success).count();
    let failed = results.len() - success;

    RenderStats {
        total: results.len(),
        success,
        failed,
        duration,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use async_trait::async_trait;
    use tempfile::tempdir;

    use crate::config::SitemapConfig;
    use crate::hooks::HookError;

    /// Renderer that serves canned markup without a browser, exercising the
    /// full pipeline around it.
    struct StubRenderer {
        fail_routes: Vec<String>,
    }

    #[async_trait]
    impl Renderer for StubRenderer {
        async fn render(&self, _server_url: &Url, route: &str) -> Result<String, RenderError> {
            if self.fail_routes.iter().any(|r| r == route) {
                return Err(RenderError::Navigation {
                    route: route.to_string(),
                    message: "stubbed".to_string(),
                });
            }
            Ok(format!("<html><head></head><body>{route}</body></html>"))
        }
    }

    fn test_config(temp: &tempfile::TempDir) -> RenderConfig {
        let input = temp.path().join("dist");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("index.html"), "<html>app shell</html>").unwrap();
        fs::write(input.join("app.js"), "console.log(1)").unwrap();

        RenderConfig {
            input_dir: input,
            output_dir: temp.path().join("static"),
            routes: vec!["/".to_string(), "/about".to_string()],
            parallel: 2,
            retries: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn end_to_end_renders_routes_and_assembles_output() {
        let temp = tempdir().unwrap();
        let config = test_config(&temp);
        let output_dir = config.output_dir.clone();

        let stats = Prerenderer::new(config)
            .run_with_renderer(Box::new(StubRenderer { fail_routes: vec![] }))
            .await
            .unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.success, 2);
        assert_eq!(stats.failed, 0);

        assert!(output_dir.join("index.html").exists());
        assert!(output_dir.join("about/index.html").exists());
        // non-HTML assets are mirrored; the shell HTML is not
        assert!(output_dir.join("app.js").exists());
        assert_eq!(
            fs::read_to_string(output_dir.join("about/index.html")).unwrap(),
            "<html><head></head><body>/about</body></html>"
        );
    }

    #[tokio::test]
    async fn failed_routes_are_counted_not_fatal() {
        let temp = tempdir().unwrap();
        let config = test_config(&temp);

        let stats = Prerenderer::new(config)
            .run_with_renderer(Box::new(StubRenderer {
                fail_routes: vec!["/about".to_string()],
            }))
            .await
            .unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.success, 1);
        assert_eq!(stats.failed, 1);

        let failed = &stats.results[1];
        assert_eq!(failed.route, "/about");
        assert!(failed.error.is_some());
    }

    #[tokio::test]
    async fn sitemap_and_robots_derive_from_successes() {
        let temp = tempdir().unwrap();
        let mut config = test_config(&temp);
        config.routes = vec!["/".to_string(), "/admin/x".to_string(), "/blog/a".to_string()];
        config.sitemap = Some(SitemapConfig {
            hostname: "https://example.com".to_string(),
            exclude: vec!["/admin/*".to_string()],
        });
        config.robots = Some(lacquer_output::RobotsConfig {
            policies: vec![lacquer_output::RobotsPolicy {
                user_agent: "*".to_string(),
                allow: lacquer_output::Rules::One("/".to_string()),
                disallow: lacquer_output::Rules::default(),
            }],
        });
        let output_dir = config.output_dir.clone();

        Prerenderer::new(config)
            .run_with_renderer(Box::new(StubRenderer { fail_routes: vec![] }))
            .await
            .unwrap();

        let sitemap = fs::read_to_string(output_dir.join("sitemap.xml")).unwrap();
        assert!(sitemap.contains("https://example.com/blog/a"));
        assert!(!sitemap.contains("/admin/x"));

        let robots = fs::read_to_string(output_dir.join("robots.txt")).unwrap();
        assert!(robots.contains("User-agent: *"));
        assert!(robots.ends_with("Sitemap: https://example.com/sitemap.xml"));
    }

    #[tokio::test]
    async fn generator_failure_aborts_before_server_start() {
        let temp = tempdir().unwrap();
        let config = test_config(&temp);
        let output_dir = config.output_dir.clone();

        let prerenderer =
            Prerenderer::new(config).with_route_source(RouteSource::Generator {
                name: "broken".to_string(),
                produce: Box::new(|| Err("boom".into())),
            });

        let err = prerenderer
            .run_with_renderer(Box::new(StubRenderer { fail_routes: vec![] }))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::Routes(_)));
        // resolution failed before the output tree was prepared
        assert!(!output_dir.exists());
    }

    #[tokio::test]
    async fn hooks_can_rewrite_markup() {
        struct StampHooks;

        impl RenderHooks for StampHooks {
            fn after_render(&self, _route: &str, html: String) -> Result<String, HookError> {
                Ok(html.replace("</body>", "<!-- stamped --></body>"))
            }
        }

        let temp = tempdir().unwrap();
        let config = test_config(&temp);
        let output_dir = config.output_dir.clone();

        // after_render runs inside the Chrome renderer; exercise the hook
        // contract through the full pipeline via a wrapping stub.
        struct HookedStub(StampHooks);

        #[async_trait]
        impl Renderer for HookedStub {
            async fn render(&self, _server_url: &Url, route: &str) -> Result<String, RenderError> {
                let html = format!("<html><body>{route}</body></html>");
                self.0
                    .after_render(route, html)
                    .map_err(|e| RenderError::Hook {
                        route: route.to_string(),
                        message: e.to_string(),
                    })
            }
        }

        let stats = Prerenderer::new(config)
            .run_with_renderer(Box::new(HookedStub(StampHooks)))
            .await
            .unwrap();

        assert_eq!(stats.failed, 0);
        assert!(fs::read_to_string(output_dir.join("index.html"))
            .unwrap()
            .contains("<!-- stamped -->"));
    }

    #[tokio::test]
    async fn renderer_lifecycle_brackets_the_run() {
        use std::sync::atomic::{AtomicBool, Ordering};

        #[derive(Default)]
        struct Lifecycle {
            initialized: Arc<AtomicBool>,
            closed: Arc<AtomicBool>,
        }

        struct TrackedRenderer(Lifecycle);

        #[async_trait]
        impl Renderer for TrackedRenderer {
            fn initialize(&mut self) -> Result<(), RenderError> {
                self.0.initialized.store(true, Ordering::SeqCst);
                Ok(())
            }

            async fn render(&self, _server_url: &Url, route: &str) -> Result<String, RenderError> {
                assert!(self.0.initialized.load(Ordering::SeqCst));
                assert!(!self.0.closed.load(Ordering::SeqCst));
                Ok(format!("<html><body>{route}</body></html>"))
            }

            fn close(&mut self) {
                self.0.closed.store(true, Ordering::SeqCst);
            }
        }

        let temp = tempdir().unwrap();
        let config = test_config(&temp);

        let lifecycle = Lifecycle::default();
        let initialized = Arc::clone(&lifecycle.initialized);
        let closed = Arc::clone(&lifecycle.closed);

        let stats = Prerenderer::new(config)
            .run_with_renderer(Box::new(TrackedRenderer(lifecycle)))
            .await
            .unwrap();

        assert_eq!(stats.failed, 0);
        assert!(initialized.load(Ordering::SeqCst));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn launch_failure_is_fatal_and_still_frees_the_server() {
        struct BrokenRenderer;

        #[async_trait]
        impl Renderer for BrokenRenderer {
            fn initialize(&mut self) -> Result<(), RenderError> {
                Err(RenderError::Launch("no browser".to_string()))
            }

            async fn render(&self, _server_url: &Url, _route: &str) -> Result<String, RenderError> {
                unreachable!("render must not run after a failed initialize")
            }
        }

        let temp = tempdir().unwrap();
        let mut config = test_config(&temp);
        config.port = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        let addr = format!("{}:{}", config.host, config.port);

        let err = Prerenderer::new(config)
            .run_with_renderer(Box::new(BrokenRenderer))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Render(RenderError::Launch(_))));

        // The ephemeral server must have released its port on the error path.
        drop(std::net::TcpListener::bind(addr).unwrap());
    }
}
