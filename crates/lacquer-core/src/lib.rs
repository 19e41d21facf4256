//! Route-rendering pipeline for lacquer.
//!
//! Converts a built client-rendered single-page application into static HTML
//! by serving it locally, driving headless Chrome across the configured
//! routes with batched concurrency and retries, and persisting the results.

pub mod config;
pub mod hooks;
pub mod naming;
pub mod pipeline;
pub mod postprocess;
pub mod renderer;
pub mod routes;
pub mod scheduler;

pub use config::{
    load_config, BrowserConfig, ConfigError, FileNaming, MetaTag, RenderConfig, RobotsConfig,
    RobotsPolicy, Rules, SitemapConfig, Viewport, WaitFor,
};
pub use hooks::{HookError, NoopHooks, RenderHooks};
pub use naming::NamingStrategy;
pub use pipeline::{generate, GenerateError, Prerenderer, RenderStats};
pub use renderer::{ChromeRenderer, RenderError, Renderer};
pub use routes::{RouteError, RouteSource};
pub use scheduler::RenderResult;
