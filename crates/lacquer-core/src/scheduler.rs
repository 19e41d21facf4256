//! Batch scheduling of render work.
//!
//! Routes are partitioned into consecutive windows of `parallel`; windows run
//! strictly sequentially while the routes inside a window race. Each route
//! gets a bounded retry loop, and a successful render is persisted to the
//! output tree immediately.

use std::path::{Path, PathBuf};

use url::Url;

use crate::naming::NamingStrategy;
use crate::renderer::{RenderError, Renderer};

/// Outcome of the scheduler's final attempt for one route.
#[derive(Debug)]
pub struct RenderResult {
    pub route: String,

    /// Rendered markup; empty on failure.
    pub html: String,

    /// Output path relative to the output directory.
    pub output_path: PathBuf,

    pub success: bool,

    /// Terminal error of the last attempt, on failure.
    pub error: Option<RenderError>,
}

/// Render every route, batch by batch, returning results in route order.
pub async fn render_routes(
    renderer: &dyn Renderer,
    server_url: &Url,
    routes: &[String],
    naming: &NamingStrategy,
    output_dir: &Path,
    parallel: usize,
    retries: u32,
) -> Vec<RenderResult> {
    let parallel = parallel.max(1);
    // The first attempt counts as attempt 1, so at least one always runs.
    let attempts = retries.max(1);

    let mut results = Vec::with_capacity(routes.len());

    for window in routes.chunks(parallel) {
        let batch = window.iter().map(|route| {
            render_with_retries(renderer, server_url, route, naming, output_dir, attempts)
        });

        // join_all preserves input order, so results stay aligned with the
        // resolved route list.
        results.extend(futures::future::join_all(batch).await);
    }

    results
}

async fn render_with_retries(
    renderer: &dyn Renderer,
    server_url: &Url,
    route: &str,
    naming: &NamingStrategy,
    output_dir: &Path,
    attempts: u32,
) -> RenderResult {
    let output_path = naming.output_path(route);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match renderer.render(server_url, route).await {
            Ok(html) => {
                tracing::debug!("Rendered {} (attempt {})", route, attempt);

                return match persist(output_dir, &output_path, &html).await {
                    Ok(()) => RenderResult {
                        route: route.to_string(),
                        html,
                        output_path,
                        success: true,
                        error: None,
                    },
                    // A failed write is terminal for the route.
                    Err(e) => {
                        tracing::warn!("Failed to persist {}: {}", route, e);
                        RenderResult {
                            route: route.to_string(),
                            html: String::new(),
                            output_path,
                            success: false,
                            error: Some(e),
                        }
                    }
                };
            }
            Err(e) => {
                tracing::warn!("Render attempt {} for {} failed: {}", attempt, route, e);
                last_error = Some(e);
            }
        }
    }

    RenderResult {
        route: route.to_string(),
        html: String::new(),
        output_path,
        success: false,
        error: last_error,
    }
}

async fn persist(output_dir: &Path, relative: &Path, html: &str) -> Result<(), RenderError> {
    let path = output_dir.join(relative);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| RenderError::Write {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
    }

    tokio::fs::write(&path, html)
        .await
        .map_err(|e| RenderError::Write {
            path,
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::tempdir;

    /// Test renderer that fails a configurable number of times per route and
    /// records attempt counts, start order, and peak concurrency.
    struct ScriptedRenderer {
        failures_before_success: HashMap<String, u32>,
        attempts: Mutex<HashMap<String, u32>>,
        start_order: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedRenderer {
        fn new(failures: &[(&str, u32)]) -> Self {
            Self {
                failures_before_success: failures
                    .iter()
                    .map(|(route, n)| (route.to_string(), *n))
                    .collect(),
                attempts: Mutex::new(HashMap::new()),
                start_order: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn attempts_for(&self, route: &str) -> u32 {
            self.attempts
                .lock()
                .unwrap()
                .get(route)
                .copied()
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl Renderer for ScriptedRenderer {
        async fn render(&self, _server_url: &Url, route: &str) -> Result<String, RenderError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            self.start_order.lock().unwrap().push(route.to_string());

            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let entry = attempts.entry(route.to_string()).or_insert(0);
                *entry += 1;
                *entry
            };

            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let failures = self
                .failures_before_success
                .get(route)
                .copied()
                .unwrap_or(0);

            if attempt <= failures {
                Err(RenderError::Navigation {
                    route: route.to_string(),
                    message: format!("scripted failure {attempt}"),
                })
            } else {
                Ok(format!("<html><body>{route}</body></html>"))
            }
        }
    }

    fn routes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn server_url() -> Url {
        Url::parse("http://127.0.0.1:0/").unwrap()
    }

    #[tokio::test]
    async fn retry_exhaustion_keeps_last_failure() {
        let temp = tempdir().unwrap();
        let renderer = ScriptedRenderer::new(&[("/broken", u32::MAX)]);

        let results = render_routes(
            &renderer,
            &server_url(),
            &routes(&["/broken"]),
            &NamingStrategy::Nested,
            temp.path(),
            1,
            3,
        )
        .await;

        assert_eq!(renderer.attempts_for("/broken"), 3);
        assert!(!results[0].success);
        assert!(results[0].error.is_some());
        assert!(results[0].html.is_empty());
    }

    #[tokio::test]
    async fn stops_retrying_at_first_success() {
        let temp = tempdir().unwrap();
        let renderer = ScriptedRenderer::new(&[("/flaky", 1)]);

        let results = render_routes(
            &renderer,
            &server_url(),
            &routes(&["/flaky"]),
            &NamingStrategy::Nested,
            temp.path(),
            1,
            5,
        )
        .await;

        assert_eq!(renderer.attempts_for("/flaky"), 2);
        assert!(results[0].success);
        assert!(temp.path().join("flaky/index.html").exists());
    }

    #[tokio::test]
    async fn zero_retries_still_runs_one_attempt() {
        let temp = tempdir().unwrap();
        let renderer = ScriptedRenderer::new(&[]);

        let results = render_routes(
            &renderer,
            &server_url(),
            &routes(&["/"]),
            &NamingStrategy::Nested,
            temp.path(),
            1,
            0,
        )
        .await;

        assert_eq!(renderer.attempts_for("/"), 1);
        assert!(results[0].success);
    }

    #[tokio::test]
    async fn batches_run_sequentially_with_bounded_concurrency() {
        let temp = tempdir().unwrap();
        let renderer = ScriptedRenderer::new(&[]);
        let route_list = routes(&["/a", "/b", "/c", "/d", "/e"]);

        let results = render_routes(
            &renderer,
            &server_url(),
            &route_list,
            &NamingStrategy::Nested,
            temp.path(),
            2,
            1,
        )
        .await;

        assert!(results.iter().all(|r| r.success));
        assert!(renderer.peak.load(Ordering::SeqCst) <= 2);

        // every route in window N starts before anything in window N+1
        let order = renderer.start_order.lock().unwrap();
        let position = |route: &str| order.iter().position(|r| r == route).unwrap();
        assert!(position("/a").max(position("/b")) < position("/c").min(position("/d")));
        assert!(position("/c").max(position("/d")) < position("/e"));
    }

    #[tokio::test]
    async fn results_preserve_route_order() {
        let temp = tempdir().unwrap();
        let renderer = ScriptedRenderer::new(&[("/b", u32::MAX)]);
        let route_list = routes(&["/a", "/b", "/c"]);

        let results = render_routes(
            &renderer,
            &server_url(),
            &route_list,
            &NamingStrategy::Nested,
            temp.path(),
            2,
            2,
        )
        .await;

        let listed: Vec<&str> = results.iter().map(|r| r.route.as_str()).collect();
        assert_eq!(listed, vec!["/a", "/b", "/c"]);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);
    }

    #[tokio::test]
    async fn flat_naming_writes_dashed_files() {
        let temp = tempdir().unwrap();
        let renderer = ScriptedRenderer::new(&[]);

        render_routes(
            &renderer,
            &server_url(),
            &routes(&["/", "/about/team"]),
            &NamingStrategy::Flat,
            temp.path(),
            2,
            1,
        )
        .await;

        assert!(temp.path().join("index.html").exists());
        assert!(temp.path().join("about-team.html").exists());
    }
}
