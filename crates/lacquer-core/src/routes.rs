//! Route resolution.
//!
//! Flattens static routes, an optional route-producing callback, and any
//! number of named generators into a deduplicated, order-stable route list.

use std::collections::HashSet;
use std::fmt;

/// Fallible producer of route strings.
pub type RouteFn =
    dyn Fn() -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> + Send + Sync;

/// One origin of routes, resolved exactly once per run.
pub enum RouteSource {
    /// Verbatim route strings.
    Static(Vec<String>),

    /// A callback producing the route list.
    Callback(Box<RouteFn>),

    /// A named dynamic generator; the name is documentation only.
    Generator { name: String, produce: Box<RouteFn> },
}

impl fmt::Debug for RouteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteSource::Static(routes) => f.debug_tuple("Static").field(routes).finish(),
            RouteSource::Callback(_) => write!(f, "Callback(..)"),
            RouteSource::Generator { name, .. } => {
                f.debug_struct("Generator").field("name", name).finish()
            }
        }
    }
}

/// Errors raised during route resolution. These abort the run before any
/// server or browser resource is acquired.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Route callback failed: {0}")]
    Callback(String),

    #[error("Route generator '{name}' failed: {message}")]
    Generator { name: String, message: String },
}

/// Union all sources into a deduplicated route list, first-seen order.
///
/// Routes are normalized to a leading slash before deduplication.
pub fn resolve_routes(sources: &[RouteSource]) -> Result<Vec<String>, RouteError> {
    let mut seen = HashSet::new();
    let mut routes = Vec::new();

    let mut push = |route: String, seen: &mut HashSet<String>, routes: &mut Vec<String>| {
        let route = if route.starts_with('/') {
            route
        } else {
            format!("/{}", route)
        };
        if seen.insert(route.clone()) {
            routes.push(route);
        }
    };

    for source in sources {
        match source {
            RouteSource::Static(list) => {
                for route in list {
                    push(route.clone(), &mut seen, &mut routes);
                }
            }
            RouteSource::Callback(produce) => {
                let produced = produce().map_err(|e| RouteError::Callback(e.to_string()))?;
                for route in produced {
                    push(route, &mut seen, &mut routes);
                }
            }
            RouteSource::Generator { name, produce } => {
                let produced = produce().map_err(|e| RouteError::Generator {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
                tracing::debug!("Generator '{}' produced {} routes", name, produced.len());
                for route in produced {
                    push(route, &mut seen, &mut routes);
                }
            }
        }
    }

    Ok(routes)
}
