//! Route to output-path mapping.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::FileNaming;

/// Resolved naming scheme, fixed once per run.
///
/// A custom naming callback, when set, wins unconditionally over the
/// configured enum.
#[derive(Clone)]
pub enum NamingStrategy {
    /// `/about` -> `about/index.html`
    Nested,

    /// `/about/team` -> `about-team.html`
    Flat,

    /// Caller-supplied mapping.
    Custom(Arc<dyn Fn(&str) -> PathBuf + Send + Sync>),
}

impl NamingStrategy {
    /// Compute the output path for a route, relative to the output directory.
    pub fn output_path(&self, route: &str) -> PathBuf {
        let trimmed = route.trim_matches('/');

        match self {
            NamingStrategy::Custom(naming) => naming(route),
            NamingStrategy::Nested => {
                if trimmed.is_empty() {
                    PathBuf::from("index.html")
                } else {
                    PathBuf::from(trimmed).join("index.html")
                }
            }
            NamingStrategy::Flat => {
                if trimmed.is_empty() {
                    PathBuf::from("index.html")
                } else {
                    let joined = trimmed.split('/').collect::<Vec<_>>().join("-");
                    PathBuf::from(format!("{}.html", joined))
                }
            }
        }
    }
}

impl From<FileNaming> for NamingStrategy {
    fn from(naming: FileNaming) -> Self {
        match naming {
            FileNaming::Nested => NamingStrategy::Nested,
            FileNaming::Flat => NamingStrategy::Flat,
        }
    }
}

impl fmt::Debug for NamingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingStrategy::Nested => write!(f, "Nested"),
            NamingStrategy::Flat => write!(f, "Flat"),
            NamingStrategy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
