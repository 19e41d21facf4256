//! Output assembly for prerendered sites.
//!
//! After rendering finishes this crate mirrors the non-HTML build assets into
//! the output tree, copies the public directory, and derives `sitemap.xml`
//! and `robots.txt` from the render results and configuration.

use std::path::PathBuf;

pub mod assets;
pub mod robots;
pub mod sitemap;

pub use assets::{clean_output, copy_assets, copy_public_dir};
pub use robots::{build_robots, write_robots, RobotsConfig, RobotsPolicy, Rules};
pub use sitemap::{build_sitemap, write_sitemap, SitemapConfig};

/// Errors that can occur while assembling the output tree.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to clean output directory {path}: {message}")]
    Clean { path: PathBuf, message: String },

    #[error("Failed to copy {path}: {message}")]
    Copy { path: PathBuf, message: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
}
