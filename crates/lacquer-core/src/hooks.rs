//! Lifecycle hooks invoked around each render attempt.

use crate::renderer::RenderError;

/// A hook's own failure, surfaced as a failed render attempt.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Optional side effects around a render attempt.
///
/// The defaults are no-ops, so implementors override only what they need and
/// the worker never special-cases "was a hook provided".
pub trait RenderHooks: Send + Sync {
    /// Runs after the page context opens, before navigation. Failure aborts
    /// the attempt and goes through the normal retry path.
    fn before_render(&self, _route: &str) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs on the extracted, post-processed markup; the returned string
    /// replaces it.
    fn after_render(&self, _route: &str, html: String) -> Result<String, HookError> {
        Ok(html)
    }

    /// Runs once per failed attempt, best-effort.
    fn on_error(&self, _route: &str, _error: &RenderError) {}
}

/// Hook implementation that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl RenderHooks for NoopHooks {}
