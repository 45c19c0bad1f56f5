//! Lifecycle hooks around shape display.
//!
//! Hooks run at fixed points of the display pipeline:
//!
//! ```text
//! global displaying → descriptor displaying → shape displaying
//!   → descriptor processing (only when no content was supplied yet)
//!   → binding selected → shape processing → binding executed
//!   → wrappers
//!   → global displayed → descriptor displayed → shape displayed
//!   → global display finalized (always, even after an error)
//! ```
//!
//! Within a phase hooks run strictly in registration order. A failing hook
//! aborts the remaining phases for that shape; finalization still runs.
//!
//! There are two kinds of hook:
//!
//! - [`ShapeHook`]: a single callback, registered on a descriptor or on one
//!   shape instance. Plain closures qualify through [`hook_fn`].
//! - [`ShapeDisplayEvents`]: a global plugin that observes every shape.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::ShapeDisplayContext;

/// The pipeline phase in which a hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Displaying,
    Processing,
    Displayed,
    Finalized,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Displaying => write!(f, "displaying"),
            HookPhase::Processing => write!(f, "processing"),
            HookPhase::Displayed => write!(f, "displayed"),
            HookPhase::Finalized => write!(f, "finalized"),
        }
    }
}

/// Error returned by a hook.
#[derive(Debug, Error)]
#[error("hook error ({phase}): {message}")]
pub struct HookError {
    /// Human-readable error message
    pub message: String,
    /// The phase where the error occurred
    pub phase: HookPhase,
    /// The underlying error, if any
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl HookError {
    pub fn new(phase: HookPhase, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            phase,
            source: None,
        }
    }

    pub fn displaying(message: impl Into<String>) -> Self {
        Self::new(HookPhase::Displaying, message)
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::new(HookPhase::Processing, message)
    }

    pub fn displayed(message: impl Into<String>) -> Self {
        Self::new(HookPhase::Displayed, message)
    }

    pub fn finalized(message: impl Into<String>) -> Self {
        Self::new(HookPhase::Finalized, message)
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.source = Some(source.into());
        self
    }
}

/// A single lifecycle callback.
///
/// Implement this trait directly for hooks that need to await (a localized
/// string lookup, a cache read). Synchronous closures can be wrapped with
/// [`hook_fn`].
#[async_trait]
pub trait ShapeHook: Send + Sync {
    async fn call(&self, ctx: &mut ShapeDisplayContext<'_>) -> Result<(), HookError>;
}

#[async_trait]
impl<F> ShapeHook for F
where
    F: Fn(&mut ShapeDisplayContext<'_>) -> Result<(), HookError> + Send + Sync,
{
    async fn call(&self, ctx: &mut ShapeDisplayContext<'_>) -> Result<(), HookError> {
        (self)(ctx)
    }
}

/// Pins a closure to the [`ShapeHook`] signature so its argument type is inferred.
///
/// ```rust
/// use vitrine_display::{hook_fn, HtmlContent, Shape};
///
/// let mut shape = Shape::new("Banner");
/// shape.metadata_mut().on_displayed(hook_fn(|ctx| {
///     let inner = ctx.child_content().map(|c| c.to_string()).unwrap_or_default();
///     ctx.set_child_content(Some(HtmlContent::new(format!("<aside>{inner}</aside>"))));
///     Ok(())
/// }));
/// ```
pub fn hook_fn<F>(f: F) -> F
where
    F: Fn(&mut ShapeDisplayContext<'_>) -> Result<(), HookError> + Send + Sync,
{
    f
}

/// A global plugin notified for every shape the engine displays.
///
/// All methods default to doing nothing, so a plugin only overrides the
/// phases it cares about.
#[async_trait]
pub trait ShapeDisplayEvents: Send + Sync {
    /// Runs before the descriptor's and the shape's own displaying hooks.
    async fn displaying(&self, _ctx: &mut ShapeDisplayContext<'_>) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs after rendering and wrapping, before the descriptor's displayed hooks.
    async fn displayed(&self, _ctx: &mut ShapeDisplayContext<'_>) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs last, whether or not the display succeeded.
    async fn display_finalized(
        &self,
        _ctx: &mut ShapeDisplayContext<'_>,
    ) -> Result<(), HookError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_error_creation() {
        let err = HookError::displaying("boom");
        assert_eq!(err.phase, HookPhase::Displaying);
        assert_eq!(err.message, "boom");
        assert_eq!(err.to_string(), "hook error (displaying): boom");
    }

    #[test]
    fn test_hook_error_with_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let err = HookError::finalized("metrics flush failed").with_source(io);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(HookPhase::Processing.to_string(), "processing");
        assert_eq!(HookPhase::Displayed.to_string(), "displayed");
    }
}
