//! Error types for the display pipeline.

use thiserror::Error;

use crate::hooks::HookError;
use crate::template::RegistryError;

/// Error type for display operations.
///
/// Only [`BindingNotFound`](DisplayError::BindingNotFound) is raised by the
/// pipeline itself; a missing wrapper binding or a missing descriptor is not
/// an error.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// No alternate and no fallback of the shape type has a binding.
    #[error("shape type '{shape_type}' not found for theme '{}'", .theme.as_deref().unwrap_or("<none>"))]
    BindingNotFound {
        shape_type: String,
        theme: Option<String>,
    },

    /// A lifecycle hook failed.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// Template compilation or rendering failed.
    #[error("template error in '{name}': {message}")]
    Template { name: String, message: String },

    /// Template lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A binding resolver or table provider failed.
    #[error("resolver error: {0}")]
    Resolver(String),
}

impl DisplayError {
    pub fn binding_not_found(shape_type: impl Into<String>, theme: Option<&str>) -> Self {
        DisplayError::BindingNotFound {
            shape_type: shape_type.into(),
            theme: theme.map(str::to_string),
        }
    }

    pub fn template(name: impl Into<String>, err: minijinja::Error) -> Self {
        DisplayError::Template {
            name: name.into(),
            message: err.to_string(),
        }
    }

    /// Returns the unresolved shape type for a binding-not-found error.
    pub fn missing_shape_type(&self) -> Option<&str> {
        match self {
            DisplayError::BindingNotFound { shape_type, .. } => Some(shape_type),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_not_found_names_shape_and_theme() {
        let err = DisplayError::binding_not_found("Content__Card", Some("TheBlog"));
        let msg = err.to_string();
        assert!(msg.contains("Content__Card"));
        assert!(msg.contains("TheBlog"));
        assert_eq!(err.missing_shape_type(), Some("Content__Card"));
    }

    #[test]
    fn test_binding_not_found_without_theme() {
        let err = DisplayError::binding_not_found("Menu", None);
        assert_eq!(err.to_string(), "shape type 'Menu' not found for theme '<none>'");
    }

    #[test]
    fn test_from_hook_error() {
        let err: DisplayError = HookError::displaying("denied").into();
        assert!(matches!(err, DisplayError::Hook(_)));
        assert_eq!(err.missing_shape_type(), None);
        assert_eq!(err.to_string(), "hook error (displaying): denied");
    }
}
