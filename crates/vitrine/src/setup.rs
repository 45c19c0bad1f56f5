//! Error types for site setup.

use std::path::PathBuf;

use thiserror::Error;
use vitrine_display::{DisplayError, RegistryError};

/// Error type for loading a site file and assembling its engine.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Reading a site or shape file failed.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The site or shape file is not valid YAML for its schema.
    #[error("invalid site file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A theme name does not match any configured theme.
    #[error("theme not found: {0}")]
    ThemeNotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Template directory loading error.
    #[error("template error: {0}")]
    Registry(#[from] RegistryError),

    /// A template failed to compile.
    #[error(transparent)]
    Display(#[from] DisplayError),
}

impl SetupError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SetupError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_display() {
        let err = SetupError::ThemeNotFound("dark".into());
        assert_eq!(err.to_string(), "theme not found: dark");

        let err = SetupError::io(
            "site.yaml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "failed to read site.yaml: missing");

        let err: SetupError = RegistryError::NotFound { name: "Menu".into() }.into();
        assert_eq!(err.to_string(), "template error: Template not found: \"Menu\"");
    }
}
