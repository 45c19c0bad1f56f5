//! YAML site files.
//!
//! A site file names the themes, where their templates live and which theme
//! is current:
//!
//! ```yaml
//! theme: TheAdmin
//! templates: templates          # bindings shared by every theme
//! themes:
//!   - name: TheTheme
//!     templates: themes/TheTheme
//!   - name: TheAdmin
//!     base: TheTheme
//!     templates: themes/TheAdmin
//!     inline:
//!       Menu: "<nav>{{ Items | join('') }}</nav>"
//! dynamic:                      # consulted before any theme
//!   Banner: "<div class=\"banner\">{{ Text }}</div>"
//! wrappers:                     # added to every shape of the type
//!   Widget: [Widget_Wrapper]
//! ```
//!
//! Relative template paths are resolved against the directory of the site
//! file when loaded with [`SiteConfig::from_file`].

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::setup::SetupError;

/// A theme entry of a site file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    pub name: String,
    pub base: Option<String>,
    pub templates: Option<PathBuf>,
    /// Shape name → template source.
    pub inline: BTreeMap<String, String>,
}

/// A parsed site file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// The current theme. Without one, only site-wide templates are bound.
    pub theme: Option<String>,
    pub templates: Option<PathBuf>,
    pub themes: Vec<ThemeConfig>,
    /// Templates served by a runtime resolver, ahead of every theme.
    pub dynamic: BTreeMap<String, String>,
    /// Shape type → wrappers added when the shape is first displayed.
    pub wrappers: BTreeMap<String, Vec<String>>,
    #[serde(skip)]
    root: Option<PathBuf>,
}

impl SiteConfig {
    /// Parses and validates a site file.
    pub fn from_yaml(yaml: &str) -> Result<Self, SetupError> {
        let config: SiteConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a site file; relative paths in it resolve against its directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|e| SetupError::io(path, e))?;
        let mut config = Self::from_yaml(&yaml)?;
        config.root = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Sets the directory relative paths resolve against.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn find_theme(&self, name: &str) -> Option<&ThemeConfig> {
        self.themes.iter().find(|t| t.name == name)
    }

    /// Checks theme names and base references.
    pub fn validate(&self) -> Result<(), SetupError> {
        let mut seen = HashSet::new();
        for theme in &self.themes {
            if theme.name.is_empty() {
                return Err(SetupError::Config("theme without a name".into()));
            }
            if !seen.insert(theme.name.as_str()) {
                return Err(SetupError::Config(format!(
                    "theme '{}' is defined twice",
                    theme.name
                )));
            }
        }

        for theme in &self.themes {
            if let Some(base) = &theme.base {
                if self.find_theme(base).is_none() {
                    return Err(SetupError::ThemeNotFound(base.clone()));
                }
            }
        }

        if let Some(current) = &self.theme {
            if self.find_theme(current).is_none() {
                return Err(SetupError::ThemeNotFound(current.clone()));
            }
        }
        Ok(())
    }
}
