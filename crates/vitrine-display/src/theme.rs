//! Theme identity and the current-theme collaborator.
//!
//! A [`Theme`] is only an identity here: a name and the name of the theme it
//! derives from. Shape tables are built and cached per theme name by a
//! [`ShapeTableManager`](crate::ShapeTableManager). Rendering without a theme
//! is valid and uses the base table.

use async_trait::async_trait;

/// A named theme, optionally derived from a base theme.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Theme {
    name: String,
    base: Option<String>,
}

impl Theme {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
        }
    }

    /// Sets the theme this one derives from.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }
}

/// Supplies the theme for the current request.
#[async_trait]
pub trait ThemeManager: Send + Sync {
    /// Returns the current theme, or `None` to use the base table.
    async fn current_theme(&self) -> Option<Theme>;
}

/// A theme manager that always answers with the same theme.
#[derive(Debug, Clone, Default)]
pub struct FixedThemeManager {
    theme: Option<Theme>,
}

impl FixedThemeManager {
    pub fn new(theme: Theme) -> Self {
        Self { theme: Some(theme) }
    }

    /// A manager that reports no current theme.
    pub fn none() -> Self {
        Self { theme: None }
    }
}

#[async_trait]
impl ThemeManager for FixedThemeManager {
    async fn current_theme(&self) -> Option<Theme> {
        self.theme.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_base() {
        let theme = Theme::new("TheAdmin").with_base("TheTheme");
        assert_eq!(theme.name(), "TheAdmin");
        assert_eq!(theme.base(), Some("TheTheme"));
        assert_eq!(Theme::new("Plain").base(), None);
    }

    #[tokio::test]
    async fn test_fixed_theme_manager() {
        let manager = FixedThemeManager::new(Theme::new("TheBlog"));
        assert_eq!(manager.current_theme().await.unwrap().name(), "TheBlog");
        assert!(FixedThemeManager::none().current_theme().await.is_none());
    }
}
