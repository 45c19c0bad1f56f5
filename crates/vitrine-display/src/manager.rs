//! Per-theme shape table construction and caching.
//!
//! [`ShapeTableCache`] builds one [`ShapeTable`] per theme the first time the
//! theme is displayed and hands out the same `Arc` afterwards.
//!
//! # Layering
//!
//! Tables are assembled from [`ShapeTableProvider`]s:
//!
//! 1. Providers registered with [`with_provider`](ShapeTableCache::with_provider)
//!    contribute to every table, in registration order.
//! 2. Providers registered for a theme contribute only when that theme, or a
//!    theme derived from it, is current. The base theme's providers run before
//!    the derived theme's, so a derived theme overrides its base.
//!
//! Rendering without a theme uses a table built from step 1 alone.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::DisplayError;
use crate::table::{ShapeTable, ShapeTableBuilder};
use crate::theme::Theme;

/// Supplies the shape table for a theme.
#[async_trait]
pub trait ShapeTableManager: Send + Sync {
    async fn shape_table(&self, theme: Option<&Theme>) -> Result<Arc<ShapeTable>, DisplayError>;
}

/// Contributes descriptors and bindings to a table under construction.
pub trait ShapeTableProvider: Send + Sync {
    fn discover(&self, builder: &mut ShapeTableBuilder) -> Result<(), DisplayError>;
}

impl<F> ShapeTableProvider for F
where
    F: Fn(&mut ShapeTableBuilder) -> Result<(), DisplayError> + Send + Sync,
{
    fn discover(&self, builder: &mut ShapeTableBuilder) -> Result<(), DisplayError> {
        (self)(builder)
    }
}

/// A lazily built, per-theme cache of shape tables.
#[derive(Default)]
pub struct ShapeTableCache {
    providers: Vec<(Option<String>, Arc<dyn ShapeTableProvider>)>,
    themes: HashMap<String, Theme>,
    tables: RwLock<HashMap<String, Arc<ShapeTable>>>,
}

impl ShapeTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider that contributes to every table.
    pub fn with_provider(mut self, provider: impl ShapeTableProvider + 'static) -> Self {
        self.providers.push((None, Arc::new(provider)));
        self
    }

    /// Adds a provider that only contributes to `theme` and themes derived from it.
    pub fn with_theme_provider(
        mut self,
        theme: impl Into<String>,
        provider: impl ShapeTableProvider + 'static,
    ) -> Self {
        self.providers.push((Some(theme.into()), Arc::new(provider)));
        self
    }

    /// Registers a theme so its base chain can be followed by name.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.themes.insert(theme.name().to_string(), theme);
        self
    }

    /// Drops every cached table. The next display rebuilds them.
    pub fn invalidate(&self) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of tables built so far.
    pub fn cached_count(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Theme names from the root base theme to `theme` itself.
    pub fn theme_chain(&self, theme: Option<&Theme>) -> Vec<String> {
        let Some(theme) = theme else {
            return Vec::new();
        };

        let mut chain = vec![theme.name().to_string()];
        let mut seen: HashSet<String> = chain.iter().cloned().collect();
        let mut base = theme
            .base()
            .map(str::to_string)
            .or_else(|| self.registered_base(theme.name()));

        while let Some(name) = base {
            if !seen.insert(name.clone()) {
                tracing::warn!(theme = theme.name(), base = %name, "theme base cycle ignored");
                break;
            }
            base = self.registered_base(&name);
            chain.push(name);
        }

        chain.reverse();
        chain
    }

    fn registered_base(&self, name: &str) -> Option<String> {
        self.themes
            .get(name)
            .and_then(|t| t.base())
            .map(str::to_string)
    }

    fn build(&self, theme: Option<&Theme>) -> Result<ShapeTable, DisplayError> {
        let mut builder = ShapeTableBuilder::new();

        for (_, provider) in self.providers.iter().filter(|(t, _)| t.is_none()) {
            provider.discover(&mut builder)?;
        }

        for name in self.theme_chain(theme) {
            for (_, provider) in self
                .providers
                .iter()
                .filter(|(t, _)| t.as_deref() == Some(name.as_str()))
            {
                provider.discover(&mut builder)?;
            }
        }

        tracing::debug!(
            theme = theme.map(Theme::name),
            bindings = builder.binding_count(),
            "shape table built"
        );
        Ok(builder.build())
    }
}

#[async_trait]
impl ShapeTableManager for ShapeTableCache {
    async fn shape_table(&self, theme: Option<&Theme>) -> Result<Arc<ShapeTable>, DisplayError> {
        let key = theme.map(Theme::name).unwrap_or_default().to_string();

        if let Some(table) = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(table.clone());
        }

        let table = Arc::new(self.build(theme)?);
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        // Another request may have built the same table meanwhile; keep the first
        Ok(tables.entry(key).or_insert(table).clone())
    }
}

impl fmt::Debug for ShapeTableCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeTableCache")
            .field("providers", &self.providers.len())
            .field("themes", &self.themes.keys().collect::<Vec<_>>())
            .field("cached", &self.cached_count())
            .finish()
    }
}
