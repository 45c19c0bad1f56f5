//! A configured site: a [`DisplayEngine`] assembled from a [`SiteConfig`].
//!
//! Tables are layered the way the site file reads:
//!
//! 1. Providers added with [`SiteBuilder::provider`] (module bindings).
//! 2. Site-wide `templates`.
//! 3. Per-theme `templates` and `inline` templates, base theme first.
//!
//! `dynamic` templates are served by a [`TemplateBindingResolver`] and win
//! over every table entry.

use std::sync::Arc;

use vitrine_display::template::TemplateRegistry;
use vitrine_display::{
    fallback_names, hook_fn, BindingResolver, DisplayContext, DisplayEngine, DisplayError,
    FixedThemeManager, Shape, ShapeDisplayEvents, ShapeTableBuilder, ShapeTableCache,
    ShapeTableManager, ShapeTableProvider, TemplateBindingResolver, TemplateHarvester, Theme,
};

use crate::config::{SiteConfig, ThemeConfig};
use crate::setup::SetupError;

/// Assembles a [`Site`].
///
/// ```rust
/// use vitrine::{SiteBuilder, SiteConfig};
///
/// let config = SiteConfig::from_yaml("dynamic:\n  Hello: \"<p>{{ Name }}</p>\"\n").unwrap();
/// let site = SiteBuilder::new(config).build().unwrap();
/// assert!(site.theme().is_none());
/// ```
pub struct SiteBuilder {
    config: SiteConfig,
    theme: Option<String>,
    tables: ShapeTableCache,
    events: Vec<Arc<dyn ShapeDisplayEvents>>,
    resolvers: Vec<Arc<dyn BindingResolver>>,
}

impl SiteBuilder {
    pub fn new(config: SiteConfig) -> Self {
        Self {
            config,
            theme: None,
            tables: ShapeTableCache::new(),
            events: Vec::new(),
            resolvers: Vec::new(),
        }
    }

    /// Overrides the current theme named in the site file.
    pub fn theme(mut self, name: impl Into<String>) -> Self {
        self.theme = Some(name.into());
        self
    }

    /// Adds bindings shared by every theme, ahead of the site's templates.
    pub fn provider(mut self, provider: impl ShapeTableProvider + 'static) -> Self {
        self.tables = self.tables.with_provider(provider);
        self
    }

    pub fn event(mut self, event: impl ShapeDisplayEvents + 'static) -> Self {
        self.events.push(Arc::new(event));
        self
    }

    /// Adds a resolver, consulted after the site's dynamic templates.
    pub fn resolver(mut self, resolver: impl BindingResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    pub fn build(self) -> Result<Site, SetupError> {
        let SiteBuilder {
            config,
            theme,
            mut tables,
            events,
            resolvers,
        } = self;
        config.validate()?;

        if let Some(dir) = &config.templates {
            let harvester = TemplateHarvester::from_dir(config.resolve_path(dir), "site")?;
            tables = tables.with_provider(harvester);
        }

        for theme_config in &config.themes {
            tables = tables.with_theme(theme_of(theme_config));
            if let Some(harvester) = theme_harvester(&config, theme_config)? {
                tables = tables.with_theme_provider(theme_config.name.clone(), harvester);
            }
        }

        if !config.wrappers.is_empty() {
            tables = tables.with_provider(default_wrappers(&config));
        }

        let dynamic = TemplateBindingResolver::new("dynamic");
        for (name, source) in &config.dynamic {
            dynamic.add_template(name.clone(), source.clone())?;
        }

        let current = match theme.or_else(|| config.theme.clone()) {
            Some(name) => {
                let theme_config = config
                    .find_theme(&name)
                    .ok_or(SetupError::ThemeNotFound(name))?;
                Some(theme_of(theme_config))
            }
            None => None,
        };

        let tables = Arc::new(tables);
        let themes = match &current {
            Some(theme) => FixedThemeManager::new(theme.clone()),
            None => FixedThemeManager::none(),
        };
        // Resolvers are asked in registration order, dynamic templates first
        let mut builder = DisplayEngine::builder().resolver(dynamic);
        for resolver in resolvers {
            builder = builder.shared_resolver(resolver);
        }
        for event in events {
            builder = builder.shared_event(event);
        }
        let engine = builder
            .theme_manager(themes)
            .shared_table_manager(tables.clone())
            .build();

        tracing::debug!(
            theme = current.as_ref().map(Theme::name),
            themes = config.themes.len(),
            dynamic = config.dynamic.len(),
            "site assembled"
        );

        Ok(Site {
            engine,
            tables,
            theme: current,
            config,
        })
    }
}

fn theme_of(config: &ThemeConfig) -> Theme {
    let theme = Theme::new(config.name.clone());
    match &config.base {
        Some(base) => theme.with_base(base.clone()),
        None => theme,
    }
}

fn theme_harvester(
    site: &SiteConfig,
    theme: &ThemeConfig,
) -> Result<Option<TemplateHarvester>, SetupError> {
    if theme.templates.is_none() && theme.inline.is_empty() {
        return Ok(None);
    }

    let mut registry = TemplateRegistry::new();
    if let Some(dir) = &theme.templates {
        registry.add_template_dir(site.resolve_path(dir))?;
    }
    for (name, source) in &theme.inline {
        registry.add_inline(name.clone(), source.clone());
    }
    Ok(Some(TemplateHarvester::new(
        registry,
        format!("theme:{}", theme.name),
    )))
}

/// Adds the configured wrappers when a shape is displayed for the first time.
///
/// Descriptors are keyed by base type, so the hook checks that the configured
/// name applies to the shape being displayed.
fn default_wrappers(config: &SiteConfig) -> impl ShapeTableProvider + 'static {
    let wrappers = config.wrappers.clone();
    move |builder: &mut ShapeTableBuilder| -> Result<(), DisplayError> {
        for (shape_type, names) in &wrappers {
            let key = shape_type.clone();
            let names = names.clone();
            builder.describe(shape_type).on_displaying(hook_fn(move |ctx| {
                // Already rendered shapes keep their wrapping
                if ctx.child_content().is_none() && wrapper_key_applies(ctx.shape, &key) {
                    for name in &names {
                        ctx.shape.metadata_mut().add_wrapper(name.clone());
                    }
                }
                Ok(())
            }));
        }
        Ok(())
    }
}

/// True when `key` names the shape's type, a fallback of it or an alternate.
fn wrapper_key_applies(shape: &Shape, key: &str) -> bool {
    let metadata = shape.metadata();
    fallback_names(shape.shape_type())
        .chain(metadata.alternates.iter().map(String::as_str))
        .any(|name| name.eq_ignore_ascii_case(key))
}

/// A site ready to display shapes.
pub struct Site {
    engine: DisplayEngine,
    tables: Arc<ShapeTableCache>,
    theme: Option<Theme>,
    config: SiteConfig,
}

impl Site {
    pub fn from_config(config: SiteConfig) -> Result<Self, SetupError> {
        SiteBuilder::new(config).build()
    }

    pub fn engine(&self) -> &DisplayEngine {
        &self.engine
    }

    pub fn theme(&self) -> Option<&Theme> {
        self.theme.as_ref()
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Displays `shape` with a fresh context and returns the markup.
    pub async fn render(&self, shape: &mut Shape) -> Result<String, DisplayError> {
        self.render_with(shape, &DisplayContext::new()).await
    }

    pub async fn render_with(
        &self,
        shape: &mut Shape,
        context: &DisplayContext,
    ) -> Result<String, DisplayError> {
        let html = self.engine.display(shape, context).await?;
        Ok(html.map(|h| h.into_string()).unwrap_or_default())
    }

    /// Bindings of a theme's table as `(name, source)`, sorted by name.
    ///
    /// `None` lists the table used when no theme is current.
    pub async fn bindings(&self, theme: Option<&str>) -> Result<Vec<(String, String)>, SetupError> {
        let theme = match theme {
            Some(name) => Some(
                self.config
                    .find_theme(name)
                    .map(theme_of)
                    .ok_or_else(|| SetupError::ThemeNotFound(name.to_string()))?,
            ),
            None => None,
        };

        let table = self.tables.shape_table(theme.as_ref()).await?;
        let mut bindings: Vec<(String, String)> = table
            .bindings()
            .map(|b| (b.name().to_string(), b.source().to_string()))
            .collect();
        bindings.sort();
        Ok(bindings)
    }

    /// Drops cached tables; they are rebuilt on the next display.
    pub fn invalidate(&self) {
        self.tables.invalidate();
    }
}
