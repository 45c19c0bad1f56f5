//! Template-backed bindings.
//!
//! A [`TemplateBinding`] renders a shape through a template. The template
//! sees one variable per shape property plus a few reserved names:
//!
//! | Variable | Content |
//! |----------|---------|
//! | `ChildContent` | content already produced for the shape (what a wrapper wraps) |
//! | `Items` | positional children, displayed |
//! | `Model` | `Type`, `Prefix`, `Alternates`, `Wrappers`, `BindingSources` |
//! | `Theme` | current theme name, or none |
//!
//! Nested shapes are displayed before the template runs and are passed in as
//! markup that is not escaped again. A nested shape that already has content
//! is not displayed again, so wrapper templates rendering the same shape do
//! not re-run its children's hooks. Plain values are escaped as usual.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use minijinja::Value;

use super::engine::{MiniJinjaEngine, TemplateEngine};
use super::registry::{RegistryError, ResolvedTemplate, TemplateRegistry};
use crate::content::{HtmlContent, RawValue};
use crate::context::ShapeDisplayContext;
use crate::error::DisplayError;
use crate::manager::ShapeTableProvider;
use crate::resolve::BindingResolver;
use crate::shape::Property;
use crate::table::{BindingRender, ShapeBinding, ShapeTableBuilder};

/// Renders a shape with a template.
pub struct TemplateBinding {
    name: String,
    template: ResolvedTemplate,
    engine: Arc<dyn TemplateEngine>,
}

impl TemplateBinding {
    pub fn new(
        name: impl Into<String>,
        template: ResolvedTemplate,
        engine: Arc<dyn TemplateEngine>,
    ) -> Self {
        Self {
            name: name.into(),
            template,
            engine,
        }
    }

    pub fn inline(
        name: impl Into<String>,
        source: impl Into<String>,
        engine: Arc<dyn TemplateEngine>,
    ) -> Self {
        Self::new(name, ResolvedTemplate::Inline(source.into()), engine)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for TemplateBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateBinding")
            .field("name", &self.name)
            .field("template", &self.template)
            .finish()
    }
}

#[async_trait]
impl BindingRender for TemplateBinding {
    async fn render(&self, ctx: &mut ShapeDisplayContext<'_>) -> Result<RawValue, DisplayError> {
        let source = self.template.content()?;
        let model = template_model(ctx).await?;
        let html = self.engine.render_template(&self.name, &source, model)?;
        Ok(RawValue::Html(HtmlContent::new(html)))
    }
}

fn html_value(content: Option<HtmlContent>) -> Value {
    match content {
        Some(content) => Value::from_safe_string(content.into_string()),
        None => Value::from(()),
    }
}

/// Builds the template context, displaying nested shapes first.
async fn template_model(ctx: &mut ShapeDisplayContext<'_>) -> Result<Value, DisplayError> {
    let mut vars: BTreeMap<String, Value> = BTreeMap::new();

    let names: Vec<String> = ctx.shape.property_names().map(str::to_string).collect();
    for name in names {
        let value = match ctx.shape.get(&name) {
            Some(Property::Value(json)) => Value::from_serialize(json),
            Some(Property::Shape(child)) if child.metadata().child_content.is_some() => {
                html_value(child.metadata().child_content.clone())
            }
            Some(Property::Shape(_)) => html_value(ctx.display_child(&name).await?),
            None => continue,
        };
        vars.insert(name, value);
    }

    let mut items = Vec::with_capacity(ctx.shape.items().len());
    for index in 0..ctx.shape.items().len() {
        let value = match ctx.shape.items().get(index) {
            Some(Property::Value(json)) => Value::from_serialize(json),
            Some(Property::Shape(child)) if child.metadata().child_content.is_some() => {
                html_value(child.metadata().child_content.clone())
            }
            Some(Property::Shape(_)) => html_value(ctx.display_item(index).await?),
            None => continue,
        };
        items.push(value);
    }
    vars.insert("Items".into(), Value::from(items));

    let metadata = ctx.shape.metadata();
    let model: BTreeMap<&str, Value> = BTreeMap::from([
        ("Type", Value::from(metadata.shape_type())),
        ("Prefix", Value::from(ctx.display.prefix())),
        ("Alternates", Value::from(metadata.alternates.clone())),
        ("Wrappers", Value::from(metadata.wrappers.clone())),
        ("BindingSources", Value::from(metadata.binding_sources.clone())),
    ]);
    vars.insert("Model".into(), Value::from_iter(model));
    vars.insert("ChildContent".into(), html_value(ctx.child_content().cloned()));
    vars.insert(
        "Theme".into(),
        ctx.theme().map_or(Value::from(()), |theme| Value::from(theme.name())),
    );

    Ok(Value::from_iter(vars))
}

/// Registers every template of a [`TemplateRegistry`] as a binding.
///
/// ```rust
/// use vitrine_display::template::{TemplateHarvester, TemplateRegistry};
/// use vitrine_display::ShapeTableCache;
///
/// let mut registry = TemplateRegistry::new();
/// registry.add_inline("Menu", "<nav>{{ ChildContent }}</nav>");
///
/// let cache = ShapeTableCache::new()
///     .with_theme_provider("TheBlog", TemplateHarvester::new(registry, "theme:TheBlog"));
/// ```
pub struct TemplateHarvester {
    registry: TemplateRegistry,
    engine: Arc<dyn TemplateEngine>,
    source: String,
}

impl TemplateHarvester {
    /// `source` labels inline templates in the shape table.
    pub fn new(registry: TemplateRegistry, source: impl Into<String>) -> Self {
        Self {
            registry,
            engine: Arc::new(MiniJinjaEngine::new()),
            source: source.into(),
        }
    }

    /// Harvests every template under `dir`. Files are read again on each render.
    pub fn from_dir(
        dir: impl AsRef<std::path::Path>,
        source: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let mut registry = TemplateRegistry::new();
        registry.add_template_dir(dir)?;
        Ok(Self::new(registry, source))
    }

    pub fn with_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }
}

impl ShapeTableProvider for TemplateHarvester {
    fn discover(&self, builder: &mut ShapeTableBuilder) -> Result<(), DisplayError> {
        for (shape_name, template) in self.registry.templates() {
            let source = match &template {
                ResolvedTemplate::Inline(content) => {
                    self.engine.validate(&shape_name, content)?;
                    self.source.clone()
                }
                ResolvedTemplate::File(path) => path.display().to_string(),
            };
            let binding = TemplateBinding::new(shape_name.clone(), template, self.engine.clone());
            builder.add_binding(ShapeBinding::new(shape_name, source, binding));
        }
        Ok(())
    }
}

impl fmt::Debug for TemplateHarvester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateHarvester")
            .field("source", &self.source)
            .field("templates", &self.registry.shape_names())
            .finish()
    }
}

/// Serves templates that can be added and removed while the site runs.
///
/// Lookups ignore ASCII case, like the shape table.
pub struct TemplateBindingResolver {
    engine: Arc<dyn TemplateEngine>,
    source: String,
    templates: RwLock<HashMap<String, (String, String)>>,
}

impl TemplateBindingResolver {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            engine: Arc::new(MiniJinjaEngine::new()),
            source: source.into(),
            templates: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Adds or replaces the template for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::Template`] if the template doesn't compile; the
    /// previous template, if any, stays in place.
    pub fn add_template(
        &self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), DisplayError> {
        let name = name.into();
        let source = source.into();
        self.engine.validate(&name, &source)?;
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_ascii_lowercase(), (name, source));
        Ok(())
    }

    /// Removes the template for `name`. Returns whether one existed.
    pub fn remove_template(&self, name: &str) -> bool {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name.to_ascii_lowercase())
            .is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl BindingResolver for TemplateBindingResolver {
    async fn resolve(&self, name: &str) -> Result<Option<ShapeBinding>, DisplayError> {
        let templates = self.templates.read().unwrap_or_else(PoisonError::into_inner);
        Ok(templates
            .get(&name.to_ascii_lowercase())
            .map(|(name, source)| {
                let binding = TemplateBinding::inline(name.clone(), source.clone(), self.engine.clone());
                ShapeBinding::new(name.clone(), self.source.clone(), binding)
            }))
    }
}

impl fmt::Debug for TemplateBindingResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateBindingResolver")
            .field("source", &self.source)
            .field("templates", &self.names())
            .finish()
    }
}
