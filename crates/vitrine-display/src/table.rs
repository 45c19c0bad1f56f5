//! Shape tables: per-theme indexes of descriptors and bindings.
//!
//! A [`ShapeTable`] maps
//!
//! - a base shape type (`"Content"`) to its [`ShapeDescriptor`]: the ordered
//!   lifecycle hooks and binding sources for every shape of that type, and
//! - a qualified binding name (`"Content"`, `"Content__Summary"`) to the
//!   [`ShapeBinding`] that renders it.
//!
//! Tables are assembled with a [`ShapeTableBuilder`] and are immutable once
//! built, so one `Arc<ShapeTable>` is shared by every request using a theme.
//! Lookups ignore ASCII case.
//!
//! # Binding names and descriptors
//!
//! A binding name is attached to the descriptor of its base type, the text
//! before the first `__`. Binding `"Content__Summary"` therefore adds its
//! source to the `"Content"` descriptor.
//!
//! ```rust
//! use vitrine_display::{render_fn, RawValue, ShapeTableBuilder};
//!
//! let mut builder = ShapeTableBuilder::new();
//! builder.bind("Content", "module:Contents", render_fn(|_ctx| Ok(RawValue::from("full"))));
//! builder.bind(
//!     "Content__Summary",
//!     "module:Contents",
//!     render_fn(|_ctx| Ok(RawValue::from("summary"))),
//! );
//! let table = builder.build();
//!
//! assert!(table.binding("content__summary").is_some());
//! assert_eq!(table.descriptor("Content").unwrap().binding_source(), Some("module:Contents"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::content::RawValue;
use crate::context::ShapeDisplayContext;
use crate::error::DisplayError;
use crate::hooks::ShapeHook;

/// Renders a bound shape.
#[async_trait]
pub trait BindingRender: Send + Sync {
    async fn render(&self, ctx: &mut ShapeDisplayContext<'_>) -> Result<RawValue, DisplayError>;
}

#[async_trait]
impl<F> BindingRender for F
where
    F: Fn(&mut ShapeDisplayContext<'_>) -> Result<RawValue, DisplayError> + Send + Sync,
{
    async fn render(&self, ctx: &mut ShapeDisplayContext<'_>) -> Result<RawValue, DisplayError> {
        (self)(ctx)
    }
}

/// Pins a closure to the [`BindingRender`] signature so its argument type is inferred.
pub fn render_fn<F>(f: F) -> F
where
    F: Fn(&mut ShapeDisplayContext<'_>) -> Result<RawValue, DisplayError> + Send + Sync,
{
    f
}

/// The renderer bound to one qualified name.
///
/// A binding without a renderer is a passthrough: the shape keeps whatever
/// child content it already has.
#[derive(Clone)]
pub struct ShapeBinding {
    name: String,
    source: String,
    render: Option<Arc<dyn BindingRender>>,
}

impl ShapeBinding {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        render: impl BindingRender + 'static,
    ) -> Self {
        Self::from_arc(name, source, Arc::new(render))
    }

    pub fn from_arc(
        name: impl Into<String>,
        source: impl Into<String>,
        render: Arc<dyn BindingRender>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            render: Some(render),
        }
    }

    /// A binding that leaves already rendered content untouched.
    pub fn passthrough(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            render: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the binding came from (a template path, a module name).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn renderer(&self) -> Option<&Arc<dyn BindingRender>> {
        self.render.as_ref()
    }
}

impl fmt::Debug for ShapeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeBinding")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("passthrough", &self.render.is_none())
            .finish()
    }
}

/// Per-type display metadata shared by every shape of a base type.
#[derive(Clone, Default)]
pub struct ShapeDescriptor {
    shape_type: String,
    binding_source: Option<String>,
    binding_sources: Vec<String>,
    displaying: Vec<Arc<dyn ShapeHook>>,
    processing: Vec<Arc<dyn ShapeHook>>,
    displayed: Vec<Arc<dyn ShapeHook>>,
}

impl ShapeDescriptor {
    pub fn new(shape_type: impl Into<String>) -> Self {
        Self {
            shape_type: shape_type.into(),
            ..Self::default()
        }
    }

    pub fn shape_type(&self) -> &str {
        &self.shape_type
    }

    /// The primary binding source.
    pub fn binding_source(&self) -> Option<&str> {
        self.binding_source.as_deref()
    }

    /// Every source that bound a name for this type, in registration order.
    pub fn binding_sources(&self) -> &[String] {
        &self.binding_sources
    }

    pub fn displaying(&self) -> &[Arc<dyn ShapeHook>] {
        &self.displaying
    }

    pub fn processing(&self) -> &[Arc<dyn ShapeHook>] {
        &self.processing
    }

    pub fn displayed(&self) -> &[Arc<dyn ShapeHook>] {
        &self.displayed
    }

    fn add_source(&mut self, source: &str) {
        if !self.binding_sources.iter().any(|s| s == source) {
            self.binding_sources.push(source.to_string());
        }
    }
}

impl fmt::Debug for ShapeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeDescriptor")
            .field("shape_type", &self.shape_type)
            .field("binding_source", &self.binding_source)
            .field("binding_sources", &self.binding_sources)
            .field("displaying_count", &self.displaying.len())
            .field("processing_count", &self.processing.len())
            .field("displayed_count", &self.displayed.len())
            .finish()
    }
}

/// Returns the base type of a binding name: the text before the first `__`.
pub fn base_shape_type(name: &str) -> &str {
    name.split_once("__").map(|(base, _)| base).unwrap_or(name)
}

fn table_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// An immutable index of descriptors and bindings for one theme.
#[derive(Clone, Default)]
pub struct ShapeTable {
    descriptors: HashMap<String, Arc<ShapeDescriptor>>,
    bindings: HashMap<String, ShapeBinding>,
}

impl ShapeTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptor(&self, shape_type: &str) -> Option<&Arc<ShapeDescriptor>> {
        self.descriptors.get(&table_key(shape_type))
    }

    pub fn binding(&self, name: &str) -> Option<&ShapeBinding> {
        self.bindings.get(&table_key(name))
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<ShapeDescriptor>> {
        self.descriptors.values()
    }

    pub fn bindings(&self) -> impl Iterator<Item = &ShapeBinding> {
        self.bindings.values()
    }

    /// Binding names, sorted.
    pub fn binding_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bindings.values().map(|b| b.name()).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty() && self.bindings.is_empty()
    }
}

impl fmt::Debug for ShapeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeTable")
            .field("descriptors", &self.descriptors.len())
            .field("bindings", &self.binding_names())
            .finish()
    }
}

/// Collects descriptors and bindings into a [`ShapeTable`].
///
/// Later registrations win: re-binding a name replaces the earlier binding,
/// which is how a derived theme overrides its base.
#[derive(Default)]
pub struct ShapeTableBuilder {
    descriptors: HashMap<String, ShapeDescriptor>,
    bindings: HashMap<String, ShapeBinding>,
}

impl ShapeTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts describing a shape type. Hooks attach to its base type.
    pub fn describe(&mut self, shape_type: &str) -> DescriptorBuilder<'_> {
        let base = base_shape_type(shape_type);
        let descriptor = self
            .descriptors
            .entry(table_key(base))
            .or_insert_with(|| ShapeDescriptor::new(base));
        DescriptorBuilder { descriptor }
    }

    /// Binds a renderer to a qualified name.
    pub fn bind(
        &mut self,
        name: &str,
        source: &str,
        render: impl BindingRender + 'static,
    ) -> &mut Self {
        self.add_binding(ShapeBinding::new(name, source, render))
    }

    /// Registers a prepared binding, replacing any earlier one of the same name.
    pub fn add_binding(&mut self, binding: ShapeBinding) -> &mut Self {
        let base = base_shape_type(binding.name());
        let descriptor = self
            .descriptors
            .entry(table_key(base))
            .or_insert_with(|| ShapeDescriptor::new(base));
        descriptor.add_source(binding.source());
        if binding.name().eq_ignore_ascii_case(base) {
            descriptor.binding_source = Some(binding.source().to_string());
        }
        self.bindings.insert(table_key(binding.name()), binding);
        self
    }

    /// Number of bindings registered so far.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn build(self) -> ShapeTable {
        ShapeTable {
            descriptors: self
                .descriptors
                .into_iter()
                .map(|(key, descriptor)| (key, Arc::new(descriptor)))
                .collect(),
            bindings: self.bindings,
        }
    }
}

/// Adds hooks and sources to one descriptor. Returned by [`ShapeTableBuilder::describe`].
pub struct DescriptorBuilder<'a> {
    descriptor: &'a mut ShapeDescriptor,
}

impl DescriptorBuilder<'_> {
    pub fn on_displaying(self, hook: impl ShapeHook + 'static) -> Self {
        self.descriptor.displaying.push(Arc::new(hook));
        self
    }

    pub fn on_processing(self, hook: impl ShapeHook + 'static) -> Self {
        self.descriptor.processing.push(Arc::new(hook));
        self
    }

    pub fn on_displayed(self, hook: impl ShapeHook + 'static) -> Self {
        self.descriptor.displayed.push(Arc::new(hook));
        self
    }

    /// Sets the primary binding source without binding anything.
    pub fn binding_source(self, source: impl Into<String>) -> Self {
        self.descriptor.binding_source = Some(source.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::hook_fn;

    fn noop() -> impl BindingRender {
        render_fn(|_ctx| Ok(RawValue::Null))
    }

    #[test]
    fn test_base_shape_type() {
        assert_eq!(base_shape_type("Content"), "Content");
        assert_eq!(base_shape_type("Content__Summary"), "Content");
        assert_eq!(base_shape_type("Content__Summary__Blog"), "Content");
        assert_eq!(base_shape_type("Content_Edit"), "Content_Edit");
    }

    #[test]
    fn test_lookup_ignores_case() {
        let mut builder = ShapeTableBuilder::new();
        builder.bind("Content__Summary", "a", noop());
        let table = builder.build();
        assert!(table.binding("CONTENT__summary").is_some());
        assert!(table.descriptor("content").is_some());
        assert_eq!(table.descriptor("content").unwrap().shape_type(), "Content");
    }

    #[test]
    fn test_binding_sources_are_collected_per_base_type() {
        let mut builder = ShapeTableBuilder::new();
        builder
            .bind("Content__Summary", "theme:TheBlog", noop())
            .bind("Content", "module:Contents", noop())
            .bind("Content__Detail", "module:Contents", noop());
        let table = builder.build();

        let descriptor = table.descriptor("Content").unwrap();
        assert_eq!(
            descriptor.binding_sources(),
            &["theme:TheBlog".to_string(), "module:Contents".to_string()]
        );
        assert_eq!(descriptor.binding_source(), Some("module:Contents"));
    }

    #[test]
    fn test_rebinding_replaces() {
        let mut builder = ShapeTableBuilder::new();
        builder.bind("Menu", "base", noop());
        builder.add_binding(ShapeBinding::passthrough("menu", "derived"));
        let table = builder.build();
        assert_eq!(table.binding("Menu").unwrap().source(), "derived");
        assert!(table.binding("Menu").unwrap().renderer().is_none());
        assert_eq!(table.binding_names(), vec!["menu"]);
    }

    #[test]
    fn test_describe_attaches_hooks_to_base_type() {
        let mut builder = ShapeTableBuilder::new();
        builder
            .describe("Widget__Footer")
            .on_displaying(hook_fn(|_ctx| Ok(())))
            .on_displayed(hook_fn(|_ctx| Ok(())))
            .binding_source("module:Widgets");
        builder.describe("Widget").on_processing(hook_fn(|_ctx| Ok(())));
        let table = builder.build();

        let descriptor = table.descriptor("Widget").unwrap();
        assert_eq!(descriptor.displaying().len(), 1);
        assert_eq!(descriptor.processing().len(), 1);
        assert_eq!(descriptor.displayed().len(), 1);
        assert_eq!(descriptor.binding_source(), Some("module:Widgets"));
        assert!(descriptor.binding_sources().is_empty());
        assert!(table.descriptor("Widget__Footer").is_none());
    }

    #[test]
    fn test_empty_table() {
        let table = ShapeTable::new();
        assert!(table.is_empty());
        assert!(table.binding("Anything").is_none());
    }
}
