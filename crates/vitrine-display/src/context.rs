//! Display contexts.
//!
//! Two context types flow through the pipeline:
//!
//! 1. [`DisplayContext`]: ambient state supplied by the caller (field prefix,
//!    shared [`Services`], a model-error sink). It is cheap to clone and every
//!    nested render forks its own copy instead of mutating the parent's.
//! 2. [`ShapeDisplayContext`]: the per-shape state handed to hooks and
//!    bindings. It borrows the shape being rendered, owns the forked
//!    `DisplayContext`, and knows the engine so bindings can display nested
//!    shapes.
//!
//! The rendered content has exactly one home, the shape's
//! [`child_content`](crate::ShapeMetadata::child_content). Hooks that replace
//! the content write to that slot through
//! [`ShapeDisplayContext::set_child_content`], so nothing needs to be copied
//! back and forth between phases.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::content::{coerce, HtmlContent, RawValue};
use crate::engine::DisplayEngine;
use crate::error::DisplayError;
use crate::shape::Shape;
use crate::theme::Theme;

/// Type-keyed collaborators available to hooks and bindings.
///
/// Values are stored behind `Arc`, so cloning a `Services` map (which every
/// context fork does) shares the collaborators rather than copying them.
///
/// ```rust
/// use vitrine_display::Services;
///
/// struct Clock { year: u32 }
///
/// let mut services = Services::new();
/// services.insert(Clock { year: 2026 });
/// assert_eq!(services.get::<Clock>().unwrap().year, 2026);
/// ```
#[derive(Clone, Default)]
pub struct Services {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a service, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: T) {
        self.map.insert(TypeId::of::<T>(), Arc::new(service));
    }

    /// Inserts an already shared service.
    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.map.insert(TypeId::of::<T>(), service);
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|service| service.downcast_ref())
    }

    /// Returns a shared handle to a service.
    pub fn get_arc<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.map
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|service| service.downcast().ok())
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("count", &self.map.len())
            .finish()
    }
}

/// Callback receiving `(field, message)` model errors reported by hooks.
pub type ModelErrorSink = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Ambient state for one display invocation.
#[derive(Clone, Default)]
pub struct DisplayContext {
    prefix: String,
    parent_prefix: Option<String>,
    services: Services,
    model_errors: Option<ModelErrorSink>,
}

impl DisplayContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Installs the callback that receives model errors reported by hooks.
    pub fn with_model_errors<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.model_errors = Some(Arc::new(sink));
        self
    }

    /// The current field prefix; empty when none applies.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The prefix of the context this one was forked from.
    pub fn parent_prefix(&self) -> Option<&str> {
        self.parent_prefix.as_deref()
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut Services {
        &mut self.services
    }

    /// Copies this context for a nested render with its own prefix.
    ///
    /// The parent's prefix is remembered by value; the parent is not modified.
    pub fn fork(&self, prefix: Option<&str>) -> Self {
        Self {
            prefix: prefix.unwrap_or_default().to_string(),
            parent_prefix: Some(self.prefix.clone()),
            services: self.services.clone(),
            model_errors: self.model_errors.clone(),
        }
    }

    /// Qualifies a field name with the current prefix (`prefix.name`).
    pub fn field_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix, name)
        }
    }

    /// Reports a model error for a field. Never aborts the pipeline.
    ///
    /// Errors are dropped when the caller installed no sink.
    pub fn add_model_error(&self, field: &str, message: &str) {
        match &self.model_errors {
            Some(sink) => sink(&self.field_name(field), message),
            None => tracing::debug!(field, message, "model error reported without a sink"),
        }
    }
}

impl fmt::Debug for DisplayContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayContext")
            .field("prefix", &self.prefix)
            .field("parent_prefix", &self.parent_prefix)
            .field("services", &self.services)
            .field("has_model_errors", &self.model_errors.is_some())
            .finish()
    }
}

/// Per-shape state shared by hooks and the binding during one display.
pub struct ShapeDisplayContext<'a> {
    /// The shape being displayed.
    pub shape: &'a mut Shape,
    /// The display context forked for this shape.
    pub display: DisplayContext,
    theme: Option<Theme>,
    engine: &'a DisplayEngine,
}

impl<'a> ShapeDisplayContext<'a> {
    pub(crate) fn new(
        shape: &'a mut Shape,
        display: DisplayContext,
        theme: Option<Theme>,
        engine: &'a DisplayEngine,
    ) -> Self {
        Self {
            shape,
            display,
            theme,
            engine,
        }
    }

    /// The theme the shape is displayed with, if any.
    pub fn theme(&self) -> Option<&Theme> {
        self.theme.as_ref()
    }

    pub fn engine(&self) -> &DisplayEngine {
        self.engine
    }

    pub fn child_content(&self) -> Option<&HtmlContent> {
        self.shape.metadata().child_content.as_ref()
    }

    pub fn set_child_content(&mut self, content: Option<HtmlContent>) {
        self.shape.metadata_mut().child_content = content;
    }

    /// Coerces a raw value and stores it as the child content.
    pub fn set_child_value(&mut self, value: impl Into<RawValue>) {
        self.set_child_content(coerce(value.into()));
    }

    /// Displays the nested shape stored under `name`.
    ///
    /// A child without its own prefix gets `parent.name`. Returns `Ok(None)`
    /// when no child shape exists under that name.
    pub async fn display_child(&mut self, name: &str) -> Result<Option<HtmlContent>, DisplayError> {
        let field = self.display.field_name(name);
        let Some(child) = self.shape.child_shape_mut(name) else {
            return Ok(None);
        };
        if child.metadata().prefix.is_none() {
            child.metadata_mut().prefix = Some(field);
        }
        self.engine.display(child, &self.display).await
    }

    /// Displays the positional item at `index`, coercing plain values.
    pub async fn display_item(&mut self, index: usize) -> Result<Option<HtmlContent>, DisplayError> {
        let field = self.display.field_name(&format!("[{index}]"));
        match self.shape.items_mut().get_mut(index) {
            Some(crate::shape::Property::Shape(child)) => {
                if child.metadata().prefix.is_none() {
                    child.metadata_mut().prefix = Some(field);
                }
                self.engine.display(child, &self.display).await
            }
            Some(crate::shape::Property::Value(value)) => {
                Ok(coerce(RawValue::Json(value.clone())))
            }
            None => Ok(None),
        }
    }
}

impl fmt::Debug for ShapeDisplayContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeDisplayContext")
            .field("shape", &self.shape.shape_type())
            .field("display", &self.display)
            .field("theme", &self.theme)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_services_insert_and_get() {
        struct Greeting(&'static str);

        let mut services = Services::new();
        assert!(services.is_empty());
        services.insert(Greeting("hi"));
        assert!(services.contains::<Greeting>());
        assert_eq!(services.get::<Greeting>().unwrap().0, "hi");
        assert_eq!(services.len(), 1);
        assert!(services.get::<String>().is_none());
    }

    #[test]
    fn test_services_clone_shares_values() {
        let mut services = Services::new();
        services.insert_arc(Arc::new(Mutex::new(0u32)));
        let cloned = services.clone();
        *cloned.get::<Mutex<u32>>().unwrap().lock().unwrap() += 5;
        assert_eq!(*services.get::<Mutex<u32>>().unwrap().lock().unwrap(), 5);
        assert!(services.get_arc::<Mutex<u32>>().is_some());
    }

    #[test]
    fn test_fork_does_not_touch_parent() {
        let parent = DisplayContext::new().with_prefix("Order");
        let child = parent.fork(Some("Lines"));
        assert_eq!(parent.prefix(), "Order");
        assert_eq!(child.prefix(), "Lines");
        assert_eq!(child.parent_prefix(), Some("Order"));

        let unprefixed = parent.fork(None);
        assert_eq!(unprefixed.prefix(), "");
    }

    #[test]
    fn test_field_name() {
        assert_eq!(DisplayContext::new().field_name("Title"), "Title");
        assert_eq!(
            DisplayContext::new().with_prefix("Part").field_name("Title"),
            "Part.Title"
        );
    }

    #[test]
    fn test_model_errors_reach_sink() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let ctx = DisplayContext::new()
            .with_prefix("Blog")
            .with_model_errors(move |field, message| {
                sink.lock()
                    .unwrap()
                    .push(format!("{field}: {message}"));
            });

        ctx.fork(Some("Post")).add_model_error("Title", "required");
        assert_eq!(*errors.lock().unwrap(), vec!["Post.Title: required"]);
    }

    #[test]
    fn test_model_errors_without_sink_are_ignored() {
        DisplayContext::new().add_model_error("Title", "required");
    }
}
