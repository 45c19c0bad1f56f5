//! Shapes: named, data-carrying placeholders for one renderable unit.
//!
//! A [`Shape`] has a fixed type name and a [`ShapeMetadata`] describing how it
//! should be displayed: alternates (more specific binding names), wrappers
//! (frames applied around the rendered content), a field prefix, and
//! per-instance lifecycle hooks.
//!
//! Shape data is held as named properties (insertion ordered, unique keys) and
//! positional items. A property is either plain JSON data or a nested shape.
//!
//! ```rust
//! use vitrine_display::Shape;
//! use serde_json::json;
//!
//! let shape = Shape::new("Content")
//!     .with_alternate("Content__Summary")
//!     .with_alternate("Content__Summary__Blog")
//!     .with_wrapper("Content_Wrapper")
//!     .with("title", json!("Hello"))
//!     .with("header", Shape::new("Content_Header"));
//!
//! assert_eq!(shape.shape_type(), "Content");
//! assert_eq!(shape.metadata().alternates.last().unwrap(), "Content__Summary__Blog");
//! assert!(shape.child_shape("header").is_some());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::content::HtmlContent;
use crate::hooks::ShapeHook;

/// Display metadata owned by a [`Shape`].
#[derive(Clone, Default)]
pub struct ShapeMetadata {
    shape_type: String,
    /// Field prefix applied to the display context while this shape renders.
    pub prefix: Option<String>,
    /// Alternate binding names. Later entries have higher priority.
    pub alternates: Vec<String>,
    /// Wrapper shape types, applied in order. Drained by each render.
    pub wrappers: Vec<String>,
    /// Per-instance hooks run after the descriptor's displaying hooks.
    pub displaying: Vec<Arc<dyn ShapeHook>>,
    /// Per-instance hooks run once a binding has been selected.
    pub processing: Vec<Arc<dyn ShapeHook>>,
    /// Per-instance hooks run last in the displayed phase.
    pub displayed: Vec<Arc<dyn ShapeHook>>,
    /// The rendered content, if any.
    pub child_content: Option<HtmlContent>,
    /// Binding sources of the resolved descriptor, used to scope localization.
    pub binding_sources: Vec<String>,
}

impl ShapeMetadata {
    /// Creates metadata for the given shape type.
    pub fn new(shape_type: impl Into<String>) -> Self {
        Self {
            shape_type: shape_type.into(),
            ..Self::default()
        }
    }

    /// The shape type. It never changes after creation.
    pub fn shape_type(&self) -> &str {
        &self.shape_type
    }

    /// Adds an alternate with the highest priority.
    ///
    /// An alternate that is already present moves to the end of the list.
    pub fn add_alternate(&mut self, alternate: impl Into<String>) {
        let alternate = alternate.into();
        self.alternates.retain(|a| a != &alternate);
        self.alternates.push(alternate);
    }

    /// Appends a wrapper. The last wrapper ends up outermost.
    pub fn add_wrapper(&mut self, wrapper: impl Into<String>) {
        self.wrappers.push(wrapper.into());
    }

    /// Registers a per-instance displaying hook.
    pub fn on_displaying(&mut self, hook: impl ShapeHook + 'static) {
        self.displaying.push(Arc::new(hook));
    }

    /// Registers a per-instance processing hook.
    pub fn on_processing(&mut self, hook: impl ShapeHook + 'static) {
        self.processing.push(Arc::new(hook));
    }

    /// Registers a per-instance displayed hook.
    pub fn on_displayed(&mut self, hook: impl ShapeHook + 'static) {
        self.displayed.push(Arc::new(hook));
    }
}

impl fmt::Debug for ShapeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeMetadata")
            .field("shape_type", &self.shape_type)
            .field("prefix", &self.prefix)
            .field("alternates", &self.alternates)
            .field("wrappers", &self.wrappers)
            .field("displaying_count", &self.displaying.len())
            .field("processing_count", &self.processing.len())
            .field("displayed_count", &self.displayed.len())
            .field("child_content", &self.child_content)
            .field("binding_sources", &self.binding_sources)
            .finish()
    }
}

/// A value held by a shape: plain data or a nested shape.
#[derive(Debug, Clone)]
pub enum Property {
    Value(serde_json::Value),
    Shape(Shape),
}

impl Property {
    pub fn as_shape(&self) -> Option<&Shape> {
        match self {
            Property::Shape(shape) => Some(shape),
            Property::Value(_) => None,
        }
    }

    pub fn as_shape_mut(&mut self) -> Option<&mut Shape> {
        match self {
            Property::Shape(shape) => Some(shape),
            Property::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Property::Value(value) => Some(value),
            Property::Shape(_) => None,
        }
    }
}

impl From<serde_json::Value> for Property {
    fn from(value: serde_json::Value) -> Self {
        Property::Value(value)
    }
}

impl From<Shape> for Property {
    fn from(shape: Shape) -> Self {
        Property::Shape(shape)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::Value(serde_json::Value::String(value.to_string()))
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Property::Value(serde_json::Value::String(value))
    }
}

/// A named, typed rendering unit.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    metadata: ShapeMetadata,
    properties: Vec<(String, Property)>,
    items: Vec<Property>,
}

impl Shape {
    /// Creates an empty shape of the given type.
    pub fn new(shape_type: impl Into<String>) -> Self {
        Self {
            metadata: ShapeMetadata::new(shape_type),
            properties: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn shape_type(&self) -> &str {
        self.metadata.shape_type()
    }

    pub fn metadata(&self) -> &ShapeMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ShapeMetadata {
        &mut self.metadata
    }

    /// Sets a named property, replacing an existing one in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Property>) {
        let name = name.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((name, value)),
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Property>) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metadata.prefix = Some(prefix.into());
        self
    }

    pub fn with_alternate(mut self, alternate: impl Into<String>) -> Self {
        self.metadata.add_alternate(alternate);
        self
    }

    pub fn with_wrapper(mut self, wrapper: impl Into<String>) -> Self {
        self.metadata.add_wrapper(wrapper);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Removes a named property, returning it.
    pub fn remove(&mut self, name: &str) -> Option<Property> {
        let index = self.properties.iter().position(|(key, _)| key == name)?;
        Some(self.properties.remove(index).1)
    }

    pub fn child_shape(&self, name: &str) -> Option<&Shape> {
        self.get(name).and_then(Property::as_shape)
    }

    pub fn child_shape_mut(&mut self, name: &str) -> Option<&mut Shape> {
        self.get_mut(name).and_then(Property::as_shape_mut)
    }

    /// Named properties in insertion order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.properties.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(key, _)| key.as_str())
    }

    /// Appends a positional item.
    pub fn push(&mut self, item: impl Into<Property>) {
        self.items.push(item.into());
    }

    pub fn with_item(mut self, item: impl Into<Property>) -> Self {
        self.push(item);
        self
    }

    pub fn items(&self) -> &[Property] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [Property] {
        &mut self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_properties_keep_insertion_order() {
        let shape = Shape::new("Card")
            .with("b", json!(1))
            .with("a", json!(2))
            .with("c", json!(3));
        let names: Vec<&str> = shape.property_names().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut shape = Shape::new("Card").with("a", json!(1)).with("b", json!(2));
        shape.set("a", json!(10));
        let names: Vec<&str> = shape.property_names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(shape.get("a").unwrap().as_value(), Some(&json!(10)));
    }

    #[test]
    fn test_remove_property() {
        let mut shape = Shape::new("Card").with("a", json!(1));
        assert!(shape.remove("a").is_some());
        assert!(shape.get("a").is_none());
        assert!(shape.remove("a").is_none());
    }

    #[test]
    fn test_readding_alternate_moves_it_last() {
        let mut meta = ShapeMetadata::new("Card");
        meta.add_alternate("Card__A");
        meta.add_alternate("Card__B");
        meta.add_alternate("Card__A");
        assert_eq!(meta.alternates, vec!["Card__B", "Card__A"]);
    }

    #[test]
    fn test_nested_shape_access() {
        let mut shape = Shape::new("Page").with("header", Shape::new("Header"));
        assert_eq!(shape.child_shape("header").unwrap().shape_type(), "Header");
        shape
            .child_shape_mut("header")
            .unwrap()
            .metadata_mut()
            .add_wrapper("Frame");
        assert_eq!(
            shape.child_shape("header").unwrap().metadata().wrappers,
            vec!["Frame"]
        );
        assert!(shape.child_shape("missing").is_none());
    }

    #[test]
    fn test_items() {
        let shape = Shape::new("List")
            .with_item(Shape::new("Item"))
            .with_item(json!("text"));
        assert_eq!(shape.items().len(), 2);
        assert!(shape.items()[0].as_shape().is_some());
        assert!(shape.items()[1].as_value().is_some());
    }
}
