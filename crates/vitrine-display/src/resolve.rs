//! Descriptor and binding resolution.
//!
//! # Fallback names
//!
//! Shape names use `__` as a specificity separator. When an exact name has no
//! match, the name is truncated at its last `__` and tried again:
//!
//! ```text
//! Content__Summary__Blog → Content__Summary → Content
//! ```
//!
//! This is a naming convention, not a type hierarchy: a template for
//! `Content__Summary` does not need to know about `Content`.
//!
//! # Binding resolution
//!
//! [`resolve_binding`] works in two phases:
//!
//! 1. Alternates, last to first (later alternates are more specific).
//! 2. The shape type, then each of its fallback names.
//!
//! For every candidate name the registered [`BindingResolver`]s are asked in
//! registration order before the shape table. The first hit wins.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DisplayError;
use crate::table::{ShapeBinding, ShapeDescriptor, ShapeTable};

/// A source of bindings outside the shape table.
///
/// Resolvers are consulted before the table for every candidate name, so
/// they can supply templates compiled on demand or stored elsewhere.
#[async_trait]
pub trait BindingResolver: Send + Sync {
    /// Returns the binding for a fully qualified name, if this resolver has one.
    async fn resolve(&self, name: &str) -> Result<Option<ShapeBinding>, DisplayError>;
}

/// Iterator over a name and its `__` truncations, most specific first.
#[derive(Debug, Clone)]
pub struct FallbackNames<'a> {
    next: Option<&'a str>,
}

impl<'a> Iterator for FallbackNames<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let current = self.next?;
        self.next = current
            .rfind("__")
            .filter(|&index| index > 0)
            .map(|index| &current[..index]);
        Some(current)
    }
}

/// Yields `name`, then every truncation at the last `__`.
///
/// ```rust
/// use vitrine_display::fallback_names;
///
/// let names: Vec<&str> = fallback_names("Foo__Bar__Baz").collect();
/// assert_eq!(names, vec!["Foo__Bar__Baz", "Foo__Bar", "Foo"]);
/// ```
pub fn fallback_names(name: &str) -> FallbackNames<'_> {
    FallbackNames {
        next: (!name.is_empty()).then_some(name),
    }
}

/// Finds the descriptor for a shape type, ignoring alternates.
pub fn resolve_descriptor(table: &ShapeTable, shape_type: &str) -> Option<Arc<ShapeDescriptor>> {
    fallback_names(shape_type).find_map(|name| table.descriptor(name).cloned())
}

/// Finds the binding to render a shape with.
///
/// Returns `Ok(None)` when neither an alternate nor any fallback of the shape
/// type has a binding. Resolver errors propagate.
pub async fn resolve_binding(
    resolvers: &[Arc<dyn BindingResolver>],
    table: &ShapeTable,
    shape_type: &str,
    alternates: &[String],
) -> Result<Option<ShapeBinding>, DisplayError> {
    for alternate in alternates.iter().rev() {
        if let Some(binding) = lookup(resolvers, table, alternate).await? {
            tracing::debug!(shape_type, alternate = %alternate, "binding resolved from alternate");
            return Ok(Some(binding));
        }
    }

    for name in fallback_names(shape_type) {
        if let Some(binding) = lookup(resolvers, table, name).await? {
            tracing::debug!(shape_type, name, "binding resolved");
            return Ok(Some(binding));
        }
    }

    Ok(None)
}

async fn lookup(
    resolvers: &[Arc<dyn BindingResolver>],
    table: &ShapeTable,
    name: &str,
) -> Result<Option<ShapeBinding>, DisplayError> {
    // TODO: remember resolver misses per request once sites register more than a handful of resolvers
    for resolver in resolvers {
        if let Some(binding) = resolver.resolve(name).await? {
            return Ok(Some(binding));
        }
    }
    Ok(table.binding(name).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::RawValue;
    use crate::table::{render_fn, ShapeTableBuilder};
    use proptest::prelude::*;
    use std::sync::Mutex;

    fn table_with(names: &[&str]) -> ShapeTable {
        let mut builder = ShapeTableBuilder::new();
        for name in names {
            builder.bind(name, "table", render_fn(|_ctx| Ok(RawValue::Null)));
        }
        builder.build()
    }

    struct MapResolver {
        names: Vec<&'static str>,
        asked: Mutex<Vec<String>>,
    }

    impl MapResolver {
        fn new(names: &[&'static str]) -> Self {
            Self {
                names: names.to_vec(),
                asked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BindingResolver for MapResolver {
        async fn resolve(&self, name: &str) -> Result<Option<ShapeBinding>, DisplayError> {
            self.asked.lock().unwrap().push(name.to_string());
            Ok(self
                .names
                .iter()
                .find(|n| **n == name)
                .map(|n| ShapeBinding::passthrough(*n, "resolver")))
        }
    }

    #[test]
    fn test_fallback_names_single() {
        let names: Vec<&str> = fallback_names("Foo").collect();
        assert_eq!(names, vec!["Foo"]);
    }

    #[test]
    fn test_fallback_names_empty() {
        assert_eq!(fallback_names("").count(), 0);
    }

    #[test]
    fn test_fallback_names_leading_separator_stops() {
        let names: Vec<&str> = fallback_names("__Foo").collect();
        assert_eq!(names, vec!["__Foo"]);
    }

    #[test]
    fn test_resolve_descriptor_truncates() {
        let table = table_with(&["Foo"]);
        let descriptor = resolve_descriptor(&table, "Foo__Bar__Baz").unwrap();
        assert_eq!(descriptor.shape_type(), "Foo");
        assert!(resolve_descriptor(&table, "Other__Bar").is_none());
    }

    #[tokio::test]
    async fn test_alternates_checked_last_first() {
        let table = table_with(&["Foo", "Foo__A", "Foo__B"]);
        let alternates = vec!["Foo__A".to_string(), "Foo__B".to_string()];
        let binding = resolve_binding(&[], &table, "Foo", &alternates)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(binding.name(), "Foo__B");
    }

    #[tokio::test]
    async fn test_registered_alternate_wins_over_base() {
        let table = table_with(&["Foo", "Foo__B"]);
        let alternates = vec!["Foo__A".to_string(), "Foo__B".to_string()];
        let binding = resolve_binding(&[], &table, "Foo", &alternates)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(binding.name(), "Foo__B");

        let alternates = vec!["Foo__B".to_string(), "Foo__A".to_string()];
        let binding = resolve_binding(&[], &table, "Foo", &alternates)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(binding.name(), "Foo__B");
    }

    #[tokio::test]
    async fn test_base_type_truncation() {
        let table = table_with(&["Foo__Bar"]);
        let binding = resolve_binding(&[], &table, "Foo__Bar__Baz", &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(binding.name(), "Foo__Bar");

        let table = table_with(&["Foo"]);
        let binding = resolve_binding(&[], &table, "Foo__Bar__Baz", &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(binding.name(), "Foo");
    }

    #[tokio::test]
    async fn test_no_binding_is_none() {
        let table = table_with(&["Other"]);
        let alternates = vec!["Foo__Alt".to_string()];
        assert!(resolve_binding(&[], &table, "Foo__Bar", &alternates)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_resolvers_consulted_before_table() {
        let table = table_with(&["Foo"]);
        let resolver: Arc<dyn BindingResolver> = Arc::new(MapResolver::new(&["Foo"]));
        let binding = resolve_binding(&[resolver], &table, "Foo", &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(binding.source(), "resolver");
    }

    #[tokio::test]
    async fn test_resolvers_asked_in_order_for_each_candidate() {
        let table = table_with(&["Foo"]);
        let first = Arc::new(MapResolver::new(&[]));
        let second = Arc::new(MapResolver::new(&[]));
        let resolvers: Vec<Arc<dyn BindingResolver>> = vec![first.clone(), second.clone()];
        let alternates = vec!["Foo__Alt".to_string()];

        let binding = resolve_binding(&resolvers, &table, "Foo__Bar", &alternates)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(binding.source(), "table");
        assert_eq!(
            *first.asked.lock().unwrap(),
            vec!["Foo__Alt", "Foo__Bar", "Foo"]
        );
        assert_eq!(*second.asked.lock().unwrap(), *first.asked.lock().unwrap());
    }

    proptest! {
        #[test]
        fn prop_fallback_names_shrink_to_first_segment(
            segments in prop::collection::vec("[A-Za-z][A-Za-z0-9]{0,6}", 1..6)
        ) {
            let name = segments.join("__");
            let names: Vec<&str> = fallback_names(&name).collect();
            prop_assert_eq!(names.len(), segments.len());
            prop_assert_eq!(names[0], name.as_str());
            prop_assert_eq!(*names.last().unwrap(), segments[0].as_str());
            for pair in names.windows(2) {
                prop_assert!(pair[0].starts_with(pair[1]));
                prop_assert!(pair[0].len() > pair[1].len());
            }
        }
    }
}
