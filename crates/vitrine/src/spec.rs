//! Serializable descriptions of shape trees.
//!
//! The CLI reads shapes from YAML:
//!
//! ```yaml
//! type: Layout
//! children:
//!   Content:
//!     type: Content
//!     alternates: [Content__Summary]
//!     properties:
//!       Title: Hello
//! items:
//!   - plain value
//!   - type: Widget
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vitrine_display::{Property, Shape};

/// A shape tree as it appears in a shape file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShapeSpec {
    #[serde(rename = "type")]
    pub shape_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wrappers: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, ShapeSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ItemSpec>,
}

/// A positional child: a nested shape or a plain value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemSpec {
    Shape(ShapeSpec),
    Value(serde_json::Value),
}

impl ShapeSpec {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn into_shape(self) -> Shape {
        let mut shape = Shape::new(self.shape_type);
        let metadata = shape.metadata_mut();
        metadata.prefix = self.prefix;
        for alternate in self.alternates {
            metadata.add_alternate(alternate);
        }
        for wrapper in self.wrappers {
            metadata.add_wrapper(wrapper);
        }

        for (name, value) in self.properties {
            shape.set(name, value);
        }
        for (name, child) in self.children {
            shape.set(name, child.into_shape());
        }
        for item in self.items {
            shape.push(Property::from(item));
        }
        shape
    }
}

impl From<ShapeSpec> for Shape {
    fn from(spec: ShapeSpec) -> Self {
        spec.into_shape()
    }
}

impl From<ItemSpec> for Property {
    fn from(item: ItemSpec) -> Self {
        match item {
            ItemSpec::Shape(spec) => Property::Shape(spec.into_shape()),
            ItemSpec::Value(value) => Property::Value(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_file_to_shape() {
        let spec = ShapeSpec::from_yaml(
            r#"
type: Layout
prefix: Page
wrappers: [Document]
properties:
  Title: Hello
  Count: 3
children:
  Content:
    type: Content
    alternates: [Content__Summary, Content__Card]
items:
  - plain
  - type: Widget
"#,
        )
        .unwrap();
        let shape = spec.into_shape();

        assert_eq!(shape.shape_type(), "Layout");
        assert_eq!(shape.metadata().prefix.as_deref(), Some("Page"));
        assert_eq!(shape.metadata().wrappers, vec!["Document"]);
        assert_eq!(
            shape.get("Count").and_then(Property::as_value),
            Some(&serde_json::json!(3))
        );

        let content = shape.child_shape("Content").unwrap();
        assert_eq!(
            content.metadata().alternates,
            vec!["Content__Summary", "Content__Card"]
        );

        assert_eq!(shape.items().len(), 2);
        assert_eq!(shape.items()[0].as_value(), Some(&serde_json::json!("plain")));
        assert_eq!(shape.items()[1].as_shape().map(Shape::shape_type), Some("Widget"));
    }

    #[test]
    fn test_type_is_required() {
        assert!(ShapeSpec::from_yaml("properties: {}").is_err());
    }

    #[test]
    fn test_map_item_without_type_is_a_value() {
        let spec = ShapeSpec::from_yaml("type: List\nitems:\n  - name: x\n").unwrap();
        assert_eq!(
            spec.items,
            vec![ItemSpec::Value(serde_json::json!({ "name": "x" }))]
        );
    }
}
