//! Renderable content and value coercion.
//!
//! Bindings and hooks produce a [`RawValue`]. Before it is stored as a shape's
//! child content it passes through [`coerce`]:
//!
//! | Input | Result |
//! |-------|--------|
//! | `RawValue::Null` | `None` |
//! | `RawValue::Html` | returned unchanged |
//! | `RawValue::Text` | HTML-encoded |
//! | `RawValue::Json` | string form, HTML-encoded (`null` → `None`) |
//!
//! Already-encoded [`HtmlContent`] is never serialized or encoded a second time.

use std::fmt;

use serde::Serialize;

/// Markup that is already safe to emit.
///
/// Constructing `HtmlContent` from a string asserts that the string is
/// encoded. Use [`HtmlContent::encode`] for untrusted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HtmlContent(String);

impl HtmlContent {
    /// Wraps markup without encoding it.
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    /// HTML-encodes `text` and wraps the result.
    pub fn encode(text: &str) -> Self {
        Self(encode_html(text))
    }

    /// Returns the markup.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the markup is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the content, returning the markup.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for HtmlContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<HtmlContent> for String {
    fn from(content: HtmlContent) -> Self {
        content.0
    }
}

/// A value produced by a binding, a hook or a caller, before coercion.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawValue {
    /// No value.
    #[default]
    Null,
    /// Markup that must not be encoded again.
    Html(HtmlContent),
    /// Plain text, encoded on coercion.
    Text(String),
    /// Arbitrary data, rendered through its string form.
    Json(serde_json::Value),
}

impl From<HtmlContent> for RawValue {
    fn from(content: HtmlContent) -> Self {
        RawValue::Html(content)
    }
}

impl From<Option<HtmlContent>> for RawValue {
    fn from(content: Option<HtmlContent>) -> Self {
        content.map(RawValue::Html).unwrap_or_default()
    }
}

impl From<String> for RawValue {
    fn from(text: String) -> Self {
        RawValue::Text(text)
    }
}

impl From<&str> for RawValue {
    fn from(text: &str) -> Self {
        RawValue::Text(text.to_string())
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        RawValue::Json(value)
    }
}

/// Normalizes a raw value into renderable content.
pub fn coerce(value: RawValue) -> Option<HtmlContent> {
    match value {
        RawValue::Null => None,
        RawValue::Html(content) => Some(content),
        RawValue::Text(text) => Some(HtmlContent::encode(&text)),
        RawValue::Json(serde_json::Value::Null) => None,
        // Strings render without their JSON quotes
        RawValue::Json(serde_json::Value::String(text)) => Some(HtmlContent::encode(&text)),
        RawValue::Json(other) => Some(HtmlContent::encode(&other.to_string())),
    }
}

/// Encodes the characters that are significant in HTML text and attributes.
///
/// Uses the same escaping as template auto-escaping, so coerced text and
/// template output encode alike.
pub fn encode_html(text: &str) -> String {
    minijinja::HtmlEscape(text).to_string()
}
