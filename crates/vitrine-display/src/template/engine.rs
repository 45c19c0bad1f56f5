//! Template engine abstraction.
//!
//! This module defines the [`TemplateEngine`] trait which lets template
//! bindings work with different template backends. The default
//! implementation is [`MiniJinjaEngine`], which escapes every interpolated
//! value for HTML unless it is already safe markup.

use minijinja::{AutoEscape, Environment, Value};

use crate::error::DisplayError;

/// A template engine that renders template sources with a context value.
pub trait TemplateEngine: Send + Sync {
    /// Compiles and renders `source`. `name` is used in error messages.
    fn render_template(&self, name: &str, source: &str, context: Value) -> Result<String, DisplayError>;

    /// Checks that `source` compiles.
    fn validate(&self, name: &str, source: &str) -> Result<(), DisplayError>;
}

/// MiniJinja-based template engine with HTML auto-escaping.
///
/// ```rust
/// use vitrine_display::template::{MiniJinjaEngine, TemplateEngine};
/// use minijinja::context;
///
/// let engine = MiniJinjaEngine::new();
/// let out = engine
///     .render_template("greeting", "<p>{{ name }}</p>", context! { name => "<World>" })
///     .unwrap();
/// assert_eq!(out, "<p>&lt;World&gt;</p>");
/// ```
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    /// Creates an engine with HTML escaping and the default filters.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        register_filters(&mut env);
        Self { env }
    }

    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }

    /// Gives access to the environment to register extra filters or functions.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render_template(&self, name: &str, source: &str, context: Value) -> Result<String, DisplayError> {
        let tmpl = self
            .env
            .template_from_named_str(name, source)
            .map_err(|err| DisplayError::template(name, err))?;
        tmpl.render(context)
            .map_err(|err| DisplayError::template(name, err))
    }

    fn validate(&self, name: &str, source: &str) -> Result<(), DisplayError> {
        self.env
            .template_from_named_str(name, source)
            .map(|_| ())
            .map_err(|err| DisplayError::template(name, err))
    }
}

/// Turns a shape name into a CSS class: `Content__Summary` → `content-summary`.
pub fn css_class(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Registers vitrine's filters with a MiniJinja environment.
///
/// This is called by [`MiniJinjaEngine::new`].
pub fn register_filters(env: &mut Environment<'static>) {
    env.add_filter("css_class", |value: String| -> String { css_class(&value) });

    // Empty or undefined child content falls back to the given markup
    env.add_filter("or_content", |value: Value, fallback: Value| -> Value {
        if value.is_undefined() || value.is_none() || value.as_str() == Some("") {
            fallback
        } else {
            value
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_escapes_values() {
        let engine = MiniJinjaEngine::new();
        let out = engine
            .render_template("t", "{{ v }}", context! { v => "<b>&</b>" })
            .unwrap();
        assert_eq!(out, "&lt;b&gt;&amp;&lt;&#x2f;b&gt;");
    }

    #[test]
    fn test_safe_strings_are_not_escaped() {
        let engine = MiniJinjaEngine::new();
        let out = engine
            .render_template(
                "t",
                "<div>{{ v }}</div>",
                context! { v => Value::from_safe_string("<b>ok</b>".into()) },
            )
            .unwrap();
        assert_eq!(out, "<div><b>ok</b></div>");
    }

    #[test]
    fn test_css_class_filter() {
        let engine = MiniJinjaEngine::new();
        let out = engine
            .render_template("t", "{{ name | css_class }}", context! { name => "Content__Summary" })
            .unwrap();
        assert_eq!(out, "content-summary");
        assert_eq!(css_class("Widget_Footer__Blog"), "widget-footer-blog");
    }

    #[test]
    fn test_or_content_filter() {
        let engine = MiniJinjaEngine::new();
        let out = engine
            .render_template("t", "{{ missing | or_content('empty') }}", context! {})
            .unwrap();
        assert_eq!(out, "empty");
    }

    #[test]
    fn test_syntax_error_names_template() {
        let engine = MiniJinjaEngine::new();
        let err = engine.validate("Broken", "{% if %}").unwrap_err();
        assert!(matches!(err, DisplayError::Template { ref name, .. } if name == "Broken"));
        assert!(engine.validate("Fine", "{{ x }}").is_ok());
    }
}
