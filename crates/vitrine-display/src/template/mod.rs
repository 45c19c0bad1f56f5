//! Template-backed shape bindings.
//!
//! Themes and modules ship templates; this module turns them into bindings.
//!
//! ## Harvesting
//!
//! A [`TemplateHarvester`] is a [`ShapeTableProvider`](crate::ShapeTableProvider)
//! that registers every template of a [`TemplateRegistry`] under the shape
//! name derived from its path:
//!
//! ```text
//! templates/Content-Summary.html  →  Content__Summary
//! templates/Widget/Footer.jinja   →  Widget__Footer
//! ```
//!
//! File templates are read on every render, so edits show up without
//! rebuilding the shape table.
//!
//! ## Dynamic Templates
//!
//! [`TemplateBindingResolver`] is a [`BindingResolver`](crate::BindingResolver)
//! whose templates can be added and removed while the site runs. Resolvers
//! are consulted before the shape table.
//!
//! ## Escaping
//!
//! [`MiniJinjaEngine`] escapes every interpolated value for HTML. Nested
//! shapes and `ChildContent` are passed as markup and are not escaped again.

mod binding;
mod engine;
mod registry;

pub use binding::{TemplateBinding, TemplateBindingResolver, TemplateHarvester};
pub use engine::{css_class, register_filters, MiniJinjaEngine, TemplateEngine};
pub use registry::{
    template_shape_name, walk_template_dir, RegistryError, ResolvedTemplate, TemplateFile,
    TemplateRegistry, TEMPLATE_EXTENSIONS,
};
