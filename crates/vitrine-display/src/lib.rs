//! # Vitrine Display - Shape-Based Rendering Pipeline
//!
//! `vitrine-display` turns trees of dynamic view models ("shapes") into HTML.
//! Every shape carries a type name; the current theme's [`ShapeTable`] decides
//! which binding renders it, which lifecycle hooks run around it and which
//! wrappers surround the result.
//!
//! ## Core Concepts
//!
//! - [`Shape`]: a dynamic view model with a type, properties and [`ShapeMetadata`]
//! - [`ShapeTable`]: descriptors (hooks per base type) and bindings (renderers per name)
//! - [`DisplayEngine`]: runs the display pipeline for one shape
//! - [`ShapeTableCache`]: builds one table per theme, layering derived themes over their base
//! - [`template`]: MiniJinja templates as bindings
//!
//! ## Quick Start
//!
//! ```rust
//! use vitrine_display::{
//!     render_fn, DisplayContext, DisplayEngine, DisplayError, RawValue, Shape,
//!     ShapeTableBuilder, ShapeTableCache,
//! };
//!
//! # tokio_test_block(async {
//! let tables = ShapeTableCache::new().with_provider(
//!     |builder: &mut ShapeTableBuilder| -> Result<(), DisplayError> {
//!         builder.bind("Badge", "module:Demo", render_fn(|_ctx| Ok(RawValue::from("<new>"))));
//!         Ok(())
//!     },
//! );
//! let engine = DisplayEngine::builder().table_manager(tables).build();
//!
//! let mut shape = Shape::new("Badge");
//! let html = engine.display(&mut shape, &DisplayContext::new()).await.unwrap();
//! assert_eq!(html.unwrap().as_str(), "&lt;new&gt;");
//! # });
//! # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```
//!
//! ## Name Resolution
//!
//! Bindings are looked up by the shape's alternates, last first, then by its
//! type and each `__` truncation of it (`Content__Summary__Blog`,
//! `Content__Summary`, `Content`). See [`resolve`].

pub mod content;
pub mod context;
pub mod engine;
mod error;
pub mod hooks;
pub mod manager;
pub mod resolve;
pub mod shape;
pub mod table;
pub mod template;
pub mod theme;

pub use error::DisplayError;

pub use content::{coerce, encode_html, HtmlContent, RawValue};
pub use context::{DisplayContext, ModelErrorSink, Services, ShapeDisplayContext};
pub use engine::{DisplayEngine, DisplayEngineBuilder, Displayable};
pub use hooks::{hook_fn, HookError, HookPhase, ShapeDisplayEvents, ShapeHook};
pub use manager::{ShapeTableCache, ShapeTableManager, ShapeTableProvider};
pub use resolve::{
    fallback_names, resolve_binding, resolve_descriptor, BindingResolver, FallbackNames,
};
pub use shape::{Property, Shape, ShapeMetadata};
pub use table::{
    base_shape_type, render_fn, BindingRender, DescriptorBuilder, ShapeBinding, ShapeDescriptor,
    ShapeTable, ShapeTableBuilder,
};
pub use template::{
    MiniJinjaEngine, RegistryError, TemplateBinding, TemplateBindingResolver, TemplateEngine,
    TemplateHarvester, TemplateRegistry,
};
pub use theme::{FixedThemeManager, Theme, ThemeManager};
