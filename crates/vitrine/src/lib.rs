//! # Vitrine - Themed HTML from Shape Trees
//!
//! `vitrine` wires the [`vitrine_display`] pipeline to YAML site files:
//! themes and their template directories, runtime templates and default
//! wrappers. The `vitrine` binary renders shape files from the command line.
//!
//! ```rust
//! use vitrine::{Site, SiteConfig, ShapeSpec};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let config = SiteConfig::from_yaml(r#"
//! dynamic:
//!   Greeting: "<p>Hello, {{ Name }}!</p>"
//! "#).unwrap();
//! let site = Site::from_config(config).unwrap();
//!
//! let spec = ShapeSpec::from_yaml("type: Greeting\nproperties:\n  Name: <World>\n").unwrap();
//! let html = site.render(&mut spec.into_shape()).await.unwrap();
//! assert_eq!(html, "<p>Hello, &lt;World&gt;!</p>");
//! # });
//! ```

pub mod config;
pub mod setup;
pub mod site;
pub mod spec;

pub use config::{SiteConfig, ThemeConfig};
pub use setup::SetupError;
pub use site::{Site, SiteBuilder};
pub use spec::{ItemSpec, ShapeSpec};

pub use vitrine_display as display;
pub use vitrine_display::{DisplayContext, DisplayError, Shape, Theme};
