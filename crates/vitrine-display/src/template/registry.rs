//! Template registry for file-based and inline templates.
//!
//! [`TemplateRegistry`] collects the templates a theme or module ships and
//! maps each of them to the shape name it binds.
//!
//! # Template Resolution
//!
//! 1. Inline templates (added via [`TemplateRegistry::add_inline`]) have highest priority
//! 2. File templates are searched in directory registration order
//!
//! # Shape Names
//!
//! A file's shape name is derived from its path relative to the template
//! directory, see [`template_shape_name`]:
//!
//! | File | Shape |
//! |------|-------|
//! | `Content.html` | `Content` |
//! | `Content-Summary.jinja` | `Content__Summary` |
//! | `Content/Summary.html` | `Content__Summary` |
//! | `Widget.Footer.j2` | `Widget_Footer` |
//!
//! # Supported Extensions
//!
//! | Priority | Extension |
//! |----------|-----------|
//! | 1 (highest) | `.jinja` |
//! | 2 | `.j2` |
//! | 3 (lowest) | `.html` |
//!
//! If multiple files in one directory share a base name, the higher-priority
//! extension wins. Two directories providing the same name is a
//! [`RegistryError::Collision`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Recognized template file extensions in priority order.
pub const TEMPLATE_EXTENSIONS: &[&str] = &[".jinja", ".j2", ".html"];

/// A template file discovered during directory walking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Relative path without extension, `/`-separated (e.g. "Content/Summary")
    pub name: String,
    /// Relative path with extension (e.g. "Content/Summary.html")
    pub name_with_ext: String,
    pub absolute_path: PathBuf,
    /// The template directory root this file belongs to
    pub source_dir: PathBuf,
}

impl TemplateFile {
    pub fn new(
        name: impl Into<String>,
        name_with_ext: impl Into<String>,
        absolute_path: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            name_with_ext: name_with_ext.into(),
            absolute_path: absolute_path.into(),
            source_dir: source_dir.into(),
        }
    }

    /// Returns the extension priority (lower is higher priority).
    ///
    /// Returns `usize::MAX` if the extension is not recognized.
    pub fn extension_priority(&self) -> usize {
        TEMPLATE_EXTENSIONS
            .iter()
            .position(|ext| self.name_with_ext.ends_with(ext))
            .unwrap_or(usize::MAX)
    }

    pub fn shape_name(&self) -> String {
        template_shape_name(&self.name)
    }
}

/// How a template's content is stored or accessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTemplate {
    /// Template content stored directly in memory.
    Inline(String),

    /// Template read from disk on every render, so edits show up without a restart.
    File(PathBuf),
}

impl ResolvedTemplate {
    /// Returns the template source, reading it from disk if necessary.
    pub fn content(&self) -> Result<String, RegistryError> {
        match self {
            ResolvedTemplate::Inline(content) => Ok(content.clone()),
            ResolvedTemplate::File(path) => {
                fs::read_to_string(path).map_err(|e| RegistryError::ReadError {
                    path: path.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Error type for template registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two template files resolve to the same name or shape name.
    Collision {
        name: String,
        existing_path: PathBuf,
        existing_dir: PathBuf,
        conflicting_path: PathBuf,
        conflicting_dir: PathBuf,
    },

    /// Template not found in registry.
    NotFound { name: String },

    /// Failed to read a template file or directory.
    ReadError { path: PathBuf, message: String },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Collision {
                name,
                existing_path,
                existing_dir,
                conflicting_path,
                conflicting_dir,
            } => {
                write!(
                    f,
                    "Template collision detected for \"{}\":\n  \
                     - {} (from {})\n  \
                     - {} (from {})",
                    name,
                    existing_path.display(),
                    existing_dir.display(),
                    conflicting_path.display(),
                    conflicting_dir.display()
                )
            }
            RegistryError::NotFound { name } => {
                write!(f, "Template not found: \"{}\"", name)
            }
            RegistryError::ReadError { path, message } => {
                write!(
                    f,
                    "Failed to read template \"{}\": {}",
                    path.display(),
                    message
                )
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Registry for template resolution from inline strings and directories.
///
/// ```rust
/// use vitrine_display::template::TemplateRegistry;
///
/// let mut registry = TemplateRegistry::new();
/// registry.add_inline("Menu", "<nav>{{ ChildContent }}</nav>");
///
/// assert!(registry.get("Menu").is_ok());
/// assert_eq!(registry.shape_names(), vec!["Menu"]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct TemplateRegistry {
    inline: HashMap<String, String>,
    /// Extensionless name → path
    files: HashMap<String, PathBuf>,
    /// name → (path, source_dir), for collision detection
    sources: HashMap<String, (PathBuf, PathBuf)>,
    /// Lowercased shape name → name of the file template binding it
    shapes: HashMap<String, String>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an inline template. The name is used as the shape name as is.
    ///
    /// Inline templates shadow file templates with the same name.
    pub fn add_inline(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.inline.insert(name.into(), content.into());
    }

    /// Walks `path` and registers every template file in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory can't be read or a file collides
    /// with one registered from another directory.
    pub fn add_template_dir<P: AsRef<Path>>(&mut self, path: P) -> Result<(), RegistryError> {
        let files = walk_template_dir(path)?;
        self.add_from_files(files)
    }

    /// Adds templates discovered from a directory scan.
    pub fn add_from_files(&mut self, files: Vec<TemplateFile>) -> Result<(), RegistryError> {
        // Higher-priority extensions are registered first and win within a directory
        let mut sorted_files = files;
        sorted_files.sort_by_key(|f| f.extension_priority());

        for file in sorted_files {
            if let Some((existing_path, existing_dir)) = self.sources.get(&file.name) {
                if existing_dir != &file.source_dir {
                    return Err(RegistryError::Collision {
                        name: file.name.clone(),
                        existing_path: existing_path.clone(),
                        existing_dir: existing_dir.clone(),
                        conflicting_path: file.absolute_path.clone(),
                        conflicting_dir: file.source_dir.clone(),
                    });
                }
                continue;
            }

            // `Content-Summary` and `Content/Summary` bind the same shape
            let shape_key = file.shape_name().to_lowercase();
            if let Some(existing) = self.shapes.get(&shape_key) {
                if let Some((existing_path, existing_dir)) = self.sources.get(existing) {
                    return Err(RegistryError::Collision {
                        name: file.shape_name(),
                        existing_path: existing_path.clone(),
                        existing_dir: existing_dir.clone(),
                        conflicting_path: file.absolute_path.clone(),
                        conflicting_dir: file.source_dir.clone(),
                    });
                }
            }

            self.shapes.insert(shape_key, file.name.clone());
            self.sources.insert(
                file.name.clone(),
                (file.absolute_path.clone(), file.source_dir.clone()),
            );
            self.files.insert(file.name, file.absolute_path);
        }

        Ok(())
    }

    /// Looks up a template by registry name (inline name or relative path).
    pub fn get(&self, name: &str) -> Result<ResolvedTemplate, RegistryError> {
        if let Some(content) = self.inline.get(name) {
            return Ok(ResolvedTemplate::Inline(content.clone()));
        }

        if let Some(path) = self.files.get(name) {
            return Ok(ResolvedTemplate::File(path.clone()));
        }

        Err(RegistryError::NotFound {
            name: name.to_string(),
        })
    }

    /// Gets the content of a template, reading from disk if necessary.
    pub fn get_content(&self, name: &str) -> Result<String, RegistryError> {
        self.get(name)?.content()
    }

    /// Every template as `(shape name, template)`, sorted by shape name.
    ///
    /// An inline template wins over a file template with the same shape name.
    pub fn templates(&self) -> Vec<(String, ResolvedTemplate)> {
        let mut by_shape: HashMap<String, ResolvedTemplate> = self
            .files
            .iter()
            .map(|(name, path)| (template_shape_name(name), ResolvedTemplate::File(path.clone())))
            .collect();
        for (name, content) in &self.inline {
            by_shape.insert(name.clone(), ResolvedTemplate::Inline(content.clone()));
        }

        let mut templates: Vec<_> = by_shape.into_iter().collect();
        templates.sort_by(|a, b| a.0.cmp(&b.0));
        templates
    }

    /// Shape names of every registered template, sorted.
    pub fn shape_names(&self) -> Vec<String> {
        self.templates().into_iter().map(|(name, _)| name).collect()
    }

    pub fn len(&self) -> usize {
        self.templates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inline.is_empty() && self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.inline.clear();
        self.files.clear();
        self.sources.clear();
        self.shapes.clear();
    }
}

/// Converts a template path into the shape name it binds.
///
/// Path separators and `-` become `__`, `.` becomes `_`.
///
/// ```rust
/// use vitrine_display::template::template_shape_name;
///
/// assert_eq!(template_shape_name("Content-Summary"), "Content__Summary");
/// assert_eq!(template_shape_name("Content/Summary-Blog"), "Content__Summary__Blog");
/// assert_eq!(template_shape_name("Widget.Footer"), "Widget_Footer");
/// ```
pub fn template_shape_name(name: &str) -> String {
    name.replace(['/', '\\', '-'], "__").replace('.', "_")
}

/// Walks a template directory and collects template files.
///
/// Files without a recognized extension are skipped. Entries are returned in
/// path order so results are stable across platforms.
///
/// # Errors
///
/// Returns [`RegistryError::ReadError`] if `root` or a subdirectory can't be read.
pub fn walk_template_dir<P: AsRef<Path>>(root: P) -> Result<Vec<TemplateFile>, RegistryError> {
    let root = root.as_ref();
    let root_path = root.canonicalize().map_err(|e| RegistryError::ReadError {
        path: root.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    walk_recursive(&root_path, &root_path, &mut files)?;
    files.sort_by(|a, b| a.name_with_ext.cmp(&b.name_with_ext));
    Ok(files)
}

fn walk_recursive(
    current: &Path,
    root: &Path,
    files: &mut Vec<TemplateFile>,
) -> Result<(), RegistryError> {
    let read_error = |e: std::io::Error| RegistryError::ReadError {
        path: current.to_path_buf(),
        message: e.to_string(),
    };

    for entry in fs::read_dir(current).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();

        if path.is_dir() {
            walk_recursive(&path, root, files)?;
            continue;
        }

        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let name_with_ext = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let Some(ext) = TEMPLATE_EXTENSIONS
            .iter()
            .find(|ext| name_with_ext.ends_with(*ext))
        else {
            continue;
        };

        let name = name_with_ext[..name_with_ext.len() - ext.len()].to_string();
        if name.is_empty() || name.ends_with('/') {
            continue;
        }
        files.push(TemplateFile::new(name, name_with_ext, path, root));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_shape_names_from_paths() {
        assert_eq!(template_shape_name("Content"), "Content");
        assert_eq!(template_shape_name("Content-Summary"), "Content__Summary");
        assert_eq!(template_shape_name("Content/Summary"), "Content__Summary");
        assert_eq!(template_shape_name("Widget.Footer"), "Widget_Footer");
    }

    #[test]
    fn test_extension_priority() {
        let jinja = TemplateFile::new("a", "a.jinja", "/t/a.jinja", "/t");
        let html = TemplateFile::new("a", "a.html", "/t/a.html", "/t");
        let other = TemplateFile::new("a", "a.txt", "/t/a.txt", "/t");
        assert!(jinja.extension_priority() < html.extension_priority());
        assert_eq!(other.extension_priority(), usize::MAX);
    }

    #[test]
    fn test_walk_collects_nested_templates() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Menu.html", "<nav/>");
        write(dir.path(), "Content/Summary.jinja", "<p/>");
        write(dir.path(), "README.md", "ignored");

        let files = walk_template_dir(dir.path()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Content/Summary", "Menu"]);
        assert_eq!(files[0].shape_name(), "Content__Summary");
    }

    #[test]
    fn test_walk_missing_dir_is_read_error() {
        let err = walk_template_dir("/definitely/not/here").unwrap_err();
        assert!(matches!(err, RegistryError::ReadError { .. }));
    }

    #[test]
    fn test_same_dir_higher_priority_extension_wins() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Menu.html", "html");
        write(dir.path(), "Menu.jinja", "jinja");

        let mut registry = TemplateRegistry::new();
        registry.add_template_dir(dir.path()).unwrap();
        assert_eq!(registry.get_content("Menu").unwrap(), "jinja");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_cross_dir_collision() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(first.path(), "Menu.html", "a");
        write(second.path(), "Menu.html", "b");

        let mut registry = TemplateRegistry::new();
        registry.add_template_dir(first.path()).unwrap();
        let err = registry.add_template_dir(second.path()).unwrap_err();
        assert!(matches!(err, RegistryError::Collision { ref name, .. } if name == "Menu"));
        assert!(err.to_string().contains("collision"));
    }

    #[test]
    fn test_files_binding_the_same_shape_collide() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Content-Summary.html", "dash");
        write(dir.path(), "Content/Summary.html", "nested");

        let mut registry = TemplateRegistry::new();
        let err = registry.add_template_dir(dir.path()).unwrap_err();
        match err {
            RegistryError::Collision {
                name,
                existing_path,
                conflicting_path,
                ..
            } => {
                assert_eq!(name, "Content__Summary");
                assert!(existing_path.ends_with("Content-Summary.html"));
                assert!(conflicting_path.ends_with("Content/Summary.html"));
            }
            other => panic!("expected a collision, got {other:?}"),
        }
    }

    #[test]
    fn test_inline_shadows_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Content-Summary.html", "file");

        let mut registry = TemplateRegistry::new();
        registry.add_template_dir(dir.path()).unwrap();
        registry.add_inline("Content__Summary", "inline");

        let templates = registry.templates();
        assert_eq!(templates.len(), 1);
        assert_eq!(
            templates[0],
            ("Content__Summary".to_string(), ResolvedTemplate::Inline("inline".into()))
        );
    }

    #[test]
    fn test_file_content_is_read_on_demand() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Menu.html", "v1");

        let mut registry = TemplateRegistry::new();
        registry.add_template_dir(dir.path()).unwrap();
        assert_eq!(registry.get_content("Menu").unwrap(), "v1");

        write(dir.path(), "Menu.html", "v2");
        assert_eq!(registry.get_content("Menu").unwrap(), "v2");
    }

    #[test]
    fn test_not_found() {
        let registry = TemplateRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(
            registry.get("Nope").unwrap_err(),
            RegistryError::NotFound { name: "Nope".into() }
        );
    }
}
