//! Template catalog: categories, previews and handles.
//!
//! The catalog is a directory tree. Each first-level directory under the root
//! is a category; templates may sit at any depth below it. Nothing is cached,
//! every call re-reads the tree.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::document::{Document, is_template_file};
use crate::error::CatalogError;

pub const DEFAULT_NAME: &str = "Unnamed template";
pub const DEFAULT_DESCRIPTION: &str = "No description available";

/// Identifies a template: its directory relative to the root and its file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateHandle {
    /// Directory relative to the root, `/`-separated. Empty for root-level files.
    pub category: String,
    pub file: String,
}

impl TemplateHandle {
    pub fn new(category: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            file: file.into(),
        }
    }

    /// `category/file`, or just `file` for root-level templates.
    pub fn display_path(&self) -> String {
        if self.category.is_empty() {
            self.file.clone()
        } else {
            format!("{}/{}", self.category, self.file)
        }
    }
}

/// A listing entry built without rendering any placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRecord {
    pub label: String,
    pub name: String,
    pub description: String,
    pub handle: TemplateHandle,
}

impl PreviewRecord {
    fn new(handle: TemplateHandle, document: &Document) -> Self {
        let name = document.name().unwrap_or_else(|| DEFAULT_NAME.to_string());
        let description = document
            .description()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
        let label = format!(
            "{}\n  name: {}\n  description: {}",
            handle.display_path(),
            name,
            description
        );
        Self {
            label,
            name,
            description,
            handle,
        }
    }
}

/// What to list previews for.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// Everything under one category, recursively.
    Category(&'a str),
    /// Explicit files, e.g. search results. Relative paths are relative to the root.
    Paths(&'a [PathBuf]),
}

#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    sort_categories: bool,
}

impl Catalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sort_categories: true,
        }
    }

    /// Like [`Catalog::new`], but fails if the root is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let catalog = Self::new(root);
        catalog.ensure_dir(&catalog.root)?;
        Ok(catalog)
    }

    /// Keep categories in directory-listing order instead of sorting them.
    pub fn with_sorted_categories(mut self, sort: bool) -> Self {
        self.sort_categories = sort;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of the first-level directories under the root. Hidden directories are skipped.
    pub fn list_categories(&self) -> Result<Vec<String>, CatalogError> {
        let entries = fs::read_dir(&self.root).map_err(|e| self.dir_error(&self.root, e))?;

        let mut categories: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter(|entry| !is_hidden(&entry.file_name()))
            .filter_map(|entry| entry.file_name().to_str().map(String::from))
            .collect();

        if self.sort_categories {
            categories.sort();
        }
        debug!(count = categories.len(), "categories_listed");
        Ok(categories)
    }

    /// Preview records for a scope. Files that cannot be read or parsed are
    /// left out; only a missing category directory is an error.
    pub fn list_previews(&self, scope: Scope<'_>) -> Result<Vec<PreviewRecord>, CatalogError> {
        let handles: Vec<TemplateHandle> = match scope {
            Scope::Category(category) => {
                let dir = self.root.join(category);
                self.ensure_dir(&dir)?;
                template_files(&dir)
                    .filter_map(|path| self.handle_for(&path))
                    .collect()
            }
            Scope::Paths(paths) => paths
                .iter()
                .filter(|path| is_template_file(path))
                .filter_map(|path| {
                    let handle = self.handle_for(path);
                    if handle.is_none() {
                        warn!(path = ?path, "template_outside_root");
                    }
                    handle
                })
                .collect(),
        };

        let mut previews = Vec::with_capacity(handles.len());
        for handle in handles {
            match Document::read(&self.path_of(&handle)) {
                Ok(document) => previews.push(PreviewRecord::new(handle, &document)),
                Err(e) => warn!(template = %handle.display_path(), error = %e, "preview_skipped"),
            }
        }
        debug!(count = previews.len(), "previews_listed");
        Ok(previews)
    }

    /// Load `root/category/rel_path`. The category may be empty for root-level files.
    pub fn load(&self, category: &str, rel_path: &str) -> Result<Document, CatalogError> {
        let dir = self.root.join(category);
        self.ensure_dir(&dir)?;
        Document::read(&dir.join(rel_path))
    }

    pub fn load_handle(&self, handle: &TemplateHandle) -> Result<Document, CatalogError> {
        self.load(&handle.category, &handle.file)
    }

    /// Absolute (or root-joined) path of a handle.
    pub fn path_of(&self, handle: &TemplateHandle) -> PathBuf {
        self.root.join(&handle.category).join(&handle.file)
    }

    /// Handle for a file path. Relative paths are taken as relative to the root;
    /// absolute paths must lie under it.
    pub fn handle_for(&self, path: &Path) -> Option<TemplateHandle> {
        let relative = if path.is_absolute() || path.starts_with(&self.root) {
            path.strip_prefix(&self.root).ok()?
        } else {
            path
        };

        let file = relative.file_name()?.to_str()?.to_string();
        let category = relative
            .parent()
            .map(slash_path)
            .unwrap_or_default();
        Some(TemplateHandle { category, file })
    }

    fn ensure_dir(&self, dir: &Path) -> Result<(), CatalogError> {
        match fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(CatalogError::DirectoryNotFound {
                path: dir.to_path_buf(),
            }),
            Err(e) => Err(self.dir_error(dir, e)),
        }
    }

    fn dir_error(&self, dir: &Path, error: io::Error) -> CatalogError {
        if error.kind() == io::ErrorKind::NotFound {
            CatalogError::DirectoryNotFound {
                path: dir.to_path_buf(),
            }
        } else {
            CatalogError::Io {
                path: dir.to_path_buf(),
                source: error,
            }
        }
    }
}

/// Template files under `dir`, recursively, in file-name order. Hidden files
/// and directories below `dir` are skipped, as in [`Catalog::list_categories`].
pub fn template_files(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "walk_entry_failed");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_template_file(entry.path()))
        .map(|entry| entry.into_path())
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}

/// Normal path components joined with `/`.
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
