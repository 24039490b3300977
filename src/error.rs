//! Error kinds for catalog, loading and rendering operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while scanning, loading or rendering templates.
///
/// Listing and search swallow per-file `Parse`, `NotAMapping` and `Io`
/// errors; they only surface when a single explicitly selected file fails.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{} does not contain a key/value document", path.display())]
    NotAMapping { path: PathBuf },

    #[error("template error: {source}")]
    Render {
        #[from]
        source: minijinja::Error,
    },

    #[error("undefined template variable: {name}")]
    MissingVariable { name: String },
}

impl CatalogError {
    /// Path of the file or directory the error is about, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::DirectoryNotFound { path }
            | Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::NotAMapping { path } => Some(path),
            Self::Render { .. } | Self::MissingVariable { .. } => None,
        }
    }
}
