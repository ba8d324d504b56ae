//! Errors raised while loading a configuration tree.

use std::path::PathBuf;
use thiserror::Error;

/// A specialized Result type for loading operations.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Fatal errors of the loader. Any of these aborts the parse with no partial result.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A configuration or include file could not be opened or read.
    #[error("cannot access '{}': {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file includes itself, directly or through other files.
    #[error("circular include of '{}' (chain: {})", .path.display(), format_chain(.chain))]
    CircularInclude { path: PathBuf, chain: Vec<PathBuf> },

    /// The include graph is deeper than the configured maximum.
    #[error("include depth exceeds {max_depth} at '{}'", .path.display())]
    IncludeDepthExceeded { path: PathBuf, max_depth: usize },

    /// An include directive carries a pattern the glob engine rejects.
    #[error("invalid include pattern '{pattern}': {source}")]
    InvalidIncludePattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

impl LoadError {
    pub(crate) fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// The file the error relates to, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            LoadError::FileAccess { path, .. }
            | LoadError::CircularInclude { path, .. }
            | LoadError::IncludeDepthExceeded { path, .. } => Some(path),
            LoadError::InvalidIncludePattern { .. } => None,
        }
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
