//! Reads a configuration file into directive lines, expanding includes in place.
//!
//! Comments start at the first `#` or `!` and run to end of line. Blank lines
//! and comment-only lines are dropped. An `include <glob>` directive is
//! replaced by the lines of every file its pattern matches, resolved relative
//! to the directory of the including file.

use crate::error::{LoadError, Result};
use crate::types::{RawLine, SourceLocation};
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Default limit on nested includes.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*include\s+(?P<path>\S+)").expect("include pattern is valid")
});

/// Loader settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Maximum include nesting. The top-level file is depth 0.
    pub max_include_depth: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

/// Recursive file loader.
///
/// Keeps the chain of files currently being read so that a file including
/// itself (directly or transitively) is reported instead of recursing forever.
#[derive(Debug)]
pub struct Loader {
    options: LoaderOptions,
    in_progress: Vec<PathBuf>,
}

impl Loader {
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            options,
            in_progress: Vec::new(),
        }
    }

    /// Load `path` and everything it includes, in order.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Vec<RawLine>> {
        self.in_progress.clear();
        let mut out = Vec::new();
        self.load_file(path.as_ref(), &mut out)?;
        Ok(out)
    }

    fn load_file(&mut self, path: &Path, out: &mut Vec<RawLine>) -> Result<()> {
        let depth = self.in_progress.len();
        if depth > self.options.max_include_depth {
            return Err(LoadError::IncludeDepthExceeded {
                path: path.to_path_buf(),
                max_depth: self.options.max_include_depth,
            });
        }

        let file = File::open(path).map_err(|e| LoadError::file_access(path, e))?;
        let canonical = path
            .canonicalize()
            .map_err(|e| LoadError::file_access(path, e))?;
        if self.in_progress.contains(&canonical) {
            let mut chain = self.in_progress.clone();
            chain.push(canonical);
            return Err(LoadError::CircularInclude {
                path: path.to_path_buf(),
                chain,
            });
        }

        debug!(path = %path.display(), depth, "loading config file");
        self.in_progress.push(canonical);
        let result = self.read_lines(path, BufReader::new(file), out);
        self.in_progress.pop();
        result
    }

    fn read_lines(
        &mut self,
        path: &Path,
        mut reader: impl BufRead,
        out: &mut Vec<RawLine>,
    ) -> Result<()> {
        let conf_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut buf = Vec::new();
        let mut line_no = 0usize;

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| LoadError::file_access(path, e))?;
            if read == 0 {
                break;
            }
            line_no += 1;

            // Bytes that are not UTF-8 (e.g. Latin-1 comments) are replaced, not rejected.
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);
            let Some(text) = strip_comment(line) else {
                continue;
            };

            if let Some(caps) = INCLUDE.captures(text) {
                self.expand_include(conf_dir, &caps["path"], out)?;
            } else {
                out.push(RawLine::new(text, SourceLocation::new(path, line_no)));
            }
        }
        Ok(())
    }

    fn expand_include(
        &mut self,
        conf_dir: &Path,
        pattern: &str,
        out: &mut Vec<RawLine>,
    ) -> Result<()> {
        let full = conf_dir.join(pattern);
        let full = full.to_string_lossy();
        let matches = glob::glob(&full).map_err(|source| LoadError::InvalidIncludePattern {
            pattern: full.to_string(),
            source,
        })?;

        let mut count = 0usize;
        for entry in matches {
            let included = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                LoadError::file_access(path, e.into_error())
            })?;
            count += 1;
            self.load_file(&included, out)?;
        }
        trace!(pattern = %full, matches = count, "include expanded");
        Ok(())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(LoaderOptions::default())
    }
}

/// Load a configuration file with default options.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<RawLine>> {
    Loader::default().load(path)
}

/// Return the directive part of `line`, or `None` when nothing but comment or whitespace remains.
pub fn strip_comment(line: &str) -> Option<&str> {
    let end = line.find(['#', '!']).unwrap_or(line.len());
    let text = line[..end].trim_end();
    if text.trim_start().is_empty() {
        None
    } else {
        Some(text)
    }
}
