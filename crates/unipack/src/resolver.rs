//! Import resolution
//!
//! Maps dependency specifiers to files on disk. Specifiers are resolved
//! against the directory of the importing file, never against the entry file
//! or the process working directory. Only relative specifiers are supported;
//! bare package names have no meaning in a self-contained bundle.

use std::path::{Component, Path, PathBuf};

use log::trace;

use crate::{
    config::Config,
    error::{BundleError, BundleResult},
};

/// Resolves dependency specifiers for one build invocation
#[derive(Debug, Clone)]
pub struct ImportResolver {
    /// Extensions tried when the specifier does not name a file verbatim
    extensions: Vec<String>,
    /// Root directory imports may not escape, unless disabled
    project_root: Option<PathBuf>,
}

impl ImportResolver {
    /// Build a resolver from configuration and the entry file's location.
    /// The escape-policy root defaults to the entry file's directory.
    pub fn from_config(config: &Config, entry: &Path) -> Self {
        let project_root = if config.resolve.allow_outside_root {
            None
        } else {
            let root = config
                .project_root
                .clone()
                .or_else(|| entry.parent().map(Path::to_path_buf));
            root.map(|r| normalize_path(&absolute(&r)))
        };
        Self {
            extensions: config.resolve.extensions.clone(),
            project_root,
        }
    }

    /// Resolver with explicit settings, used by tests and embedders
    pub fn new(extensions: Vec<String>, project_root: Option<PathBuf>) -> Self {
        Self {
            extensions,
            project_root: project_root.map(|r| normalize_path(&absolute(&r))),
        }
    }

    /// Absolutize and normalize the entry path itself. A missing entry is a
    /// resolution failure naming the path that was asked for.
    pub fn resolve_entry(&self, entry: &Path) -> BundleResult<PathBuf> {
        let normalized = normalize_path(&absolute(entry));
        if normalized.is_file() {
            Ok(normalized)
        } else {
            Err(BundleError::Resolution {
                importer: normalized.clone(),
                specifier: entry.display().to_string(),
                reason: "entry file does not exist".into(),
            })
        }
    }

    /// Resolve one specifier against the importing file's directory
    pub fn resolve(&self, importer: &Path, specifier: &str) -> BundleResult<PathBuf> {
        if !specifier.starts_with("./") && !specifier.starts_with("../") {
            return Err(self.failure(
                importer,
                specifier,
                "only relative specifiers ('./x', '../x') can be bundled",
            ));
        }

        let base = importer.parent().unwrap_or_else(|| Path::new("."));
        let joined = normalize_path(&base.join(specifier));

        for candidate in self.candidates(&joined) {
            trace!("resolve candidate: {}", candidate.display());
            if candidate.is_file() {
                if let Some(root) = &self.project_root
                    && !candidate.starts_with(root)
                {
                    return Err(self.failure(
                        importer,
                        specifier,
                        &format!("resolved path escapes project root {}", root.display()),
                    ));
                }
                return Ok(candidate);
            }
        }

        Err(self.failure(importer, specifier, "no file matches"))
    }

    /// Candidate paths in probe order: the path verbatim, each extension
    /// appended, then index files inside a directory of that name
    fn candidates(&self, joined: &Path) -> Vec<PathBuf> {
        let mut candidates = vec![joined.to_path_buf()];
        let joined_str = joined.as_os_str().to_string_lossy();
        for ext in &self.extensions {
            candidates.push(PathBuf::from(format!("{joined_str}{ext}")));
        }
        for ext in &self.extensions {
            candidates.push(joined.join(format!("index{ext}")));
        }
        candidates
    }

    fn failure(&self, importer: &Path, specifier: &str, reason: &str) -> BundleError {
        BundleError::Resolution {
            importer: importer.to_path_buf(),
            specifier: specifier.to_owned(),
            reason: reason.to_owned(),
        }
    }
}

/// Make a path absolute against the current directory without touching the
/// filesystem
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into their
/// parent. Purely textual, so two imports of the same file always compare
/// equal as deduplication keys.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(Component::ParentDir);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
