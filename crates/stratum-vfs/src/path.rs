//! Path resolution
//!
//! Caller paths are rewritten into the form translators understand before
//! every routed operation. When an application root is configured, paths
//! that can be expressed relative to it are prefixed with the root marker
//! (`//` by default) so that translators scoped to the application tree
//! accept them. Resolution is pure string work: it never touches the
//! filesystem and cannot fail.
//!
//! The second half of this module is the translator side: splitting a
//! resolved path back into nodes below a translator's own base.

use crate::DEFAULT_ROOT_MARKER;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Path in the form handed to translators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath(String);

impl ResolvedPath {
    /// Wrap an already resolved path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Borrow the path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the path names a container (trailing separator).
    pub fn is_directory(&self) -> bool {
        is_directory_path(&self.0)
    }

    /// Same path with a trailing separator.
    #[must_use]
    pub fn into_directory(mut self) -> Self {
        if !self.is_directory() {
            self.0.push('/');
        }
        self
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResolvedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Maps caller paths onto translator paths.
#[derive(Debug, Clone)]
pub struct PathResolver {
    app_root: Option<PathBuf>,
    marker: String,
    case_sensitive: bool,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self {
            app_root: None,
            marker: DEFAULT_ROOT_MARKER.to_string(),
            case_sensitive: true,
        }
    }
}

impl PathResolver {
    /// Create a resolver.
    ///
    /// `case_sensitive` controls how the application root prefix is matched.
    pub fn new(app_root: Option<PathBuf>, marker: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            app_root: app_root.map(|root| lexical_normalize(&root)),
            marker: marker.into(),
            case_sensitive,
        }
    }

    /// Configured application root.
    pub fn app_root(&self) -> Option<&Path> {
        self.app_root.as_deref()
    }

    /// Translator root marker.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Resolve a caller path for file operations.
    pub fn resolve(&self, path: &str) -> ResolvedPath {
        match self.relative_to_app_root(path) {
            Some(nodes) => {
                let mut out = self.marker.clone();
                out.push_str(&nodes.join("/"));
                if is_directory_path(path) && !nodes.is_empty() {
                    out.push('/');
                }
                ResolvedPath(out)
            }
            None => ResolvedPath(path.to_string()),
        }
    }

    /// Resolve a caller path for directory listings (trailing separator).
    pub fn resolve_dir(&self, path: &str) -> ResolvedPath {
        self.resolve(path).into_directory()
    }

    /// Whether a caller path is relative.
    ///
    /// Paths carrying the root marker are anchored and count as absolute.
    pub fn is_relative(&self, path: &str) -> bool {
        !(path.starts_with(&self.marker) || Path::new(path).is_absolute())
    }

    fn relative_to_app_root(&self, path: &str) -> Option<Vec<String>> {
        let root = self.app_root.as_ref()?;

        if path.starts_with(&self.marker) {
            return None;
        }

        let candidate = Path::new(path);
        if !candidate.is_absolute() {
            return normalize_nodes(path);
        }

        let normalized = lexical_normalize(candidate);
        strip_root(&normalized, root, self.case_sensitive)
    }
}

/// Translator-side view of a resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualPath {
    /// Path below the translator root (`//a/b`).
    Root(Vec<String>),
    /// Absolute host path.
    Absolute(PathBuf),
    /// Path relative to the translator base.
    Relative(Vec<String>),
}

impl VirtualPath {
    /// Parse a resolved path using the default root marker.
    ///
    /// Returns `None` when the path escapes upward with `..`.
    pub fn parse(path: &str) -> Option<Self> {
        Self::parse_with_marker(path, DEFAULT_ROOT_MARKER)
    }

    /// Parse a resolved path using `marker` as the root marker.
    pub fn parse_with_marker(path: &str, marker: &str) -> Option<Self> {
        if let Some(rest) = path.strip_prefix(marker) {
            return normalize_nodes(rest).map(Self::Root);
        }

        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return Some(Self::Absolute(lexical_normalize(candidate)));
        }

        normalize_nodes(path).map(Self::Relative)
    }

    /// Nodes below `base`, or `None` if the path lies outside it.
    pub fn nodes_below(&self, base: &Path, case_sensitive: bool) -> Option<Vec<String>> {
        match self {
            Self::Root(nodes) | Self::Relative(nodes) => Some(nodes.clone()),
            Self::Absolute(path) => strip_root(path, &lexical_normalize(base), case_sensitive),
        }
    }
}

/// Whether a path string ends in a separator.
pub fn is_directory_path(path: &str) -> bool {
    path.ends_with('/') || path.ends_with('\\')
}

/// Split a relative path into normalized nodes.
///
/// Empty and `.` nodes are dropped, `..` removes the previous node.
/// Returns `None` if `..` would climb above the start.
pub fn normalize_nodes(path: &str) -> Option<Vec<String>> {
    let mut nodes: Vec<String> = Vec::new();

    for node in path.split(['/', '\\']) {
        match node {
            "" | "." => {}
            ".." => {
                nodes.pop()?;
            }
            other => nodes.push(other.to_string()),
        }
    }

    Some(nodes)
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root or a prefix
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }

    out
}

/// Last node of a path, without trailing separators.
pub fn file_name_item(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    trimmed
        .rfind(['/', '\\'])
        .map_or(trimmed, |index| &trimmed[index + 1..])
}

/// Directory part of a path (everything before the last node).
pub fn directory_item(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    trimmed
        .rfind(['/', '\\'])
        .map_or("", |index| &trimmed[..=index])
}

fn strip_root(path: &Path, root: &Path, case_sensitive: bool) -> Option<Vec<String>> {
    let mut path_components = path.components();

    for root_component in root.components() {
        let path_component = path_components.next()?;
        let equal = if case_sensitive {
            path_component == root_component
        } else {
            path_component
                .as_os_str()
                .to_string_lossy()
                .to_lowercase()
                == root_component.as_os_str().to_string_lossy().to_lowercase()
        };
        if !equal {
            return None;
        }
    }

    Some(
        path_components
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect(),
    )
}
