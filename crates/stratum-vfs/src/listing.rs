//! Directory enumeration
//!
//! A listing asks every translator for the entries of one directory and
//! merges the answers into a single deduplicated set:
//!
//! 1. Name patterns are compiled once per call, honoring the case flag.
//! 2. Each translator is scanned in registry order. Translators that cannot
//!    scan the directory contribute nothing.
//! 3. An entry must match every pattern (no patterns matches everything),
//!    except directories when [`ListFilter::ALL_DIRS`] is set.
//! 4. Survivors go into one set keyed by name under the case comparator;
//!    the first translator to report a name keeps its spelling.
//! 5. Names come out in comparator order, never in translator order.

use crate::path::ResolvedPath;
use crate::translator::{DirEntry, DirIter, ScanFilter, Translator};
use crate::{Result, VfsError};
use bitflags::bitflags;
use globset::{GlobBuilder, GlobMatcher};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

bitflags! {
    /// Attribute filters of a listing request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ListFilter: u32 {
        /// Include directories.
        const DIRS = 0x0001;
        /// Include files.
        const FILES = 0x0002;
        /// Exclude junctions and symbolic links.
        const NO_SYMLINKS = 0x0008;
        /// Include hidden entries.
        const HIDDEN = 0x0100;
        /// Include system entries.
        const SYSTEM = 0x0200;
        /// Directories bypass name patterns.
        const ALL_DIRS = 0x0400;
        /// Compare names case-sensitively.
        const CASE_SENSITIVE = 0x0800;
        /// Exclude the `.` entry.
        const NO_DOT = 0x2000;
        /// Exclude the `..` entry.
        const NO_DOT_DOT = 0x4000;

        /// Directories and files.
        const ALL_ENTRIES = Self::DIRS.bits() | Self::FILES.bits();
        /// Exclude both `.` and `..`.
        const NO_DOT_AND_DOT_DOT = Self::NO_DOT.bits() | Self::NO_DOT_DOT.bits();
    }
}

impl Default for ListFilter {
    fn default() -> Self {
        Self::ALL_ENTRIES
    }
}

impl ListFilter {
    /// Attribute filter handed to translators.
    pub fn scan_filter(self) -> ScanFilter {
        ScanFilter {
            no_directory: !self.contains(Self::DIRS),
            no_file: !self.contains(Self::FILES),
            no_junction_or_link: self.contains(Self::NO_SYMLINKS),
            no_hidden: !self.contains(Self::HIDDEN),
            no_system: !self.contains(Self::SYSTEM),
            no_pattern_on_dirs: self.contains(Self::ALL_DIRS),
            no_current_dir_desc: self.contains(Self::NO_DOT),
            no_parent_dir_desc: self.contains(Self::NO_DOT_DOT),
        }
    }

    /// Whether names compare case-sensitively.
    pub fn is_case_sensitive(self) -> bool {
        self.contains(Self::CASE_SENSITIVE)
    }
}

/// Compiled name pattern.
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Glob such as `*.txt` or `a?c`.
    Glob(GlobMatcher),
    /// Exact name, used when the glob does not compile.
    Literal {
        /// Name to compare against
        name: String,
        /// Compare case-sensitively
        case_sensitive: bool,
    },
}

impl NamePattern {
    /// Compile a glob pattern.
    pub fn compile(pattern: &str, case_sensitive: bool) -> Result<Self> {
        GlobBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
            .map(|glob| Self::Glob(glob.compile_matcher()))
            .map_err(|e| VfsError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.kind().to_string(),
            })
    }

    /// Compile a glob, falling back to an exact-name match if it is invalid.
    pub fn compile_lenient(pattern: &str, case_sensitive: bool) -> Self {
        Self::compile(pattern, case_sensitive).unwrap_or_else(|e| {
            warn!("{e}; matching it as a literal name");
            Self::Literal {
                name: pattern.to_string(),
                case_sensitive,
            }
        })
    }

    /// Whether `name` matches.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Glob(matcher) => matcher.is_match(name),
            Self::Literal {
                name: literal,
                case_sensitive: true,
            } => literal == name,
            Self::Literal { name: literal, .. } => {
                literal.to_lowercase() == name.to_lowercase()
            }
        }
    }
}

/// Whether `entry` passes every pattern (AND), honoring the
/// no-pattern-on-directories policy.
pub fn matches_all(entry: &DirEntry, patterns: &[NamePattern], filter: &ScanFilter) -> bool {
    if entry.is_dir() && filter.no_pattern_on_dirs {
        return true;
    }

    patterns.iter().all(|pattern| pattern.matches(&entry.name))
}

/// Deduplicating name set ordered by a case comparator.
#[derive(Debug, Clone)]
pub struct NameSet {
    case_sensitive: bool,
    names: BTreeMap<String, String>,
}

impl NameSet {
    /// Empty set using the given comparator.
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            names: BTreeMap::new(),
        }
    }

    /// Insert a name; an equal name already present wins.
    ///
    /// Returns `true` if the name was new.
    pub fn insert(&mut self, name: String) -> bool {
        let key = if self.case_sensitive {
            name.clone()
        } else {
            name.to_lowercase()
        };

        match self.names.entry(key) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(name);
                true
            }
        }
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in comparator order.
    pub fn into_list(self) -> EntryList {
        EntryList {
            names: self.names.into_values().collect(),
        }
    }
}

/// Result of a merged directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryList {
    names: Vec<String>,
}

impl EntryList {
    /// Iterate names in comparator order. Can be called repeatedly.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.names.iter()
    }

    /// Number of names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the listing is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether the listing contains exactly `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Names as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    /// Cursor over the names.
    pub fn into_entry_iter(self) -> EntryIterator {
        EntryIterator::new(self.names)
    }
}

impl IntoIterator for EntryList {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntryList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

/// Restartable cursor over a listing.
#[derive(Debug, Clone)]
pub struct EntryIterator {
    names: Vec<String>,
    next: usize,
}

impl EntryIterator {
    /// Cursor positioned before the first name.
    pub fn new(names: Vec<String>) -> Self {
        Self { names, next: 0 }
    }

    /// Whether another name follows.
    pub fn has_next(&self) -> bool {
        self.next < self.names.len()
    }

    /// Name returned by the last `next` call.
    pub fn current_file_name(&self) -> Option<&str> {
        self.next
            .checked_sub(1)
            .and_then(|index| self.names.get(index))
            .map(String::as_str)
    }

    /// Start over from the first name.
    pub fn rewind(&mut self) {
        self.next = 0;
    }
}

impl Iterator for EntryIterator {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.names.get(self.next)?.clone();
        self.next += 1;
        Some(name)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.names.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for EntryIterator {}

/// Apply the scan filter and a translator-level pattern to raw entries.
///
/// Backends use this to implement [`Translator::begin_listing`]; `.` and
/// `..` are prepended unless filtered.
pub fn filter_scan(
    entries: Vec<DirEntry>,
    pattern: &str,
    filter: &ScanFilter,
    case_sensitive: bool,
) -> DirIter {
    let patterns = [NamePattern::compile_lenient(pattern, case_sensitive)];
    let filter = *filter;

    let out: Vec<DirEntry> = filter
        .dot_entries()
        .into_iter()
        .chain(entries)
        .filter(|entry| filter.admits(entry) && matches_all(entry, &patterns, &filter))
        .collect();
    Box::new(out.into_iter())
}

/// Merge the listing of `dir` across `translators`.
pub fn list_directory<S: AsRef<str>>(
    translators: &[Arc<dyn Translator>],
    dir: &ResolvedPath,
    filters: ListFilter,
    name_patterns: &[S],
) -> EntryList {
    let case_sensitive = filters.is_case_sensitive();
    let scan_filter = filters.scan_filter();

    let patterns: Vec<NamePattern> = name_patterns
        .iter()
        .map(|p| NamePattern::compile_lenient(p.as_ref(), case_sensitive))
        .collect();

    let mut names = NameSet::new(case_sensitive);

    for translator in translators {
        let entries = match translator.begin_listing(dir.as_str(), "*", &scan_filter) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Translator '{}' skipped listing {dir}: {e}", translator.name());
                continue;
            }
        };

        for entry in entries {
            if matches_all(&entry, &patterns, &scan_filter) {
                names.insert(entry.name);
            }
        }
    }

    debug!("Listed {} entries in {dir}", names.len());
    names.into_list()
}
