//! Purpose: Resolve the directory that holds a table's record files.
//! Exports: `Location`, `resolve_table_path`.
//! Role: Pure path arithmetic shared by every store operation; no I/O.
//! Invariants: Resolved paths are lexically clean and end with a separator.
//! Invariants: A suffix (even empty) fully replaces the type-derived table name.
//! Invariants: Relative results are anchored with `./` unless they climb with `..`.
use std::ffi::OsString;
use std::path::{Component, MAIN_SEPARATOR_STR, Path, PathBuf, is_separator};

/// Where a table lives: an optional parent directory (`prefix`) and an optional
/// replacement for the type-derived directory name (`suffix`).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Location {
    prefix: Option<String>,
    suffix: Option<String>,
}

impl Location {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional overrides: the first is the prefix, the second the suffix.
    /// Anything after the second is ignored.
    pub fn from_overrides<S: AsRef<str>>(overrides: &[S]) -> Self {
        let mut overrides = overrides.iter();
        Self {
            prefix: overrides.next().map(|value| value.as_ref().to_string()),
            suffix: overrides.next().map(|value| value.as_ref().to_string()),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }
}

impl From<&Path> for Location {
    fn from(prefix: &Path) -> Self {
        Self::new().with_prefix(prefix.to_string_lossy())
    }
}

impl From<PathBuf> for Location {
    fn from(prefix: PathBuf) -> Self {
        Self::from(prefix.as_path())
    }
}

pub fn resolve_table_path(table: &str, location: &Location) -> PathBuf {
    let prefix = location.prefix().unwrap_or("");
    let suffix = location.suffix().unwrap_or(table);
    let cleaned = lexical_clean(&join_lexical(prefix, suffix));

    let mut rendered = OsString::new();
    if cleaned.as_os_str().is_empty() {
        rendered.push(".");
    } else if cleaned.is_relative()
        && !matches!(cleaned.components().next(), Some(Component::ParentDir))
    {
        rendered.push(".");
        rendered.push(MAIN_SEPARATOR_STR);
        rendered.push(cleaned.as_os_str());
    } else {
        rendered.push(cleaned.as_os_str());
    }

    let ends_with_separator = rendered
        .as_encoded_bytes()
        .last()
        .is_some_and(|byte| is_separator(*byte as char));
    if !ends_with_separator {
        rendered.push(MAIN_SEPARATOR_STR);
    }
    PathBuf::from(rendered)
}

// The suffix is nested under a non-empty prefix even when it is absolute.
fn join_lexical(prefix: &str, suffix: &str) -> PathBuf {
    let mut joined = PathBuf::from(prefix);
    for component in Path::new(suffix).components() {
        match component {
            Component::RootDir | Component::Prefix(_) if !prefix.is_empty() => continue,
            other => joined.push(other),
        }
    }
    joined
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}
