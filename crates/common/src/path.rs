//! Distributed filesystem paths.
//!
//! A [`Path`] is an ordered sequence of components. Its string form is a
//! forward-slash-delimited sequence of those components, and the root directory is a
//! single forward slash.
//!
//! ## Validation rules
//! - A path string must begin with `/`
//! - Neither `/` nor `:` may appear inside a component (`:` is reserved for application use)
//! - Empty components are dropped when parsing, so `//a///b/` is the same path as `/a/b`
//! - `.` and `..` are not components: a path never escapes the directory it is mapped onto
//!
//! ## Ordering
//! Paths order component-wise. A consequence relied upon by the naming server is that
//! every descendant of a path sorts immediately after it, before any unrelated sibling:
//!
//! ```text
//! /a  <  /a/b  <  /a/b/c  <  /a/c  <  /b
//! ```

use crate::{PathError, PathResult};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Component separator.
pub const SEPARATOR: char = '/';

/// Character reserved as a delimiter for application use.
pub const RESERVED: char = ':';

fn is_relative_component(component: &str) -> bool {
    component == "." || component == ".."
}

/// An immutable, validated filesystem path.
///
/// Two paths are equal if and only if they have the same components. Paths are cheap to
/// clone, hashable, and safe to share between threads, so they can be used directly as
/// map keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    components: Vec<String>,
}

impl Path {
    /// Returns the path representing the root directory.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a path string.
    ///
    /// # Arguments
    ///
    /// * `input` - A `/`-delimited path string. It must begin with `/`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::NotAbsolute`] if `input` does not begin with `/`, or
    /// [`PathError::ReservedCharacter`] if it contains `:`, or
    /// [`PathError::RelativeComponent`] if any component is `.` or `..`.
    pub fn parse(input: &str) -> PathResult<Self> {
        if !input.starts_with(SEPARATOR) {
            return Err(PathError::NotAbsolute(input.to_owned()));
        }
        if input.contains(RESERVED) {
            return Err(PathError::ReservedCharacter(input.to_owned()));
        }

        let components: Vec<String> = input
            .split(SEPARATOR)
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect();
        if components.iter().any(|c| is_relative_component(c)) {
            return Err(PathError::RelativeComponent(input.to_owned()));
        }

        Ok(Self { components })
    }

    /// Creates a new path by appending `component` to this one.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidComponent`] if `component` is empty or contains `/`
    /// or `:`, and [`PathError::RelativeComponent`] if it is `.` or `..`.
    pub fn child(&self, component: &str) -> PathResult<Self> {
        if component.is_empty() || component.contains(SEPARATOR) || component.contains(RESERVED)
        {
            return Err(PathError::InvalidComponent(component.to_owned()));
        }
        if is_relative_component(component) {
            return Err(PathError::RelativeComponent(component.to_owned()));
        }

        let mut components = self.components.clone();
        components.push(component.to_owned());
        Ok(Self { components })
    }

    /// Returns `true` if this path is the root directory.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns the path to the parent of this path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Root`] for the root directory.
    pub fn parent(&self) -> PathResult<Self> {
        match self.components.split_last() {
            Some((_, rest)) => Ok(Self {
                components: rest.to_vec(),
            }),
            None => Err(PathError::Root),
        }
    }

    /// Returns the last component of this path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Root`] for the root directory.
    pub fn last(&self) -> PathResult<&str> {
        self.components
            .last()
            .map(String::as_str)
            .ok_or(PathError::Root)
    }

    /// Returns `true` if `other` is a prefix of this path.
    ///
    /// Every path is a subpath of itself, and the root is a subpath of every path.
    pub fn is_subpath(&self, other: &Path) -> bool {
        self.components.starts_with(&other.components)
    }

    /// Number of components. The root has depth zero.
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Iterates over the components of this path, root-most first.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }

    /// Returns the component immediately following `prefix` in this path.
    ///
    /// Returns `None` unless `prefix` is a strict prefix of this path.
    pub fn component_after(&self, prefix: &Path) -> Option<&str> {
        if self.depth() > prefix.depth() && self.is_subpath(prefix) {
            Some(self.components[prefix.depth()].as_str())
        } else {
            None
        }
    }

    /// Returns every proper, non-root prefix of this path, shallowest first.
    ///
    /// For `/a/b/c` this yields `/a` and `/a/b`.
    pub fn ancestors(&self) -> impl Iterator<Item = Path> + '_ {
        (1..self.components.len()).map(move |len| Self {
            components: self.components[..len].to_vec(),
        })
    }

    /// Maps this path onto a directory of the local filesystem.
    pub fn to_local(&self, root: &std::path::Path) -> PathBuf {
        let mut local = root.to_path_buf();
        local.extend(self.components.iter());
        local
    }

    /// Lists every regular file beneath a local directory as a path relative to it.
    ///
    /// The result is sorted. Directories are not listed themselves; they are implied by
    /// the files they contain.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::DirectoryNotFound`] if `directory` does not exist,
    /// [`PathError::NotADirectory`] if it is not a directory, and
    /// [`PathError::InvalidComponent`] if a file name cannot be represented as a path
    /// component.
    pub fn list_local(directory: &std::path::Path) -> PathResult<Vec<Path>> {
        if !directory.exists() {
            return Err(PathError::DirectoryNotFound(directory.to_path_buf()));
        }
        if !directory.is_dir() {
            return Err(PathError::NotADirectory(directory.to_path_buf()));
        }

        fn walk(dir: &std::path::Path, prefix: &Path, out: &mut Vec<Path>) -> PathResult<()> {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let name = entry.file_name();
                let name = name
                    .to_str()
                    .ok_or_else(|| PathError::InvalidComponent(name.to_string_lossy().into()))?;
                let path = prefix.child(name)?;
                let entry_path = entry.path();

                if entry_path.is_dir() {
                    walk(&entry_path, &path, out)?;
                } else {
                    out.push(path);
                }
            }
            Ok(())
        }

        let mut files = Vec::new();
        walk(directory, &Path::root(), &mut files)?;
        files.sort();
        Ok(files)
    }
}

impl fmt::Display for Path {
    /// Formats the path in its canonical string form, which [`Path::parse`] accepts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "{}", SEPARATOR);
        }
        for component in &self.components {
            write!(f, "{}{}", SEPARATOR, component)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl serde::Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Path {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Path::parse(&s).map_err(serde::de::Error::custom)
    }
}
