// Copyright (C) 2017 Christopher R. Field.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Utilities for working with paths that are written into installer scripts.
//!
//! Path separators are a mess:
//!
//! * on windows, `\` and `/` are both valid path separators
//! * on unix, only `/` is a valid separator, and `\` can appear in file names
//!
//! Every path this crate writes into a WiX Source file, an Inno Setup script,
//! or a desktop shortcut batch file is consumed on Windows, so paths are
//! normalized to `\` regardless of the host that generated the script. This
//! normalization is handled by the [`StoredPath`][] and [`StoredPathBuf`][]
//! types.
//!
//! These types have two flavours of entry-point:
//!
//! * When making a StoredPathBuf from a String, the input is assumed to be
//!   user-provided (a destination token such as `[INSTALLDIR]\Config`) and is
//!   forwarded verbatim.
//!
//! * When making a StoredPathBuf from a Path or Utf8Path, the input comes from
//!   the file system (the staging tree, the temporary directory) and all path
//!   separators are normalized to `\`. See [`StoredPathBuf::from_utf8_path`][].
//!
//! A StoredPath is not intended for doing actual i/o. It only answers
//! questions like "what is the file name" and "what are the segments",
//! treating both `\` and `/` as separators.

use std::{fmt, path::Path};

use camino::{Utf8Component, Utf8Path};

/// A path that will be written into a generated installer definition.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoredPathBuf(String);

/// A borrowed [`StoredPathBuf`][]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoredPath(str);

impl StoredPathBuf {
    /// Make a new StoredPathBuf from a String
    pub fn new(v: String) -> Self {
        Self(v)
    }

    /// Make a new StoredPathBuf from an OS-specific path.
    ///
    /// Non UTF-8 paths are converted lossily, which is fine for paths that
    /// only end up as text in a script.
    pub fn from_std_path(path: &Path) -> Self {
        match Utf8Path::from_path(path) {
            Some(utf8) => Self::from_utf8_path(utf8),
            None => Self::from_utf8_path(Utf8Path::new(&path.to_string_lossy())),
        }
    }

    /// Make a new StoredPathBuf from an OS-specific Utf8Path
    ///
    /// This breaks the path into its components and rewrites the slashes to `\`.
    pub fn from_utf8_path(path: &Utf8Path) -> Self {
        // `C:\a\b\c` is given to us as `["C:", "\", "a", "b", "c"]`
        let mut result = String::new();
        let mut multipart = false;
        for component in path.components() {
            if multipart {
                result.push('\\');
            }
            let part = match component {
                Utf8Component::Prefix(prefix) => prefix.as_str(),
                Utf8Component::RootDir => "\\",
                other => {
                    multipart = true;
                    other.as_str()
                }
            };
            result.push_str(part);
        }
        Self(result)
    }

    /// Appends a relative segment with a `\` separator.
    pub fn push(&mut self, segment: &str) {
        if !self.0.is_empty() && !self.0.ends_with(['\\', '/']) {
            self.0.push('\\');
        }
        self.0.push_str(segment.trim_start_matches(['\\', '/']));
    }
}

impl StoredPath {
    /// Make a new StoredPath from a str
    pub fn new(v: &str) -> &Self {
        // SAFETY: this is the idiomatic pattern for converting between newtyped slices.
        // See the impl of std::str::from_utf8_unchecked for an example.
        unsafe { std::mem::transmute(v) }
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        self
    }

    /// Returns a new owned path with `segment` appended.
    pub fn join(&self, segment: &str) -> StoredPathBuf {
        let mut joined = self.to_owned();
        joined.push(segment);
        joined
    }

    /// Iterates over the non-empty segments, splitting on both `\` and `/`.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.as_str()
            .split(['\\', '/'])
            .filter(|s| !s.is_empty() && *s != ".")
    }

    /// Extracts the stem (non-extension) part of the [`self.file_name`][].
    ///
    /// A name that starts with `.` and has no other `.` is all stem.
    pub fn file_stem(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => Some(stem),
            _ => Some(name),
        }
    }

    /// Returns the final component of the path, if there is one.
    pub fn file_name(&self) -> Option<&str> {
        let mut path = self.as_str();

        // Trailing slashes and `/.` are no-ops, trailing `..` is opaque.
        while let Some(prefix) = path
            .strip_suffix('\\')
            .or_else(|| path.strip_suffix('/'))
            .or_else(|| path.strip_suffix("/."))
            .or_else(|| path.strip_suffix("\\."))
        {
            path = prefix;
        }

        let name = match path.rfind(['\\', '/']) {
            Some(index) => &path[index + 1..],
            None => path,
        };

        if name.is_empty() || name == "." || name == ".." {
            None
        } else {
            Some(name)
        }
    }
}

impl std::ops::Deref for StoredPathBuf {
    type Target = StoredPath;
    fn deref(&self) -> &Self::Target {
        StoredPath::new(&self.0)
    }
}
impl std::ops::Deref for StoredPath {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl std::borrow::Borrow<StoredPath> for StoredPathBuf {
    fn borrow(&self) -> &StoredPath {
        self
    }
}
impl std::borrow::ToOwned for StoredPath {
    type Owned = StoredPathBuf;

    fn to_owned(&self) -> StoredPathBuf {
        StoredPathBuf::new(self.0.to_owned())
    }
}
impl std::convert::From<String> for StoredPathBuf {
    fn from(v: String) -> Self {
        Self::new(v)
    }
}
impl std::convert::From<StoredPathBuf> for String {
    fn from(v: StoredPathBuf) -> Self {
        v.0
    }
}
impl<'a> std::convert::From<&'a str> for StoredPathBuf {
    fn from(v: &'a str) -> Self {
        StoredPath::new(v).to_owned()
    }
}
impl std::fmt::Debug for StoredPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        std::fmt::Debug::fmt(self.as_str(), f)
    }
}
impl std::fmt::Display for StoredPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(self.as_str(), f)
    }
}
impl std::fmt::Debug for StoredPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        std::fmt::Debug::fmt(self.as_str(), f)
    }
}
impl std::fmt::Display for StoredPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(self.as_str(), f)
    }
}
