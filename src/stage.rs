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

//! Assembling the staging tree.
//!
//! The staging tree is what ends up in the installer. It holds a copy of the
//! Release build output, plus the two curated file sets in their own
//! subfolders:
//!
//! ```text
//! <staging root>\
//!     App.exe
//!     App.dll
//!     DllFiles\          library files, relative to their common ancestor
//!     AdditionalFiles\   config, text and json files, likewise
//! ```
//!
//! The curated subfolders are mapped to their destination tokens by the
//! script generators; in the staging tree they only keep the sets apart.

use crate::BuildLog;
use crate::Error;
use crate::Result;
use crate::StoredPathBuf;
use crate::ADDITIONAL_FOLDER_NAME;
use crate::DLL_FOLDER_NAME;
use crate::STAGING_DIR_SUFFIX;

use tempfile::TempDir;
use walkdir::WalkDir;

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// One curated file and where it was staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// The file the user picked.
    pub source: PathBuf,
    /// The destination relative to the staging root, e.g. `DllFiles\a\x.dll`.
    pub destination: StoredPathBuf,
}

/// The staging tree of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPlan {
    root: PathBuf,
    artifact: PathBuf,
    library_files: Vec<StagedFile>,
    additional_files: Vec<StagedFile>,
}

impl StagingPlan {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The build output folder that was copied.
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn library_files(&self) -> &[StagedFile] {
        &self.library_files
    }

    pub fn additional_files(&self) -> &[StagedFile] {
        &self.additional_files
    }

    pub fn has_library_files(&self) -> bool {
        !self.library_files.is_empty()
    }

    pub fn has_additional_files(&self) -> bool {
        !self.additional_files.is_empty()
    }
}

/// Creates the temporary staging root for a product. The directory is
/// removed when the returned value is dropped.
pub fn staging_dir(product_name: &str) -> Result<TempDir> {
    let dir = tempfile::Builder::new()
        .prefix(&format!("{}{}", product_name, STAGING_DIR_SUFFIX))
        .tempdir()?;
    Ok(dir)
}

/// Removes repeated paths, keeping the first occurrence.
pub fn dedup(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    files
        .iter()
        .filter(|f| seen.insert(f.as_path()))
        .cloned()
        .collect()
}

/// Copies the build output and the curated file sets into `staging_root`.
pub fn stage(
    artifact_dir: &Path,
    library_files: &[PathBuf],
    additional_files: &[PathBuf],
    staging_root: &Path,
    log: &BuildLog,
) -> Result<StagingPlan> {
    info!("Staging the installer contents");
    debug!("artifact_dir = {:?}", artifact_dir);
    debug!("staging_root = {:?}", staging_root);
    copy_tree(artifact_dir, staging_root)?;
    log.append(format!("Copied the build output to {}", staging_root.display()));
    let library_files = stage_set(library_files, DLL_FOLDER_NAME, staging_root, log)?;
    let additional_files = stage_set(additional_files, ADDITIONAL_FOLDER_NAME, staging_root, log)?;
    Ok(StagingPlan {
        root: staging_root.to_owned(),
        artifact: artifact_dir.to_owned(),
        library_files,
        additional_files,
    })
}

/// Recursively copies `source` into `destination`, overwriting existing
/// files.
pub fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination).map_err(|err| staging_error(destination, err))?;
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|err| Error::Staging(err.to_string()))?;
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|err| staging_error(&target, err))?;
        } else {
            trace!("Copying '{}' to '{}'", entry.path().display(), target.display());
            fs::copy(entry.path(), &target).map_err(|err| staging_error(&target, err))?;
        }
    }
    Ok(())
}

fn stage_set(
    files: &[PathBuf],
    folder: &str,
    staging_root: &Path,
    log: &BuildLog,
) -> Result<Vec<StagedFile>> {
    let files = dedup(files);
    if files.is_empty() {
        return Ok(Vec::new());
    }
    let ancestor = if files.len() > 1 {
        common_ancestor(&files)
    } else {
        None
    };
    debug!("{} ancestor = {:?}", folder, ancestor);
    let skip = ancestor.as_ref().map(|a| a.components().count());
    let folder_path = staging_root.join(folder);
    let mut staged = Vec::with_capacity(files.len());
    for file in files {
        let relative: PathBuf = match skip {
            Some(n) => file.components().skip(n).collect(),
            None => file.file_name().map(PathBuf::from).ok_or_else(|| {
                Error::Staging(format!("The '{}' path is not a file", file.display()))
            })?,
        };
        let target = folder_path.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| staging_error(parent, err))?;
        }
        fs::copy(&file, &target).map_err(|err| staging_error(&target, err))?;
        let destination = StoredPathBuf::from_std_path(&Path::new(folder).join(&relative));
        log.append(format!(
            "Copied {} -> {}",
            file.file_name().unwrap_or_default().to_string_lossy(),
            destination
        ));
        staged.push(StagedFile {
            source: file,
            destination,
        });
    }
    Ok(staged)
}

fn staging_error(path: &Path, err: std::io::Error) -> Error {
    Error::Staging(format!("Could not stage '{}': {}", path.display(), err))
}

/// Gets the deepest folder that contains every file, comparing path
/// segments case-insensitively from the root down.
///
/// A single file yields its own folder. Files with no shared folder name
/// yield `None`. This covers files on different drives and files that only
/// share the filesystem root, such as `/libs/x.dll` and `/other/y.dll`.
pub fn common_ancestor(files: &[PathBuf]) -> Option<PathBuf> {
    let (first, rest) = files.split_first()?;
    let mut shared: Vec<Component> = first.parent()?.components().collect();
    for file in rest {
        let parent = file.parent()?;
        let count = shared
            .iter()
            .zip(parent.components())
            .take_while(|(a, b)| same_segment(a, b))
            .count();
        shared.truncate(count);
    }
    if shared.iter().any(|c| matches!(c, Component::Normal(_))) {
        Some(shared.iter().collect())
    } else {
        None
    }
}

fn same_segment(a: &Component, b: &Component) -> bool {
    a.as_os_str().to_string_lossy().to_lowercase() == b.as_os_str().to_string_lossy().to_lowercase()
}
