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

//! WiX Source for the staging tree.
//!
//! Every file of the staging tree gets its own component, placed in a
//! directory that mirrors its staged location below `INSTALLDIR`. The curated
//! `DllFiles` and `AdditionalFiles` folders are placed at the sub-path of
//! their destination token instead, so `[INSTALLDIR]\lib` puts the library
//! files in a `lib` folder and `[INSTALLDIR]` merges them into the
//! installation folder.
//!
//! The product and upgrade codes are random, so every build is a new product
//! as far as Windows Installer is concerned.
//!
//! The source uses the WiX v3 schema (`http://schemas.microsoft.com/wix/2006/wi`
//! with a `Product` root). The v3 `candle`/`light` pair compiles it directly.
//! WiX v4 and later reject it in `wix build` until it has been converted with
//! `wix convert`, so a run with only the `wix` command installed fails at the
//! compile step.

use super::{install_subpath, random_guid, InstallerRequest};
use crate::Error;
use crate::Result;
use crate::StoredPath;
use crate::Template;
use crate::ADDITIONAL_FOLDER_NAME;
use crate::DLL_FOLDER_NAME;

use mustache::{self, MapBuilder};
use walkdir::WalkDir;

use std::collections::HashMap;
use std::path::Path;

/// The WiX `Id` of the installation folder.
pub const INSTALL_DIR_ID: &str = "INSTALLDIR";

/// The version used when the requested version has no numeric fields.
pub const DEFAULT_MSI_VERSION: &str = "1.0.0";

/// Converts a free-text version to an MSI product version, which is at most
/// three numeric fields.
///
/// # Examples
///
/// ```rust
/// use installer::script::wxs::msi_version;
///
/// assert_eq!(msi_version("1.2.3.4"), "1.2.3");
/// assert_eq!(msi_version("2.0"), "2.0");
/// assert_eq!(msi_version("v1"), "1.0.0");
/// ```
pub fn msi_version(version: &str) -> String {
    let fields: Vec<&str> = version
        .trim()
        .split('.')
        .take_while(|f| !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()))
        .take(3)
        .collect();
    if fields.is_empty() {
        String::from(DEFAULT_MSI_VERSION)
    } else {
        fields.join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DirectoryEntry {
    pub id: String,
    pub parent: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileEntry {
    pub directory: String,
    pub name: String,
    pub source: String,
}

/// The directories and files of the installation folder.
#[derive(Debug, Default)]
pub(crate) struct Layout {
    pub directories: Vec<DirectoryEntry>,
    pub files: Vec<FileEntry>,
    ids: HashMap<String, String>,
}

impl Layout {
    /// Walks the staging tree of `request`.
    pub fn scan(request: &InstallerRequest) -> Result<Self> {
        let library = if request.has_library_files() {
            Some(curated_prefix(&request.library_destination, DLL_FOLDER_NAME))
        } else {
            None
        };
        let additional = if request.has_additional_files() {
            Some(curated_prefix(
                &request.additional_destination,
                ADDITIONAL_FOLDER_NAME,
            ))
        } else {
            None
        };
        let root = request.staging_root.as_path();
        let mut layout = Layout::default();
        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            let mut segments = segments(entry.path(), root)?;
            let name = segments.pop().ok_or_else(|| {
                Error::Generic(format!("'{}' has no file name", entry.path().display()))
            })?;
            if let Some(first) = segments.first() {
                let prefix = if first == DLL_FOLDER_NAME {
                    library.as_ref()
                } else if first == ADDITIONAL_FOLDER_NAME {
                    additional.as_ref()
                } else {
                    None
                };
                if let Some(prefix) = prefix {
                    segments.splice(..1, prefix.iter().cloned());
                }
            }
            let directory = layout.directory_id(&segments);
            trace!("{} -> {}", entry.path().display(), directory);
            layout.files.push(FileEntry {
                directory,
                name,
                source: entry.path().display().to_string(),
            });
        }
        Ok(layout)
    }

    /// Gets the `Id` of the directory at `segments` below the installation
    /// folder, adding it and its parents as needed.
    fn directory_id(&mut self, segments: &[String]) -> String {
        let Some((name, parents)) = segments.split_last() else {
            return String::from(INSTALL_DIR_ID);
        };
        let key = segments.join("\\").to_lowercase();
        if let Some(id) = self.ids.get(&key) {
            return id.clone();
        }
        let parent = self.directory_id(parents);
        let id = format!("Dir{}", self.directories.len() + 1);
        self.directories.push(DirectoryEntry {
            id: id.clone(),
            parent,
            name: name.clone(),
        });
        self.ids.insert(key, id.clone());
        id
    }
}

fn segments(path: &Path, root: &Path) -> Result<Vec<String>> {
    let relative = path
        .strip_prefix(root)
        .map_err(|err| Error::Generic(err.to_string()))?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect())
}

/// The folders below `INSTALLDIR` for a curated set.
fn curated_prefix(token: &str, folder: &str) -> Vec<String> {
    match install_subpath(token) {
        Some(rest) => StoredPath::new(rest)
            .segments()
            .map(String::from)
            .collect(),
        None => {
            warn!(
                "The '{}' destination is not below {} and cannot be expressed in the \
                 WiX Source. The files will be installed to the '{}' folder of the \
                 installation folder instead.",
                token,
                crate::INSTALL_DIR_TOKEN,
                folder
            );
            vec![folder.to_owned()]
        }
    }
}

/// Renders the WiX Source for the staging tree of `request`.
pub fn render(request: &InstallerRequest) -> Result<String> {
    debug!("product_name = {:?}", request.product_name);
    debug!("staging_root = {:?}", request.staging_root);
    let layout = Layout::scan(request)?;
    info!(
        "Creating the WiX Source with {} files in {} folders",
        layout.files.len(),
        layout.directories.len() + 1
    );
    let template = mustache::compile_str(Template::Wxs.to_str())?;
    let data = MapBuilder::new()
        .insert_vec("directories", |mut builder| {
            for directory in &layout.directories {
                builder = builder.push_map(|builder| {
                    builder
                        .insert_str("id", &directory.id)
                        .insert_str("parent", &directory.parent)
                        .insert_str("name", &directory.name)
                });
            }
            builder
        })
        .insert_vec("components", |mut builder| {
            for (index, file) in layout.files.iter().enumerate() {
                builder = builder.push_map(|builder| {
                    builder
                        .insert_str("index", (index + 1).to_string())
                        .insert_str("guid", random_guid())
                        .insert_str("directory", &file.directory)
                        .insert_str("name", &file.name)
                        .insert_str("source", &file.source)
                });
            }
            builder
        })
        .insert_str("product-name", &request.product_name)
        .insert_str("product-guid", random_guid())
        .insert_str("upgrade-guid", random_guid())
        .insert_str("manufacturer", &request.publisher)
        .insert_str("language", &request.wix_language)
        .insert_str("codepage", &request.wix_codepage)
        .insert_str("version", msi_version(&request.version))
        .insert_str("exe-name", request.exe_name())
        .insert_str("desktop-shortcut-guid", random_guid())
        .insert_str("start-menu-shortcut-guid", random_guid())
        .build();
    let mut rendered = Vec::new();
    template.render_data(&mut rendered, &data)?;
    String::from_utf8(rendered).map_err(|err| Error::Generic(err.to_string()))
}
