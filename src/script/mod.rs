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

//! # Script Module
//!
//! Renders the installer definition for the selected toolchain: a WiX Source
//! file, an Inno Setup script, or the configuration block and shortcut batch
//! file of a self-extracting archive. Exactly one definition is produced per
//! run.
//!
//! The destination of each curated file set is given as a token. A token
//! starting with `[INSTALLDIR]` is relative to the installation folder, e.g.
//! `[INSTALLDIR]\lib`; anything else is a literal path on the target machine.

pub mod iss;
pub mod sfx;
pub mod wxs;

use crate::stage::StagingPlan;
use crate::toolset::Toolchain;
use crate::Result;
use crate::StoredPath;
use crate::StoredPathBuf;
use crate::DEFAULT_PUBLISHER;
use crate::DEFAULT_VERSION;
use crate::INNO_APP_DIR;
use crate::INSTALL_DIR_TOKEN;

use uuid::Uuid;

use std::path::PathBuf;

/// The default Inno Setup installation folder.
pub const DEFAULT_INSTALL_DIR: &str = "{autopf}\\{#MyAppName}";

/// The placeholder for the application name in a user-supplied installation
/// folder.
pub const APP_NAME_PLACEHOLDER: &str = "{app-name}";

/// The Inno Setup macro for the application name.
pub const APP_NAME_MACRO: &str = "{#MyAppName}";

pub const DEFAULT_LANGUAGE_NAME: &str = "korean";
pub const DEFAULT_LANGUAGE_FILE: &str = "compiler:Languages\\Korean.isl";
pub const DEFAULT_WIX_LANGUAGE: &str = "1042";
pub const DEFAULT_WIX_CODEPAGE: &str = "949";

/// Everything the generators need to know about one installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerRequest {
    pub product_name: String,
    pub version: String,
    pub publisher: String,
    /// Where the installer is written.
    pub output_dir: PathBuf,
    /// The staging tree that is packaged.
    pub staging_root: PathBuf,
    pub library_destination: String,
    pub additional_destination: String,
    /// The staged library files, relative to the staging root, e.g.
    /// `DllFiles\a\x.dll`.
    pub library_files: Vec<StoredPathBuf>,
    /// The staged additional files, relative to the staging root.
    pub additional_files: Vec<StoredPathBuf>,
    /// Replace curated files that already exist on the target machine.
    pub overwrite: bool,
    /// Remove curated files when the application is uninstalled.
    pub delete_on_uninstall: bool,
    /// The Inno Setup default installation folder, `None` for the default.
    pub install_dir: Option<String>,
    pub language_name: String,
    pub language_file: String,
    pub wix_language: String,
    pub wix_codepage: String,
}

impl InstallerRequest {
    /// Creates a request with the default settings and no curated files.
    pub fn new<S, P>(product_name: S, output_dir: P, staging_root: P) -> Self
    where
        S: Into<String>,
        P: Into<PathBuf>,
    {
        InstallerRequest {
            product_name: product_name.into(),
            version: String::from(DEFAULT_VERSION),
            publisher: String::from(DEFAULT_PUBLISHER),
            output_dir: output_dir.into(),
            staging_root: staging_root.into(),
            library_destination: String::from(INSTALL_DIR_TOKEN),
            additional_destination: String::from(INSTALL_DIR_TOKEN),
            library_files: Vec::new(),
            additional_files: Vec::new(),
            overwrite: false,
            delete_on_uninstall: false,
            install_dir: None,
            language_name: String::from(DEFAULT_LANGUAGE_NAME),
            language_file: String::from(DEFAULT_LANGUAGE_FILE),
            wix_language: String::from(DEFAULT_WIX_LANGUAGE),
            wix_codepage: String::from(DEFAULT_WIX_CODEPAGE),
        }
    }

    /// Takes the curated files from a staging plan.
    pub fn with_plan(mut self, plan: &StagingPlan) -> Self {
        self.staging_root = plan.root().to_owned();
        self.library_files = plan
            .library_files()
            .iter()
            .map(|f| f.destination.clone())
            .collect();
        self.additional_files = plan
            .additional_files()
            .iter()
            .map(|f| f.destination.clone())
            .collect();
        self
    }

    pub fn has_library_files(&self) -> bool {
        !self.library_files.is_empty()
    }

    pub fn has_additional_files(&self) -> bool {
        !self.additional_files.is_empty()
    }

    /// The main executable of the application.
    pub fn exe_name(&self) -> String {
        crate::exe_name(&self.product_name)
    }

    /// The Inno Setup installation folder with the application name
    /// placeholder replaced by its macro.
    pub fn inno_install_dir(&self) -> String {
        match self.install_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => dir.replace(APP_NAME_PLACEHOLDER, APP_NAME_MACRO),
            _ => String::from(DEFAULT_INSTALL_DIR),
        }
    }
}

/// A rendered installer definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// WiX Source, compiled into an MSI.
    Wxs(String),
    /// An Inno Setup script, compiled into a setup executable.
    Inno(String),
    /// The self-extractor configuration and the shortcut batch file shipped
    /// in the archive.
    Sfx { config: String, shortcut: String },
    /// The shortcut batch file shipped in a portable zip archive.
    Zip { shortcut: String },
}

/// Renders the installer definition for `toolchain`.
///
/// The WiX Source lists every file of the staging tree, so the tree must be
/// complete before this is called.
pub fn generate(request: &InstallerRequest, toolchain: &Toolchain) -> Result<Script> {
    debug!("toolchain = {:?}", toolchain);
    match toolchain {
        Toolchain::Wix(..) => wxs::render(request).map(Script::Wxs),
        Toolchain::InnoSetup { .. } => iss::render(request).map(Script::Inno),
        Toolchain::SevenZipSfx { .. } => Ok(Script::Sfx {
            config: sfx::render_config(request)?,
            shortcut: sfx::render_shortcut(request, false)?,
        }),
        Toolchain::Zip => Ok(Script::Zip {
            shortcut: sfx::render_shortcut(request, true)?,
        }),
    }
}

/// Gets the sub-path after a leading `[INSTALLDIR]` token, matched without
/// regard to case. An empty token is the installation folder itself.
///
/// Returns `None` for a token that is not relative to the installation
/// folder.
pub fn install_subpath(token: &str) -> Option<&str> {
    let token = token.trim();
    if token.is_empty() {
        return Some("");
    }
    let head = token.get(..INSTALL_DIR_TOKEN.len())?;
    if !head.eq_ignore_ascii_case(INSTALL_DIR_TOKEN) {
        return None;
    }
    let rest = &token[INSTALL_DIR_TOKEN.len()..];
    if rest.is_empty() || rest.starts_with('\\') || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Converts a destination token to an Inno Setup path, replacing a leading
/// `[INSTALLDIR]` with `{app}` and keeping the rest verbatim.
///
/// # Examples
///
/// ```rust
/// use installer::script::inno_path;
///
/// assert_eq!(inno_path("[INSTALLDIR]"), "{app}");
/// assert_eq!(inno_path("[installdir]\\Sub\\Dir"), "{app}\\Sub\\Dir");
/// assert_eq!(inno_path("[INSTALLDIR]/Sub"), "{app}/Sub");
/// assert_eq!(inno_path("D:\\Shared"), "D:\\Shared");
/// ```
pub fn inno_path(token: &str) -> String {
    match install_subpath(token) {
        Some(rest) => format!("{}{}", INNO_APP_DIR, rest),
        None => token.to_owned(),
    }
}

/// Derives the Inno Setup application ID from the product name.
///
/// The MD5 digest of the name is read as a GUID, so the same product always
/// gets the same ID and a new version replaces the old one.
pub fn stable_app_id(product_name: &str) -> String {
    let digest = md5::compute(product_name.as_bytes());
    Uuid::from_bytes_le(digest.0)
        .hyphenated()
        .to_string()
        .to_uppercase()
}

/// A new random GUID in registry format (uppercase, hyphenated).
pub fn random_guid() -> String {
    Uuid::new_v4().hyphenated().to_string().to_uppercase()
}

/// The path of a curated file below its set folder, e.g. `a\x.dll` for
/// `DllFiles\a\x.dll`.
pub(crate) fn relative_to_set(staged: &StoredPath) -> StoredPathBuf {
    staged
        .segments()
        .skip(1)
        .fold(StoredPathBuf::new(String::new()), |mut p, s| {
            p.push(s);
            p
        })
}

/// Converts LF line endings to CRLF, for files read by Windows tools.
pub(crate) fn crlf(text: &str) -> String {
    text.lines().map(|l| format!("{}\r\n", l)).collect()
}
