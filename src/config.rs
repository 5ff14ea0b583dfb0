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

//! The optional JSON settings file.
//!
//! A settings file is a single JSON object. It is either given explicitly or
//! found beside the project file as `installer-builder.json`. Values from the
//! command line always win over values from the file, which win over the
//! built-in defaults; resolving that order is the caller's job, this module
//! only answers "what does the file say".
//!
//! ```json
//! {
//!     "publisher": "GreenPower",
//!     "version": "2.1.0.0",
//!     "install-dir": "{autopf}\\{app-name}",
//!     "library-destination": "[INSTALLDIR]\\lib",
//!     "overwrite": true
//! }
//! ```

use crate::Error;
use crate::Result;
use crate::SETTINGS_FILE_NAME;

use serde_json::Value;

use std::fs;
use std::path::{Path, PathBuf};

pub const PUBLISHER: &str = "publisher";
pub const VERSION: &str = "version";
pub const INSTALL_DIR: &str = "install-dir";
pub const LIBRARY_DESTINATION: &str = "library-destination";
pub const ADDITIONAL_DESTINATION: &str = "additional-destination";
pub const OVERWRITE: &str = "overwrite";
pub const DELETE_ON_UNINSTALL: &str = "delete-on-uninstall";
pub const LANGUAGE_NAME: &str = "language-name";
pub const LANGUAGE_FILE: &str = "language-file";
pub const WIX_LANGUAGE: &str = "wix-language";
pub const WIX_CODEPAGE: &str = "wix-codepage";
pub const CODE_PAGE: &str = "code-page";
pub const NO_BUILD: &str = "no-build";

/// The settings read from a JSON file, or no settings at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    value: Value,
    source: Option<PathBuf>,
}

impl Settings {
    /// Settings with no values, used when there is no file.
    pub fn empty() -> Self {
        Settings {
            value: Value::Object(serde_json::Map::new()),
            source: None,
        }
    }

    /// Parses settings from JSON text.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(Error::Config(String::from(
                "The settings must be a JSON object with one key per setting",
            )));
        }
        Ok(Settings {
            value,
            source: None,
        })
    }

    /// Loads the settings for a project.
    ///
    /// An explicit path must exist. Without one, the settings file beside
    /// the project file is used when present, otherwise the settings are
    /// empty.
    pub fn load(explicit: Option<&Path>, descriptor: &Path) -> Result<Self> {
        let path = if let Some(p) = explicit {
            if !p.is_file() {
                return Err(Error::Config(format!(
                    "The '{}' settings file does not exist",
                    p.display()
                )));
            }
            p.to_owned()
        } else {
            let beside = descriptor
                .parent()
                .map(|d| d.join(SETTINGS_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME));
            trace!("Looking for a settings file at '{}'", beside.display());
            if beside.is_file() {
                beside
            } else {
                return Ok(Settings::empty());
            }
        };
        debug!("settings path = {:?}", path);
        let text = fs::read_to_string(&path)?;
        let mut settings = Settings::parse(&text).map_err(|err| match err {
            Error::Json(e) => Error::Config(format!(
                "The '{}' settings file is not valid JSON: {}",
                path.display(),
                e
            )),
            e => e,
        })?;
        settings.source = Some(path);
        Ok(settings)
    }

    /// The file the settings were read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Gets a string value. Numbers are accepted and rendered as text, so
    /// `"wix-language": 1042` and `"wix-language": "1042"` are the same.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.value.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Gets a boolean value.
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.value.get(key).and_then(Value::as_bool)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::empty()
    }
}
