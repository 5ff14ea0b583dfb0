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

use crate::Error;
use lazy_static::lazy_static;
use std::fmt;
use std::str::FromStr;

/// The WiX Source (wxs) template.
static WIX_SOURCE_TEMPLATE: &str = include_str!("main.wxs.mustache");

/// The Inno Setup script (iss) template.
static INNO_SCRIPT_TEMPLATE: &str = include_str!("setup.iss.mustache");

/// The 7-Zip self-extractor configuration template.
static SFX_CONFIG_TEMPLATE: &str = include_str!("sfx-config.txt.mustache");

/// The desktop shortcut batch script template.
static SHORTCUT_BATCH_TEMPLATE: &str = include_str!("CreateDesktopShortcut.bat.mustache");

/// The different templates that are rendered into installer definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// A [WiX Source (wxs)] file.
    ///
    /// [Wix Source (wxs)]: http://wixtoolset.org/documentation/manual/v3/overview/files.html
    Wxs,
    /// An [Inno Setup] script.
    ///
    /// [Inno Setup]: https://jrsoftware.org/ishelp/
    Iss,
    /// The configuration block prepended to a 7-Zip archive by the
    /// self-extractor module.
    SfxConfig,
    /// A batch file that creates a desktop shortcut to the application.
    ShortcutBatch,
}

lazy_static! {
    static ref POSSIBLE_VALUES: Vec<String> = vec![
        Template::Wxs.id().to_owned(),
        Template::Wxs.id().to_lowercase(),
        Template::Iss.id().to_owned(),
        Template::Iss.id().to_lowercase(),
        Template::SfxConfig.id().to_owned(),
        Template::SfxConfig.id().to_lowercase(),
        Template::ShortcutBatch.id().to_owned(),
        Template::ShortcutBatch.id().to_lowercase(),
    ];
}

impl Template {
    /// Gets the ID for the template.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use installer::Template;
    ///
    /// assert_eq!(Template::Wxs.id(), "WXS");
    /// assert_eq!(Template::Iss.id(), "ISS");
    /// assert_eq!(Template::SfxConfig.id(), "SFX");
    /// assert_eq!(Template::ShortcutBatch.id(), "BAT");
    /// ```
    pub fn id(&self) -> &str {
        match *self {
            Template::Wxs => "WXS",
            Template::Iss => "ISS",
            Template::SfxConfig => "SFX",
            Template::ShortcutBatch => "BAT",
        }
    }

    /// Gets the possible string representations of each variant.
    ///
    /// The possibilities are combination of case (upper and lower) for the
    /// various templates that are available.
    pub fn possible_values() -> &'static Vec<String> {
        &POSSIBLE_VALUES
    }

    /// Gets the embedded contents of the template as a string.
    pub fn to_str(&self) -> &str {
        match *self {
            Template::Wxs => WIX_SOURCE_TEMPLATE,
            Template::Iss => INNO_SCRIPT_TEMPLATE,
            Template::SfxConfig => SFX_CONFIG_TEMPLATE,
            Template::ShortcutBatch => SHORTCUT_BATCH_TEMPLATE,
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Template {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().trim() {
            "wxs" => Ok(Template::Wxs),
            "iss" => Ok(Template::Iss),
            "sfx" => Ok(Template::SfxConfig),
            "bat" => Ok(Template::ShortcutBatch),
            _ => Err(Error::Generic(format!(
                "Cannot convert from '{s}' to a Template variant"
            ))),
        }
    }
}
