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

//! Classification of a .NET project file.
//!
//! The analysis is a handful of substring checks and regular expressions over
//! the raw text of the `.csproj` file. No XML parsing happens: old-style
//! project files, SDK-style project files, and hand-edited files with
//! unusual formatting are all treated the same way.

use crate::Error;
use crate::Result;

use lazy_static::lazy_static;
use regex::Regex;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// The architecture used when the project does not declare one.
pub const DEFAULT_ARCHITECTURE: &str = "Any CPU";

const LEGACY_VERSION_TAG: &str = "<TargetFrameworkVersion>";
const DESKTOP_SDK_MARKER: &str = "Microsoft.NET.Sdk.WindowsDesktop";
const LEGACY_NAMESPACE: &str = "http://schemas.microsoft.com/developer/msbuild/2003";
const LICENSE_RESOURCE: &str = "licenses.licx";
const UNRESOLVED_PROPERTY: &str = "$(";

lazy_static! {
    static ref LEGACY_FRAMEWORK: Regex =
        Regex::new(r"(?i)<TargetFramework>net(4\d{1,2}|3[05]|20)</TargetFramework>")
            .expect("Legacy framework regular expression");
    static ref RELEASE_PLATFORM: Regex = Regex::new(
        r"(?i)<PropertyGroup[^>]*Condition[^>]*Release[^>]*>[\s\S]*?<PlatformTarget>([^<]+)</PlatformTarget>"
    )
    .expect("Release platform regular expression");
    static ref DEFAULT_PLATFORM: Regex =
        Regex::new(r#"(?i)<Platform\s+Condition[^>]*==\s*''\s*"[^>]*>([^<]+)</Platform>"#)
            .expect("Default platform regular expression");
    static ref ANY_PLATFORM: Regex = Regex::new(r"(?i)<PlatformTarget>([^<]+)</PlatformTarget>")
        .expect("Platform target regular expression");
}

/// The runtime family a project targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    /// .NET Framework 2.0 through 4.x.
    Legacy,
    /// .NET Core 3.x and .NET 5 or later.
    Modern,
}

impl RuntimeKind {
    pub fn as_str(&self) -> &str {
        match *self {
            RuntimeKind::Legacy => "legacy",
            RuntimeKind::Modern => "modern",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The classification of a project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    path: PathBuf,
    runtime: RuntimeKind,
    architecture: String,
    has_license_resource: bool,
    requires_legacy_build_tool: bool,
}

impl BuildTarget {
    /// Reads and classifies the project file at `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            Error::Input(format!(
                "The '{}' project file could not be read: {}",
                path.display(),
                err
            ))
        })?;
        let mut target = analyze(&text);
        target.path = path.to_owned();
        Ok(target)
    }

    /// The project file, empty when the target came from [`analyze`].
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn runtime(&self) -> RuntimeKind {
        self.runtime
    }

    /// The declared platform, e.g. `x64` or `Any CPU`.
    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    /// True if the project embeds a `licenses.licx` resource, which needs the
    /// license compiler task that only MSBuild provides.
    pub fn has_license_resource(&self) -> bool {
        self.has_license_resource
    }

    pub fn requires_legacy_build_tool(&self) -> bool {
        self.requires_legacy_build_tool
    }
}

/// Classifies the text of a project file.
pub fn analyze(text: &str) -> BuildTarget {
    let runtime = runtime_kind(text);
    trace!("runtime = {:?}", runtime);
    let architecture = architecture(text);
    trace!("architecture = {:?}", architecture);
    let has_license_resource = text.contains(LICENSE_RESOURCE);
    BuildTarget {
        path: PathBuf::new(),
        runtime,
        architecture,
        has_license_resource,
        requires_legacy_build_tool: runtime == RuntimeKind::Legacy || has_license_resource,
    }
}

fn runtime_kind(text: &str) -> RuntimeKind {
    // The desktop SDK marker wins over every legacy signal.
    if text.contains(DESKTOP_SDK_MARKER) {
        RuntimeKind::Modern
    } else if text.contains(LEGACY_VERSION_TAG)
        || LEGACY_FRAMEWORK.is_match(text)
        || text.contains(LEGACY_NAMESPACE)
    {
        RuntimeKind::Legacy
    } else {
        RuntimeKind::Modern
    }
}

fn architecture(text: &str) -> String {
    RELEASE_PLATFORM
        .captures(text)
        .map(|c| c[1].trim().to_owned())
        .or_else(|| {
            DEFAULT_PLATFORM
                .captures(text)
                .map(|c| c[1].trim().to_owned())
                .filter(|p| !p.contains(UNRESOLVED_PROPERTY))
        })
        .or_else(|| ANY_PLATFORM.captures(text).map(|c| c[1].trim().to_owned()))
        .map(normalize_architecture)
        .unwrap_or_else(|| String::from(DEFAULT_ARCHITECTURE))
}

/// MSBuild accepts `Any CPU` for solutions and project platforms, but not
/// `AnyCPU`, so the spelling is always rewritten.
fn normalize_architecture(platform: String) -> String {
    if platform.eq_ignore_ascii_case("AnyCPU") {
        String::from(DEFAULT_ARCHITECTURE)
    } else {
        platform
    }
}
