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

//! # Toolset Module
//!
//! Finds the packaging toolchain installed on the machine. Three installer
//! technologies are probed in priority order, the WiX Toolset, Inno Setup,
//! and 7-Zip with a self-extraction module, and a plain zip archive is the
//! fallback when none of them is present.
//!
//! All probing goes through the [`Locator`] trait. The [`SystemLocator`]
//! looks at the real file system and asks `dotnet` for its global tools; the
//! [`StaticLocator`] answers from a fixed set of paths so the selection can be
//! exercised on any machine.

pub mod wix;

pub use wix::{ToolsetAction, ToolsetCommand, WixToolset};

use crate::BuildLog;
use crate::StoredPath;
use crate::DOTNET;

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// The WiX Toolset v3 `bin` folders, in probe order.
pub const WIX_BIN_FOLDERS: [&str; 4] = [
    "C:\\Program Files (x86)\\WiX Toolset v3.11\\bin",
    "C:\\Program Files (x86)\\WiX Toolset v3.14\\bin",
    "C:\\Program Files\\WiX Toolset v3.11\\bin",
    "C:\\Program Files\\WiX Toolset v3.14\\bin",
];

/// The Inno Setup folders, in probe order.
pub const INNO_SETUP_FOLDERS: [&str; 4] = [
    "C:\\Program Files (x86)\\Inno Setup 6",
    "C:\\Program Files\\Inno Setup 6",
    "C:\\Program Files (x86)\\Inno Setup 5",
    "C:\\Program Files\\Inno Setup 5",
];

/// The 7-Zip folders, in probe order.
pub const SEVEN_ZIP_FOLDERS: [&str; 2] = ["C:\\Program Files\\7-Zip", "C:\\Program Files (x86)\\7-Zip"];

/// The self-extraction modules shipped with 7-Zip, in order of preference.
/// `7zSD.sfx` is the installer flavour that honours `RunProgram`.
pub const SFX_MODULES: [&str; 2] = ["7zSD.sfx", "7z.sfx"];

pub const INNO_SETUP_COMPILER: &str = "ISCC.exe";
pub const SEVEN_ZIP: &str = "7z.exe";

/// The download page shown when no installer compiler is present.
pub const INNO_SETUP_DOWNLOAD_URL: &str = "https://jrsoftware.org/isdl.php";

/// The capability to look for installed tools.
pub trait Locator: fmt::Debug + Send + Sync {
    /// Returns true if `path` is an existing file.
    fn is_file(&self, path: &Path) -> bool;

    /// The output of `dotnet tool list -g`, or `None` if it could not be
    /// obtained.
    fn global_tools(&self) -> Option<String>;
}

/// Looks for tools on the real machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLocator;

impl Locator for SystemLocator {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn global_tools(&self) -> Option<String> {
        let mut command = Command::new(DOTNET);
        command
            .args(["tool", "list", "-g"])
            .stdin(Stdio::null())
            .stderr(Stdio::null());
        debug!("command = {:?}", command);
        match command.output() {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                trace!("'{} tool list -g' exited with {:?}", DOTNET, output.status.code());
                None
            }
            Err(err) => {
                trace!("'{} tool list -g' could not be started: {}", DOTNET, err);
                None
            }
        }
    }
}

/// Answers from a fixed set of files and a fixed global tool listing.
#[derive(Debug, Clone, Default)]
pub struct StaticLocator {
    files: HashSet<PathBuf>,
    global_tools: Option<String>,
}

impl StaticLocator {
    /// A locator that finds nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file that "exists".
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.files.insert(path.into());
        self
    }

    /// Sets the `dotnet tool list -g` output.
    pub fn with_global_tools<S: Into<String>>(mut self, listing: S) -> Self {
        self.global_tools = Some(listing.into());
        self
    }
}

impl Locator for StaticLocator {
    fn is_file(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    fn global_tools(&self) -> Option<String> {
        self.global_tools.clone()
    }
}

/// The packaging toolchain used for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toolchain {
    /// An MSI built with the WiX Toolset.
    Wix(WixToolset),
    /// A setup executable built by the Inno Setup compiler.
    InnoSetup { compiler: PathBuf },
    /// A self-extracting 7-Zip archive.
    SevenZipSfx { archiver: PathBuf, module: PathBuf },
    /// A plain zip archive, always available.
    Zip,
}

impl Toolchain {
    pub fn as_str(&self) -> &str {
        match *self {
            Toolchain::Wix(..) => "WiX Toolset",
            Toolchain::InnoSetup { .. } => "Inno Setup",
            Toolchain::SevenZipSfx { .. } => "7-Zip SFX",
            Toolchain::Zip => "Zip",
        }
    }

    /// The file extension of the produced installer.
    pub fn extension(&self) -> &str {
        match *self {
            Toolchain::Wix(..) => crate::MSI_FILE_EXTENSION,
            Toolchain::InnoSetup { .. } | Toolchain::SevenZipSfx { .. } => crate::EXE_FILE_EXTENSION,
            Toolchain::Zip => crate::ZIP_FILE_EXTENSION,
        }
    }

    /// The file name of the installer for a product and version.
    pub fn installer_file_name(&self, product_name: &str, version: &str) -> String {
        match *self {
            Toolchain::Zip => crate::portable_file_name(product_name, version),
            _ => crate::installer_file_name(product_name, version, self.extension()),
        }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds a Windows path from a folder and a file name.
pub(crate) fn windows_path(folder: &str, name: &str) -> PathBuf {
    PathBuf::from(StoredPath::new(folder).join(name).as_str())
}

/// Finds the WiX Toolset, preferring an installed v3 toolset over the
/// `wix` global tool.
pub fn find_wix(locator: &dyn Locator) -> Option<WixToolset> {
    WIX_BIN_FOLDERS
        .iter()
        .find(|folder| locator.is_file(&windows_path(folder, wix::WIX_COMPILER)))
        .map(|folder| WixToolset::Legacy {
            bin_path: PathBuf::from(*folder),
        })
        .or_else(|| {
            locator
                .global_tools()
                .filter(|listing| listing.contains(wix::WIX))
                .map(|_| WixToolset::Modern)
        })
}

/// Finds the Inno Setup command line compiler.
pub fn find_inno_setup(locator: &dyn Locator) -> Option<PathBuf> {
    INNO_SETUP_FOLDERS
        .iter()
        .map(|folder| windows_path(folder, INNO_SETUP_COMPILER))
        .find(|p| locator.is_file(p))
}

/// Finds the 7-Zip command line archiver and the folder it lives in.
pub fn find_seven_zip(locator: &dyn Locator) -> Option<(PathBuf, &'static str)> {
    SEVEN_ZIP_FOLDERS
        .iter()
        .map(|folder| (windows_path(folder, SEVEN_ZIP), *folder))
        .find(|(p, _)| locator.is_file(p))
}

/// Finds a self-extraction module in the 7-Zip folder.
pub fn find_sfx_module(locator: &dyn Locator, seven_zip_folder: &str) -> Option<PathBuf> {
    SFX_MODULES
        .iter()
        .map(|module| windows_path(seven_zip_folder, module))
        .find(|p| locator.is_file(p))
}

/// Probes for the toolchains in priority order and returns the first one
/// found. Never fails: the zip archive is always available.
pub fn select(locator: &dyn Locator, log: &BuildLog) -> Toolchain {
    info!("Selecting the packaging toolchain");
    if let Some(toolset) = find_wix(locator) {
        debug!("toolset = {:?}", toolset);
        log.append(format!("Creating an MSI installer with the WiX Toolset ({})", toolset));
        return Toolchain::Wix(toolset);
    }
    log.append("The WiX Toolset is not installed");
    if let Some(compiler) = find_inno_setup(locator) {
        debug!("compiler = {:?}", compiler);
        log.append(format!(
            "Creating a setup executable with Inno Setup ({})",
            compiler.display()
        ));
        return Toolchain::InnoSetup { compiler };
    }
    log.append(format!(
        "Inno Setup is not installed, see {}",
        INNO_SETUP_DOWNLOAD_URL
    ));
    match find_seven_zip(locator) {
        Some((archiver, folder)) => match find_sfx_module(locator, folder) {
            Some(module) => {
                debug!("archiver = {:?}", archiver);
                debug!("module = {:?}", module);
                log.append("Creating a self-extracting executable with 7-Zip");
                Toolchain::SevenZipSfx { archiver, module }
            }
            None => {
                warn!("No 7-Zip self-extraction module was found in '{}'", folder);
                log.append("No 7-Zip self-extraction module was found, creating a zip archive instead");
                Toolchain::Zip
            }
        },
        None => {
            log.append("7-Zip is not installed, creating a zip archive instead");
            Toolchain::Zip
        }
    }
}

/// The result of looking for one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub tool: &'static str,
    pub found: Option<String>,
}

/// Looks for every tool this crate can use, including MSBuild, without
/// selecting anything.
pub fn probe(locator: &dyn Locator) -> Vec<Probe> {
    let seven_zip = find_seven_zip(locator);
    vec![
        Probe {
            tool: "MSBuild",
            found: crate::dispatch::find_msbuild(locator).map(|p| p.display().to_string()),
        },
        Probe {
            tool: "WiX Toolset",
            found: find_wix(locator).map(|t| t.to_string()),
        },
        Probe {
            tool: "Inno Setup",
            found: find_inno_setup(locator).map(|p| p.display().to_string()),
        },
        Probe {
            tool: "7-Zip",
            found: seven_zip.as_ref().map(|(p, _)| p.display().to_string()),
        },
        Probe {
            tool: "7-Zip SFX module",
            found: seven_zip
                .and_then(|(_, folder)| find_sfx_module(locator, folder))
                .map(|p| p.display().to_string()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANDLE_V314: &str = "C:\\Program Files (x86)\\WiX Toolset v3.14\\bin\\candle.exe";
    const ISCC_V5: &str = "C:\\Program Files\\Inno Setup 5\\ISCC.exe";
    const ISCC_V6: &str = "C:\\Program Files (x86)\\Inno Setup 6\\ISCC.exe";
    const SEVEN_ZIP_X86: &str = "C:\\Program Files (x86)\\7-Zip\\7z.exe";
    const SFX_X86: &str = "C:\\Program Files (x86)\\7-Zip\\7z.sfx";

    #[test]
    fn nothing_installed_selects_zip() {
        let log = BuildLog::new();
        assert_eq!(select(&StaticLocator::new(), &log), Toolchain::Zip);
        assert!(log.contains("7-Zip is not installed"));
    }

    #[test]
    fn legacy_wix_wins_over_everything() {
        let locator = StaticLocator::new()
            .with_file(CANDLE_V314)
            .with_file(ISCC_V6)
            .with_global_tools("Package Id      Version      Commands\nwix             4.0.4        wix");
        assert_eq!(
            select(&locator, &BuildLog::new()),
            Toolchain::Wix(WixToolset::Legacy {
                bin_path: PathBuf::from("C:\\Program Files (x86)\\WiX Toolset v3.14\\bin")
            })
        );
    }

    #[test]
    fn global_wix_tool_is_modern() {
        let locator = StaticLocator::new()
            .with_file(ISCC_V6)
            .with_global_tools("Package Id      Version      Commands\nwix             4.0.4        wix");
        assert_eq!(
            select(&locator, &BuildLog::new()),
            Toolchain::Wix(WixToolset::Modern)
        );
    }

    #[test]
    fn global_tools_without_wix_is_ignored() {
        let locator = StaticLocator::new()
            .with_file(ISCC_V5)
            .with_global_tools("Package Id      Version      Commands\ndotnet-ef       8.0.0        dotnet-ef");
        assert_eq!(
            select(&locator, &BuildLog::new()),
            Toolchain::InnoSetup {
                compiler: PathBuf::from(ISCC_V5)
            }
        );
    }

    #[test]
    fn inno_setup_6_is_preferred() {
        let locator = StaticLocator::new().with_file(ISCC_V5).with_file(ISCC_V6);
        assert_eq!(find_inno_setup(&locator), Some(PathBuf::from(ISCC_V6)));
    }

    #[test]
    fn seven_zip_with_module_selects_sfx() {
        let locator = StaticLocator::new().with_file(SEVEN_ZIP_X86).with_file(SFX_X86);
        assert_eq!(
            select(&locator, &BuildLog::new()),
            Toolchain::SevenZipSfx {
                archiver: PathBuf::from(SEVEN_ZIP_X86),
                module: PathBuf::from(SFX_X86),
            }
        );
    }

    #[test]
    fn installer_module_is_preferred() {
        let locator = StaticLocator::new()
            .with_file("C:\\Program Files\\7-Zip\\7z.exe")
            .with_file("C:\\Program Files\\7-Zip\\7z.sfx")
            .with_file("C:\\Program Files\\7-Zip\\7zSD.sfx");
        assert_eq!(
            find_sfx_module(&locator, SEVEN_ZIP_FOLDERS[0]),
            Some(PathBuf::from("C:\\Program Files\\7-Zip\\7zSD.sfx"))
        );
    }

    #[test]
    fn seven_zip_without_module_selects_zip() {
        let log = BuildLog::new();
        let locator = StaticLocator::new().with_file(SEVEN_ZIP_X86);
        assert_eq!(select(&locator, &log), Toolchain::Zip);
        assert!(log.contains("No 7-Zip self-extraction module"));
    }

    #[test]
    fn installer_file_names_work() {
        assert_eq!(
            Toolchain::Wix(WixToolset::Modern).installer_file_name("App", "1.0.0.0"),
            "App_1.0.0.0_Setup.msi"
        );
        assert_eq!(
            Toolchain::InnoSetup {
                compiler: PathBuf::from(ISCC_V6)
            }
            .installer_file_name("App", "1.0.0.0"),
            "App_1.0.0.0_Setup.exe"
        );
        assert_eq!(
            Toolchain::Zip.installer_file_name("App", "1.0.0.0"),
            "App_1.0.0.0_Portable.zip"
        );
    }

    #[test]
    fn probe_reports_every_tool() {
        let locator = StaticLocator::new().with_file(ISCC_V6);
        let probes = probe(&locator);
        assert_eq!(probes.len(), 5);
        assert_eq!(probes[2].found, Some(String::from(ISCC_V6)));
        assert!(probes.iter().filter(|p| p.tool != "Inno Setup").all(|p| p.found.is_none()));
    }
}
