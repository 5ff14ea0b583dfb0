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

//! Commands for the legacy (v3) and modern (global tool) WiX Toolsets.

use crate::process::{self, Captured};
use crate::BuildLog;
use crate::Error;
use crate::Result;

use encoding_rs::Encoding;

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::process::Command;

/// The WiX v3 compiler.
pub const WIX_COMPILER: &str = "candle.exe";

/// The WiX v3 linker.
pub const WIX_LINKER: &str = "light.exe";

/// The WiX v4+ global tool.
pub const WIX: &str = "wix";

/// The WiX UI extension linked into every legacy installer.
pub const WIX_UI_EXTENSION: &str = "WixUIExtension";

/// The flavour of WiX Toolset found on the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WixToolset {
    /// WiX v3, which compiles with `candle.exe` and links with `light.exe`
    /// from its `bin` folder.
    Legacy { bin_path: PathBuf },
    /// The `wix` global tool, which builds in one step.
    Modern,
}

impl WixToolset {
    /// Returns true if the toolset in use is modern
    pub fn is_modern(&self) -> bool {
        matches!(self, WixToolset::Modern)
    }

    /// Returns a new ToolsetCommand for `candle.exe`
    pub fn compiler(&self) -> Result<ToolsetCommand> {
        match self {
            WixToolset::Legacy { bin_path } => Ok(ToolsetCommand::new(
                Command::new(super::windows_path(&bin_path.to_string_lossy(), WIX_COMPILER)),
                ToolsetAction::Compile,
            )),
            WixToolset::Modern => Err("Cannot use legacy wix commands with modern toolset".into()),
        }
    }

    /// Returns a new ToolsetCommand for `light.exe`
    pub fn linker(&self) -> Result<ToolsetCommand> {
        match self {
            WixToolset::Legacy { bin_path } => Ok(ToolsetCommand::new(
                Command::new(super::windows_path(&bin_path.to_string_lossy(), WIX_LINKER)),
                ToolsetAction::Link,
            )),
            WixToolset::Modern => Err("Cannot use legacy wix commands with modern toolset".into()),
        }
    }

    /// Returns a new ToolsetCommand for `wix build`
    pub fn builder(&self) -> Result<ToolsetCommand> {
        if self.is_modern() {
            let mut command = Command::new(WIX);
            command.arg("build");
            Ok(ToolsetCommand::new(command, ToolsetAction::Build))
        } else {
            Err("Cannot use modern wix commands with legacy toolset".into())
        }
    }

    /// Returns the ordered commands that turn a WiX Source file into an
    /// MSI. The object file is only used by the legacy toolset.
    pub fn commands(&self, wxs: &Path, wixobj: &Path, msi: &Path) -> Result<Vec<ToolsetCommand>> {
        if self.is_modern() {
            let mut builder = self.builder()?;
            builder.arg(wxs).arg("-o").arg(msi);
            Ok(vec![builder])
        } else {
            let mut compiler = self.compiler()?;
            compiler.arg(wxs).arg("-out").arg(wixobj);
            let mut linker = self.linker()?;
            linker
                .arg(wixobj)
                .arg("-out")
                .arg(msi)
                .arg("-ext")
                .arg(WIX_UI_EXTENSION)
                .arg("-sval");
            Ok(vec![compiler, linker])
        }
    }
}

impl fmt::Display for WixToolset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WixToolset::Legacy { bin_path } => write!(f, "v3, {}", bin_path.display()),
            WixToolset::Modern => write!(f, "{} global tool", WIX),
        }
    }
}

/// Enumeration of toolset actions used by this module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolsetAction {
    /// `candle`
    Compile,
    /// `light`
    Link,
    /// `wix build`
    Build,
}

impl ToolsetAction {
    fn failure(&self) -> &str {
        match *self {
            ToolsetAction::Compile => "(candle.exe) Could not compile the wxs file",
            ToolsetAction::Link => "(light.exe) Could not link the installer",
            ToolsetAction::Build => "(wix.exe) Could not build the installer",
        }
    }
}

/// Wrapper over std::process::Command
///
/// Keeps the toolset action next to the command so failures say which step
/// went wrong.
#[derive(Debug)]
pub struct ToolsetCommand {
    inner: Command,
    action: ToolsetAction,
}

impl ToolsetCommand {
    fn new(inner: Command, action: ToolsetAction) -> Self {
        ToolsetCommand { inner, action }
    }

    pub fn action(&self) -> ToolsetAction {
        self.action
    }

    /// Consumes this reference and returns the inner std::process::Command and configured toolset action
    pub fn split_into_std(self) -> (Command, ToolsetAction) {
        (self.inner, self.action)
    }

    /// Runs the command, streaming its output into the log.
    pub fn run(self, log: &BuildLog, encoding: &'static Encoding) -> Result<Captured> {
        debug!("command.action={:?}", self.action);
        let action = self.action;
        process::run(self.inner, log, encoding).map_err(|err| {
            if let Error::Command { .. } = err {
                log.append(action.failure());
            }
            err
        })
    }
}

impl Deref for ToolsetCommand {
    type Target = Command;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ToolsetCommand {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
