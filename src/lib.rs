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

//! # `installer` Library
//!
//! Library for packaging a locally built .NET application into a Windows
//! installer. The `installer-builder` binary is a thin command line surface
//! over this library; a graphical front end can drive the same pipeline
//! through the [`pipeline::Builder`] and a [`BuildLog`] listener.
//!
//! ## Organization
//!
//! Each stage of the packaging pipeline lives in its own module, leaf-first:
//!
//! - [`descriptor`] sniffs a project file (`.csproj`) and classifies the
//!   runtime and CPU architecture.
//! - [`dispatch`] chooses between MSBuild and `dotnet build` and runs it.
//! - [`artifact`] finds the Release output folder.
//! - [`stage`] copies the output and the curated library and additional files
//!   into a temporary staging tree.
//! - [`toolset`] probes the machine for WiX, Inno Setup, and 7-Zip.
//! - [`script`] renders the installer definition for the selected toolchain.
//! - [`package`] runs the toolchain and writes the final installer.
//! - [`process`] runs external programs and streams their output into the
//!   [`BuildLog`].
//!
//! The [`pipeline`] module strings these together for a single run.

#[macro_use]
extern crate log;

pub mod artifact;
pub mod build_log;
pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod package;
pub mod pipeline;
pub mod process;
pub mod script;
pub mod stage;
mod stored_path;
mod templates;
pub mod toolset;

pub use build_log::BuildLog;
pub use stored_path::{StoredPath, StoredPathBuf};
pub use templates::Template;

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::Path;

/// The name of the staging subfolder that receives the curated library files.
pub const DLL_FOLDER_NAME: &str = "DllFiles";

/// The name of the staging subfolder that receives the curated additional
/// (config, text, json) files.
pub const ADDITIONAL_FOLDER_NAME: &str = "AdditionalFiles";

/// The placeholder token for the installation root in destination paths.
pub const INSTALL_DIR_TOKEN: &str = "[INSTALLDIR]";

/// The Inno Setup constant for the installation root.
pub const INNO_APP_DIR: &str = "{app}";

/// The file name of the generated desktop shortcut batch script.
pub const SHORTCUT_SCRIPT_NAME: &str = "CreateDesktopShortcut.bat";

/// The folder, relative to the project file, with the Release build output.
pub const RELEASE_FOLDER: [&str; 2] = ["bin", "Release"];

pub const EXE_FILE_EXTENSION: &str = "exe";
pub const MSI_FILE_EXTENSION: &str = "msi";
pub const ZIP_FILE_EXTENSION: &str = "zip";
pub const SEVEN_ZIP_FILE_EXTENSION: &str = "7z";
pub const INNO_SCRIPT_FILE_EXTENSION: &str = "iss";
pub const WIX_SOURCE_FILE_EXTENSION: &str = "wxs";
pub const WIX_OBJECT_FILE_EXTENSION: &str = "wixobj";

/// The suffix of an installer file name, i.e. `<Project>_<Version>_Setup`.
pub const SETUP_SUFFIX: &str = "Setup";

/// The suffix of a portable archive name, i.e. `<Project>_<Version>_Portable`.
pub const PORTABLE_SUFFIX: &str = "Portable";

/// The suffix of the copy of a failed Inno Setup script, i.e.
/// `<Project>_setup_debug.iss`, written next to the installer.
pub const DEBUG_SCRIPT_SUFFIX: &str = "_setup_debug.iss";

/// The suffix of the staging directory prefix, i.e. `<Project>_Installer_`.
pub const STAGING_DIR_SUFFIX: &str = "_Installer_";

/// The name of the optional settings file looked up beside the project file.
pub const SETTINGS_FILE_NAME: &str = "installer-builder.json";

/// The default version used when none is given.
pub const DEFAULT_VERSION: &str = "1.0.0.0";

/// The default publisher (manufacturer) used when none is given.
pub const DEFAULT_PUBLISHER: &str = "GreenPower";

/// The program used for modern .NET builds and global tool listings.
pub const DOTNET: &str = "dotnet";

/// Gets the product name for a project file, i.e. its file stem.
///
/// # Examples
///
/// ```rust
/// use std::path::Path;
///
/// assert_eq!(
///     installer::product_name(Path::new("C:\\src\\App\\App.csproj")).unwrap(),
///     "App"
/// );
/// ```
pub fn product_name(descriptor: &Path) -> Result<String> {
    StoredPath::new(&descriptor.to_string_lossy())
        .file_stem()
        .map(String::from)
        .ok_or_else(|| {
            Error::Input(format!(
                "The '{}' project path does not have a file name",
                descriptor.display()
            ))
        })
}

/// Gets the name of the application's main executable.
pub fn exe_name(product_name: &str) -> String {
    format!("{}.{}", product_name, EXE_FILE_EXTENSION)
}

/// Gets the file name of an installer, e.g. `App_1.0.0.0_Setup.exe`.
pub fn installer_file_name(product_name: &str, version: &str, extension: &str) -> String {
    format!("{}_{}_{}.{}", product_name, version, SETUP_SUFFIX, extension)
}

/// Gets the file name of the portable archive, e.g. `App_1.0.0.0_Portable.zip`.
pub fn portable_file_name(product_name: &str, version: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        product_name, version, PORTABLE_SUFFIX, ZIP_FILE_EXTENSION
    )
}

/// The error type for installer-related operations and associated problems.
#[derive(Debug)]
pub enum Error {
    /// The Release build of the project failed or produced no output.
    Build(String),
    /// An external program exited with a non-zero exit code.
    Command {
        /// The program and arguments, as logged.
        command: String,
        /// The exit code, or 100 if the program was terminated by a signal.
        code: i32,
        /// Everything the program wrote to stdout.
        stdout: String,
        /// Everything the program wrote to stderr.
        stderr: String,
    },
    /// A settings file could not be interpreted.
    Config(String),
    /// A generic or custom error occurred. The message should contain the
    /// detailed information.
    Generic(String),
    /// A path or value supplied by the user is missing or invalid. Nothing has
    /// been started when this is returned.
    Input(String),
    /// An I/O operation failed.
    Io(io::Error),
    /// A settings file is not valid JSON.
    Json(serde_json::Error),
    /// An error occurred with rendering a template using the mustache
    /// renderer.
    Mustache(mustache::Error),
    /// Copying files into the staging tree failed.
    Staging(String),
    /// Walking a directory tree failed.
    WalkDir(walkdir::Error),
    /// Writing the portable archive failed.
    Zip(zip::result::ZipError),
}

impl Error {
    /// Gets an error code related to the error.
    ///
    /// This is useful as a return, or exit, code for a command line
    /// application, where a non-zero integer indicates a failure in the
    /// application. It can also be used for quickly and easily testing
    /// equality between two errors.
    pub fn code(&self) -> i32 {
        match *self {
            Error::Build(..) => 1,
            Error::Command { .. } => 2,
            Error::Config(..) => 3,
            Error::Generic(..) => 4,
            Error::Input(..) => 5,
            Error::Io(..) => 6,
            Error::Json(..) => 7,
            Error::Mustache(..) => 8,
            Error::Staging(..) => 9,
            Error::WalkDir(..) => 10,
            Error::Zip(..) => 11,
        }
    }

    /// Converts the error to a string that can be used as a tag in the
    /// console output.
    pub fn as_str(&self) -> &str {
        match *self {
            Error::Build(..) => "Build",
            Error::Command { .. } => "Command",
            Error::Config(..) => "Config",
            Error::Generic(..) => "Generic",
            Error::Input(..) => "Input",
            Error::Io(..) => "Io",
            Error::Json(..) => "Json",
            Error::Mustache(..) => "Mustache",
            Error::Staging(..) => "Staging",
            Error::WalkDir(..) => "WalkDir",
            Error::Zip(..) => "Zip",
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Json(ref err) => Some(err),
            Error::Mustache(ref err) => Some(err),
            Error::WalkDir(ref err) => Some(err),
            Error::Zip(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Build(ref msg) => write!(f, "{}", msg),
            Error::Command {
                ref command,
                code,
                ref stdout,
                ref stderr,
            } => write!(
                f,
                "The command failed with exit code {}\nCommand: {}\nStandard output:\n{}\nStandard error:\n{}",
                code, command, stdout, stderr
            ),
            Error::Config(ref msg) => write!(f, "{}", msg),
            Error::Generic(ref msg) => write!(f, "{}", msg),
            Error::Input(ref msg) => write!(f, "{}", msg),
            Error::Io(ref err) => write!(f, "{}", err),
            Error::Json(ref err) => write!(f, "{}", err),
            Error::Mustache(ref err) => write!(f, "{}", err),
            Error::Staging(ref msg) => write!(f, "{}", msg),
            Error::WalkDir(ref err) => write!(f, "{}", err),
            Error::Zip(ref err) => write!(f, "{}", err),
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Error) -> bool {
        self.code() == other.code()
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

impl From<mustache::Error> for Error {
    fn from(err: mustache::Error) -> Error {
        Error::Mustache(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Error {
        Error::Zip(err)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Generic(s.to_string())
    }
}

/// A specialized `Result` type for installer operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_name_strips_extension() {
        assert_eq!(
            product_name(Path::new("C:\\work\\Demo\\Demo.csproj")).unwrap(),
            "Demo"
        );
    }

    #[test]
    fn product_name_with_unix_path_works() {
        assert_eq!(product_name(Path::new("/src/My.App.csproj")).unwrap(), "My.App");
    }

    #[test]
    fn exe_name_works() {
        assert_eq!(exe_name("Demo"), "Demo.exe");
    }

    #[test]
    fn product_name_without_file_name_fails() {
        assert_eq!(
            product_name(Path::new("")).unwrap_err(),
            Error::Input(String::new())
        );
    }

    #[test]
    fn installer_file_name_works() {
        assert_eq!(
            installer_file_name("Demo", "1.2.3", MSI_FILE_EXTENSION),
            "Demo_1.2.3_Setup.msi"
        );
    }

    #[test]
    fn portable_file_name_works() {
        assert_eq!(portable_file_name("Demo", "1.2.3"), "Demo_1.2.3_Portable.zip");
    }

    #[test]
    fn command_error_display_includes_streams() {
        let err = Error::Command {
            command: String::from("ISCC.exe setup.iss"),
            code: 2,
            stdout: String::from("compiling"),
            stderr: String::from("line 4: unknown directive"),
        };
        let message = err.to_string();
        assert!(message.contains("exit code 2"));
        assert!(message.contains("ISCC.exe setup.iss"));
        assert!(message.contains("compiling"));
        assert!(message.contains("unknown directive"));
    }
}
