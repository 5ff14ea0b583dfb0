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

//! Building the project in the Release configuration.
//!
//! .NET Framework projects, and any project with a `licenses.licx` resource,
//! need MSBuild from a Visual Studio installation. Everything else builds
//! with `dotnet build`. When MSBuild is needed but cannot be found, the
//! build falls back to `dotnet build` with a warning, which works for some
//! SDK-style .NET Framework projects and fails loudly for the rest.

use crate::descriptor::{BuildTarget, RuntimeKind};
use crate::process;
use crate::toolset::{windows_path, Locator};
use crate::BuildLog;
use crate::Error;
use crate::Result;
use crate::DOTNET;

use encoding_rs::Encoding;

use std::path::{Path, PathBuf};
use std::process::Command;

pub const MSBUILD: &str = "MSBuild.exe";

const VISUAL_STUDIO_VERSIONS: [&str; 2] = ["2022", "2019"];
const PROGRAM_FILES: [&str; 2] = ["C:\\Program Files", "C:\\Program Files (x86)"];
const VISUAL_STUDIO_EDITIONS: [&str; 3] = ["Community", "Professional", "Enterprise"];

/// The MSBuild locations, in search order: newest Visual Studio first, then
/// 64-bit Program Files, then the cheapest edition.
pub fn msbuild_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for version in VISUAL_STUDIO_VERSIONS {
        for program_files in PROGRAM_FILES {
            for edition in VISUAL_STUDIO_EDITIONS {
                candidates.push(windows_path(
                    &format!(
                        "{}\\Microsoft Visual Studio\\{}\\{}\\MSBuild\\Current\\Bin",
                        program_files, version, edition
                    ),
                    MSBUILD,
                ));
            }
        }
    }
    candidates
}

/// Finds the first installed MSBuild.
pub fn find_msbuild(locator: &dyn Locator) -> Option<PathBuf> {
    msbuild_candidates().into_iter().find(|p| locator.is_file(p))
}

/// Creates the MSBuild command for a Release rebuild of a project.
pub fn msbuild_command(msbuild: &Path, project: &Path, architecture: &str) -> Command {
    let mut command = Command::new(msbuild);
    command
        .arg(project)
        .arg("/restore")
        .arg("/p:Configuration=Release");
    if !architecture.is_empty() {
        platform_arg(&mut command, architecture);
    }
    command.arg("/v:normal").arg("/t:Rebuild");
    command
}

#[cfg(windows)]
fn platform_arg(command: &mut Command, architecture: &str) {
    use std::os::windows::process::CommandExt;
    if architecture.contains(char::is_whitespace) {
        command.raw_arg(format!("/p:Platform=\"{}\"", architecture));
    } else {
        command.arg(format!("/p:Platform={}", architecture));
    }
}

#[cfg(not(windows))]
fn platform_arg(command: &mut Command, architecture: &str) {
    if architecture.contains(char::is_whitespace) {
        command.arg(format!("/p:Platform=\"{}\"", architecture));
    } else {
        command.arg(format!("/p:Platform={}", architecture));
    }
}

/// The `dotnet build` command line for a Release build of a project.
pub fn dotnet_build_line(project: &Path) -> String {
    format!("{} build \"{}\" -c Release", DOTNET, project.display())
}

/// Builds the project, streaming the build output into the log.
pub fn build(
    target: &BuildTarget,
    locator: &dyn Locator,
    log: &BuildLog,
    encoding: &'static Encoding,
) -> Result<()> {
    let project = target.path();
    info!("Building the Release configuration");
    log.append(format!(
        "Building project: {}",
        project.file_name().unwrap_or_default().to_string_lossy()
    ));
    if !target.requires_legacy_build_tool() {
        log.append(".NET Core/5+ project, building with dotnet build");
        return dotnet_build(project, log, encoding);
    }
    if target.runtime() == RuntimeKind::Legacy {
        log.append(".NET Framework project detected, MSBuild is required");
    }
    if target.has_license_resource() {
        log.append("licenses.licx detected, MSBuild is required for the license compiler");
    }
    match find_msbuild(locator) {
        Some(msbuild) => {
            debug!("msbuild = {:?}", msbuild);
            log.append(format!("MSBuild path: {}", msbuild.display()));
            log.append(format!(
                "Starting the MSBuild build (platform: {})",
                target.architecture()
            ));
            let command = msbuild_command(&msbuild, project, target.architecture());
            process::run(command, log, encoding)
                .map(|_| ())
                .map_err(build_failure)
        }
        None => {
            warn!("MSBuild was not found, falling back to 'dotnet build'");
            log.append("Warning: MSBuild was not found");
            log.append("Trying dotnet build, which may fail for .NET Framework projects");
            dotnet_build(project, log, encoding)
        }
    }
}

fn dotnet_build(project: &Path, log: &BuildLog, encoding: &'static Encoding) -> Result<()> {
    let line = dotnet_build_line(project);
    debug!("line = {:?}", line);
    process::run_via_shell(&line, log, encoding)
        .map(|_| ())
        .map_err(build_failure)
}

fn build_failure(err: Error) -> Error {
    match err {
        e @ Error::Command { .. } => Error::Build(format!("The Release build failed. {}", e)),
        e => e,
    }
}
