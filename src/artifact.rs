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

//! Finding the Release build output of a project.

use crate::BuildLog;
use crate::Error;
use crate::Result;
use crate::EXE_FILE_EXTENSION;
use crate::RELEASE_FOLDER;

use std::fs;
use std::path::{Path, PathBuf};

/// Gets the folder with the Release build output for the project in
/// `project_dir`.
///
/// SDK-style projects put their output in a framework moniker subfolder,
/// e.g. `bin\Release\net8.0-windows`. When there are several, the last one in
/// descending lexicographic order wins, so `net8.0` beats `net6.0` but
/// `net48` also beats `net10.0`. Old-style projects put the executable
/// directly in `bin\Release`.
pub fn locate(project_dir: &Path, log: &BuildLog) -> Result<PathBuf> {
    let release: PathBuf = RELEASE_FOLDER
        .iter()
        .fold(project_dir.to_owned(), |p, f| p.join(f));
    debug!("release = {:?}", release);
    if !release.is_dir() {
        return Err(Error::Build(format!(
            "The Release build output folder could not be found: {}",
            release.display()
        )));
    }
    let mut subfolders = Vec::new();
    for entry in fs::read_dir(&release)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subfolders.push(entry.path());
        }
    }
    subfolders.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    trace!("subfolders = {:?}", subfolders);
    if let Some(output) = subfolders.into_iter().next() {
        log.append(format!("Build output: {}", output.display()));
        return Ok(output);
    }
    let mut has_executable = false;
    for entry in fs::read_dir(&release)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .map(|e| e.eq_ignore_ascii_case(EXE_FILE_EXTENSION))
                .unwrap_or(false)
        {
            has_executable = true;
            break;
        }
    }
    if has_executable {
        log.append(format!("Build output (.NET Framework): {}", release.display()));
        Ok(release)
    } else {
        Err(Error::Build(format!(
            "No build output found: {}",
            release.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    #[test]
    fn missing_release_folder_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(
            locate(temp_dir.path(), &BuildLog::new()).unwrap_err(),
            Error::Build(String::new())
        );
    }

    #[test]
    fn descending_moniker_is_picked() {
        let temp_dir = TempDir::new().unwrap();
        temp_dir.child("bin/Release/net6.0/App.exe").touch().unwrap();
        temp_dir.child("bin/Release/net8.0-windows/App.exe").touch().unwrap();
        temp_dir.child("bin/Release/net48/App.exe").touch().unwrap();
        let output = locate(temp_dir.path(), &BuildLog::new()).unwrap();
        assert_eq!(output, temp_dir.path().join("bin").join("Release").join("net8.0-windows"));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let temp_dir = TempDir::new().unwrap();
        temp_dir.child("bin/Release/net10.0/App.exe").touch().unwrap();
        temp_dir.child("bin/Release/net9.0/App.exe").touch().unwrap();
        let output = locate(temp_dir.path(), &BuildLog::new()).unwrap();
        assert!(output.ends_with("net9.0"));
    }

    #[test]
    fn release_folder_with_executable_is_used() {
        let temp_dir = TempDir::new().unwrap();
        temp_dir.child("bin/Release/Legacy.exe").touch().unwrap();
        temp_dir.child("bin/Release/Legacy.exe.config").touch().unwrap();
        let log = BuildLog::new();
        let output = locate(temp_dir.path(), &log).unwrap();
        assert_eq!(output, temp_dir.path().join("bin").join("Release"));
        assert!(log.contains(".NET Framework"));
    }

    #[test]
    fn release_folder_without_executable_fails() {
        let temp_dir = TempDir::new().unwrap();
        temp_dir.child("bin/Release/readme.txt").touch().unwrap();
        assert_eq!(
            locate(temp_dir.path(), &BuildLog::new()).unwrap_err(),
            Error::Build(String::new())
        );
    }
}
