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

//! Running the selected toolchain on a rendered script.
//!
//! Intermediate files (the WiX Source and object, the 7-Zip archive and the
//! self-extractor configuration) live in a temporary folder that is removed
//! when packaging ends, whatever the outcome. The Inno Setup script is kept in
//! the temporary area for inspection unless it is asked to be cleaned, and a
//! copy is put next to the installer when the compiler fails.

use crate::process;
use crate::script::{InstallerRequest, Script};
use crate::toolset::{Toolchain, WixToolset};
use crate::BuildLog;
use crate::Error;
use crate::Result;
use crate::DEBUG_SCRIPT_SUFFIX;
use crate::INNO_SCRIPT_FILE_EXTENSION;
use crate::SEVEN_ZIP_FILE_EXTENSION;
use crate::SHORTCUT_SCRIPT_NAME;
use crate::WIX_OBJECT_FILE_EXTENSION;
use crate::WIX_SOURCE_FILE_EXTENSION;

use encoding_rs::Encoding;
use tempfile::TempDir;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

/// The byte order mark written at the start of an Inno Setup script, so the
/// compiler reads it as UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Runs `toolchain` on `script` and returns the path of the installer.
pub fn package(
    request: &InstallerRequest,
    toolchain: &Toolchain,
    script: &Script,
    clean_script: bool,
    log: &BuildLog,
    encoding: &'static Encoding,
) -> Result<PathBuf> {
    let installer = request
        .output_dir
        .join(toolchain.installer_file_name(&request.product_name, &request.version));
    debug!("installer = {:?}", installer);
    info!("Packaging with {}", toolchain);
    log.append(format!("Creating the installer with {}", toolchain));
    match (toolchain, script) {
        (Toolchain::Wix(toolset), Script::Wxs(source)) => {
            wix(request, toolset, source, &installer, log, encoding)?
        }
        (Toolchain::InnoSetup { compiler }, Script::Inno(text)) => {
            inno_setup(request, compiler, text, clean_script, log, encoding)?
        }
        (Toolchain::SevenZipSfx { archiver, module }, Script::Sfx { config, shortcut }) => {
            seven_zip_sfx(
                request, archiver, module, config, shortcut, &installer, log, encoding,
            )?
        }
        (Toolchain::Zip, Script::Zip { shortcut }) => zip_fallback(request, shortcut, &installer, log)?,
        (toolchain, _) => {
            return Err(Error::Generic(format!(
                "The rendered script does not belong to the {} toolchain",
                toolchain
            )))
        }
    }
    verify(&installer, log);
    Ok(installer)
}

fn scratch_dir(request: &InstallerRequest) -> Result<TempDir> {
    let dir = tempfile::Builder::new()
        .prefix(&format!("{}_package_", request.product_name))
        .tempdir()?;
    trace!("scratch = {:?}", dir.path());
    Ok(dir)
}

fn wix(
    request: &InstallerRequest,
    toolset: &WixToolset,
    source: &str,
    installer: &Path,
    log: &BuildLog,
    encoding: &'static Encoding,
) -> Result<()> {
    let scratch = scratch_dir(request)?;
    let wxs = scratch.path().join(format!(
        "{}.{}",
        request.product_name, WIX_SOURCE_FILE_EXTENSION
    ));
    let wixobj = scratch.path().join(format!(
        "{}.{}",
        request.product_name, WIX_OBJECT_FILE_EXTENSION
    ));
    fs::write(&wxs, source)?;
    log.append(format!("WiX Source created: {}", wxs.display()));
    if toolset.is_modern() {
        warn!("The WiX Source uses the v3 schema, which 'wix build' rejects unless converted");
    }
    for command in toolset.commands(&wxs, &wixobj, installer)? {
        command.run(log, encoding)?;
    }
    Ok(())
}

/// The path of the Inno Setup script in the temporary area.
pub fn inno_script_path(product_name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "{}_setup.{}",
        product_name, INNO_SCRIPT_FILE_EXTENSION
    ))
}

/// The path of the copy of a failed Inno Setup script.
pub fn debug_script_path(output_dir: &Path, product_name: &str) -> PathBuf {
    output_dir.join(format!("{}{}", product_name, DEBUG_SCRIPT_SUFFIX))
}

fn inno_setup(
    request: &InstallerRequest,
    compiler: &Path,
    text: &str,
    clean_script: bool,
    log: &BuildLog,
    encoding: &'static Encoding,
) -> Result<()> {
    let script = inno_script_path(&request.product_name);
    debug!("script = {:?}", script);
    let mut file = File::create(&script)?;
    file.write_all(UTF8_BOM)?;
    file.write_all(text.as_bytes())?;
    drop(file);
    log.append(format!("Inno Setup script created: {}", script.display()));
    log.append(format!("Inno Setup compiler: {}", compiler.display()));
    let mut command = Command::new(compiler);
    command.arg(&script);
    let result = process::run(command, log, encoding).map(|_| ());
    if let Err(ref err) = result {
        log.append(format!("Inno Setup failed: {}", err));
        let copy = debug_script_path(&request.output_dir, &request.product_name);
        match fs::copy(&script, &copy) {
            Ok(_) => log.append(format!("Script saved for debugging: {}", copy.display())),
            Err(e) => warn!("The script could not be saved to '{}': {}", copy.display(), e),
        }
    }
    if clean_script {
        trace!("Removing '{}'", script.display());
        if let Err(e) = fs::remove_file(&script) {
            warn!("The '{}' script could not be removed: {}", script.display(), e);
        }
    }
    result
}

#[allow(clippy::too_many_arguments)]
fn seven_zip_sfx(
    request: &InstallerRequest,
    archiver: &Path,
    module: &Path,
    config: &str,
    shortcut: &str,
    installer: &Path,
    log: &BuildLog,
    encoding: &'static Encoding,
) -> Result<()> {
    let scratch = scratch_dir(request)?;
    let archive = scratch.path().join(format!(
        "{}_temp.{}",
        request.product_name, SEVEN_ZIP_FILE_EXTENSION
    ));
    let batch = scratch.path().join(SHORTCUT_SCRIPT_NAME);
    fs::write(&batch, shortcut)?;
    let config_path = scratch.path().join(format!("{}_config.txt", request.product_name));
    fs::write(&config_path, config)?;
    let mut contents = request.staging_root.clone().into_os_string();
    contents.push(std::path::MAIN_SEPARATOR_STR);
    contents.push("*");
    let mut command = Command::new(archiver);
    command
        .args(["a", "-t7z"])
        .arg(&archive)
        .arg(contents)
        .arg("-mx9");
    process::run(command, log, encoding)?;
    log.append("Archive created");
    let mut command = Command::new(archiver);
    command.args(["a", "-t7z"]).arg(&archive).arg(&batch);
    process::run(command, log, encoding)?;
    concatenate(installer, &[module, &config_path, &archive])?;
    log.append(format!("SFX installer created: {}", installer.display()));
    Ok(())
}

/// Writes the files of `parts` one after the other into `output`.
pub fn concatenate(output: &Path, parts: &[&Path]) -> Result<()> {
    let mut writer = File::create(output)?;
    for part in parts {
        trace!("Appending '{}'", part.display());
        let mut reader = File::open(part)?;
        io::copy(&mut reader, &mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

fn zip_fallback(
    request: &InstallerRequest,
    shortcut: &str,
    installer: &Path,
    log: &BuildLog,
) -> Result<()> {
    let root = request.staging_root.as_path();
    fs::write(root.join(SHORTCUT_SCRIPT_NAME), shortcut)?;
    if installer.exists() {
        fs::remove_file(installer)?;
    }
    write_zip(root, installer)?;
    log.append(format!("ZIP archive created: {}", installer.display()));
    Ok(())
}

/// Zips the contents of `root`, with paths relative to it.
pub fn write_zip(root: &Path, destination: &Path) -> Result<()> {
    let mut writer = ZipWriter::new(File::create(destination)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let name = entry
            .path()
            .strip_prefix(root)
            .map_err(|err| Error::Generic(err.to_string()))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if entry.file_type().is_dir() {
            writer.add_directory(name.as_str(), options)?;
        } else {
            trace!("Zipping '{}'", name);
            writer.start_file(name.as_str(), options)?;
            let mut reader = File::open(entry.path())?;
            io::copy(&mut reader, &mut writer)?;
        }
    }
    writer.finish()?;
    Ok(())
}

fn verify(installer: &Path, log: &BuildLog) {
    match fs::metadata(installer) {
        Ok(metadata) => {
            info!("Created '{}'", installer.display());
            log.append(format!("Installer created: {}", installer.display()));
            log.append(format!(
                "  Size: {:.2} MB",
                metadata.len() as f64 / 1024.0 / 1024.0
            ));
        }
        Err(_) => {
            warn!(
                "The installer is not at the expected path: {}",
                installer.display()
            );
            log.append(format!(
                "Warning: the installer is not at the expected path: {}",
                installer.display()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script;
    use assert_fs::prelude::*;
    use predicates::prelude::*;
    use std::io::Read;

    fn request(temp_dir: &assert_fs::TempDir, product_name: &str) -> InstallerRequest {
        let stage = temp_dir.child("stage");
        stage.create_dir_all().unwrap();
        InstallerRequest::new(
            product_name,
            temp_dir.child("out").to_path_buf(),
            stage.to_path_buf(),
        )
    }

    #[test]
    fn concatenate_joins_in_order() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        temp_dir.child("module").write_binary(b"MZ").unwrap();
        temp_dir.child("config").write_str(";!@Install@!").unwrap();
        temp_dir.child("archive").write_binary(b"7z\xBC\xAF").unwrap();
        let output = temp_dir.child("setup.exe");
        concatenate(
            output.path(),
            &[
                temp_dir.child("module").path(),
                temp_dir.child("config").path(),
                temp_dir.child("archive").path(),
            ],
        )
        .unwrap();
        assert_eq!(fs::read(output.path()).unwrap(), b"MZ;!@Install@!7z\xBC\xAF");
    }

    #[test]
    fn zip_contains_staged_tree_and_shortcut() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let request = request(&temp_dir, "ZipDemo");
        temp_dir.child("stage/ZipDemo.exe").write_str("exe").unwrap();
        temp_dir.child("stage/DllFiles/x.dll").write_str("dll").unwrap();
        temp_dir.child("out").create_dir_all().unwrap();
        let script = script::generate(&request, &Toolchain::Zip).unwrap();
        let log = BuildLog::new();
        let installer = package(
            &request,
            &Toolchain::Zip,
            &script,
            false,
            &log,
            encoding_rs::UTF_8,
        )
        .unwrap();
        assert_eq!(installer, temp_dir.child("out/ZipDemo_1.0.0.0_Portable.zip").path());
        let mut archive = zip::ZipArchive::new(File::open(&installer).unwrap()).unwrap();
        let mut contents = String::new();
        archive
            .by_name("ZipDemo.exe")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "exe");
        assert!(archive.by_name("DllFiles/x.dll").is_ok());
        let mut batch = String::new();
        archive
            .by_name(SHORTCUT_SCRIPT_NAME)
            .unwrap()
            .read_to_string(&mut batch)
            .unwrap();
        assert!(batch.contains("pause"));
        assert!(log.contains("Installer created"));
    }

    #[test]
    fn mismatched_script_fails() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let request = request(&temp_dir, "Mismatch");
        let err = package(
            &request,
            &Toolchain::Zip,
            &Script::Inno(String::new()),
            false,
            &BuildLog::new(),
            encoding_rs::UTF_8,
        )
        .unwrap_err();
        assert_eq!(err, Error::Generic(String::new()));
    }

    #[test]
    fn missing_installer_is_only_a_warning() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let log = BuildLog::new();
        verify(temp_dir.child("missing.msi").path(), &log);
        assert!(log.contains("Warning"));
    }

    #[test]
    fn debug_script_path_works() {
        assert_eq!(
            debug_script_path(Path::new("out"), "Demo"),
            Path::new("out").join("Demo_setup_debug.iss")
        );
    }

    #[test]
    fn existing_installer_is_measured() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let installer = temp_dir.child("Demo_1.0.0.0_Setup.msi");
        installer.write_str("msi").unwrap();
        let log = BuildLog::new();
        verify(installer.path(), &log);
        assert!(log.contains("Size: 0.00 MB"));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use serial_test::serial;

        #[test]
        #[serial]
        fn failed_compile_keeps_debug_script() {
            let temp_dir = assert_fs::TempDir::new().unwrap();
            let request = request(&temp_dir, "InnoFailDemo");
            temp_dir.child("out").create_dir_all().unwrap();
            let toolchain = Toolchain::InnoSetup {
                compiler: PathBuf::from("false"),
            };
            let script = script::generate(&request, &toolchain).unwrap();
            let log = BuildLog::new();
            let err = package(&request, &toolchain, &script, true, &log, encoding_rs::UTF_8)
                .unwrap_err();
            assert_eq!(
                err,
                Error::Command {
                    command: String::new(),
                    code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                }
            );
            let copy = temp_dir.child("out/InnoFailDemo_setup_debug.iss");
            copy.assert(predicate::path::is_file());
            let bytes = fs::read(copy.path()).unwrap();
            assert!(bytes.starts_with(UTF8_BOM));
            assert!(log.contains("Script saved for debugging"));
            assert!(!inno_script_path("InnoFailDemo").exists());
        }

        #[test]
        #[serial]
        fn script_is_kept_without_clean() {
            let temp_dir = assert_fs::TempDir::new().unwrap();
            let request = request(&temp_dir, "InnoKeepDemo");
            temp_dir.child("out").create_dir_all().unwrap();
            let toolchain = Toolchain::InnoSetup {
                compiler: PathBuf::from("true"),
            };
            let script = script::generate(&request, &toolchain).unwrap();
            let log = BuildLog::new();
            package(&request, &toolchain, &script, false, &log, encoding_rs::UTF_8).unwrap();
            let kept = inno_script_path("InnoKeepDemo");
            assert!(kept.is_file());
            fs::remove_file(kept).unwrap();
            assert!(log.contains("Warning: the installer is not at the expected path"));
        }
    }
}
