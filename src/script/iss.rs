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

//! Inno Setup scripts.
//!
//! The application ID is derived from the product name, so a new version of
//! a product is recognised as an upgrade. The generated `[Code]` section
//! looks up a previous installation under that ID and, after asking, removes
//! it silently before the new files are copied.
//!
//! Each curated file set is copied by two alternative `[Files]` rules, one
//! that always overwrites and one that only copies missing files. The
//! `overwritefiles` task decides which one runs.

use super::{inno_path, relative_to_set, stable_app_id, InstallerRequest};
use crate::Error;
use crate::Result;
use crate::StoredPathBuf;
use crate::Template;
use crate::ADDITIONAL_FOLDER_NAME;
use crate::DLL_FOLDER_NAME;

use chrono::Datelike;
use mustache::{self, MapBuilder};

use std::path::Path;

/// The registry key, below `HKLM` or `HKCU`, where Inno Setup registers the
/// uninstaller of an application.
pub const UNINSTALL_KEY: &str = "Software\\Microsoft\\Windows\\CurrentVersion\\Uninstall";

/// The suffix Inno Setup appends to the application ID for its uninstall key.
pub const UNINSTALL_KEY_SUFFIX: &str = "_is1";

/// Gets the uninstall registry key for an application ID.
pub fn uninstall_key(app_id: &str) -> String {
    format!("{}\\{{{}}}{}", UNINSTALL_KEY, app_id, UNINSTALL_KEY_SUFFIX)
}

/// Inno Setup accepts forward slashes everywhere, which spares the script
/// from escaping.
fn script_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

struct CuratedSet<'a> {
    folder: &'static str,
    destination: String,
    files: &'a [StoredPathBuf],
}

/// Renders the Inno Setup script for `request`.
pub fn render(request: &InstallerRequest) -> Result<String> {
    let app_id = stable_app_id(&request.product_name);
    debug!("app_id = {:?}", app_id);
    let sets: Vec<CuratedSet> = [
        CuratedSet {
            folder: DLL_FOLDER_NAME,
            destination: inno_path(&request.library_destination),
            files: &request.library_files,
        },
        CuratedSet {
            folder: ADDITIONAL_FOLDER_NAME,
            destination: inno_path(&request.additional_destination),
            files: &request.additional_files,
        },
    ]
    .into_iter()
    .filter(|s| !s.files.is_empty())
    .collect();
    for set in &sets {
        debug!("{} destination = {:?}", set.folder, set.destination);
    }
    let source_dir = script_path(&request.staging_root);
    let template = mustache::compile_str(Template::Iss.to_str())?;
    let data = MapBuilder::new()
        .insert_str("product-name", &request.product_name)
        .insert_str("version", &request.version)
        .insert_str("publisher", &request.publisher)
        .insert_str("exe-name", request.exe_name())
        .insert_str("app-id", format!("{{{{{}}}", app_id))
        .insert_str("year", chrono::Local::now().year().to_string())
        .insert_str("install-dir", request.inno_install_dir())
        .insert_str("output-dir", script_path(&request.output_dir))
        .insert_str("source-dir", &source_dir)
        .insert_str(
            "excludes",
            format!("{},{}", DLL_FOLDER_NAME, ADDITIONAL_FOLDER_NAME),
        )
        .insert_str("language-name", &request.language_name)
        .insert_str("language-file", &request.language_file)
        .insert_bool("has-curated-files", !sets.is_empty())
        .insert_bool("overwrite", request.overwrite)
        .insert_bool("delete-on-uninstall", request.delete_on_uninstall)
        .insert_vec("curated-sets", |mut builder| {
            for set in &sets {
                builder = builder.push_map(|builder| {
                    builder
                        .insert_str("folder", set.folder)
                        .insert_str("destination", &set.destination)
                });
            }
            builder
        })
        .insert_vec("uninstall-entries", |mut builder| {
            for set in &sets {
                for file in set.files {
                    let relative = relative_to_set(file);
                    builder = builder.push_map(|builder| {
                        builder.insert_str(
                            "path",
                            format!("{}\\{}", set.destination.trim_end_matches(['\\', '/']), relative),
                        )
                    });
                }
            }
            builder
        })
        .insert_str("uninstall-key", uninstall_key(&app_id))
        .build();
    let mut rendered = Vec::new();
    template.render_data(&mut rendered, &data)?;
    String::from_utf8(rendered).map_err(|err| Error::Generic(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request() -> InstallerRequest {
        let mut request = InstallerRequest::new(
            "Demo",
            PathBuf::from("C:\\out"),
            PathBuf::from("C:\\Temp\\Demo_Installer_x"),
        );
        request.version = String::from("2.1.0.0");
        request
    }

    fn with_curated_files(mut request: InstallerRequest) -> InstallerRequest {
        request.library_destination = String::from("[INSTALLDIR]\\lib");
        request.library_files = vec![
            StoredPathBuf::new(String::from("DllFiles\\a\\x.dll")),
            StoredPathBuf::new(String::from("DllFiles\\b\\y.dll")),
        ];
        request.additional_destination = String::from("C:\\ProgramData\\Demo");
        request.additional_files =
            vec![StoredPathBuf::new(String::from("AdditionalFiles\\appsettings.json"))];
        request
    }

    #[test]
    fn uninstall_key_works() {
        assert_eq!(
            uninstall_key("ABC"),
            "Software\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\{ABC}_is1"
        );
    }

    #[test]
    fn header_defines_macros() {
        let script = render(&request()).unwrap();
        assert!(script.starts_with("#define MyAppName \"Demo\"\n"));
        assert!(script.contains("#define MyAppVersion \"2.1.0.0\""));
        assert!(script.contains("#define MyAppPublisher \"GreenPower\""));
        assert!(script.contains("#define MyAppExeName \"Demo.exe\""));
    }

    #[test]
    fn app_id_is_stable_and_escaped() {
        let script = render(&request()).unwrap();
        let expected = format!("AppId={{{{{}}}\n", stable_app_id("Demo"));
        assert!(script.contains(&expected), "{script}");
        assert_eq!(script, render(&request()).unwrap());
    }

    #[test]
    fn setup_section_works() {
        let script = render(&request()).unwrap();
        assert!(script.contains("DefaultDirName={autopf}\\{#MyAppName}\n"));
        assert!(script.contains("OutputDir=C:/out\n"));
        assert!(script.contains("OutputBaseFilename={#MyAppName}_{#MyAppVersion}_Setup\n"));
        assert!(script.contains("Compression=lzma2\n"));
        assert!(script.contains("PrivilegesRequired=lowest\n"));
        assert!(script.contains(
            "Name: \"korean\"; MessagesFile: \"compiler:Languages\\Korean.isl\""
        ));
    }

    #[test]
    fn base_files_exclude_curated_folders() {
        let script = render(&request()).unwrap();
        assert!(script.contains(
            "Source: \"C:/Temp/Demo_Installer_x/*\"; DestDir: \"{app}\"; \
             Flags: ignoreversion recursesubdirs createallsubdirs; \
             Excludes: \"DllFiles,AdditionalFiles\""
        ));
    }

    #[test]
    fn no_curated_files_has_no_tasks() {
        let script = render(&request()).unwrap();
        assert!(!script.contains("[Tasks]"));
        assert!(!script.contains("[UninstallDelete]"));
        assert!(!script.contains("DllFiles/*"));
    }

    #[test]
    fn curated_sets_have_two_rules() {
        let script = render(&with_curated_files(request())).unwrap();
        assert!(script.contains(
            "Source: \"C:/Temp/Demo_Installer_x/DllFiles/*\"; DestDir: \"{app}\\lib\"; \
             Flags: ignoreversion recursesubdirs createallsubdirs uninsneveruninstall; \
             Tasks: overwritefiles"
        ));
        assert!(script.contains(
            "Source: \"C:/Temp/Demo_Installer_x/DllFiles/*\"; DestDir: \"{app}\\lib\"; \
             Flags: onlyifdoesntexist recursesubdirs createallsubdirs uninsneveruninstall; \
             Tasks: not overwritefiles"
        ));
        assert!(script.contains(
            "Source: \"C:/Temp/Demo_Installer_x/AdditionalFiles/*\"; \
             DestDir: \"C:\\ProgramData\\Demo\"; Flags: ignoreversion"
        ));
    }

    #[test]
    fn tasks_follow_checkboxes() {
        let script = render(&with_curated_files(request())).unwrap();
        assert!(script.contains(
            "Name: \"overwritefiles\"; Description: \"Overwrite existing config and library files\"; Flags: unchecked"
        ));
        let mut checked = with_curated_files(request());
        checked.overwrite = true;
        checked.delete_on_uninstall = true;
        let script = render(&checked).unwrap();
        assert!(script.contains(
            "Name: \"overwritefiles\"; Description: \"Overwrite existing config and library files\"\n"
        ));
        assert!(script.contains(
            "Name: \"deleteonuninstall\"; Description: \"Delete config and library files on uninstall\"\n"
        ));
    }

    #[test]
    fn uninstall_delete_lists_curated_files() {
        let script = render(&with_curated_files(request())).unwrap();
        assert!(script.contains(
            "Type: files; Name: \"{app}\\lib\\a\\x.dll\"; Tasks: deleteonuninstall"
        ));
        assert!(script.contains(
            "Type: files; Name: \"C:\\ProgramData\\Demo\\appsettings.json\"; Tasks: deleteonuninstall"
        ));
    }

    #[test]
    fn code_removes_previous_version() {
        let script = render(&request()).unwrap();
        assert!(script.contains(&format!(
            "UninstallKey := '{}';",
            uninstall_key(&stable_app_id("Demo"))
        )));
        assert!(script.contains("function PrepareToInstall(var NeedsRestart: Boolean): String;"));
        assert!(script.contains("/VERYSILENT /NORESTART /SUPPRESSMSGBOXES"));
        assert!(script.contains("CreateOutputProgressPage("));
    }

    #[test]
    fn run_section_launches_application() {
        let script = render(&request()).unwrap();
        assert!(script.contains(
            "Filename: \"{app}\\{#MyAppExeName}\"; \
             Description: \"{cm:LaunchProgram,{#StringChange(MyAppName, '&', '&&')}}\"; \
             Flags: nowait postinstall skipifsilent"
        ));
    }

    #[test]
    fn custom_install_dir_uses_macro() {
        let mut request = request();
        request.install_dir = Some(String::from("{localappdata}\\{app-name}"));
        let script = render(&request).unwrap();
        assert!(script.contains("DefaultDirName={localappdata}\\{#MyAppName}\n"));
    }
}
