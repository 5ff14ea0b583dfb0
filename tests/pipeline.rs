extern crate assert_fs;
extern crate installer;
extern crate predicates;
extern crate zip;

mod common;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

use installer::pipeline::Builder;
use installer::toolset::{StaticLocator, Toolchain};
use installer::{BuildLog, Error, SETTINGS_FILE_NAME, SHORTCUT_SCRIPT_NAME};

use std::fs::File;
use std::sync::{Arc, Mutex};

use common::PROJECT_NAME;

fn archive_names(path: &std::path::Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    names
}

#[test]
fn no_tools_creates_portable_zip() {
    let project = common::create_test_project();
    let output = project.child("dist");
    let input = project.child(format!("{}.csproj", PROJECT_NAME));
    let log = BuildLog::new();
    let outcome = Builder::new()
        .input(input.path().to_str())
        .output(output.path().to_str())
        .no_build(true)
        .locator(Some(Arc::new(StaticLocator::new())))
        .build()
        .run(&log)
        .unwrap();
    assert_eq!(outcome.toolchain, Toolchain::Zip);
    assert_eq!(
        outcome.installer,
        output.path().join("App_1.0.0.0_Portable.zip")
    );
    output.child("App_1.0.0.0_Portable.zip").assert(predicate::path::is_file());
    let names = archive_names(&outcome.installer);
    assert!(names.contains(&String::from("App.exe")));
    assert!(names.contains(&String::from("App.dll")));
    assert!(names.contains(&String::from("runtimes/win-x64/native/e_sqlite3.dll")));
    assert!(names.contains(&String::from(SHORTCUT_SCRIPT_NAME)));
    assert!(log.contains("Skipping the build"));
    assert!(log.contains("Installer created: "));
    assert_eq!(log.lines().last().map(String::as_str), Some("Done"));
}

#[test]
fn curated_files_keep_their_structure() {
    let project = common::create_test_project();
    let curated = common::create_curated_files(&project);
    let appsettings = project.child("appsettings.json");
    appsettings.write_str("{}").unwrap();
    let output = project.child("dist");
    let input = project.child(format!("{}.csproj", PROJECT_NAME));
    let outcome = Builder::new()
        .input(input.path().to_str())
        .output(output.path().to_str())
        .library_files(Some(curated.iter().map(String::as_str).collect()))
        .additional_files(Some(vec![appsettings.path().to_str().unwrap()]))
        .no_build(true)
        .locator(Some(Arc::new(StaticLocator::new())))
        .build()
        .run(&BuildLog::new())
        .unwrap();
    let names = archive_names(&outcome.installer);
    assert!(names.contains(&String::from("DllFiles/a/x.dll")));
    assert!(names.contains(&String::from("DllFiles/b/y.dll")));
    assert!(names.contains(&String::from("AdditionalFiles/appsettings.json")));
}

#[test]
fn duplicate_curated_files_are_staged_once() {
    let project = common::create_test_project();
    let curated = common::create_curated_files(&project);
    let output = project.child("dist");
    let input = project.child(format!("{}.csproj", PROJECT_NAME));
    let log = BuildLog::new();
    Builder::new()
        .input(input.path().to_str())
        .output(output.path().to_str())
        .library_files(Some(vec![curated[0].as_str(), curated[0].as_str()]))
        .no_build(true)
        .locator(Some(Arc::new(StaticLocator::new())))
        .build()
        .run(&log)
        .unwrap();
    let copies = log
        .lines()
        .iter()
        .filter(|l| l.starts_with("Copied ") && l.contains("x.dll"))
        .count();
    assert_eq!(copies, 1);
}

#[test]
fn settings_file_beside_project_is_used() {
    let project = common::create_test_project();
    project
        .child(SETTINGS_FILE_NAME)
        .write_str(r#"{ "version": "2.5.0.0", "publisher": "Acme", "no-build": true }"#)
        .unwrap();
    let output = project.child("dist");
    let input = project.child(format!("{}.csproj", PROJECT_NAME));
    let log = BuildLog::new();
    let outcome = Builder::new()
        .input(input.path().to_str())
        .output(output.path().to_str())
        .locator(Some(Arc::new(StaticLocator::new())))
        .build()
        .run(&log)
        .unwrap();
    assert_eq!(
        outcome.installer,
        output.path().join("App_2.5.0.0_Portable.zip")
    );
    assert!(log.contains("Settings: "));
    assert!(log.contains("Skipping the build"));
}

#[test]
fn version_option_overrides_settings_file() {
    let project = common::create_test_project();
    project
        .child(SETTINGS_FILE_NAME)
        .write_str(r#"{ "version": "2.5.0.0", "no-build": true }"#)
        .unwrap();
    let output = project.child("dist");
    let input = project.child(format!("{}.csproj", PROJECT_NAME));
    let outcome = Builder::new()
        .input(input.path().to_str())
        .output(output.path().to_str())
        .version(Some("3.0.0.0"))
        .locator(Some(Arc::new(StaticLocator::new())))
        .build()
        .run(&BuildLog::new())
        .unwrap();
    assert_eq!(
        outcome.installer,
        output.path().join("App_3.0.0.0_Portable.zip")
    );
}

#[test]
fn explicit_missing_settings_file_fails() {
    let project = common::create_test_project();
    let output = project.child("dist");
    let input = project.child(format!("{}.csproj", PROJECT_NAME));
    let missing = project.child("missing.json");
    let result = Builder::new()
        .input(input.path().to_str())
        .output(output.path().to_str())
        .config(missing.path().to_str())
        .no_build(true)
        .build()
        .run(&BuildLog::new());
    assert_eq!(result.unwrap_err(), Error::Config(String::new()));
}

#[test]
fn missing_release_output_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.child("App.csproj");
    input.write_str(common::MODERN_PROJECT).unwrap();
    let output = temp_dir.child("dist");
    let result = Builder::new()
        .input(input.path().to_str())
        .output(output.path().to_str())
        .no_build(true)
        .locator(Some(Arc::new(StaticLocator::new())))
        .build()
        .run(&BuildLog::new());
    assert_eq!(result.unwrap_err(), Error::Build(String::new()));
}

#[test]
fn log_is_cleared_between_runs() {
    let project = common::create_test_project();
    let output = project.child("dist");
    let input = project.child(format!("{}.csproj", PROJECT_NAME));
    let log = BuildLog::new();
    log.append("A line from an earlier run");
    Builder::new()
        .input(input.path().to_str())
        .output(output.path().to_str())
        .no_build(true)
        .locator(Some(Arc::new(StaticLocator::new())))
        .build()
        .run(&log)
        .unwrap();
    assert!(!log.contains("A line from an earlier run"));
}

#[test]
fn spawned_run_streams_to_listener() {
    let project = common::create_test_project();
    let output = project.child("dist");
    let input = project.child(format!("{}.csproj", PROJECT_NAME));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let log = BuildLog::with_listener(move |line| sink.lock().unwrap().push(line.to_owned()));
    let handle = Builder::new()
        .input(input.path().to_str())
        .output(output.path().to_str())
        .no_build(true)
        .locator(Some(Arc::new(StaticLocator::new())))
        .build()
        .spawn(log.clone());
    let outcome = handle.join().unwrap().unwrap();
    assert!(outcome.installer.is_file());
    let seen = seen.lock().unwrap();
    assert_eq!(*seen, log.lines());
    assert!(seen.iter().any(|l| l == "Done"));
}
