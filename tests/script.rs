extern crate assert_fs;
extern crate installer;

mod common;

use assert_fs::prelude::*;
use assert_fs::TempDir;

use installer::script::{self, InstallerRequest, Script};
use installer::toolset::{Toolchain, WixToolset};
use installer::StoredPathBuf;

use std::path::PathBuf;

use common::evaluate_xpath;

fn staged_request(root: &TempDir) -> InstallerRequest {
    root.child("App.exe").touch().unwrap();
    root.child("App.dll").touch().unwrap();
    root.child("DllFiles/a/x.dll").touch().unwrap();
    root.child("DllFiles/b/y.dll").touch().unwrap();
    root.child("AdditionalFiles/appsettings.json").touch().unwrap();
    let mut request = InstallerRequest::new("App", PathBuf::from("out"), root.path().to_owned());
    request.version = String::from("2.3.4.5");
    request.publisher = String::from("Acme");
    request.library_destination = String::from("[INSTALLDIR]\\lib");
    request.library_files = vec![
        StoredPathBuf::new(String::from("DllFiles\\a\\x.dll")),
        StoredPathBuf::new(String::from("DllFiles\\b\\y.dll")),
    ];
    request.additional_files =
        vec![StoredPathBuf::new(String::from("AdditionalFiles\\appsettings.json"))];
    request
}

fn wxs(request: &InstallerRequest) -> String {
    match script::generate(request, &Toolchain::Wix(WixToolset::Modern)).unwrap() {
        Script::Wxs(source) => source,
        other => panic!("Expected a WiX Source, got {:?}", other),
    }
}

#[test]
fn wxs_product_attributes_are_correct() {
    let root = TempDir::new().unwrap();
    let source = wxs(&staged_request(&root));
    assert_eq!(evaluate_xpath(&source, "/wix:Wix/wix:Product/@Name"), "App");
    assert_eq!(
        evaluate_xpath(&source, "/wix:Wix/wix:Product/@Manufacturer"),
        "Acme"
    );
    assert_eq!(
        evaluate_xpath(&source, "/wix:Wix/wix:Product/@Version"),
        "2.3.4"
    );
    assert_eq!(
        evaluate_xpath(&source, "/wix:Wix/wix:Product/@Language"),
        "1042"
    );
    assert_eq!(
        evaluate_xpath(&source, "/wix:Wix/wix:Product/wix:Package/@SummaryCodepage"),
        "949"
    );
}

#[test]
fn wxs_has_a_component_per_file() {
    let root = TempDir::new().unwrap();
    let source = wxs(&staged_request(&root));
    assert_eq!(
        evaluate_xpath(&source, "count(//wix:Component/wix:File)"),
        "5"
    );
    assert_eq!(
        evaluate_xpath(
            &source,
            "count(/wix:Wix/wix:Product/wix:Feature/wix:ComponentRef)"
        ),
        "7"
    );
}

#[test]
fn wxs_library_files_go_below_destination() {
    let root = TempDir::new().unwrap();
    let source = wxs(&staged_request(&root));
    let lib_id = evaluate_xpath(
        &source,
        "//wix:DirectoryRef[@Id='INSTALLDIR']/wix:Directory[@Name='lib']/@Id",
    );
    assert!(!lib_id.is_empty());
    let a_id = evaluate_xpath(
        &source,
        &format!(
            "//wix:DirectoryRef[@Id='{}']/wix:Directory[@Name='a']/@Id",
            lib_id
        ),
    );
    assert_eq!(
        evaluate_xpath(
            &source,
            &format!("//wix:DirectoryRef[@Id='{}']/wix:Component/wix:File/@Name", a_id)
        ),
        "x.dll"
    );
    assert_eq!(
        evaluate_xpath(&source, "count(//wix:Directory[@Name='DllFiles'])"),
        "0"
    );
}

#[test]
fn wxs_additional_files_merge_into_install_dir() {
    let root = TempDir::new().unwrap();
    let source = wxs(&staged_request(&root));
    assert_eq!(
        evaluate_xpath(
            &source,
            "count(//wix:DirectoryRef[@Id='INSTALLDIR']/wix:Component/wix:File[@Name='appsettings.json'])"
        ),
        "1"
    );
}

#[test]
fn wxs_shortcuts_target_executable() {
    let root = TempDir::new().unwrap();
    let source = wxs(&staged_request(&root));
    assert_eq!(
        evaluate_xpath(
            &source,
            "//wix:Component[@Id='DesktopShortcut']/wix:Shortcut/@Target"
        ),
        "[INSTALLDIR]App.exe"
    );
    assert_eq!(
        evaluate_xpath(
            &source,
            "//wix:Component[@Id='StartMenuShortcut']/wix:Shortcut/@Target"
        ),
        "[INSTALLDIR]App.exe"
    );
}

#[test]
fn wxs_guids_differ_between_builds() {
    let root = TempDir::new().unwrap();
    let request = staged_request(&root);
    let first = evaluate_xpath(&wxs(&request), "/wix:Wix/wix:Product/@UpgradeCode");
    let second = evaluate_xpath(&wxs(&request), "/wix:Wix/wix:Product/@UpgradeCode");
    assert_ne!(first, second);
}

#[test]
fn inno_script_app_id_is_stable_across_builds() {
    let root = TempDir::new().unwrap();
    let request = staged_request(&root);
    let toolchain = Toolchain::InnoSetup {
        compiler: PathBuf::from("ISCC.exe"),
    };
    let first = script::generate(&request, &toolchain).unwrap();
    let second = script::generate(&request, &toolchain).unwrap();
    assert_eq!(first, second);
    match first {
        Script::Inno(text) => assert!(text.contains(&format!(
            "AppId={{{{{}}}",
            script::stable_app_id("App")
        ))),
        other => panic!("Expected an Inno Setup script, got {:?}", other),
    }
}

#[test]
fn zip_script_is_a_portable_shortcut() {
    let root = TempDir::new().unwrap();
    match script::generate(&staged_request(&root), &Toolchain::Zip).unwrap() {
        Script::Zip { shortcut } => {
            assert!(shortcut.contains("App.exe"));
            assert!(shortcut.contains("pause"));
        }
        other => panic!("Expected a shortcut script, got {:?}", other),
    }
}
