extern crate sxd_document;
extern crate sxd_xpath;

use assert_fs::prelude::*;
use assert_fs::TempDir;

use self::sxd_document::parser;
use self::sxd_xpath::{Context, Factory};

#[allow(dead_code)]
pub const PROJECT_NAME: &str = "App";

/// A minimal SDK-style project file targeting .NET 8 on Windows.
#[allow(dead_code)]
pub const MODERN_PROJECT: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <OutputType>WinExe</OutputType>
    <TargetFramework>net8.0-windows</TargetFramework>
    <UseWindowsForms>true</UseWindowsForms>
  </PropertyGroup>
</Project>
"#;

/// Creates a project folder with a project file and an existing Release
/// build output, so a run with `no_build` can package it.
///
/// The layout is:
///
/// ```text
/// App.csproj
/// bin\Release\net8.0-windows\App.exe
/// bin\Release\net8.0-windows\App.dll
/// bin\Release\net8.0-windows\runtimes\win-x64\native\e_sqlite3.dll
/// ```
///
/// # Panics
///
/// This will panic if the temporary directory or any of its files cannot be
/// created.
#[allow(dead_code)]
pub fn create_test_project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    temp_dir
        .child(format!("{}.csproj", PROJECT_NAME))
        .write_str(MODERN_PROJECT)
        .unwrap();
    let output = temp_dir.child("bin/Release/net8.0-windows");
    output
        .child(format!("{}.exe", PROJECT_NAME))
        .write_binary(b"MZ")
        .unwrap();
    output
        .child(format!("{}.dll", PROJECT_NAME))
        .write_binary(b"MZ")
        .unwrap();
    output
        .child("runtimes/win-x64/native/e_sqlite3.dll")
        .write_binary(b"MZ")
        .unwrap();
    temp_dir
}

/// Creates curated files in their own folder tree next to the project.
#[allow(dead_code)]
pub fn create_curated_files(temp_dir: &TempDir) -> Vec<String> {
    ["curated/libs/a/x.dll", "curated/libs/b/y.dll"]
        .iter()
        .map(|p| {
            let child = temp_dir.child(p);
            child.write_str("library").unwrap();
            child.path().to_str().unwrap().to_owned()
        })
        .collect()
}

/// Evaluates an XPath expression for WiX Source text.
///
/// This registers the WiX XML namespace with the `wix` prefix. So, XPath
/// expressions should use `/wix:Wix/` as the start and prefix all element/node
/// names with the `wix:` prefix. Note, attributes should _not_ have the `wix:`
/// prefix.
///
/// All values are currently returned as strings.
#[allow(dead_code)]
pub fn evaluate_xpath(wxs: &str, xpath: &str) -> String {
    let wxs_package = parser::parse(wxs).expect("Parsing WiX Source");
    let wxs_document = wxs_package.as_document();
    let mut context = Context::new();
    context.set_namespace("wix", "http://schemas.microsoft.com/wix/2006/wi");
    let xpath = Factory::new().build(xpath).unwrap().unwrap();
    xpath.evaluate(&context, wxs_document.root()).unwrap().string()
}
