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

//! # `installer-builder` Binary
//!
//! The `installer-builder` binary builds a .NET project in its Release
//! configuration and packages the output into a Windows installer. The core
//! functionality is provided in the `installer` library; this binary is a
//! command line surface over its [pipeline].
//!
//! ## Quick Start
//!
//! ```dos
//! C:\>installer-builder C:\src\App\App.csproj -o C:\dist
//! ```
//!
//! The installer is written to `C:\dist`. Its kind depends on the tools found
//! on the machine, in this order:
//!
//! 1. The [WiX Toolset], v3 (`candle.exe` and `light.exe`) or the `wix`
//!    global .NET tool, creates `App_<version>_Setup.msi`.
//! 2. [Inno Setup] 6 or 5 creates `App_<version>_Setup.exe`.
//! 3. [7-Zip] with a self-extraction module creates `App_<version>_Setup.exe`,
//!    which extracts the application and puts a shortcut on the desktop.
//! 4. Otherwise a portable `App_<version>_Portable.zip` is created. It holds
//!    the application and a `CreateDesktopShortcut.bat` file.
//!
//! Use the `probe` subcommand to see what would be selected:
//!
//! ```dos
//! C:\>installer-builder probe
//! ```
//!
//! The `print` subcommand writes one of the embedded templates (`WXS`, `ISS`,
//! `SFX`, or `BAT`) to stdout, which shows what is rendered for each
//! toolchain.
//!
//! ## Curated Files
//!
//! Library files (`--library-file`) and additional files (`--additional-file`)
//! are copied beside the application under their own destination folders. A
//! destination starting with `[INSTALLDIR]` is relative to the installation
//! folder, e.g. `[INSTALLDIR]\lib`. When more than one file is given, the
//! folder structure below their deepest common folder is kept.
//!
//! With Inno Setup, the installer asks whether existing curated files are
//! overwritten and whether they are removed on uninstall. The
//! `--overwrite` and `--delete-on-uninstall` flags check these boxes by
//! default.
//!
//! ## Configuration
//!
//! Settings are read from an `installer-builder.json` file beside the project
//! file, or from the file given with `--config`. A value on the command line
//! wins over the settings file, which wins over the built-in default:
//!
//! ```json
//! {
//!     "publisher": "Acme",
//!     "version": "2.0.0.0",
//!     "library-destination": "[INSTALLDIR]\\lib",
//!     "additional-destination": "[INSTALLDIR]",
//!     "install-dir": "{autopf}\\{app-name}",
//!     "overwrite": false,
//!     "delete-on-uninstall": false,
//!     "language-name": "korean",
//!     "language-file": "compiler:Languages\\Korean.isl",
//!     "wix-language": 1042,
//!     "wix-codepage": 949,
//!     "code-page": "windows-949",
//!     "no-build": false
//! }
//! ```
//!
//! [7-Zip]: https://www.7-zip.org
//! [Inno Setup]: https://jrsoftware.org/isinfo.php
//! [pipeline]: ../installer/pipeline/index.html
//! [WiX Toolset]: http://wixtoolset.org

use clap::{Arg, ArgAction, ArgMatches, Command};

use env_logger::fmt::Color as LogColor;
use env_logger::Builder;

use installer::descriptor::BuildTarget;
use installer::pipeline;
use installer::toolset::{self, SystemLocator};
use installer::{BuildLog, Result, Template};

use log::{info, Level, LevelFilter};

use std::io::Write;
use std::path::Path;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The log target of the library crate.
const LIBRARY_LOG_TARGET: &str = "installer";
/// The log target of this binary, which logs the final summary.
const BINARY_LOG_TARGET: &str = "installer_builder";

fn main() {
    let verbose = Arg::new("verbose")
        .help("Sets the level of verbosity")
        .long_help(
            "Sets the level of verbosity. The higher the level of verbosity, \
             the more information that is printed and logged when the \
             application is executed. This flag can be specified multiple \
             times, where each occurrence increases the level and/or details \
             written for each statement.",
        )
        .long("verbose")
        .short('v')
        .action(ArgAction::Count)
        .global(true);
    let matches = Command::new(PKG_NAME)
        .version(PKG_VERSION)
        .about(PKG_DESCRIPTION)
        .args_conflicts_with_subcommands(true)
        .arg(verbose)
        .arg(
            Arg::new("additional-destination")
                .help("The destination of the additional files")
                .long_help(
                    "Sets the folder the additional files are installed to. A \
                     destination starting with '[INSTALLDIR]' is relative to the \
                     installation folder. The default is '[INSTALLDIR]'.",
                )
                .long("additional-destination")
                .num_args(1),
        )
        .arg(
            Arg::new("additional-files")
                .help("A config, text, or json file shipped with the application")
                .long_help(
                    "Adds a file that is copied to the additional destination. \
                     Use this option repeatedly to add multiple files. Duplicates \
                     are ignored.",
                )
                .long("additional-file")
                .short('a')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("clean-script")
                .help("Removes the generated Inno Setup script after compiling")
                .long("clean-script")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("code-page")
                .help("The code page of the build and packaging tools' output")
                .long_help(
                    "Sets the encoding used to decode the output of MSBuild, dotnet, \
                     and the packaging tools, as a label such as 'windows-949', \
                     'windows-1252', or 'utf-8'. The default is 'windows-949'.",
                )
                .long("code-page")
                .num_args(1),
        )
        .arg(
            Arg::new("config")
                .help("A path to a settings file (.json)")
                .long_help(
                    "Sets the settings file. The default is the \
                     'installer-builder.json' file beside the project file, if it \
                     exists.",
                )
                .long("config")
                .short('c')
                .num_args(1),
        )
        .arg(
            Arg::new("delete-on-uninstall")
                .help("Removes the curated files on uninstall by default")
                .long("delete-on-uninstall")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("install-dir")
                .help("The default installation folder of an Inno Setup installer")
                .long_help(
                    "Sets the default installation folder of an Inno Setup \
                     installer. A literal '{app-name}' is replaced by the \
                     application name. The default is '{autopf}\\{app-name}'.",
                )
                .long("install-dir")
                .num_args(1),
        )
        .arg(
            Arg::new("library-destination")
                .help("The destination of the library files")
                .long("library-destination")
                .num_args(1),
        )
        .arg(
            Arg::new("library-files")
                .help("A library file (.dll) shipped with the application")
                .long_help(
                    "Adds a file that is copied to the library destination. Use \
                     this option repeatedly to add multiple files. Duplicates are \
                     ignored.",
                )
                .long("library-file")
                .short('l')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("no-build")
                .help("Skips building the project")
                .long_help(
                    "Packages the existing Release output of the project without \
                     building it first.",
                )
                .long("no-build")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .help("The folder the installer is written to")
                .long("output")
                .short('o')
                .num_args(1),
        )
        .arg(
            Arg::new("overwrite")
                .help("Overwrites existing curated files by default")
                .long("overwrite")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("publisher")
                .help("The publisher, or manufacturer, of the application")
                .long("publisher")
                .short('p')
                .num_args(1),
        )
        .arg(
            Arg::new("install-version")
                .help("The version of the installer")
                .long_help(
                    "Sets the version shown by the installer and used in its file \
                     name. The default is '1.0.0.0'.",
                )
                .long("install-version")
                .short('i')
                .num_args(1),
        )
        .arg(
            Arg::new("INPUT")
                .help("A path to the project file (.csproj)")
                .index(1),
        )
        .subcommand(
            Command::new("analyze")
                .version(PKG_VERSION)
                .about("Prints the runtime and platform of a project")
                .arg(
                    Arg::new("INPUT")
                        .help("A path to the project file (.csproj)")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("print")
                .version(PKG_VERSION)
                .about("Prints an embedded template to stdout")
                .long_about(
                    "Prints the mustache template used to render an installer \
                     definition, before any value is substituted. [values: WXS, \
                     ISS, SFX, BAT]",
                )
                .arg(
                    Arg::new("TEMPLATE")
                        .help("A name of a template")
                        .long_help(
                            "This is required and values are case insensitive. \
                             [values: WXS, ISS, SFX, BAT]",
                        )
                        .hide_possible_values(true)
                        .value_parser(
                            Template::possible_values()
                                .iter()
                                .map(String::as_str)
                                .collect::<Vec<&str>>(),
                        )
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("probe")
                .version(PKG_VERSION)
                .about("Prints the build and packaging tools found on this machine"),
        )
        .get_matches();
    let verbosity = match matches.subcommand() {
        Some((_, m)) => m.get_count("verbose"),
        None => matches.get_count("verbose"),
    };
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            // The default `env_logger` format with a colon between the level
            // and the message.
            let mut level_style = buf.style();
            let level = record.level();
            match level {
                Level::Trace => level_style.set_color(LogColor::White).set_bold(false),
                Level::Debug => level_style.set_color(LogColor::White).set_bold(true),
                Level::Info => level_style.set_color(LogColor::Green).set_bold(true),
                Level::Warn => level_style.set_color(LogColor::Yellow).set_bold(true),
                Level::Error => level_style.set_color(LogColor::Red).set_bold(true),
            };
            let write_level = write!(buf, "{:>5}: ", level_style.value(level));
            let write_args = writeln!(buf, "{}", record.args());
            write_level.and(write_args)
        })
        .filter(Some(LIBRARY_LOG_TARGET), level)
        .filter(Some(BINARY_LOG_TARGET), level)
        .init();
    let result = match matches.subcommand() {
        Some(("analyze", m)) => analyze(m),
        Some(("print", m)) => m
            .get_one::<String>("TEMPLATE")
            .map(String::as_str)
            .unwrap_or_default()
            .parse::<Template>()
            .map(|template| print!("{}", template.to_str())),
        Some(("probe", _)) => {
            for probe in toolset::probe(&SystemLocator) {
                match probe.found {
                    Some(found) => println!("{:<18} {}", probe.tool, found),
                    None => println!("{:<18} not found", probe.tool),
                }
            }
            let selected = toolset::select(&SystemLocator, &BuildLog::new());
            println!("Selected: {}", selected);
            Ok(())
        }
        _ => create(&matches),
    };
    match result {
        Ok(_) => std::process::exit(0),
        Err(e) => {
            {
                let mut stderr = StandardStream::stderr(ColorChoice::Auto);
                stderr
                    .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))
                    .expect("Coloring stderr");
                write!(&mut stderr, "Error[{}] ({}): ", e.code(), e.as_str())
                    .expect("Write tag to stderr");
                // Resetting keeps the color from leaking into the console once
                // the application exits.
                stderr
                    .reset()
                    .expect("Revert color settings after printing the tag");
                stderr
                    .set_color(ColorSpec::new().set_fg(Some(Color::White)).set_bold(false))
                    .expect("Coloring stderr");
                writeln!(&mut stderr, "{e}").expect("Write message to stderr");
                stderr
                    .reset()
                    .expect("Revert color settings after printing the message");
            }
            std::process::exit(e.code());
        }
    }
}

fn analyze(m: &ArgMatches) -> Result<()> {
    let input = m
        .get_one::<String>("INPUT")
        .map(String::as_str)
        .unwrap_or_default();
    let target = BuildTarget::from_path(Path::new(input))?;
    println!("Runtime:      {}", target.runtime());
    println!("Platform:     {}", target.architecture());
    println!("License file: {}", target.has_license_resource());
    println!(
        "Build tool:   {}",
        if target.requires_legacy_build_tool() {
            "MSBuild"
        } else {
            "dotnet build"
        }
    );
    Ok(())
}

fn create(m: &ArgMatches) -> Result<()> {
    let log = BuildLog::with_listener(|line| println!("{}", line));
    let mut create = pipeline::Builder::new();
    create.additional_destination(m.get_one("additional-destination").map(String::as_str));
    create.additional_files(
        m.get_many::<String>("additional-files")
            .map(|v| v.map(String::as_str).collect()),
    );
    create.clean_script(m.get_flag("clean-script"));
    create.code_page(m.get_one("code-page").map(String::as_str));
    create.config(m.get_one("config").map(String::as_str));
    create.delete_on_uninstall(m.get_flag("delete-on-uninstall"));
    create.input(m.get_one("INPUT").map(String::as_str));
    create.install_dir(m.get_one("install-dir").map(String::as_str));
    create.library_destination(m.get_one("library-destination").map(String::as_str));
    create.library_files(
        m.get_many::<String>("library-files")
            .map(|v| v.map(String::as_str).collect()),
    );
    create.no_build(m.get_flag("no-build"));
    create.output(m.get_one("output").map(String::as_str));
    create.overwrite(m.get_flag("overwrite"));
    create.publisher(m.get_one("publisher").map(String::as_str));
    create.version(m.get_one("install-version").map(String::as_str));
    let outcome = create.build().run(&log)?;
    info!(
        "Created '{}' with {}",
        outcome.installer.display(),
        outcome.toolchain
    );
    Ok(())
}
