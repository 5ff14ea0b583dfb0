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

//! One packaging run, from the project file to the installer.
//!
//! A run validates its inputs, reads the project file, builds the Release
//! configuration, finds the build output, stages it with the curated files,
//! selects a toolchain, renders the script for it, and runs it. Each step
//! only starts when the previous one succeeded, and the first failure ends
//! the run. The staging tree is removed on every exit path.
//!
//! Settings are resolved in the same order for every value: the value given
//! to the [`Builder`], then the value from the settings file, then the
//! built-in default.

use crate::artifact;
use crate::config::{self, Settings};
use crate::descriptor::BuildTarget;
use crate::dispatch;
use crate::package;
use crate::process;
use crate::script::{self, InstallerRequest};
use crate::stage;
use crate::toolset::{self, Locator, SystemLocator, Toolchain};
use crate::BuildLog;
use crate::Error;
use crate::Result;
use crate::DEFAULT_PUBLISHER;
use crate::DEFAULT_VERSION;
use crate::INSTALL_DIR_TOKEN;

use std::fs;
use std::path::{self, Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A builder for a packaging run.
#[derive(Debug, Clone)]
pub struct Builder<'a> {
    additional_destination: Option<&'a str>,
    additional_files: Option<Vec<&'a str>>,
    clean_script: bool,
    code_page: Option<&'a str>,
    config: Option<&'a str>,
    delete_on_uninstall: bool,
    input: Option<&'a str>,
    install_dir: Option<&'a str>,
    library_destination: Option<&'a str>,
    library_files: Option<Vec<&'a str>>,
    locator: Option<Arc<dyn Locator>>,
    no_build: bool,
    output: Option<&'a str>,
    overwrite: bool,
    publisher: Option<&'a str>,
    version: Option<&'a str>,
}

impl<'a> Builder<'a> {
    /// Creates a new `Builder` instance.
    pub fn new() -> Self {
        Builder {
            additional_destination: None,
            additional_files: None,
            clean_script: false,
            code_page: None,
            config: None,
            delete_on_uninstall: false,
            input: None,
            install_dir: None,
            library_destination: None,
            library_files: None,
            locator: None,
            no_build: false,
            output: None,
            overwrite: false,
            publisher: None,
            version: None,
        }
    }

    /// Sets the destination of the additional files.
    ///
    /// A destination starting with `[INSTALLDIR]` is relative to the
    /// installation folder. The default is `[INSTALLDIR]`.
    pub fn additional_destination(&mut self, d: Option<&'a str>) -> &mut Self {
        self.additional_destination = d;
        self
    }

    /// Sets the additional (config, text, json) files shipped with the
    /// application.
    pub fn additional_files(&mut self, f: Option<Vec<&'a str>>) -> &mut Self {
        self.additional_files = f;
        self
    }

    /// Removes the generated Inno Setup script once the compiler has run.
    pub fn clean_script(&mut self, c: bool) -> &mut Self {
        self.clean_script = c;
        self
    }

    /// Sets the code page used to decode the output of the build and
    /// packaging tools, as a WHATWG label such as `windows-949` or `utf-8`.
    pub fn code_page(&mut self, c: Option<&'a str>) -> &mut Self {
        self.code_page = c;
        self
    }

    /// Sets the settings file.
    ///
    /// The default is the `installer-builder.json` file beside the project
    /// file, if it exists.
    pub fn config(&mut self, c: Option<&'a str>) -> &mut Self {
        self.config = c;
        self
    }

    /// Removes the curated files when the application is uninstalled.
    pub fn delete_on_uninstall(&mut self, d: bool) -> &mut Self {
        self.delete_on_uninstall = d;
        self
    }

    /// Sets the project file (`.csproj`).
    pub fn input(&mut self, i: Option<&'a str>) -> &mut Self {
        self.input = i;
        self
    }

    /// Sets the default installation folder of the Inno Setup installer. A
    /// literal `{app-name}` is replaced by the application name.
    pub fn install_dir(&mut self, i: Option<&'a str>) -> &mut Self {
        self.install_dir = i;
        self
    }

    /// Sets the destination of the library files. The default is
    /// `[INSTALLDIR]`.
    pub fn library_destination(&mut self, d: Option<&'a str>) -> &mut Self {
        self.library_destination = d;
        self
    }

    /// Sets the library files shipped with the application.
    pub fn library_files(&mut self, f: Option<Vec<&'a str>>) -> &mut Self {
        self.library_files = f;
        self
    }

    /// Sets where to look for the build and packaging tools. The default is
    /// the real machine.
    pub fn locator(&mut self, l: Option<Arc<dyn Locator>>) -> &mut Self {
        self.locator = l;
        self
    }

    /// Skips building the project and packages the existing Release output.
    ///
    /// This value will override any default and skip looking for a value in
    /// the settings file.
    pub fn no_build(&mut self, n: bool) -> &mut Self {
        self.no_build = n;
        self
    }

    /// Sets the folder the installer is written to. It is created when
    /// missing.
    pub fn output(&mut self, o: Option<&'a str>) -> &mut Self {
        self.output = o;
        self
    }

    /// Replaces curated files that already exist on the target machine.
    pub fn overwrite(&mut self, o: bool) -> &mut Self {
        self.overwrite = o;
        self
    }

    /// Sets the publisher, or manufacturer, of the application.
    pub fn publisher(&mut self, p: Option<&'a str>) -> &mut Self {
        self.publisher = p;
        self
    }

    /// Sets the version. It is free text, used as is in file names and the
    /// Inno Setup script, and cut to its numeric fields for an MSI.
    pub fn version(&mut self, v: Option<&'a str>) -> &mut Self {
        self.version = v;
        self
    }

    /// Builds a context for a packaging run.
    pub fn build(&mut self) -> Execution {
        Execution {
            additional_destination: self.additional_destination.map(String::from),
            additional_files: self
                .additional_files
                .as_ref()
                .map(|v| v.iter().map(PathBuf::from).collect())
                .unwrap_or_default(),
            clean_script: self.clean_script,
            code_page: self.code_page.map(String::from),
            config: self.config.map(PathBuf::from),
            delete_on_uninstall: self.delete_on_uninstall,
            input: self.input.map(PathBuf::from),
            install_dir: self.install_dir.map(String::from),
            library_destination: self.library_destination.map(String::from),
            library_files: self
                .library_files
                .as_ref()
                .map(|v| v.iter().map(PathBuf::from).collect())
                .unwrap_or_default(),
            locator: self
                .locator
                .clone()
                .unwrap_or_else(|| Arc::new(SystemLocator)),
            no_build: self.no_build,
            output: self.output.map(PathBuf::from),
            overwrite: self.overwrite,
            publisher: self.publisher.map(String::from),
            version: self.version.map(String::from),
        }
    }
}

impl<'a> Default for Builder<'a> {
    fn default() -> Self {
        Builder::new()
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The installer, or portable archive.
    pub installer: PathBuf,
    /// The toolchain that created it.
    pub toolchain: Toolchain,
}

/// A context for a packaging run.
#[derive(Debug)]
pub struct Execution {
    additional_destination: Option<String>,
    additional_files: Vec<PathBuf>,
    clean_script: bool,
    code_page: Option<String>,
    config: Option<PathBuf>,
    delete_on_uninstall: bool,
    input: Option<PathBuf>,
    install_dir: Option<String>,
    library_destination: Option<String>,
    library_files: Vec<PathBuf>,
    locator: Arc<dyn Locator>,
    no_build: bool,
    output: Option<PathBuf>,
    overwrite: bool,
    publisher: Option<String>,
    version: Option<String>,
}

impl Execution {
    /// Runs the packaging pipeline, appending progress to `log`. The log is
    /// cleared first.
    pub fn run(self, log: &BuildLog) -> Result<Outcome> {
        debug!("self.additional_destination = {:?}", self.additional_destination);
        debug!("self.additional_files = {:?}", self.additional_files);
        debug!("self.clean_script = {:?}", self.clean_script);
        debug!("self.code_page = {:?}", self.code_page);
        debug!("self.config = {:?}", self.config);
        debug!("self.delete_on_uninstall = {:?}", self.delete_on_uninstall);
        debug!("self.input = {:?}", self.input);
        debug!("self.install_dir = {:?}", self.install_dir);
        debug!("self.library_destination = {:?}", self.library_destination);
        debug!("self.library_files = {:?}", self.library_files);
        debug!("self.locator = {:?}", self.locator);
        debug!("self.no_build = {:?}", self.no_build);
        debug!("self.output = {:?}", self.output);
        debug!("self.overwrite = {:?}", self.overwrite);
        debug!("self.publisher = {:?}", self.publisher);
        debug!("self.version = {:?}", self.version);
        log.clear();
        let input = self.input()?;
        debug!("input = {:?}", input);
        let output = self.output()?;
        debug!("output = {:?}", output);
        self.check_curated_files()?;
        let settings = Settings::load(self.config.as_deref(), input)?;
        debug!("settings = {:?}", settings);
        let product_name = crate::product_name(input)?;
        debug!("product_name = {:?}", product_name);
        let encoding = process::encoding_for_label(&self.code_page(&settings));
        debug!("encoding = {:?}", encoding.name());
        log.append(format!("Project: {}", input.display()));
        if let Some(source) = settings.source() {
            log.append(format!("Settings: {}", source.display()));
        }
        if !output.exists() {
            fs::create_dir_all(output)?;
            log.append(format!("Created the output folder: {}", output.display()));
        }
        let output = absolute_output(output)?;
        debug!("absolute output = {:?}", output);

        let target = BuildTarget::from_path(input)?;
        debug!("target = {:?}", target);
        log.append(format!(
            "Runtime: {}, platform: {}",
            target.runtime(),
            target.architecture()
        ));
        if self.no_build(&settings) {
            info!("Skipping the build");
            log.append("Skipping the build, packaging the existing Release output");
        } else {
            dispatch::build(&target, self.locator.as_ref(), log, encoding)?;
        }
        let project_dir = input.parent().unwrap_or_else(|| Path::new("."));
        let artifact_dir = artifact::locate(project_dir, log)?;
        debug!("artifact_dir = {:?}", artifact_dir);

        let staging = stage::staging_dir(&product_name)?;
        let plan = stage::stage(
            &artifact_dir,
            &self.library_files,
            &self.additional_files,
            staging.path(),
            log,
        )?;
        info!(
            "Staged '{}' with {} library and {} additional files",
            plan.artifact().display(),
            plan.library_files().len(),
            plan.additional_files().len()
        );
        let toolchain = toolset::select(self.locator.as_ref(), log);
        debug!("toolchain = {:?}", toolchain);
        let request = self.request(&settings, &product_name, &output).with_plan(&plan);
        debug!("request = {:?}", request);
        let script = script::generate(&request, &toolchain)?;
        let installer = package::package(
            &request,
            &toolchain,
            &script,
            self.clean_script,
            log,
            encoding,
        )?;
        if let Err(err) = staging.close() {
            warn!("The staging folder could not be removed: {}", err);
        } else {
            log.append("Temporary files removed");
        }
        log.append("Done");
        Ok(Outcome {
            installer,
            toolchain,
        })
    }

    /// Runs the pipeline on a background thread. The log handle is moved
    /// into the thread; keep a clone to follow the progress.
    pub fn spawn(self, log: BuildLog) -> JoinHandle<Result<Outcome>> {
        thread::spawn(move || self.run(&log))
    }

    fn input(&self) -> Result<&Path> {
        let input = self.input.as_deref().ok_or_else(|| {
            Error::Input(String::from("A project file (.csproj) is required"))
        })?;
        if !input.is_file() {
            return Err(Error::Input(format!(
                "The '{}' project file does not exist or is not a file",
                input.display()
            )));
        }
        Ok(input)
    }

    fn output(&self) -> Result<&Path> {
        self.output
            .as_deref()
            .filter(|o| !o.as_os_str().is_empty())
            .ok_or_else(|| Error::Input(String::from("An output folder is required")))
    }

    fn check_curated_files(&self) -> Result<()> {
        if let Some(missing) = self
            .library_files
            .iter()
            .chain(self.additional_files.iter())
            .find(|f| !f.is_file())
        {
            return Err(Error::Input(format!(
                "The '{}' file does not exist",
                missing.display()
            )));
        }
        Ok(())
    }

    fn request(&self, settings: &Settings, product_name: &str, output: &Path) -> InstallerRequest {
        let mut request = InstallerRequest::new(product_name, output, Path::new(""));
        request.version = self.version(settings);
        request.publisher = self.publisher(settings);
        request.library_destination = self.library_destination(settings);
        request.additional_destination = self.additional_destination(settings);
        request.overwrite = self.overwrite(settings);
        request.delete_on_uninstall = self.delete_on_uninstall(settings);
        request.install_dir = self.install_dir(settings);
        if let Some(name) = settings.string(config::LANGUAGE_NAME) {
            request.language_name = name;
        }
        if let Some(file) = settings.string(config::LANGUAGE_FILE) {
            request.language_file = file;
        }
        if let Some(language) = settings.string(config::WIX_LANGUAGE) {
            request.wix_language = language;
        }
        if let Some(codepage) = settings.string(config::WIX_CODEPAGE) {
            request.wix_codepage = codepage;
        }
        request
    }

    fn version(&self, settings: &Settings) -> String {
        non_empty(self.version.as_deref())
            .or_else(|| settings.string(config::VERSION))
            .unwrap_or_else(|| String::from(DEFAULT_VERSION))
    }

    fn publisher(&self, settings: &Settings) -> String {
        non_empty(self.publisher.as_deref())
            .or_else(|| settings.string(config::PUBLISHER))
            .unwrap_or_else(|| String::from(DEFAULT_PUBLISHER))
    }

    fn library_destination(&self, settings: &Settings) -> String {
        non_empty(self.library_destination.as_deref())
            .or_else(|| settings.string(config::LIBRARY_DESTINATION))
            .unwrap_or_else(|| String::from(INSTALL_DIR_TOKEN))
    }

    fn additional_destination(&self, settings: &Settings) -> String {
        non_empty(self.additional_destination.as_deref())
            .or_else(|| settings.string(config::ADDITIONAL_DESTINATION))
            .unwrap_or_else(|| String::from(INSTALL_DIR_TOKEN))
    }

    fn install_dir(&self, settings: &Settings) -> Option<String> {
        non_empty(self.install_dir.as_deref()).or_else(|| settings.string(config::INSTALL_DIR))
    }

    fn code_page(&self, settings: &Settings) -> String {
        non_empty(self.code_page.as_deref())
            .or_else(|| settings.string(config::CODE_PAGE))
            .unwrap_or_else(|| String::from(process::DEFAULT_CODE_PAGE))
    }

    fn overwrite(&self, settings: &Settings) -> bool {
        if self.overwrite {
            true
        } else {
            settings.bool(config::OVERWRITE).unwrap_or(false)
        }
    }

    fn delete_on_uninstall(&self, settings: &Settings) -> bool {
        if self.delete_on_uninstall {
            true
        } else {
            settings.bool(config::DELETE_ON_UNINSTALL).unwrap_or(false)
        }
    }

    fn no_build(&self, settings: &Settings) -> bool {
        if self.no_build {
            true
        } else {
            settings.bool(config::NO_BUILD).unwrap_or(false)
        }
    }
}

impl Default for Execution {
    fn default() -> Self {
        Builder::new().build()
    }
}

/// Anchors the output folder to the current directory. Inno Setup reads a
/// relative `OutputDir` against the folder of the script, which is not where
/// the user asked for the installer.
fn absolute_output(output: &Path) -> Result<PathBuf> {
    path::absolute(output).map_err(Error::from)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
