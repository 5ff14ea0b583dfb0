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

//! Self-extractor configuration and the desktop shortcut batch file.

use super::{crlf, InstallerRequest};
use crate::Error;
use crate::Result;
use crate::Template;
use crate::SHORTCUT_SCRIPT_NAME;

use mustache::{self, MapBuilder};

fn render_template(template: Template, data: &mustache::Data) -> Result<String> {
    let template = mustache::compile_str(template.to_str())?;
    let mut rendered = Vec::new();
    template.render_data(&mut rendered, data)?;
    String::from_utf8(rendered).map_err(|err| Error::Generic(err.to_string()))
}

/// Renders the configuration block read by the 7-Zip installer module. It
/// runs the shortcut batch file once the archive is extracted.
pub fn render_config(request: &InstallerRequest) -> Result<String> {
    let data = MapBuilder::new()
        .insert_str("product-name", &request.product_name)
        .insert_str("shortcut-script", SHORTCUT_SCRIPT_NAME)
        .build();
    render_template(Template::SfxConfig, &data)
}

/// Renders the batch file that puts a shortcut to the application on the
/// desktop. The `portable` flavour is run by hand, so it says when it is done
/// and waits for a key.
pub fn render_shortcut(request: &InstallerRequest, portable: bool) -> Result<String> {
    let data = MapBuilder::new()
        .insert_str("product-name", &request.product_name)
        .insert_str("exe-name", request.exe_name())
        .insert_bool("portable", portable)
        .build();
    render_template(Template::ShortcutBatch, &data).map(|text| crlf(&text))
}
