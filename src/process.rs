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

//! Running external programs.
//!
//! Every external tool (MSBuild, `dotnet`, the WiX compiler and linker,
//! the Inno Setup compiler, 7-Zip) goes through [`run`] or [`run_via_shell`].
//! Both stream each non-empty line of the child's stdout and stderr into the
//! [`BuildLog`] as it arrives, block until the child exits, and turn a
//! non-zero exit code into an [`Error::Command`] carrying everything the
//! child printed.
//!
//! Localized Windows tools print in the console code page rather than UTF-8,
//! so output is decoded with a configurable encoding (EUC-KR, i.e. code page
//! 949, unless the settings say otherwise).

use crate::BuildLog;
use crate::Error;
use crate::Result;

use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;

use std::ffi::OsStr;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::process::{Command, Stdio};
use std::thread;

/// The label of the encoding used for tool output when none is configured.
pub const DEFAULT_CODE_PAGE: &str = "windows-949";

/// The exit code reported when a child was terminated by a signal.
const SIGNAL_EXIT_CODE: i32 = 100;

/// The lines a successful child printed, without the log prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

/// Looks up an encoding by its WHATWG label, falling back to UTF-8.
pub fn encoding_for_label(label: &str) -> &'static Encoding {
    Encoding::for_label(label.trim().as_bytes()).unwrap_or_else(|| {
        warn!(
            "The '{}' code page is not available, tool output is decoded as UTF-8",
            label
        );
        UTF_8
    })
}

/// Runs a program directly, without a shell.
pub fn run(command: Command, log: &BuildLog, encoding: &'static Encoding) -> Result<Captured> {
    let description = describe(&command);
    log.append(format!("[EXEC] {}", description));
    execute(command, description, log, encoding)
}

/// Runs a command line through the platform shell, `cmd.exe /c` on Windows
/// and `sh -c` elsewhere.
pub fn run_via_shell(line: &str, log: &BuildLog, encoding: &'static Encoding) -> Result<Captured> {
    log.append(format!("[CMD] {}", line));
    execute(shell_command(line), line.to_owned(), log, encoding)
}

/// Creates the shell command for a command line without running it.
pub fn shell_command(line: &str) -> Command {
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        // The line carries its own quoting, which Rust's argument escaping
        // would otherwise double.
        let mut command = Command::new("cmd.exe");
        command.arg("/c").raw_arg(line);
        command
    }
    #[cfg(not(windows))]
    {
        let mut command = Command::new("sh");
        command.arg("-c").arg(line);
        command
    }
}

/// Renders a command the way it would be typed, quoting arguments with spaces.
pub fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(quote)
        .collect::<Vec<String>>()
        .join(" ")
}

fn quote(arg: &OsStr) -> String {
    let arg = arg.to_string_lossy();
    if arg.contains(' ') && !arg.starts_with('"') {
        format!("\"{}\"", arg)
    } else {
        arg.into_owned()
    }
}

fn execute(
    mut command: Command,
    description: String,
    log: &BuildLog,
    encoding: &'static Encoding,
) -> Result<Captured> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    debug!("command = {:?}", command);
    let mut child = command.spawn().map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            Error::Generic(format!(
                "The '{}' application could not be found. Please check it is installed and \
                 the path is correct.",
                command.get_program().to_string_lossy()
            ))
        } else {
            err.into()
        }
    })?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (stdout, stderr) = thread::scope(|s| {
        let out = s.spawn(move || {
            stdout
                .map(|r| pump(r, "[OUT]", log, encoding))
                .unwrap_or_default()
        });
        let err = s.spawn(move || {
            stderr
                .map(|r| pump(r, "[ERR]", log, encoding))
                .unwrap_or_default()
        });
        (out.join().unwrap_or_default(), err.join().unwrap_or_default())
    });
    let status = child.wait()?;
    let code = status.code().unwrap_or(SIGNAL_EXIT_CODE);
    log.append(format!("[EXIT CODE] {}", code));
    if status.success() {
        Ok(Captured { stdout, stderr })
    } else {
        Err(Error::Command {
            command: description,
            code,
            stdout: stdout.join("\n"),
            stderr: stderr.join("\n"),
        })
    }
}

fn pump<R: Read>(
    reader: R,
    prefix: &str,
    log: &BuildLog,
    encoding: &'static Encoding,
) -> Vec<String> {
    let decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(reader);
    let mut lines = Vec::new();
    for line in BufReader::new(decoder).lines() {
        match line {
            Ok(line) => {
                let line = line.trim_end_matches('\r');
                if line.is_empty() {
                    continue;
                }
                log.append(format!("{} {}", prefix, line));
                lines.push(line.to_owned());
            }
            Err(err) => {
                warn!("Stopped reading the {} stream: {}", prefix, err);
                break;
            }
        }
    }
    lines
}
