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

//! The append-only log of a packaging run.
//!
//! A [`BuildLog`] is a cheaply clonable handle. Every clone appends to the
//! same ordered list of lines, so the stdout and stderr readers of a
//! subprocess can write to it at the same time. A front end that wants to
//! show progress registers a listener with [`BuildLog::with_listener`]; the
//! listener runs on whichever thread appended the line, and marshaling onto a
//! UI thread is the listener's job.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

type Listener = Arc<dyn Fn(&str) + Send + Sync>;

/// An ordered, append-only sequence of log lines shared by every stage of a
/// run.
#[derive(Clone, Default)]
pub struct BuildLog {
    lines: Arc<Mutex<Vec<String>>>,
    listener: Option<Listener>,
}

impl BuildLog {
    /// Creates an empty log without a listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty log that forwards every appended line to `listener`.
    pub fn with_listener<F>(listener: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        BuildLog {
            lines: Arc::default(),
            listener: Some(Arc::new(listener)),
        }
    }

    /// Appends a line.
    pub fn append<S: Into<String>>(&self, line: S) {
        let line = line.into();
        debug!("{}", line);
        if let Some(listener) = &self.listener {
            listener(&line);
        }
        self.guard().push(line);
    }

    /// Gets a snapshot of every line appended so far.
    pub fn lines(&self) -> Vec<String> {
        self.guard().clone()
    }

    /// Returns true if any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.guard().iter().any(|l| l.contains(needle))
    }

    /// Removes every line. Only used at the start of a new run.
    pub fn clear(&self) {
        self.guard().clear();
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<String>> {
        // A reader thread that panicked mid-push leaves the lines intact.
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for BuildLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildLog")
            .field("lines", &self.len())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
