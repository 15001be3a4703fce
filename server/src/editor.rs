//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! External text editor sessions
//!
//! The editor runs against a temporary file with the session's socket handed
//! to it. Once it exits the file is read back, removed, and passed to the
//! caller's callback.

use crate::config::EditorSection;
use futures::future::BoxFuture;
use havok_service::{BoxError, ExternalProcess};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Receives the edited text
pub type EditCallback =
    Box<dyn FnOnce(String) -> BoxFuture<'static, Result<(), BoxError>> + Send + 'static>;

/// Temporary file removed when dropped, whether or not the editor ever ran
#[derive(Debug)]
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn new() -> Self {
        Self {
            path: std::env::temp_dir().join(format!("havokmud-edit-{}.txt", Uuid::new_v4())),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %err, "Failed to remove editor file");
            }
        }
    }
}

/// Editor launcher
#[derive(Debug, Clone)]
pub struct Editor {
    program: String,
    args: Vec<String>,
}

impl Editor {
    /// Editor running `program` with `args` before the file name
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Editor from the `[editor]` section
    pub fn from_config(config: &EditorSection) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Write `initial` to a scratch file and build the process editing it.
    ///
    /// `on_saved` receives the file's contents after the editor exits.
    pub async fn launch(&self, initial: &str, on_saved: EditCallback) -> Result<ExternalProcess, BoxError> {
        let scratch = ScratchFile::new();
        tokio::fs::write(scratch.path(), initial).await?;
        let file_arg = scratch.path().display().to_string();
        debug!(program = %self.program, file = %file_arg, "Launching editor");

        let process = ExternalProcess::new(self.program.clone())
            .with_args(self.args.iter().cloned().chain(std::iter::once(file_arg)))
            .with_on_exit(Box::new(move |status| {
                Box::pin(async move {
                    let text = tokio::fs::read_to_string(scratch.path()).await?;
                    drop(scratch);
                    debug!(status = %status, bytes = text.len(), "Editor finished");
                    on_saved(text).await
                })
            }));
        Ok(process)
    }
}
