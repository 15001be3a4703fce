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

//! External process hand-off
//!
//! While an [`ExternalProcess`] runs, the session's reader stops framing lines
//! and forwards raw client bytes to the child's stdin; the child's stdout is
//! written back to the client untouched. The client is switched to character
//! mode with local echo off for the duration and restored afterwards by a
//! [`RawModeGuard`], whatever way the child finishes.

use crate::session::ReaderMode;
use crate::{BoxError, ServiceError, Session};
use bytes::Bytes;
use futures::future::BoxFuture;
use havok_telnetcodec::TelnetOutput;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Runs after the child exits, once the session is back in line mode.
pub type ExitCallback =
    Box<dyn FnOnce(ExitStatus) -> BoxFuture<'static, Result<(), BoxError>> + Send + 'static>;

/// An OS process that temporarily owns a session's socket.
pub struct ExternalProcess {
    program: String,
    args: Vec<String>,
    on_exit: Option<ExitCallback>,
}

impl ExternalProcess {
    /// A process running `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            on_exit: None,
        }
    }

    /// Append arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the post-exit callback
    pub fn with_on_exit(mut self, callback: ExitCallback) -> Self {
        self.on_exit = Some(callback);
        self
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Program arguments
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run the process against `session` and then the exit callback.
    ///
    /// The session is back in line mode before the callback runs, whether the
    /// child succeeded, failed to start or the client disconnected meanwhile.
    /// A failing callback is reported as [`ServiceError::ExitCallback`].
    pub async fn run(self, session: &Session) -> Result<ExitStatus, ServiceError> {
        let ExternalProcess {
            program,
            args,
            on_exit,
        } = self;
        let status = {
            let (raw_tx, raw_rx) = mpsc::channel(64);
            let _guard = RawModeGuard::engage(session, raw_tx);
            pump(session, &program, &args, raw_rx).await?
        };
        info!(session_id = %session.id(), program = %program, status = %status, "External process finished");
        if let Some(callback) = on_exit {
            callback(status)
                .await
                .map_err(|source| ServiceError::ExitCallback { program, source })?;
        }
        Ok(status)
    }
}

async fn pump(
    session: &Session,
    program: &str,
    args: &[String],
    mut input: mpsc::Receiver<Bytes>,
) -> Result<ExitStatus, ServiceError> {
    let process_error = |reason: String| ServiceError::Process {
        program: program.to_string(),
        reason,
    };
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| process_error(err.to_string()))?;
    debug!(session_id = %session.id(), program = %program, "External process started");

    let mut stdin = child.stdin.take();
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| process_error("stdout not captured".to_string()))?;
    let mut buffer = vec![0u8; 4096];
    let mut stdout_open = true;

    loop {
        tokio::select! {
            status = child.wait() => {
                let status = status?;
                let mut rest = Vec::new();
                if stdout_open && stdout.read_to_end(&mut rest).await.is_ok() && !rest.is_empty() {
                    session.send_raw(Bytes::from(rest));
                }
                return Ok(status);
            }
            read = stdout.read(&mut buffer), if stdout_open => match read {
                Ok(0) | Err(_) => stdout_open = false,
                Ok(count) => session.send_raw(Bytes::copy_from_slice(&buffer[..count])),
            },
            bytes = input.recv() => match bytes {
                Some(bytes) => {
                    if let Some(pipe) = stdin.as_mut() {
                        if pipe.write_all(&bytes).await.is_err() {
                            stdin = None;
                        }
                    }
                }
                None => {
                    warn!(session_id = %session.id(), program = %program, "Session input closed, stopping process");
                    child.start_kill()?;
                    return Ok(child.wait().await?);
                }
            },
            _ = session.closed() => {
                warn!(session_id = %session.id(), program = %program, "Session closed, stopping process");
                child.start_kill()?;
                return Ok(child.wait().await?);
            }
        }
    }
}

/// Puts a session into raw character mode and restores line mode on drop.
pub struct RawModeGuard<'a> {
    session: &'a Session,
    echo: bool,
}

impl<'a> RawModeGuard<'a> {
    /// Switch `session` to raw mode, routing client bytes to `input`.
    pub(crate) fn engage(session: &'a Session, input: mpsc::Sender<Bytes>) -> Self {
        let echo = session.echo();
        session.set_reader_mode(ReaderMode::Raw(input));
        session.set_echo(false);
        session.send_telnet(TelnetOutput::request_linemode());
        session.send_telnet(TelnetOutput::character_mode());
        RawModeGuard { session, echo }
    }
}

impl Drop for RawModeGuard<'_> {
    fn drop(&mut self) {
        self.session.set_reader_mode(ReaderMode::Lines);
        self.session.send_telnet(TelnetOutput::line_mode());
        self.session.set_echo(self.echo);
    }
}
