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

//! Session dispatch worker
//!
//! The SessionWorker drives one session's handler chain:
//! - prompt, read one line, tokenize, dispatch
//! - handler replacement (login to command)
//! - external process hand-off with restoration of the prior handler
//! - session-fatal error reporting
//! - registry and metrics cleanup

use crate::{
    BoxError, Handoff, HandlerKind, ServerMetrics, Session, SessionFactory, SessionHandler,
    SessionInput, SessionRegistry, ServiceError,
};
use futures::FutureExt;
use metrics::counter;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// First line of the apology shown when a handler fails
pub const APOLOGY: &str =
    "Something has gone wrong server-side.  If you wish to refer to this in a support request";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Remote,
    Local,
}

/// Drives the handler chain of a single session.
pub struct SessionWorker {
    session: Arc<Session>,
    input: SessionInput,
    registry: Arc<SessionRegistry>,
    metrics: Arc<ServerMetrics>,
    idle_timeout: Option<Duration>,
}

impl SessionWorker {
    /// Create a worker for a freshly accepted session
    pub fn new(
        session: Arc<Session>,
        input: SessionInput,
        registry: Arc<SessionRegistry>,
        metrics: Arc<ServerMetrics>,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            session,
            input,
            registry,
            metrics,
            idle_timeout,
        }
    }

    /// Run until the session ends.
    pub async fn run(mut self, factory: Arc<dyn SessionFactory>) {
        counter!("havokmud.sessions.total").increment(1);
        let ending = match AssertUnwindSafe(factory.create(self.session.clone()))
            .catch_unwind()
            .await
        {
            Ok(Ok(handler)) => self.dispatch_loop(handler).await,
            Ok(Err(err)) => self.fatal(err),
            Err(_) => self.fatal("session factory panicked".into()),
        };

        match ending {
            Ending::Remote => info!(session_id = %self.session.id(), "Disconnected {} (remote)", self.session.peer_addr()),
            Ending::Local => info!(session_id = %self.session.id(), "Disconnected {} (local)", self.session.peer_addr()),
        }
        self.registry.remove(self.session.id());
        self.metrics
            .session_closed(self.session.connected_at().elapsed());
        self.session.disconnect();
    }

    async fn dispatch_loop(&mut self, mut handler: Box<dyn SessionHandler>) -> Ending {
        self.session.set_handler_kind(handler.kind());
        loop {
            if self.session.is_closed() {
                return Ending::Remote;
            }

            let prompt = match AssertUnwindSafe(handler.prompt()).catch_unwind().await {
                Ok(Ok(prompt)) => prompt,
                Ok(Err(err)) => return self.fatal(err),
                Err(_) => return self.fatal("handler panicked while prompting".into()),
            };
            if !prompt.is_empty() {
                self.session.write(prompt);
            }

            let Some(line) = self.next_line().await else {
                return Ending::Remote;
            };
            self.metrics.line_received();
            let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();

            let handoff = match AssertUnwindSafe(handler.handle_input(tokens))
                .catch_unwind()
                .await
            {
                Ok(Ok(handoff)) => handoff,
                Ok(Err(err)) => return self.fatal(err),
                Err(_) => return self.fatal("handler panicked while handling input".into()),
            };

            match handoff {
                Handoff::Stay => {}
                Handoff::Replace(next) => {
                    debug!(
                        session_id = %self.session.id(),
                        from = %handler.kind(),
                        to = %next.kind(),
                        "Handler replaced"
                    );
                    handler = next;
                    self.session.set_handler_kind(handler.kind());
                }
                Handoff::External(process) => {
                    let program = process.program().to_string();
                    self.metrics.external_process();
                    self.session.set_handler_kind(HandlerKind::ExternalProcess);
                    match process.run(&self.session).await {
                        Ok(_) => {}
                        Err(err @ ServiceError::ExitCallback { .. }) => {
                            warn!(
                                session_id = %self.session.id(),
                                program = %program,
                                error = %err,
                                "External process result was not applied"
                            );
                            self.session
                                .writeln(format!("{} finished, but its result could not be saved.", program));
                        }
                        Err(err) => {
                            warn!(
                                session_id = %self.session.id(),
                                program = %program,
                                error = %err,
                                "External process failed"
                            );
                            self.session
                                .writeln(format!("Unable to run {}.", program));
                        }
                    }
                    self.session.set_handler_kind(handler.kind());
                }
                Handoff::Disconnect => return Ending::Local,
            }
        }
    }

    async fn next_line(&mut self) -> Option<String> {
        let session = self.session.clone();
        let read = async {
            match self.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, self.input.read_line()).await {
                    Ok(line) => line,
                    Err(_) => {
                        info!(session_id = %session.id(), "Idle timeout");
                        self.metrics.timeout();
                        session.writeln("Idle timeout, disconnecting.");
                        None
                    }
                },
                None => self.input.read_line().await,
            }
        };
        tokio::select! {
            line = read => line,
            _ = session.closed() => None,
        }
    }

    fn fatal(&self, err: BoxError) -> Ending {
        let bug_id = Uuid::new_v4();
        error!(
            session_id = %self.session.id(),
            bug_id = %bug_id,
            error = %err,
            "Session handler failed"
        );
        self.metrics.fatal_error();
        counter!("havokmud.sessions.fatal").increment(1);
        self.session.writeln(APOLOGY);
        self.session
            .writeln(format!("please reference the event as {}", bug_id));
        Ending::Local
    }
}
