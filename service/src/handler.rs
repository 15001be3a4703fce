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

//! Handler traits for the session layer

use crate::{BoxError, ExternalProcess, HandlerKind, Session};
use async_trait::async_trait;
use std::sync::Arc;

/// What the dispatcher does after a handler has processed a line.
pub enum Handoff {
    /// Keep the current handler
    Stay,
    /// Retire the current handler in favour of another
    Replace(Box<dyn SessionHandler>),
    /// Lend the socket to an external process, then resume the current handler
    External(ExternalProcess),
    /// Flush output and close the session
    Disconnect,
}

impl std::fmt::Debug for Handoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handoff::Stay => f.write_str("Stay"),
            Handoff::Replace(next) => f.debug_tuple("Replace").field(&next.kind()).finish(),
            Handoff::External(process) => f.debug_tuple("External").field(&process.program()).finish(),
            Handoff::Disconnect => f.write_str("Disconnect"),
        }
    }
}

/// The active handler of a session.
///
/// Exactly one handler drives a session at a time. The dispatcher alternates
/// between [`prompt`](SessionHandler::prompt) and
/// [`handle_input`](SessionHandler::handle_input), so a handler never sees two
/// lines concurrently.
///
/// An `Err` from either method is fatal to the session: it is logged with a
/// correlation id, the user is shown that id, and the session is closed.
///
/// # Example
///
/// ```no_run
/// use havok_service::{BoxError, Handoff, HandlerKind, Session, SessionHandler};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Shout {
///     session: Arc<Session>,
/// }
///
/// #[async_trait]
/// impl SessionHandler for Shout {
///     fn kind(&self) -> HandlerKind {
///         HandlerKind::Command
///     }
///
///     async fn prompt(&mut self) -> Result<String, BoxError> {
///         Ok("> ".to_string())
///     }
///
///     async fn handle_input(&mut self, tokens: Vec<String>) -> Result<Handoff, BoxError> {
///         if tokens.is_empty() {
///             return Ok(Handoff::Disconnect);
///         }
///         self.session.writeln(tokens.join(" ").to_uppercase());
///         Ok(Handoff::Stay)
///     }
/// }
/// ```
#[async_trait]
pub trait SessionHandler: Send + 'static {
    /// Which kind of handler this is
    fn kind(&self) -> HandlerKind;

    /// Text written before the next line is read. Empty for none.
    async fn prompt(&mut self) -> Result<String, BoxError>;

    /// Process one whitespace tokenized line.
    async fn handle_input(&mut self, tokens: Vec<String>) -> Result<Handoff, BoxError>;
}

/// Builds the first handler of every accepted session.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    /// Called once per session before its first prompt.
    async fn create(&self, session: Arc<Session>) -> Result<Box<dyn SessionHandler>, BoxError>;
}
