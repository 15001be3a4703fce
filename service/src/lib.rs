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

//! HavokMud Session Service
//!
//! This crate accepts telnet connections and runs each one as an independent
//! session with a blocking-looking "prompt, read line, dispatch" loop:
//!
//! - Line framing, telnet stripping and echo negotiation per connection
//! - One active handler per session, swapped atomically by the dispatcher
//! - External process hand-off with guaranteed restoration of line mode
//! - A weakly referenced registry for listings and broadcasts
//! - Session-fatal errors reported to the user with a correlation id
//!
//! # Architecture
//!
//! ```text
//! TelnetServer (accept loop)
//!     ↓
//! SessionWorker → SessionHandler (Login | Command | ExternalProcess)
//!     ↓
//! Session → reader task (LineCodec) / writer task (TelnetEncoder)
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod config;
mod error;
mod external;
mod handler;
mod metrics;
mod registry;
mod server;
mod session;
mod types;
mod worker;

pub use config::ServiceConfig;
pub use error::{BoxError, Result, ServiceError};
pub use external::{ExitCallback, ExternalProcess, RawModeGuard};
pub use handler::{Handoff, SessionFactory, SessionHandler};
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use registry::{BroadcastResult, SessionRegistry};
pub use server::TelnetServer;
pub use session::{DeferredOutput, Outbound, Session, SessionInput};
pub use types::{HandlerKind, ServerSnapshot, SessionId, SessionInfo};
pub use worker::{APOLOGY, SessionWorker};
