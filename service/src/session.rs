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

//! Per-connection session
//!
//! A [`Session`] is split across three tasks:
//!
//! - a reader task owning the socket's read half, framing input with the
//!   [`LineCodec`] and feeding complete lines to the dispatcher, or raw bytes
//!   to an external process while one owns the socket,
//! - a writer task owning the write half, draining the output queue and
//!   rendering colour markup, echo negotiation and deferred output,
//! - the dispatcher ([`SessionWorker`](crate::SessionWorker)) that drives the
//!   active handler.
//!
//! Output is queued on an unbounded channel so any task may append to a
//! session without awaiting. Output queued before [`Session::disconnect`] is
//! flushed before the socket closes.

use crate::{HandlerKind, Result, ServiceConfig, SessionId, SessionInfo};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use havok_telnetcodec::{Inbound, LineCodec, TelnetEncoder, TelnetOutput};
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, trace, warn};

/// Output rendered only when the writer reaches it.
#[async_trait]
pub trait DeferredOutput: Send + 'static {
    /// Produce the text to send. Colour markup is applied afterwards.
    async fn render(self: Box<Self>) -> String;
}

/// An item on a session's output queue
pub enum Outbound {
    /// Text sent as is
    Text(String),
    /// Text followed by CRLF
    Line(String),
    /// Echo negotiation, `true` lets the client echo locally
    Echo(bool),
    /// Telnet negotiation or subnegotiation frame
    Telnet(TelnetOutput),
    /// Bytes passed through without markup rendering
    Raw(Bytes),
    /// Text produced by a renderer when dequeued
    Deferred(Box<dyn DeferredOutput>),
    /// Close the socket once everything before this item is written
    Disconnect,
}

impl fmt::Debug for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outbound::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Outbound::Line(text) => f.debug_tuple("Line").field(text).finish(),
            Outbound::Echo(on) => f.debug_tuple("Echo").field(on).finish(),
            Outbound::Telnet(frame) => f.debug_tuple("Telnet").field(frame).finish(),
            Outbound::Raw(bytes) => f.debug_tuple("Raw").field(&bytes.len()).finish(),
            Outbound::Deferred(_) => f.write_str("Deferred"),
            Outbound::Disconnect => f.write_str("Disconnect"),
        }
    }
}

/// Where the reader task delivers input
#[derive(Clone, Debug)]
pub(crate) enum ReaderMode {
    /// Framed lines to the dispatcher
    Lines,
    /// Unframed bytes to an external process
    Raw(mpsc::Sender<Bytes>),
}

/// Lines framed by a session's reader task.
#[derive(Debug)]
pub struct SessionInput {
    lines: mpsc::Receiver<String>,
}

impl SessionInput {
    /// Next line, or `None` once the remote side has gone away.
    pub async fn read_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }
}

/// A connected client.
pub struct Session {
    id: SessionId,
    peer_addr: SocketAddr,
    connected_at: Instant,
    hostname: RwLock<String>,
    name: RwLock<Option<String>>,
    echo: AtomicBool,
    ansi: AtomicBool,
    handler: AtomicU8,
    outbound: mpsc::UnboundedSender<Outbound>,
    reader_mode: watch::Sender<ReaderMode>,
    closed: CancellationToken,
}

impl Session {
    /// Split `stream` and start the reader and writer tasks.
    pub fn spawn(
        id: SessionId,
        stream: TcpStream,
        config: &ServiceConfig,
    ) -> Result<(Arc<Session>, SessionInput)> {
        let peer_addr = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (lines_tx, lines) = mpsc::channel(config.input_queue_depth.max(1));
        let (reader_mode, mode_rx) = watch::channel(ReaderMode::Lines);

        let session = Arc::new(Session {
            id,
            peer_addr,
            connected_at: Instant::now(),
            hostname: RwLock::new(peer_addr.ip().to_string()),
            name: RwLock::new(None),
            echo: AtomicBool::new(true),
            ansi: AtomicBool::new(false),
            handler: AtomicU8::new(HandlerKind::Login.as_u8()),
            outbound,
            reader_mode,
            closed: CancellationToken::new(),
        });

        let framed_read =
            FramedRead::new(read_half, LineCodec::with_max_line_length(config.max_line_length));
        tokio::spawn(read_loop(session.clone(), framed_read, lines_tx, mode_rx));

        let framed_write = FramedWrite::new(write_half, TelnetEncoder::new());
        tokio::spawn(write_loop(
            session.clone(),
            framed_write,
            outbound_rx,
            config.write_timeout,
        ));

        Ok((session, SessionInput { lines }))
    }

    /// Session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Remote address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// When the session was accepted
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Reverse-resolved hostname, the peer IP until resolved
    pub fn hostname(&self) -> String {
        self.hostname
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record the resolved hostname
    pub fn set_hostname(&self, hostname: impl Into<String>) {
        *self.hostname.write().unwrap_or_else(PoisonError::into_inner) = hostname.into();
    }

    /// Display name shown in listings and broadcasts
    pub fn name(&self) -> Option<String> {
        self.name.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Set the display name
    pub fn set_name(&self, name: Option<String>) {
        *self.name.write().unwrap_or_else(PoisonError::into_inner) = name;
    }

    /// Whether the client currently echoes its own input
    pub fn echo(&self) -> bool {
        self.echo.load(Ordering::Acquire)
    }

    /// Change echo state, negotiating only on an actual change.
    ///
    /// Turning echo back on also sends an empty line, since the client's own
    /// newline was swallowed while echo was off.
    pub fn set_echo(&self, on: bool) {
        if self.echo.swap(on, Ordering::AcqRel) != on {
            self.push(Outbound::Echo(on));
            if on {
                self.push(Outbound::Line(String::new()));
            }
        }
    }

    /// Whether colour markup is rendered as ANSI escapes
    pub fn ansi(&self) -> bool {
        self.ansi.load(Ordering::Acquire)
    }

    /// Enable or disable colour rendering
    pub fn set_ansi(&self, on: bool) {
        self.ansi.store(on, Ordering::Release);
    }

    /// Kind of handler currently driving the session
    pub fn handler_kind(&self) -> HandlerKind {
        HandlerKind::from_u8(self.handler.load(Ordering::Acquire))
    }

    pub(crate) fn set_handler_kind(&self, kind: HandlerKind) {
        self.handler.store(kind.as_u8(), Ordering::Release);
    }

    /// Queue text
    pub fn write(&self, text: impl Into<String>) {
        self.push(Outbound::Text(text.into()));
    }

    /// Queue a line of text
    pub fn writeln(&self, text: impl Into<String>) {
        self.push(Outbound::Line(text.into()));
    }

    /// Queue bytes that bypass markup rendering
    pub fn send_raw(&self, bytes: Bytes) {
        self.push(Outbound::Raw(bytes));
    }

    /// Queue a telnet negotiation frame
    pub fn send_telnet(&self, frame: TelnetOutput) {
        self.push(Outbound::Telnet(frame));
    }

    /// Queue output rendered when the writer reaches it
    pub fn defer(&self, output: Box<dyn DeferredOutput>) {
        self.push(Outbound::Deferred(output));
    }

    /// Close after flushing everything queued so far.
    pub fn disconnect(&self) {
        self.push(Outbound::Disconnect);
    }

    /// Close immediately, discarding queued output.
    pub fn abort(&self) {
        self.closed.cancel();
    }

    /// Whether the session has closed
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the session has closed
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }

    pub(crate) fn set_reader_mode(&self, mode: ReaderMode) {
        self.reader_mode.send_replace(mode);
    }

    /// Listing snapshot
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            peer_addr: self.peer_addr,
            hostname: self.hostname(),
            name: self.name(),
            handler: self.handler_kind(),
            connected_at: self.connected_at,
        }
    }

    fn push(&self, item: Outbound) {
        if self.outbound.send(item).is_err() {
            trace!(session_id = %self.id, "Dropping output for closed session");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("handler", &self.handler_kind())
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn read_loop(
    session: Arc<Session>,
    mut framed: FramedRead<OwnedReadHalf, LineCodec>,
    lines: mpsc::Sender<String>,
    mut mode_rx: watch::Receiver<ReaderMode>,
) {
    let mut mode = mode_rx.borrow_and_update().clone();
    loop {
        tokio::select! {
            _ = session.closed.cancelled() => break,
            changed = mode_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                mode = mode_rx.borrow_and_update().clone();
                let raw = matches!(mode, ReaderMode::Raw(_));
                if framed.decoder().is_passthrough() != raw {
                    framed.decoder_mut().set_passthrough(raw);
                }
            }
            item = framed.next() => match item {
                Some(Ok(Inbound::Line(line))) => {
                    trace!(session_id = %session.id, line = %line, "Line received");
                    if lines.send(line).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Inbound::Raw(bytes))) => {
                    if let ReaderMode::Raw(process) = &mode {
                        if process.send(bytes).await.is_err() {
                            trace!(session_id = %session.id, "External process stopped reading");
                        }
                    }
                }
                Some(Err(err)) => {
                    debug!(session_id = %session.id, error = %err, "Read failed");
                    break;
                }
                None => {
                    debug!(session_id = %session.id, "Remote closed connection");
                    break;
                }
            }
        }
    }
    session.closed.cancel();
}

async fn write_loop(
    session: Arc<Session>,
    mut framed: FramedWrite<OwnedWriteHalf, TelnetEncoder>,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
    write_timeout: Duration,
) {
    loop {
        let item = tokio::select! {
            _ = session.closed.cancelled() => break,
            item = queue.recv() => item,
        };
        let frame = match item {
            None | Some(Outbound::Disconnect) => break,
            Some(Outbound::Text(text)) => TelnetOutput::Text(havok_ansicodec::render(&text, session.ansi())),
            Some(Outbound::Line(mut text)) => {
                text.push_str("\r\n");
                TelnetOutput::Text(havok_ansicodec::render(&text, session.ansi()))
            }
            Some(Outbound::Echo(true)) => TelnetOutput::echo_on(),
            Some(Outbound::Echo(false)) => TelnetOutput::echo_off(),
            Some(Outbound::Telnet(frame)) => frame,
            Some(Outbound::Raw(bytes)) => TelnetOutput::Raw(bytes),
            Some(Outbound::Deferred(output)) => {
                let text = output.render().await;
                TelnetOutput::Text(havok_ansicodec::render(&text, session.ansi()))
            }
        };
        match tokio::time::timeout(write_timeout, framed.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(session_id = %session.id, error = %err, "Write failed");
                break;
            }
            Err(_) => {
                warn!(session_id = %session.id, "Write timed out");
                break;
            }
        }
    }
    session.closed.cancel();
    if let Err(err) = framed.get_mut().shutdown().await {
        trace!(session_id = %session.id, error = %err, "Socket shutdown failed");
    }
}
