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

//! Integration tests for sessions over real sockets

use async_trait::async_trait;
use havok_service::{
    APOLOGY, BoxError, ExternalProcess, Handoff, HandlerKind, ServiceConfig, Session,
    SessionFactory, SessionHandler, TelnetServer,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};

/// Writes back whatever it is given, with a few control words.
struct Echo {
    session: Arc<Session>,
    exited: Arc<AtomicBool>,
}

#[async_trait]
impl SessionHandler for Echo {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Login
    }

    async fn prompt(&mut self) -> Result<String, BoxError> {
        Ok("> ".to_string())
    }

    async fn handle_input(&mut self, tokens: Vec<String>) -> Result<Handoff, BoxError> {
        match tokens.first().map(String::as_str) {
            Some("boom") => Err("handler exploded".into()),
            Some("quit") => {
                self.session.writeln("Bye");
                Ok(Handoff::Disconnect)
            }
            Some("noecho") => {
                self.session.set_echo(false);
                Ok(Handoff::Stay)
            }
            Some("echo") => {
                self.session.set_echo(true);
                Ok(Handoff::Stay)
            }
            Some("color") => {
                self.session.set_ansi(true);
                self.session.writeln("$c0009red");
                Ok(Handoff::Stay)
            }
            Some("swap") => Ok(Handoff::Replace(Box::new(Shout {
                session: self.session.clone(),
            }))),
            Some("run") => {
                let exited = self.exited.clone();
                let process = ExternalProcess::new("sh")
                    .with_args(["-c", "printf external"])
                    .with_on_exit(Box::new(move |_status| {
                        Box::pin(async move {
                            exited.store(true, Ordering::SeqCst);
                            Ok(())
                        })
                    }));
                Ok(Handoff::External(process))
            }
            Some("unsaved") => {
                let process = ExternalProcess::new("sh")
                    .with_args(["-c", "true"])
                    .with_on_exit(Box::new(|_status| {
                        Box::pin(async { Err::<(), BoxError>("disk full".into()) })
                    }));
                Ok(Handoff::External(process))
            }
            Some("missing") => Ok(Handoff::External(ExternalProcess::new(
                "/nonexistent/havok-editor",
            ))),
            _ => {
                self.session.writeln(format!("got: {}", tokens.join(" ")));
                Ok(Handoff::Stay)
            }
        }
    }
}

struct Shout {
    session: Arc<Session>,
}

#[async_trait]
impl SessionHandler for Shout {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Command
    }

    async fn prompt(&mut self) -> Result<String, BoxError> {
        Ok("! ".to_string())
    }

    async fn handle_input(&mut self, tokens: Vec<String>) -> Result<Handoff, BoxError> {
        self.session.writeln(tokens.join(" ").to_uppercase());
        Ok(Handoff::Stay)
    }
}

struct Factory {
    exited: Arc<AtomicBool>,
}

#[async_trait]
impl SessionFactory for Factory {
    async fn create(&self, session: Arc<Session>) -> Result<Box<dyn SessionHandler>, BoxError> {
        Ok(Box::new(Echo {
            session,
            exited: self.exited.clone(),
        }))
    }
}

async fn start() -> (TelnetServer, Arc<AtomicBool>) {
    let exited = Arc::new(AtomicBool::new(false));
    let server = TelnetServer::new(ServiceConfig::new("127.0.0.1:0".parse().unwrap()))
        .await
        .unwrap();
    server
        .start(Arc::new(Factory {
            exited: exited.clone(),
        }))
        .await
        .unwrap();
    (server, exited)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Read until `needle` has been seen, returning everything read.
async fn read_until(stream: &mut TcpStream, needle: &[u8]) -> Vec<u8> {
    let mut seen = Vec::new();
    let mut buffer = [0u8; 1024];
    timeout(Duration::from_secs(5), async {
        while !contains(&seen, needle) {
            let count = stream.read(&mut buffer).await.unwrap();
            assert!(count > 0, "closed before {:?} in {:?}", needle, seen);
            seen.extend_from_slice(&buffer[..count]);
        }
    })
    .await
    .expect("timed out waiting for output");
    seen
}

async fn read_to_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut seen = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut seen))
        .await
        .expect("timed out waiting for close")
        .unwrap();
    seen
}

#[tokio::test]
async fn test_prompt_and_dispatch() {
    let (server, _) = start().await;
    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    read_until(&mut client, b"> ").await;
    client.write_all(b"hello   world\r\n").await.unwrap();
    read_until(&mut client, b"got: hello world\r\n> ").await;

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_telnet_commands_and_backspace_are_stripped() {
    let (server, _) = start().await;
    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    read_until(&mut client, b"> ").await;
    client.write_all(b"\xff\xfb\x01he\x08ello\xff\xfd\x03\r\n").await.unwrap();
    read_until(&mut client, b"got: hello\r\n").await;

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_handler_error_apologizes_and_disconnects() {
    let (server, _) = start().await;
    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    read_until(&mut client, b"> ").await;
    client.write_all(b"boom\r\n").await.unwrap();
    let output = read_to_close(&mut client).await;
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains(APOLOGY));
    assert!(text.contains("please reference the event as "));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_quit_flushes_then_closes() {
    let (server, _) = start().await;
    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    read_until(&mut client, b"> ").await;
    client.write_all(b"quit\r\n").await.unwrap();
    let output = read_to_close(&mut client).await;
    assert!(contains(&output, b"Bye\r\n"));

    timeout(Duration::from_secs(5), async {
        while !server.registry().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session never left the registry");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_echo_negotiation() {
    let (server, _) = start().await;
    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    read_until(&mut client, b"> ").await;
    client.write_all(b"noecho\r\n").await.unwrap();
    read_until(&mut client, b"\xff\xfb\x01> ").await;

    client.write_all(b"echo\r\n").await.unwrap();
    read_until(&mut client, b"\xff\xfc\x01\r\n> ").await;

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_colour_markup_rendered_when_enabled() {
    let (server, _) = start().await;
    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    read_until(&mut client, b"> ").await;
    client.write_all(b"color\r\n").await.unwrap();
    let output = read_until(&mut client, b"red").await;
    assert!(contains(&output, b"\x1b["));
    assert!(!contains(&output, b"$c0009"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_handler_replacement() {
    let (server, _) = start().await;
    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    read_until(&mut client, b"> ").await;
    client.write_all(b"swap\r\n").await.unwrap();
    read_until(&mut client, b"! ").await;
    assert_eq!(
        server.registry().snapshot()[0].handler_kind(),
        HandlerKind::Command
    );

    client.write_all(b"quiet please\r\n").await.unwrap();
    read_until(&mut client, b"QUIET PLEASE\r\n! ").await;

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_external_process_restores_line_mode_and_handler() {
    let (server, exited) = start().await;
    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    read_until(&mut client, b"> ").await;
    client.write_all(b"run\r\n").await.unwrap();
    let output = read_until(&mut client, b"\xff\xfc\x01\r\n> ").await;

    // echo off, DO LINEMODE and character mode precede the child's output
    let engaged = b"\xff\xfb\x01\xff\xfd\x22\xff\xfa\x22\x01\x00\xff\xf0";
    assert!(contains(&output, engaged));
    assert!(contains(&output, b"external"));
    assert!(contains(&output, b"\xff\xfa\x22\x01\x11\xff\xf0"));
    assert!(exited.load(Ordering::SeqCst));

    client.write_all(b"after\r\n").await.unwrap();
    read_until(&mut client, b"got: after\r\n").await;

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_external_exit_callback_failure_is_reported_apart_from_launch_failure() {
    let (server, _) = start().await;
    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    read_until(&mut client, b"> ").await;
    client.write_all(b"unsaved\r\n").await.unwrap();
    let output = read_until(&mut client, b"sh finished, but its result could not be saved.\r\n").await;
    assert!(!contains(&output, b"Unable to run"));

    client.write_all(b"missing\r\n").await.unwrap();
    read_until(&mut client, b"Unable to run /nonexistent/havok-editor.\r\n").await;

    client.write_all(b"after\r\n").await.unwrap();
    read_until(&mut client, b"got: after\r\n").await;

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_broadcast_reaches_every_session() {
    let (server, _) = start().await;
    let mut first = TcpStream::connect(server.bind_address()).await.unwrap();
    let mut second = TcpStream::connect(server.bind_address()).await.unwrap();
    read_until(&mut first, b"> ").await;
    read_until(&mut second, b"> ").await;

    let result = server.registry().broadcast("attention", None);
    assert_eq!(result.total, 2);
    assert_eq!(result.delivered, 2);
    read_until(&mut first, b"attention\r\n").await;
    read_until(&mut second, b"attention\r\n").await;

    let listing = server.registry().list();
    assert_eq!(listing.len(), 2);
    assert!(listing[0].id < listing[1].id);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_sessions() {
    let (server, _) = start().await;
    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();
    read_until(&mut client, b"> ").await;

    server.shutdown().await.unwrap();
    read_to_close(&mut client).await;
    assert!(server.registry().is_empty());
}
