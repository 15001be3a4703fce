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

//! Telnet server implementation
//!
//! The TelnetServer owns the TCP listener, accepts connections, and spawns a
//! [`SessionWorker`] per connection with the handler built by the
//! application's [`SessionFactory`].

use crate::{
    Result, ServerMetrics, ServerSnapshot, ServiceConfig, ServiceError, Session, SessionFactory,
    SessionRegistry, SessionWorker,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Telnet server
///
/// # Example
///
/// ```no_run
/// use havok_service::{BoxError, Session, SessionFactory, SessionHandler, ServiceConfig, TelnetServer};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Factory;
///
/// #[async_trait]
/// impl SessionFactory for Factory {
///     async fn create(&self, session: Arc<Session>) -> Result<Box<dyn SessionHandler>, BoxError> {
///         Err("no handlers yet".into())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = TelnetServer::new(ServiceConfig::default()).await?;
///     server.start(Arc::new(Factory)).await?;
///     tokio::signal::ctrl_c().await?;
///     server.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct TelnetServer {
    config: ServiceConfig,
    registry: Arc<SessionRegistry>,
    metrics: Arc<ServerMetrics>,
    listener: Mutex<Option<TcpListener>>,
    bind_address: SocketAddr,
    started_at: Instant,
    running: Arc<AtomicBool>,
    shutdown: CancellationToken,
    accept_handle: Mutex<Option<JoinHandle<()>>>,
}

impl TelnetServer {
    /// Bind the configured address without accepting yet.
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        Self::with_registry(config, Arc::new(SessionRegistry::new())).await
    }

    /// Bind using an existing registry shared with the application.
    pub async fn with_registry(config: ServiceConfig, registry: Arc<SessionRegistry>) -> Result<Self> {
        config.validate().map_err(ServiceError::InvalidConfig)?;
        let listener = TcpListener::bind(config.bind_address).await?;
        let bind_address = listener.local_addr()?;

        tracing::info!("Telnet server bound to {}", bind_address);

        Ok(Self {
            config,
            registry,
            metrics: Arc::new(ServerMetrics::new()),
            listener: Mutex::new(Some(listener)),
            bind_address,
            started_at: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
            accept_handle: Mutex::new(None),
        })
    }

    /// Start accepting connections.
    pub async fn start(&self, factory: Arc<dyn SessionFactory>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServiceError::ServerAlreadyRunning);
        }
        let Some(listener) = self.listener.lock().await.take() else {
            self.running.store(false, Ordering::SeqCst);
            return Err(ServiceError::ServerNotRunning);
        };

        tracing::info!("Starting Telnet server on {}", self.bind_address);
        let handle = tokio::spawn(accept_loop(
            listener,
            factory,
            self.config.clone(),
            self.registry.clone(),
            self.metrics.clone(),
            self.shutdown.clone(),
        ));
        *self.accept_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop accepting and close every session.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::ServerNotRunning);
        }

        tracing::info!("Shutting down Telnet server");
        self.shutdown.cancel();
        if let Some(handle) = self.accept_handle.lock().await.take() {
            let _ = tokio::time::timeout(self.config.shutdown_timeout, handle).await;
        }

        let closing = self.registry.disconnect_all();
        let deadline = Instant::now() + self.config.shutdown_timeout;
        while !self.registry.is_empty() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        for session in self.registry.snapshot() {
            session.abort();
        }

        tracing::info!(sessions = closing, "Telnet server shutdown complete");
        Ok(())
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the server's bind address
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Get the number of live sessions
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            active_sessions: self.registry.len(),
            total_sessions: self.metrics.total_sessions(),
            bind_address: self.bind_address,
            uptime: self.started_at.elapsed(),
        }
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Get the session registry
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

async fn accept_loop(
    listener: TcpListener,
    factory: Arc<dyn SessionFactory>,
    config: ServiceConfig,
    registry: Arc<SessionRegistry>,
    metrics: Arc<ServerMetrics>,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            result = listener.accept() => result,
            _ = shutdown.cancelled() => break,
        };

        match accepted {
            Ok((socket, peer_addr)) => {
                if registry.len() >= config.max_sessions {
                    tracing::warn!(
                        "Session limit reached ({}), rejecting connection from {}",
                        config.max_sessions,
                        peer_addr
                    );
                    metrics.session_rejected();
                    drop(socket);
                    continue;
                }

                let id = registry.next_id();
                match Session::spawn(id, socket, &config) {
                    Ok((session, input)) => {
                        registry.insert(&session);
                        metrics.session_opened();
                        tracing::info!(session_id = %id, "Connected {}", peer_addr);
                        let worker = SessionWorker::new(
                            session,
                            input,
                            registry.clone(),
                            metrics.clone(),
                            config.idle_timeout,
                        );
                        tokio::spawn(worker.run(factory.clone()));
                    }
                    Err(e) => {
                        tracing::error!("Failed to set up session for {}: {}", peer_addr, e);
                        metrics.accept_error();
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to accept connection: {}", e);
                metrics.accept_error();
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }

    tracing::info!("Accept loop terminated");
}

impl std::fmt::Debug for TelnetServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetServer")
            .field("bind_address", &self.bind_address)
            .field("running", &self.is_running())
            .field("session_count", &self.session_count())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

impl Drop for TelnetServer {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            tracing::warn!("TelnetServer dropped while still running");
            self.running.store(false, Ordering::SeqCst);
            self.shutdown.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxError, SessionHandler};
    use async_trait::async_trait;
    use tracing_test::traced_test;

    struct Refuse;

    #[async_trait]
    impl SessionFactory for Refuse {
        async fn create(&self, _session: Arc<Session>) -> std::result::Result<Box<dyn SessionHandler>, BoxError> {
            Err("refused".into())
        }
    }

    fn config() -> ServiceConfig {
        ServiceConfig::new("127.0.0.1:0".parse().unwrap())
    }

    #[tokio::test]
    async fn test_server_lifecycle() {
        let server = TelnetServer::new(config()).await.unwrap();
        assert!(!server.is_running());

        server.start(Arc::new(Refuse)).await.unwrap();
        assert!(server.is_running());

        server.shutdown().await.unwrap();
        assert!(!server.is_running());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_server_snapshot() {
        let server = TelnetServer::new(config()).await.unwrap();
        assert!(logs_contain("Telnet server bound to"));
        let snapshot = server.snapshot();
        assert_eq!(snapshot.active_sessions, 0);
        assert_eq!(snapshot.total_sessions, 0);
        assert_ne!(snapshot.bind_address.port(), 0);
    }

    #[tokio::test]
    async fn test_server_double_start() {
        let server = TelnetServer::new(config()).await.unwrap();
        server.start(Arc::new(Refuse)).await.unwrap();
        assert!(matches!(
            server.start(Arc::new(Refuse)).await,
            Err(ServiceError::ServerAlreadyRunning)
        ));
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let result = TelnetServer::new(config().with_max_sessions(0)).await;
        assert!(matches!(result, Err(ServiceError::InvalidConfig(_))));
    }
}
