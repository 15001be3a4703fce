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

//! Resource actor implementation
//!
//! A [`ResourceActor`] owns a set of resources keyed by `K` and drains a
//! single request queue. Exactly one request is in flight at any time, so a
//! read-modify-write performed inside [`Resource::handle`] can never
//! interleave with another caller's request. This replaces row locking for
//! every collaborator the MUD talks to.
//!
//! Callers never see the actor directly; they hold a cloneable [`Mediator`]
//! handle and await the reply on a oneshot channel. A caller that goes away
//! before its reply arrives simply drops the reply.

use crate::{MediatorError, MediatorResult};
use async_trait::async_trait;
use futures::FutureExt;
use metrics::counter;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

/// Default depth of an actor's request queue
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

/// A collaborator driven by a [`ResourceActor`].
#[async_trait]
pub trait Resource: Send + 'static {
    /// Closed set of operations the resource understands
    type Request: Send + 'static;
    /// Successful outcome of an operation
    type Reply: Send + 'static;
    /// Failure reported by the resource
    type Error: std::error::Error + Send + Sync + 'static;

    /// Handle one request. Never called concurrently for the same actor.
    async fn handle(&mut self, request: Self::Request) -> Result<Self::Reply, Self::Error>;
}

type ReplySender<R> = oneshot::Sender<
    MediatorResult<<R as Resource>::Reply, <R as Resource>::Error>,
>;

enum Command<K, R: Resource> {
    Register {
        key: K,
        resource: R,
    },
    Request {
        key: K,
        request: R::Request,
        reply: Option<ReplySender<R>>,
    },
}

/// Single-consumer task serializing access to its resources.
pub struct ResourceActor<K, R: Resource> {
    name: &'static str,
    resources: HashMap<K, R>,
    receiver: mpsc::Receiver<Command<K, R>>,
}

impl<K, R> ResourceActor<K, R>
where
    K: Eq + Hash + Debug + Send + 'static,
    R: Resource,
{
    /// Spawn an actor over `resources` and return its handle.
    pub fn spawn(
        name: &'static str,
        resources: impl IntoIterator<Item = (K, R)>,
        queue_depth: usize,
    ) -> Mediator<K, R> {
        let (sender, receiver) = mpsc::channel(queue_depth.max(1));
        let actor = ResourceActor {
            name,
            resources: resources.into_iter().collect(),
            receiver,
        };
        tokio::spawn(actor.run());
        Mediator { name, sender }
    }

    async fn run(mut self) {
        debug!(resource = self.name, "Resource actor started");
        while let Some(command) = self.receiver.recv().await {
            match command {
                Command::Register { key, resource } => {
                    debug!(resource = self.name, key = ?key, "Registered resource");
                    self.resources.insert(key, resource);
                }
                Command::Request {
                    key,
                    request,
                    reply,
                } => {
                    let outcome = self.dispatch(key, request).await;
                    if let Some(reply) = reply {
                        // The caller may have given up waiting
                        let _ = reply.send(outcome);
                    }
                }
            }
        }
        debug!(resource = self.name, "Resource actor stopped");
    }

    async fn dispatch(&mut self, key: K, request: R::Request) -> MediatorResult<R::Reply, R::Error> {
        counter!("havokmud.mediator.requests", "resource" => self.name).increment(1);
        let Some(resource) = self.resources.get_mut(&key) else {
            warn!(resource = self.name, key = ?key, "No handler for request");
            return Err(MediatorError::NoHandler(format!("{:?}", key)));
        };
        match AssertUnwindSafe(resource.handle(request)).catch_unwind().await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(err)) => {
                counter!("havokmud.mediator.failures", "resource" => self.name).increment(1);
                warn!(resource = self.name, key = ?key, error = %err, "Resource request failed");
                Err(MediatorError::Failed(err))
            }
            Err(_) => {
                counter!("havokmud.mediator.panics", "resource" => self.name).increment(1);
                error!(resource = self.name, key = ?key, "Resource panicked handling request");
                Err(MediatorError::Panicked)
            }
        }
    }
}

/// Cloneable handle to a [`ResourceActor`].
pub struct Mediator<K, R: Resource> {
    name: &'static str,
    sender: mpsc::Sender<Command<K, R>>,
}

impl<K, R: Resource> Clone for Mediator<K, R> {
    fn clone(&self) -> Self {
        Mediator {
            name: self.name,
            sender: self.sender.clone(),
        }
    }
}

impl<K, R: Resource> Debug for Mediator<K, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("name", &self.name)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl<K, R> Mediator<K, R>
where
    K: Send + 'static,
    R: Resource,
{
    /// Name the actor was spawned with
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Submit a request to the resource under `key` and wait for its reply.
    pub async fn submit(&self, key: K, request: R::Request) -> MediatorResult<R::Reply, R::Error> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Command::Request {
                key,
                request,
                reply: Some(reply),
            })
            .await
            .map_err(|_| MediatorError::Closed)?;
        response.await.map_err(|_| MediatorError::Closed)?
    }

    /// Queue a request without waiting for the outcome.
    pub async fn cast(&self, key: K, request: R::Request) -> MediatorResult<(), R::Error> {
        self.sender
            .send(Command::Request {
                key,
                request,
                reply: None,
            })
            .await
            .map_err(|_| MediatorError::Closed)
    }

    /// Add or replace the resource under `key`.
    ///
    /// Requests queued before the registration still see the old resource.
    pub async fn register(&self, key: K, resource: R) -> MediatorResult<(), R::Error> {
        self.sender
            .send(Command::Register { key, resource })
            .await
            .map_err(|_| MediatorError::Closed)
    }
}

impl<R: Resource> Mediator<(), R> {
    /// Spawn an actor around a single resource.
    pub fn single(name: &'static str, resource: R) -> Mediator<(), R> {
        ResourceActor::spawn(name, [((), resource)], DEFAULT_QUEUE_DEPTH)
    }

    /// Submit a request to the only resource.
    pub async fn call(&self, request: R::Request) -> MediatorResult<R::Reply, R::Error> {
        self.submit((), request).await
    }

    /// Queue a request to the only resource without waiting.
    pub async fn tell(&self, request: R::Request) -> MediatorResult<(), R::Error> {
        self.cast((), request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct Echo;

    #[async_trait]
    impl Resource for Echo {
        type Request = String;
        type Reply = String;
        type Error = io::Error;

        async fn handle(&mut self, request: String) -> Result<String, io::Error> {
            match request.as_str() {
                "fail" => Err(io::Error::other("asked to fail")),
                "panic" => panic!("asked to panic"),
                _ => Ok(request.to_uppercase()),
            }
        }
    }

    #[tokio::test]
    async fn test_call_round_trip() {
        let echo = Mediator::single("echo", Echo);
        assert_eq!(echo.call("hello".to_string()).await.unwrap(), "HELLO");
        assert_eq!(echo.name(), "echo");
    }

    #[tokio::test]
    async fn test_unknown_key_is_no_handler() {
        let mediator = ResourceActor::spawn("echo", [("a", Echo)], 4);
        let err = mediator.submit("b", "x".to_string()).await.unwrap_err();
        assert!(matches!(err, MediatorError::NoHandler(ref key) if key == "\"b\""));
    }

    #[tokio::test]
    async fn test_failures_reach_only_the_caller() {
        let echo = Mediator::single("echo", Echo);
        let err = echo.call("fail".to_string()).await.unwrap_err();
        assert_eq!(err.resource_error().map(|e| e.to_string()).as_deref(), Some("asked to fail"));
        assert_eq!(echo.call("still here".to_string()).await.unwrap(), "STILL HERE");
    }

    #[tokio::test]
    async fn test_panics_do_not_kill_the_actor() {
        let echo = Mediator::single("echo", Echo);
        assert!(matches!(
            echo.call("panic".to_string()).await,
            Err(MediatorError::Panicked)
        ));
        assert_eq!(echo.call("ok".to_string()).await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_register_adds_resource() {
        let mediator: Mediator<&str, Echo> = ResourceActor::spawn("echo", [], 4);
        mediator.register("late", Echo).await.unwrap();
        assert_eq!(mediator.submit("late", "x".to_string()).await.unwrap(), "X");
    }
}
