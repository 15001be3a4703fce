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

//! # HavokMud Mediator
//!
//! Every collaborator the MUD depends on (the record store, reverse DNS,
//! outbound email, the auth cache) sits behind a [`ResourceActor`]: a single
//! task that owns the resource and handles one request at a time. Sessions
//! talk to it through a cloneable [`Mediator`] handle and await a oneshot
//! reply, so any number of sessions can share a resource without locks and
//! without racing each other's read-modify-write cycles.
//!
//! ## Core Components
//!
//! - [`Resource`]: the trait a collaborator implements, one closed request
//!   enum per resource.
//! - [`ResourceActor`] / [`Mediator`]: the actor loop and its handle.
//!   Resource errors and panics are returned to the caller that caused them
//!   and never stop the loop.
//! - [`StoreHandle`], [`DnsHandle`], [`EmailHandle`], [`CacheHandle`]: typed
//!   facades over the concrete resources.
//!
//! ## Usage Example
//!
//! ```rust
//! use havok_mediator::{StoreHandle, Table, key};
//! use serde_json::json;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let store = StoreHandle::spawn([("settings", Table::in_memory(["key"]))]);
//!     store
//!         .put("settings", &json!({"key": "motd", "value": "Welcome!"}))
//!         .await
//!         .unwrap();
//!     let motd = store.get_item("settings", key([("key", "motd")])).await.unwrap();
//!     assert!(motd.is_some());
//! });
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod actor;
mod cache;
mod dns;
mod email;
mod error;
mod store;

pub use self::actor::{DEFAULT_QUEUE_DEPTH, Mediator, Resource, ResourceActor};
pub use self::cache::{Cache, CacheError, CacheHandle, CacheRequest};
pub use self::dns::{DnsError, DnsHandle, DnsRequest, Resolver, UNKNOWN_HOST};
pub use self::email::{Email, EmailError, EmailHandle, EmailRequest, EmailTransport};
pub use self::error::{MediatorError, MediatorResult};
pub use self::store::{Record, StoreError, StoreHandle, StoreReply, StoreRequest, Table, key};
