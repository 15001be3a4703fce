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

//! Live session registry
//!
//! The registry holds weak references only; a session is owned by its own
//! tasks and disappears from listings as soon as they finish, even before
//! [`SessionRegistry::remove`] runs.

use crate::{Session, SessionId, SessionInfo};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Result of a broadcast operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Sessions in the snapshot
    pub total: usize,
    /// Sessions the text was queued for
    pub delivered: usize,
}

/// Server-wide set of live sessions.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Weak<Session>>,
    next_id: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate the next session ID
    pub fn next_id(&self) -> SessionId {
        SessionId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Add a session
    pub fn insert(&self, session: &Arc<Session>) {
        self.sessions.insert(session.id(), Arc::downgrade(session));
    }

    /// Remove a session
    pub fn remove(&self, id: SessionId) {
        self.sessions.remove(&id);
    }

    /// Look up a live session
    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).and_then(|entry| entry.upgrade())
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is registered
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Live sessions at this instant, ordered by ID.
    ///
    /// Sessions joining or leaving after the call are not reflected.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        let mut live: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .filter_map(|entry| entry.value().upgrade())
            .filter(|session| !session.is_closed())
            .collect();
        live.sort_by_key(|session| session.id());
        live
    }

    /// Listing of live sessions
    pub fn list(&self) -> Vec<SessionInfo> {
        self.snapshot().iter().map(|session| session.info()).collect()
    }

    /// Queue `line` for every live session except `except`
    pub fn broadcast(&self, line: &str, except: Option<SessionId>) -> BroadcastResult {
        let snapshot = self.snapshot();
        let mut delivered = 0;
        for session in &snapshot {
            if Some(session.id()) == except {
                continue;
            }
            session.writeln(line);
            delivered += 1;
        }
        BroadcastResult {
            total: snapshot.len(),
            delivered,
        }
    }

    /// Ask every live session to close after flushing its output
    pub fn disconnect_all(&self) -> usize {
        let snapshot = self.snapshot();
        for session in &snapshot {
            session.disconnect();
        }
        snapshot.len()
    }
}
