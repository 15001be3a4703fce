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

//! Key/value cache resource

use crate::{Mediator, MediatorResult, Resource};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

/// Cache error types
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis command or connection failure
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Operations understood by a [`Cache`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheRequest {
    /// Store `value` under `key`
    Set {
        /// Key
        key: String,
        /// Value
        value: String,
    },
    /// Fetch the value under a key
    Get(String),
    /// Remove a key
    Delete(String),
}

/// A cache backend.
pub enum Cache {
    /// Process-local map
    Memory(HashMap<String, String>),
    /// Redis server connection
    Redis(redis::aio::MultiplexedConnection),
}

impl Cache {
    /// Connect to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Cache, CacheError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        info!(url = %url, "Connected to cache");
        Ok(Cache::Redis(connection))
    }

    /// An empty in-memory cache.
    pub fn memory() -> Cache {
        Cache::Memory(HashMap::new())
    }
}

#[async_trait]
impl Resource for Cache {
    type Request = CacheRequest;
    type Reply = Option<String>;
    type Error = CacheError;

    async fn handle(&mut self, request: CacheRequest) -> Result<Option<String>, CacheError> {
        match (self, request) {
            (Cache::Memory(map), CacheRequest::Set { key, value }) => Ok(map.insert(key, value)),
            (Cache::Memory(map), CacheRequest::Get(key)) => Ok(map.get(&key).cloned()),
            (Cache::Memory(map), CacheRequest::Delete(key)) => Ok(map.remove(&key)),
            (Cache::Redis(conn), CacheRequest::Set { key, value }) => {
                let _: () = conn.set(&key, value).await?;
                Ok(None)
            }
            (Cache::Redis(conn), CacheRequest::Get(key)) => Ok(conn.get(&key).await?),
            (Cache::Redis(conn), CacheRequest::Delete(key)) => {
                let _: () = conn.del(&key).await?;
                Ok(None)
            }
        }
    }
}

/// Handle to the cache actor.
#[derive(Clone, Debug)]
pub struct CacheHandle {
    mediator: Mediator<(), Cache>,
}

impl CacheHandle {
    /// Spawn a cache actor around `cache`.
    pub fn spawn(cache: Cache) -> CacheHandle {
        CacheHandle {
            mediator: Mediator::single("cache", cache),
        }
    }

    /// Queue a set without waiting for it to land.
    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let request = CacheRequest::Set {
            key: key.clone(),
            value: value.into(),
        };
        if let Err(err) = self.mediator.tell(request).await {
            warn!(key = %key, error = %err, "Cache set dropped");
        }
    }

    /// Fetch a value.
    pub async fn get(&self, key: impl Into<String>) -> MediatorResult<Option<String>, CacheError> {
        self.mediator.call(CacheRequest::Get(key.into())).await
    }

    /// Queue a delete without waiting for it to land.
    pub async fn delete(&self, key: impl Into<String>) {
        if let Err(err) = self.mediator.tell(CacheRequest::Delete(key.into())).await {
            warn!(error = %err, "Cache delete dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_set_get_delete() {
        let cache = CacheHandle::spawn(Cache::memory());
        cache.set("userdb/zed", "{\"user\":\"zed@example.com\"}").await;
        assert_eq!(
            cache.get("userdb/zed").await.unwrap().as_deref(),
            Some("{\"user\":\"zed@example.com\"}")
        );
        cache.delete("userdb/zed").await;
        assert_eq!(cache.get("userdb/zed").await.unwrap(), None);
    }
}
