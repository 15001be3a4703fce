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

//! Reverse DNS resource

use crate::{Mediator, Resource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use thiserror::Error;
use tracing::warn;

/// Hostname reported when a reverse lookup fails
pub const UNKNOWN_HOST: &str = "unknown.host.name";

/// DNS error types
#[derive(Debug, Error)]
pub enum DnsError {
    /// The system resolver returned an error
    #[error("Lookup of {addr} failed: {source}")]
    Lookup {
        /// Address being resolved
        addr: IpAddr,
        /// Resolver error
        #[source]
        source: std::io::Error,
    },

    /// The blocking lookup task died
    #[error("Lookup task failed: {0}")]
    Task(String),

    /// No entry for the address in a static table
    #[error("No entry for {0}")]
    NotFound(IpAddr),
}

/// Operations understood by a [`Resolver`]
#[derive(Debug, Clone, Copy)]
pub enum DnsRequest {
    /// Resolve an address to a hostname
    ReverseLookup(IpAddr),
}

/// A reverse DNS backend.
#[derive(Debug, Clone)]
pub enum Resolver {
    /// The operating system resolver
    System,
    /// A fixed address map
    Static(HashMap<IpAddr, String>),
}

#[async_trait]
impl Resource for Resolver {
    type Request = DnsRequest;
    type Reply = String;
    type Error = DnsError;

    async fn handle(&mut self, request: DnsRequest) -> Result<String, DnsError> {
        let DnsRequest::ReverseLookup(addr) = request;
        match self {
            Resolver::System => tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr))
                .await
                .map_err(|err| DnsError::Task(err.to_string()))?
                .map_err(|source| DnsError::Lookup { addr, source }),
            Resolver::Static(entries) => entries.get(&addr).cloned().ok_or(DnsError::NotFound(addr)),
        }
    }
}

/// Handle to the DNS actor.
#[derive(Clone, Debug)]
pub struct DnsHandle {
    mediator: Mediator<(), Resolver>,
}

impl DnsHandle {
    /// Spawn a DNS actor around `resolver`.
    pub fn spawn(resolver: Resolver) -> DnsHandle {
        DnsHandle {
            mediator: Mediator::single("dns", resolver),
        }
    }

    /// Best-effort reverse lookup, [`UNKNOWN_HOST`] on any failure.
    pub async fn reverse_lookup(&self, addr: IpAddr) -> String {
        match self.mediator.call(DnsRequest::ReverseLookup(addr)).await {
            Ok(host) if !host.is_empty() => host,
            Ok(_) => UNKNOWN_HOST.to_string(),
            Err(err) => {
                warn!(addr = %addr, error = %err, "Reverse lookup failed");
                UNKNOWN_HOST.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_static_lookup_and_fallback() {
        let known = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let unknown = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        let dns = DnsHandle::spawn(Resolver::Static(HashMap::from([(
            known,
            "gate.example.com".to_string(),
        )])));
        assert_eq!(dns.reverse_lookup(known).await, "gate.example.com");
        assert_eq!(dns.reverse_lookup(unknown).await, UNKNOWN_HOST);
    }
}
