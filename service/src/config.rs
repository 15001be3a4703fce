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

//! Service configuration

use havok_telnetcodec::DEFAULT_MAX_LINE_LENGTH;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Service configuration
///
/// Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use havok_service::ServiceConfig;
/// use std::time::Duration;
///
/// let config = ServiceConfig::new("127.0.0.1:3000".parse().unwrap())
///     .with_max_sessions(500)
///     .with_idle_timeout(Some(Duration::from_secs(1800)));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to bind the listener to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent sessions
    pub max_sessions: usize,

    /// Disconnect sessions that send no line for this long
    pub idle_timeout: Option<Duration>,

    /// Timeout for a single socket write
    pub write_timeout: Duration,

    /// Longest line accepted before truncation
    pub max_line_length: usize,

    /// Lines buffered between a session's reader and its dispatcher
    pub input_queue_depth: usize,

    /// How long shutdown waits for sessions to drain
    pub shutdown_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3000)),
            max_sessions: 1000,
            idle_timeout: None,
            write_timeout: Duration::from_secs(30),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            input_queue_depth: 32,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServiceConfig {
    /// Create a new configuration with the given bind address
    ///
    /// All other settings will use their default values.
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Set the maximum number of concurrent sessions
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the idle timeout, `None` to never time out
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the write timeout duration
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the maximum line length
    pub fn with_max_line_length(mut self, length: usize) -> Self {
        self.max_line_length = length;
        self
    }

    /// Set the input queue depth
    pub fn with_input_queue_depth(mut self, depth: usize) -> Self {
        self.input_queue_depth = depth;
        self
    }

    /// Set the shutdown timeout duration
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_sessions == 0 {
            return Err("max_sessions must be greater than 0".to_string());
        }

        if self.idle_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err("idle_timeout must be greater than 0".to_string());
        }

        if self.write_timeout.is_zero() {
            return Err("write_timeout must be greater than 0".to_string());
        }

        if self.max_line_length == 0 {
            return Err("max_line_length must be greater than 0".to_string());
        }

        if self.input_queue_depth == 0 {
            return Err("input_queue_depth must be greater than 0".to_string());
        }

        Ok(())
    }
}
