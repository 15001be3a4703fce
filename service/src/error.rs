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

//! Error types for the session layer

use crate::types::SessionId;
use thiserror::Error;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Boxed error returned by session handlers
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Service error types
#[derive(Debug, Error)]
pub enum ServiceError {
    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error from the codec layer
    #[error("Protocol error: {0}")]
    Protocol(#[from] havok_telnetcodec::CodecError),

    /// Session with the given ID was not found
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    /// Session has been closed
    #[error("Session closed")]
    SessionClosed,

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// Server is not running
    #[error("Server not running")]
    ServerNotRunning,

    /// Server was already started
    #[error("Server already running")]
    ServerAlreadyRunning,

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// External process could not be run
    #[error("External process {program} failed: {reason}")]
    Process {
        /// Program name
        program: String,
        /// Failure description
        reason: String,
    },

    /// External process ran but its exit callback failed
    #[error("External process {program} exit handling failed: {source}")]
    ExitCallback {
        /// Program name
        program: String,
        /// Error returned by the callback
        #[source]
        source: BoxError,
    },
}

impl ServiceError {
    /// Check if the error is recoverable
    ///
    /// Recoverable errors are those that don't indicate a fatal condition
    /// and where retrying the operation might succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ServiceError::Timeout | ServiceError::SessionClosed | ServiceError::Io(_)
        )
    }

    /// Check if the error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ServiceError::SessionNotFound(_) | ServiceError::SessionClosed | ServiceError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_recoverable() {
        assert!(ServiceError::Timeout.is_recoverable());
        assert!(ServiceError::SessionClosed.is_recoverable());
        assert!(!ServiceError::ServerNotRunning.is_recoverable());
        assert!(!ServiceError::InvalidConfig("x".to_string()).is_recoverable());
    }

    #[test]
    fn test_error_is_connection_error() {
        assert!(ServiceError::SessionNotFound(SessionId::new(1)).is_connection_error());
        assert!(ServiceError::SessionClosed.is_connection_error());
        assert!(!ServiceError::Timeout.is_connection_error());
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::SessionNotFound(SessionId::new(42));
        assert_eq!(err.to_string(), "Session sess-42 not found");

        let err = ServiceError::Process {
            program: "vi".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "External process vi failed: not found");

        let err = ServiceError::ExitCallback {
            program: "vi".to_string(),
            source: "disk full".into(),
        };
        assert_eq!(err.to_string(), "External process vi exit handling failed: disk full");
        assert!(!err.is_recoverable());
    }
}
