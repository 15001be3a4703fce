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

//! Error types for mediated resource calls

use thiserror::Error;

/// Result of a mediated call against a resource failing with `E`
pub type MediatorResult<T, E> = std::result::Result<T, MediatorError<E>>;

/// Mediator error types
///
/// Only the caller whose request failed sees the error. The actor loop keeps
/// running after every variant.
#[derive(Debug, Error)]
pub enum MediatorError<E: std::error::Error + 'static> {
    /// No resource is registered under the requested key
    #[error("No handler registered for {0}")]
    NoHandler(String),

    /// The actor has stopped and can no longer take requests
    #[error("Mediator closed")]
    Closed,

    /// The resource panicked while handling the request
    #[error("Resource panicked while handling request")]
    Panicked,

    /// The resource returned an error
    #[error("Resource failed: {0}")]
    Failed(#[source] E),
}

impl<E: std::error::Error + 'static> MediatorError<E> {
    /// The resource error, if the resource itself reported one
    pub fn resource_error(&self) -> Option<&E> {
        match self {
            MediatorError::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Check whether the mediator is gone for good
    pub fn is_closed(&self) -> bool {
        matches!(self, MediatorError::Closed)
    }
}
