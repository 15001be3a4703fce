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

//! Error types for the MUD server

use crate::ledger::LedgerError;
use crate::templates::TemplateError;
use havok_currency::CurrencyError;
use havok_mediator::{CacheError, EmailError, MediatorError, StoreError};
use havok_service::ServiceError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by the server crate
pub type Result<T, E = MudError> = std::result::Result<T, E>;

/// Errors raised while configuring or running the MUD.
#[derive(Debug, Error)]
pub enum MudError {
    /// A configuration value is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// A file could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`MudConfig`](crate::MudConfig)
    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Record store failure
    #[error("Store error: {0}")]
    Store(#[from] MediatorError<StoreError>),

    /// Cache connection failure
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Email transport could not be built
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Ledger failure
    #[error("Ledger error: {0}")]
    Ledger(#[from] MediatorError<LedgerError>),

    /// Template rendering failure
    #[error("Template error: {0}")]
    Template(#[from] MediatorError<TemplateError>),

    /// Invalid coin arithmetic
    #[error("Currency error: {0}")]
    Currency(#[from] CurrencyError),

    /// Session service failure
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// The tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl MudError {
    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MudError::Io {
            path: path.into(),
            source,
        }
    }
}
