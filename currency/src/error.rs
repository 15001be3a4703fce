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

//! Error types for currency arithmetic

use crate::Value;
use thiserror::Error;

/// Result type for currency operations
pub type Result<T> = std::result::Result<T, CurrencyError>;

/// Currency error types
///
/// Every failing operation leaves its receiver unmodified.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CurrencyError {
    /// Holdings are worth less than the requested value
    #[error("Insufficient funds: holding {available}, need {required}")]
    InsufficientFunds {
        /// Value held, in base units
        available: Value,
        /// Value requested, in base units
        required: Value,
    },

    /// Removing coins would drive a denomination below zero
    #[error("Cannot remove {requested} {denomination}, only {available} held")]
    NegativeBalance {
        /// Denomination name
        denomination: String,
        /// Coins held
        available: u64,
        /// Coins requested
        requested: u64,
    },

    /// Denomination is not in the exchange table
    #[error("Unknown denomination: {0}")]
    UnknownDenomination(String),

    /// Amount text could not be parsed
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Exchange table failed validation
    #[error("Invalid exchange table: {0}")]
    InvalidExchange(String),

    /// Operands were built from different exchange tables
    #[error("Currencies use different exchange tables")]
    MismatchedTables,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CurrencyError::InsufficientFunds {
            available: 5,
            required: 12,
        };
        assert_eq!(err.to_string(), "Insufficient funds: holding 5, need 12");

        let err = CurrencyError::NegativeBalance {
            denomination: "gp".to_string(),
            available: 1,
            requested: 3,
        };
        assert_eq!(err.to_string(), "Cannot remove 3 gp, only 1 held");
    }
}
