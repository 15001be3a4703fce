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

//! # HavokMud Currency
//!
//! Multi-denomination coin arithmetic. An [`ExchangeTable`] names the coins in
//! circulation and their worth in base units; a [`Currency`] is a purse of
//! counts against one table.
//!
//! The interesting operations are [`Currency::subtract_value`], which makes
//! change by breaking larger coins, and [`Currency::minimal_payment`], which
//! picks the coins to hand over so that the payer overpays as little as
//! possible.
//!
//! ```rust
//! use havok_currency::{Currency, ExchangeTable};
//! use std::sync::Arc;
//!
//! let table = Arc::new(ExchangeTable::standard());
//! let mut purse = Currency::parse(table.clone(), "1gp").unwrap();
//! let price = Currency::parse(table, "3cp").unwrap();
//! purse.subtract_value(&price).unwrap();
//! assert_eq!(purse.convert_to_base(), 97);
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod currency;
mod error;
mod exchange;
mod payment;

pub use self::currency::Currency;
pub use self::error::{CurrencyError, Result};
pub use self::exchange::{Denomination, ExchangeTable};

/// Worth expressed in base units.
pub type Value = u128;
