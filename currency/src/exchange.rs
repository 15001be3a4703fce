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

//! Denomination exchange table

use crate::{CurrencyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named coin with its worth in base units.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Denomination {
    name: String,
    value: u64,
}

impl Denomination {
    /// Denomination name, e.g. `gp`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Worth of one coin in base units
    pub fn value(&self) -> u64 {
        self.value
    }
}

/// Exchange table mapping denomination names to base unit values.
///
/// Denominations are kept sorted from most to least valuable. The least
/// valuable one is the base type. Every value is a whole multiple of the
/// base value, so any value difference between two holdings can be paid out
/// exactly in coins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")]
pub struct ExchangeTable {
    denominations: Vec<Denomination>,
}

impl ExchangeTable {
    /// Build and validate a table.
    pub fn new<I, S>(entries: I) -> Result<ExchangeTable>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut denominations: Vec<Denomination> = entries
            .into_iter()
            .map(|(name, value)| Denomination {
                name: name.into().to_lowercase(),
                value,
            })
            .collect();

        if denominations.is_empty() {
            return Err(CurrencyError::InvalidExchange(
                "no denominations defined".to_string(),
            ));
        }
        denominations.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));

        for pair in denominations.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(CurrencyError::InvalidExchange(format!(
                    "duplicate denomination {}",
                    pair[0].name
                )));
            }
            if pair[0].value == pair[1].value {
                return Err(CurrencyError::InvalidExchange(format!(
                    "{} and {} share the value {}",
                    pair[0].name, pair[1].name, pair[0].value
                )));
            }
        }
        let mut names: Vec<&str> = denominations.iter().map(|d| d.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(CurrencyError::InvalidExchange(
                "duplicate denomination name".to_string(),
            ));
        }

        let base = denominations[denominations.len() - 1].value;
        if base == 0 {
            return Err(CurrencyError::InvalidExchange(
                "denomination values must be positive".to_string(),
            ));
        }
        if let Some(odd) = denominations.iter().find(|d| d.value % base != 0) {
            return Err(CurrencyError::InvalidExchange(format!(
                "{} ({}) is not a multiple of the base value {}",
                odd.name, odd.value, base
            )));
        }
        if let Some(bad) = denominations
            .iter()
            .find(|d| d.name.is_empty() || !d.name.chars().all(|c| c.is_ascii_alphabetic()))
        {
            return Err(CurrencyError::InvalidExchange(format!(
                "denomination name {:?} must be alphabetic",
                bad.name
            )));
        }

        Ok(ExchangeTable { denominations })
    }

    /// Platinum, gold, electrum, silver and copper.
    pub fn standard() -> ExchangeTable {
        ExchangeTable {
            denominations: [("pp", 1000), ("gp", 100), ("ep", 50), ("sp", 10), ("cp", 1)]
                .into_iter()
                .map(|(name, value)| Denomination {
                    name: name.to_string(),
                    value,
                })
                .collect(),
        }
    }

    /// Denominations from most to least valuable
    pub fn denominations(&self) -> &[Denomination] {
        &self.denominations
    }

    /// Number of denominations
    pub fn len(&self) -> usize {
        self.denominations.len()
    }

    /// Always false for a validated table
    pub fn is_empty(&self) -> bool {
        self.denominations.is_empty()
    }

    /// The least valuable denomination
    pub fn base_type(&self) -> &Denomination {
        &self.denominations[self.denominations.len() - 1]
    }

    /// Position of `name` in value order
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.denominations
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Worth of one `name` coin in base units
    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.index_of(name).map(|index| self.denominations[index].value)
    }
}

impl Default for ExchangeTable {
    fn default() -> Self {
        ExchangeTable::standard()
    }
}

impl TryFrom<BTreeMap<String, u64>> for ExchangeTable {
    type Error = CurrencyError;

    fn try_from(map: BTreeMap<String, u64>) -> Result<Self> {
        ExchangeTable::new(map)
    }
}

impl From<ExchangeTable> for BTreeMap<String, u64> {
    fn from(table: ExchangeTable) -> Self {
        table
            .denominations
            .into_iter()
            .map(|d| (d.name, d.value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_is_sorted_descending() {
        let table = ExchangeTable::standard();
        let names: Vec<&str> = table.denominations().iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["pp", "gp", "ep", "sp", "cp"]);
        assert_eq!(table.base_type().name(), "cp");
        assert_eq!(table.value_of("GP"), Some(100));
        assert_eq!(table.value_of("zz"), None);
    }

    #[test]
    fn new_sorts_entries() {
        let table = ExchangeTable::new([("cp", 1), ("gp", 100), ("sp", 10)]).unwrap();
        assert_eq!(table.index_of("gp"), Some(0));
        assert_eq!(table.index_of("cp"), Some(2));
    }

    #[test]
    fn rejects_invalid_tables() {
        assert!(ExchangeTable::new(Vec::<(String, u64)>::new()).is_err());
        assert!(ExchangeTable::new([("cp", 0)]).is_err());
        assert!(ExchangeTable::new([("gp", 10), ("sp", 10)]).is_err());
        assert!(ExchangeTable::new([("gp", 10), ("gp", 1)]).is_err());
        assert!(ExchangeTable::new([("gp", 15), ("sp", 10)]).is_err());
        assert!(ExchangeTable::new([("g1", 10), ("sp", 1)]).is_err());
    }

    #[test]
    fn deserializes_from_map() {
        let table: ExchangeTable = serde_json::from_str(r#"{"gp": 100, "cp": 1}"#).unwrap();
        assert_eq!(table.base_type().name(), "cp");
        assert!(serde_json::from_str::<ExchangeTable>(r#"{"gp": 0}"#).is_err());
    }
}
