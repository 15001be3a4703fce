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

//! Coin holdings and denomination arithmetic

use crate::{CurrencyError, ExchangeTable, Result, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A purse of coins.
///
/// Counts are stored per denomination in exchange table order. A settled
/// `Currency` never holds a negative count; operations that cannot keep that
/// promise fail without touching the receiver.
#[derive(Clone, Debug)]
pub struct Currency {
    table: Arc<ExchangeTable>,
    counts: Vec<u64>,
}

impl Currency {
    /// An empty purse.
    pub fn new(table: Arc<ExchangeTable>) -> Currency {
        let counts = vec![0; table.len()];
        Currency { table, counts }
    }

    /// A purse holding the given coins.
    pub fn from_coins<I, S>(table: Arc<ExchangeTable>, coins: I) -> Result<Currency>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        let mut currency = Currency::new(table);
        for (name, count) in coins {
            currency.add_coins(name.as_ref(), count)?;
        }
        Ok(currency)
    }

    /// Parse text such as `3pp 6gp 2cp`.
    ///
    /// Terms are separated by whitespace or commas, each is a count followed
    /// by a denomination name, optionally separated by whitespace.
    pub fn parse(table: Arc<ExchangeTable>, text: &str) -> Result<Currency> {
        let mut currency = Currency::new(table);
        let mut pending: Option<u64> = None;
        for term in text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let split = term
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(term.len());
            let (digits, name) = term.split_at(split);
            let count = match (digits.is_empty(), pending.take()) {
                (true, Some(count)) => count,
                (true, None) => return Err(CurrencyError::InvalidAmount(term.to_string())),
                (false, Some(_)) => return Err(CurrencyError::InvalidAmount(text.to_string())),
                (false, None) => digits
                    .parse::<u64>()
                    .map_err(|_| CurrencyError::InvalidAmount(term.to_string()))?,
            };
            if name.is_empty() {
                pending = Some(count);
                continue;
            }
            currency.add_coins(name, count)?;
        }
        if pending.is_some() {
            return Err(CurrencyError::InvalidAmount(text.to_string()));
        }
        Ok(currency)
    }

    /// The fewest coins worth exactly `value` base units.
    ///
    /// Any part of `value` below the base coin value is dropped.
    pub fn minimal_change(table: Arc<ExchangeTable>, value: Value) -> Currency {
        let mut currency = Currency::new(table);
        currency.mint(value);
        currency
    }

    /// Exchange table backing this purse
    pub fn table(&self) -> &Arc<ExchangeTable> {
        &self.table
    }

    /// Coins held of `name`, zero for unknown names
    pub fn count(&self, name: &str) -> u64 {
        self.table
            .index_of(name)
            .map(|index| self.counts[index])
            .unwrap_or(0)
    }

    /// True when no coins are held
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&count| count == 0)
    }

    /// Non-zero holdings from most to least valuable
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.table
            .denominations()
            .iter()
            .zip(self.counts.iter())
            .filter(|(_, count)| **count > 0)
            .map(|(denomination, count)| (denomination.name(), *count))
    }

    /// Non-zero holdings keyed by denomination name
    pub fn to_map(&self) -> BTreeMap<String, u64> {
        self.iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect()
    }

    /// Remove every coin
    pub fn clear(&mut self) {
        self.counts.iter_mut().for_each(|count| *count = 0);
    }

    /// Total worth in base units.
    pub fn convert_to_base(&self) -> Value {
        self.table
            .denominations()
            .iter()
            .zip(self.counts.iter())
            .map(|(denomination, &count)| Value::from(count) * Value::from(denomination.value()))
            .sum()
    }

    /// Total worth in base units, replacing all holdings with base coins.
    pub fn collapse_to_base(&mut self) -> Value {
        let value = self.convert_to_base();
        let base = self.table.base_type().value();
        self.clear();
        let last = self.counts.len() - 1;
        self.counts[last] = saturate(value / Value::from(base));
        value
    }

    /// Re-express the holdings with the fewest coins of the same total worth.
    pub fn convert_to_minimal(&mut self) {
        let value = self.convert_to_base();
        self.clear();
        self.mint(value);
    }

    /// Add every coin of `other`.
    pub fn add_value(&mut self, other: &Currency) -> Result<()> {
        self.check_table(other)?;
        for (count, extra) in self.counts.iter_mut().zip(other.counts.iter()) {
            *count = count.saturating_add(*extra);
        }
        Ok(())
    }

    /// Add `count` coins of `name`.
    pub fn add_coins(&mut self, name: &str, count: u64) -> Result<()> {
        let index = self.index(name)?;
        self.counts[index] = self.counts[index].saturating_add(count);
        Ok(())
    }

    /// Remove `count` coins of `name`, failing rather than going negative.
    pub fn remove_coins(&mut self, name: &str, count: u64) -> Result<()> {
        let index = self.index(name)?;
        let available = self.counts[index];
        if count > available {
            return Err(CurrencyError::NegativeBalance {
                denomination: self.table.denominations()[index].name().to_string(),
                available,
                requested: count,
            });
        }
        self.counts[index] = available - count;
        Ok(())
    }

    /// Take `other`'s worth out of this purse, breaking larger coins for change.
    ///
    /// Counts are subtracted per denomination first. Each negative count,
    /// smallest denomination first, is covered by breaking just enough coins
    /// of the next larger denomination; whatever part of a broken coin is not
    /// needed comes back as minimal change. If the most valuable denomination
    /// itself ends up short there is nothing left to break, so the remaining
    /// worth is paid out afresh as minimal change.
    pub fn subtract_value(&mut self, other: &Currency) -> Result<()> {
        self.check_table(other)?;
        let available = self.convert_to_base();
        let required = other.convert_to_base();
        if available < required {
            return Err(CurrencyError::InsufficientFunds {
                available,
                required,
            });
        }
        if available == required {
            self.clear();
            return Ok(());
        }

        let values: Vec<i128> = self
            .table
            .denominations()
            .iter()
            .map(|d| i128::from(d.value()))
            .collect();
        let mut work: Vec<i128> = self
            .counts
            .iter()
            .zip(other.counts.iter())
            .map(|(&have, &take)| i128::from(have) - i128::from(take))
            .collect();
        let mut change: i128 = 0;

        for index in (1..work.len()).rev() {
            if work[index] >= 0 {
                continue;
            }
            let deficit = -work[index];
            let small = values[index];
            let large = values[index - 1];
            let broken = (deficit * small + large - 1) / large;
            let produced = broken * large;
            let added = produced / small;
            change += produced - added * small;
            work[index] += added;
            work[index - 1] -= broken;
        }

        if work[0] < 0 {
            change += work
                .iter()
                .zip(values.iter())
                .map(|(count, value)| count * value)
                .sum::<i128>();
            work.iter_mut().for_each(|count| *count = 0);
        }

        for (count, settled) in self.counts.iter_mut().zip(work) {
            *count = u64::try_from(settled).unwrap_or(0);
        }
        self.mint(Value::try_from(change).unwrap_or(0));
        Ok(())
    }

    /// Pick coins from this purse worth at least `target`, overpaying as
    /// little as possible.
    ///
    /// Among selections with the same overpayment the one found first wins,
    /// which favours larger coins. An exact match of the whole purse returns a
    /// copy of the purse.
    pub fn minimal_payment(&self, target: &Currency) -> Result<Currency> {
        self.check_table(target)?;
        let available = self.convert_to_base();
        let required = target.convert_to_base();
        if available < required {
            return Err(CurrencyError::InsufficientFunds {
                available,
                required,
            });
        }
        if available == required {
            return Ok(self.clone());
        }
        let counts = crate::payment::select(&self.table, &self.counts, required);
        Ok(Currency {
            table: self.table.clone(),
            counts,
        })
    }

    fn index(&self, name: &str) -> Result<usize> {
        self.table
            .index_of(name)
            .ok_or_else(|| CurrencyError::UnknownDenomination(name.to_string()))
    }

    fn check_table(&self, other: &Currency) -> Result<()> {
        if Arc::ptr_eq(&self.table, &other.table) || self.table == other.table {
            Ok(())
        } else {
            Err(CurrencyError::MismatchedTables)
        }
    }

    /// Greedily add coins worth `value`, largest denomination first.
    fn mint(&mut self, mut value: Value) {
        for (denomination, count) in self
            .table
            .denominations()
            .iter()
            .zip(self.counts.iter_mut())
        {
            let worth = Value::from(denomination.value());
            let coins = value / worth;
            *count = count.saturating_add(saturate(coins));
            value -= coins * worth;
        }
    }
}

fn saturate(value: Value) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.counts == other.counts
            && (Arc::ptr_eq(&self.table, &other.table) || self.table == other.table)
    }
}

impl Eq for Currency {}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0{}", self.table.base_type().name());
        }
        let mut first = true;
        for (name, count) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}{}", count, name)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Arc<ExchangeTable> {
        Arc::new(ExchangeTable::standard())
    }

    fn coins(text: &str) -> Currency {
        Currency::parse(table(), text).unwrap()
    }

    #[test]
    fn parse_and_display() {
        let purse = coins("3pp 6gp 2cp");
        assert_eq!(purse.count("pp"), 3);
        assert_eq!(purse.count("gp"), 6);
        assert_eq!(purse.to_string(), "3pp 6gp 2cp");
        assert_eq!(coins("2 gp, 5sp").to_string(), "2gp 5sp");
        assert_eq!(Currency::new(table()).to_string(), "0cp");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Currency::parse(table(), "3zz"),
            Err(CurrencyError::UnknownDenomination(_))
        ));
        assert!(Currency::parse(table(), "gp").is_err());
        assert!(Currency::parse(table(), "5").is_err());
        assert!(Currency::parse(table(), "5 6 gp").is_err());
    }

    #[test]
    fn convert_to_base_and_minimal() {
        let mut purse = coins("3pp 6gp 2cp 17sp");
        assert_eq!(purse.convert_to_base(), 3772);
        purse.convert_to_minimal();
        assert_eq!(purse.to_string(), "3pp 7gp 1ep 2sp 2cp");
        assert_eq!(purse.convert_to_base(), 3772);
    }

    #[test]
    fn collapse_to_base() {
        let mut purse = coins("1gp 1sp");
        assert_eq!(purse.collapse_to_base(), 110);
        assert_eq!(purse.to_string(), "110cp");
    }

    #[test]
    fn remove_coins_refuses_negative_balance() {
        let mut purse = coins("2gp");
        purse.remove_coins("gp", 2).unwrap();
        assert!(purse.is_empty());
        let err = purse.remove_coins("gp", 1).unwrap_err();
        assert_eq!(
            err,
            CurrencyError::NegativeBalance {
                denomination: "gp".to_string(),
                available: 0,
                requested: 1,
            }
        );
    }

    #[test]
    fn subtract_breaks_larger_coins() {
        let mut purse = coins("1gp");
        purse.subtract_value(&coins("3cp")).unwrap();
        assert_eq!(purse.convert_to_base(), 97);
        assert_eq!(purse.count("gp"), 0);
        assert_eq!(purse.count("cp"), 7);
    }

    #[test]
    fn subtract_with_top_denomination_short() {
        let mut purse = coins("1001cp");
        purse.subtract_value(&coins("1pp")).unwrap();
        assert_eq!(purse.to_string(), "1cp");
    }

    #[test]
    fn subtract_equal_clears() {
        let mut purse = coins("1gp");
        purse.subtract_value(&coins("10sp")).unwrap();
        assert!(purse.is_empty());
    }

    #[test]
    fn subtract_insufficient_leaves_purse_alone() {
        let mut purse = coins("1gp 1cp");
        let before = purse.clone();
        let err = purse.subtract_value(&coins("2gp")).unwrap_err();
        assert_eq!(
            err,
            CurrencyError::InsufficientFunds {
                available: 101,
                required: 200,
            }
        );
        assert_eq!(purse, before);
    }

    #[test]
    fn minimal_payment_prefers_exact_amounts() {
        let purse = coins("1pp 6gp 3sp");
        let payment = purse.minimal_payment(&coins("3gp 5sp")).unwrap();
        assert_eq!(payment.convert_to_base(), 400);

        let purse = coins("2gp 5sp 4cp");
        let payment = purse.minimal_payment(&coins("1gp 2sp 3cp")).unwrap();
        assert_eq!(payment.convert_to_base(), 123);

        let purse = coins("1ep 3sp");
        let payment = purse.minimal_payment(&coins("3sp")).unwrap();
        assert_eq!(payment.to_string(), "3sp");
    }

    #[test]
    fn minimal_payment_of_whole_purse() {
        let purse = coins("1gp 1sp");
        assert_eq!(purse.minimal_payment(&coins("110cp")).unwrap(), purse);
    }

    #[test]
    fn minimal_payment_insufficient() {
        let purse = coins("1sp");
        assert!(matches!(
            purse.minimal_payment(&coins("1gp")),
            Err(CurrencyError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn mismatched_tables_are_rejected() {
        let other = Arc::new(ExchangeTable::new([("gold", 10), ("copper", 1)]).unwrap());
        let mut purse = coins("1gp");
        let foreign = Currency::from_coins(other, [("gold", 1)]).unwrap();
        assert_eq!(
            purse.add_value(&foreign),
            Err(CurrencyError::MismatchedTables)
        );
    }
}
