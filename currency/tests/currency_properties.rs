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

//! Property tests for purse arithmetic against the standard exchange table

use havok_currency::{Currency, CurrencyError, ExchangeTable, Value};
use proptest::prelude::*;
use std::sync::Arc;

const NAMES: [&str; 5] = ["pp", "gp", "ep", "sp", "cp"];

fn table() -> Arc<ExchangeTable> {
    Arc::new(ExchangeTable::standard())
}

fn purse(counts: &[u64]) -> Currency {
    Currency::from_coins(table(), NAMES.iter().copied().zip(counts.iter().copied())).unwrap()
}

fn counts() -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::vec(0u64..6, 5)
}

/// Smallest achievable overpayment by trying every selection.
fn brute_force_overpay(held: &[u64], required: Value) -> Value {
    let values = [1000u128, 100, 50, 10, 1];
    let mut best = Value::MAX;
    let mut chosen = [0u64; 5];
    loop {
        let paid: Value = chosen
            .iter()
            .zip(values.iter())
            .map(|(&count, &value)| Value::from(count) * value)
            .sum();
        if paid >= required {
            best = best.min(paid - required);
        }
        let mut index = 0;
        loop {
            if index == chosen.len() {
                return best;
            }
            if chosen[index] < held[index] {
                chosen[index] += 1;
                break;
            }
            chosen[index] = 0;
            index += 1;
        }
    }
}

proptest! {
    #[test]
    fn convert_to_minimal_keeps_value(held in counts()) {
        let mut currency = purse(&held);
        let before = currency.convert_to_base();
        currency.convert_to_minimal();
        prop_assert_eq!(currency.convert_to_base(), before);
        prop_assert_eq!(currency.count("ep") <= 1, true);
        prop_assert_eq!(currency.count("cp") < 10, true);
    }

    #[test]
    fn subtract_value_removes_exact_worth(held in counts(), taken in counts()) {
        let mut currency = purse(&held);
        let price = purse(&taken);
        let available = currency.convert_to_base();
        let required = price.convert_to_base();
        let before = currency.clone();

        match currency.subtract_value(&price) {
            Ok(()) => {
                prop_assert!(available >= required);
                prop_assert_eq!(currency.convert_to_base(), available - required);
            }
            Err(CurrencyError::InsufficientFunds { .. }) => {
                prop_assert!(available < required);
                prop_assert_eq!(currency, before);
            }
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }

    #[test]
    fn minimal_payment_is_optimal(held in counts(), taken in counts()) {
        let currency = purse(&held);
        let price = purse(&taken);
        let required = price.convert_to_base();
        prop_assume!(currency.convert_to_base() >= required);

        let payment = currency.minimal_payment(&price).unwrap();
        for (name, count) in payment.iter() {
            prop_assert!(count <= currency.count(name));
        }
        let paid = payment.convert_to_base();
        prop_assert!(paid >= required);
        prop_assert_eq!(paid - required, brute_force_overpay(&held, required));
    }

    #[test]
    fn display_parses_back(held in counts()) {
        let currency = purse(&held);
        let text = currency.to_string();
        prop_assert_eq!(Currency::parse(table(), &text).unwrap(), currency);
    }
}
