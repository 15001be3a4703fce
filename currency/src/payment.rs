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

//! Branch and bound coin selection

use crate::{ExchangeTable, Value};

/// Choose counts no larger than `held` worth at least `required` with the
/// smallest overpayment. Caller guarantees the holdings cover `required`.
pub(crate) fn select(table: &ExchangeTable, held: &[u64], required: Value) -> Vec<u64> {
    let values: Vec<Value> = table
        .denominations()
        .iter()
        .map(|d| Value::from(d.value()))
        .collect();
    let len = values.len();

    let mut capacity = vec![0 as Value; len + 1];
    let mut divisor = vec![0 as Value; len + 1];
    for index in (0..len).rev() {
        let worth = Value::from(held[index]) * values[index];
        capacity[index] = capacity[index + 1] + worth;
        divisor[index] = if held[index] > 0 {
            gcd(divisor[index + 1], values[index])
        } else {
            divisor[index + 1]
        };
    }

    let mut search = Search {
        values: &values,
        held,
        capacity: &capacity,
        divisor: &divisor,
        chosen: vec![0; len],
        best: None,
    };
    search.descend(0, required);
    search
        .best
        .map(|(_, counts)| counts)
        .unwrap_or_else(|| held.to_vec())
}

struct Search<'a> {
    values: &'a [Value],
    held: &'a [u64],
    capacity: &'a [Value],
    divisor: &'a [Value],
    chosen: Vec<u64>,
    best: Option<(Value, Vec<u64>)>,
}

impl Search<'_> {
    fn best_overpay(&self) -> Option<Value> {
        self.best.as_ref().map(|(overpay, _)| *overpay)
    }

    fn done(&self) -> bool {
        self.best_overpay() == Some(0)
    }

    fn descend(&mut self, index: usize, remaining: Value) {
        if index == self.values.len() || self.capacity[index] < remaining {
            return;
        }
        let step = self.divisor[index];
        let floor = if step == 0 {
            0
        } else {
            (step - remaining % step) % step
        };
        if let Some(best) = self.best_overpay() {
            if floor >= best {
                return;
            }
        }

        let value = self.values[index];
        let high = Value::from(self.held[index]).min(remaining.div_ceil(value));
        let rest = self.capacity[index + 1];
        let low = if rest >= remaining {
            0
        } else {
            (remaining - rest).div_ceil(value)
        };

        let mut coins = high;
        loop {
            if coins < low {
                break;
            }
            let paid = coins * value;
            self.chosen[index] = u64::try_from(coins).unwrap_or(u64::MAX);
            if paid >= remaining {
                let overpay = paid - remaining;
                if self.best_overpay().is_none_or(|best| overpay < best) {
                    self.best = Some((overpay, self.chosen.clone()));
                }
            } else {
                self.descend(index + 1, remaining - paid);
            }
            if self.done() || coins == 0 {
                break;
            }
            coins -= 1;
        }
        self.chosen[index] = 0;
    }
}

fn gcd(mut a: Value, mut b: Value) -> Value {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}
