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

//! Dice expressions such as `4d6k3` or `2d6k1+1d4+8`
//!
//! Terms are joined by `+`. A term is either a constant or `NdM` with an
//! optional `kK` suffix keeping only the `K` highest of the `N` dice.

use rand::Rng;
use std::fmt;
use thiserror::Error;

const MAX_DICE: u32 = 1000;

/// Malformed dice expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    /// Nothing to roll
    #[error("Empty dice expression")]
    Empty,
    /// A term could not be parsed
    #[error("Invalid dice term {0:?}")]
    InvalidTerm(String),
}

/// One rolled term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRoll {
    /// Term as written
    pub description: String,
    /// Kept dice, or the constant
    pub rolls: Vec<u32>,
}

/// A rolled expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    /// Original expression
    pub expression: String,
    /// Per-term results
    pub terms: Vec<TermRoll>,
}

impl DiceRoll {
    /// Sum of every kept die and constant
    pub fn total(&self) -> u32 {
        self.terms.iter().flat_map(|term| term.rolls.iter()).sum()
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .terms
            .iter()
            .map(|term| format!("{:?}", term.rolls))
            .collect();
        write!(f, "Roll: {} = {}: {}", self.expression, self.total(), terms.join("+"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Term {
    Constant(u32),
    Dice { count: u32, sides: u32, keep: u32 },
}

fn parse_term(text: &str) -> Result<Term, DiceError> {
    let invalid = || DiceError::InvalidTerm(text.to_string());
    let number = |part: &str| part.trim().parse::<u32>().map_err(|_| invalid());
    let lower = text.to_ascii_lowercase();
    let Some((count, rest)) = lower.split_once('d') else {
        return Ok(Term::Constant(number(&lower)?));
    };
    let (sides, keep) = match rest.split_once('k') {
        Some((sides, keep)) => (number(sides)?, Some(number(keep)?)),
        None => (number(rest)?, None),
    };
    let count = if count.trim().is_empty() { 1 } else { number(count)? };
    let keep = keep.unwrap_or(count);
    if count == 0 || count > MAX_DICE || sides == 0 || keep > count {
        return Err(invalid());
    }
    Ok(Term::Dice { count, sides, keep })
}

/// Roll `expression` with `rng`.
pub fn roll<R: Rng + ?Sized>(expression: &str, rng: &mut R) -> Result<DiceRoll, DiceError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(DiceError::Empty);
    }
    let mut terms = Vec::new();
    for text in expression.split('+').map(str::trim) {
        let rolls = match parse_term(text)? {
            Term::Constant(value) => vec![value],
            Term::Dice { count, sides, keep } => {
                let mut dice: Vec<u32> = (0..count).map(|_| rng.gen_range(1..=sides)).collect();
                dice.sort_unstable_by(|a, b| b.cmp(a));
                dice.truncate(keep as usize);
                dice
            }
        };
        terms.push(TermRoll {
            description: text.to_string(),
            rolls,
        });
    }
    Ok(DiceRoll {
        expression: expression.to_string(),
        terms,
    })
}
