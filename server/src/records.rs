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

//! Persisted records
//!
//! Each record type maps onto one store table. Only the fields declared here
//! are persisted; session state such as a password being changed lives in the
//! login handler instead.

use crate::dice;
use havok_currency::{Currency, CurrencyError, ExchangeTable};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Accounts, keyed by email
pub const ACCOUNTS: &str = "accounts";
/// Characters, keyed by lowercase name
pub const PLAYERS: &str = "players";
/// Free-form text settings such as the MOTD
pub const SETTINGS: &str = "settings";
/// Ledger balances, keyed by character name
pub const BANK: &str = "bank";

/// Every table with its key fields
pub const TABLES: [(&str, &str); 4] = [
    (ACCOUNTS, "email"),
    (PLAYERS, "name"),
    (SETTINGS, "key"),
    (BANK, "account"),
];

/// Rerolls granted to a new character
pub const STARTING_REROLLS: u32 = 20;

/// Dice rolled for each ability
pub const ABILITY_DICE: &str = "4d6k3";

/// Starting alignment for good characters
pub const ALIGNMENT_GOOD: i32 = 500;
/// Starting alignment for neutral characters
pub const ALIGNMENT_NEUTRAL: i32 = 0;
/// Starting alignment for evil characters
pub const ALIGNMENT_EVIL: i32 = -500;

/// A login identity, owning any number of characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    /// Lowercase email address
    pub email: String,
    /// Hex SHA-512 of the password
    pub password: Option<String>,
    /// Colour preference
    pub ansi_mode: bool,
    /// Outstanding email confirmation code
    pub confcode: Option<String>,
    /// Email address has been confirmed
    pub confirmed: bool,
    /// Lowercase names of owned characters
    pub players: Vec<String>,
    /// Last address connected from
    pub ip_address: Option<String>,
    /// Reverse DNS of `ip_address`
    pub hostname: Option<String>,
}

impl Account {
    /// A fresh, unsaved account
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    /// Record a character name as owned
    pub fn add_player(&mut self, name: &str) {
        if !self.players.iter().any(|owned| owned == name) {
            self.players.push(name.to_string());
        }
    }

    /// Forget a character name
    pub fn remove_player(&mut self, name: &str) {
        self.players.retain(|owned| owned != name);
    }
}

/// Character sex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    /// M
    Male,
    /// F
    Female,
    /// N
    Neutral,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::Neutral => "Neutral",
        })
    }
}

/// The six abilities, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    /// Str
    Strength,
    /// Int
    Intelligence,
    /// Wis
    Wisdom,
    /// Dex
    Dexterity,
    /// Con
    Constitution,
    /// Cha
    Charisma,
}

impl Ability {
    /// All abilities
    pub const ALL: [Ability; 6] = [
        Ability::Strength,
        Ability::Intelligence,
        Ability::Wisdom,
        Ability::Dexterity,
        Ability::Constitution,
        Ability::Charisma,
    ];

    /// Lowercase name, used for prefix matching
    pub fn name(self) -> &'static str {
        match self {
            Ability::Strength => "strength",
            Ability::Intelligence => "intelligence",
            Ability::Wisdom => "wisdom",
            Ability::Dexterity => "dexterity",
            Ability::Constitution => "constitution",
            Ability::Charisma => "charisma",
        }
    }

    /// Ability with the given lowercase name
    pub fn from_name(name: &str) -> Option<Ability> {
        Ability::ALL.into_iter().find(|ability| ability.name() == name)
    }
}

/// A character
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Player {
    /// Lowercase name, the record key
    pub name: String,
    /// Name as typed by the player
    pub display_name: String,
    /// Email of the owning account
    pub account: String,
    /// Sex
    pub sex: Option<Sex>,
    /// Race
    pub race: Option<String>,
    /// Class
    pub class: Option<String>,
    /// Unassigned ability rolls
    pub rolls: Vec<u32>,
    /// Rerolls left
    pub rerolls: u32,
    /// Rolls assigned to abilities
    pub stats: BTreeMap<Ability, u32>,
    /// Starting alignment
    pub alignment: Option<i32>,
    /// Free text shown to onlookers
    pub description: String,
    /// Creation is finished
    pub complete: bool,
}

impl Player {
    /// A new character with freshly rolled abilities
    pub fn create<R: Rng + ?Sized>(display_name: &str, account: &str, rng: &mut R) -> Self {
        let mut player = Self {
            name: display_name.to_lowercase(),
            display_name: display_name.to_string(),
            account: account.to_string(),
            rerolls: STARTING_REROLLS,
            ..Self::default()
        };
        player.roll_abilities(rng);
        player
    }

    /// Roll six ability scores and clear any assignment
    pub fn roll_abilities<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.rolls = (0..Ability::ALL.len())
            .map(|_| match dice::roll(ABILITY_DICE, rng) {
                Ok(roll) => roll.total(),
                Err(_) => 0,
            })
            .collect();
        self.rolls.sort_unstable_by(|a, b| b.cmp(a));
        self.stats.clear();
    }

    /// Spend a reroll. Returns `false` when none are left.
    pub fn reroll_abilities<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.rerolls == 0 {
            return false;
        }
        self.rerolls -= 1;
        self.roll_abilities(rng);
        true
    }

    /// Assign the rolls, highest first, to abilities in `priority` order.
    pub fn finalize_abilities(&mut self, priority: &[Ability]) {
        let mut rolls = self.rolls.clone();
        rolls.sort_unstable_by(|a, b| b.cmp(a));
        self.stats = priority.iter().copied().zip(rolls).collect();
    }

    /// Message naming the first thing still missing before creation can end
    pub fn missing_for_completion(&self) -> Option<&'static str> {
        if self.name.is_empty() {
            Some("Please enter a valid player name.")
        } else if self.sex.is_none() {
            Some("Please enter a proper sex.")
        } else if self.class.is_none() {
            Some("Please choose a class.")
        } else if self.stats.len() != Ability::ALL.len() {
            Some("Please pick your stats.")
        } else if self.alignment.is_none() {
            Some("Please choose an alignment.")
        } else {
            None
        }
    }
}

/// A text setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    /// Setting name
    pub key: String,
    /// Setting text
    pub value: String,
}

/// A ledger balance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankRecord {
    /// Ledger account, a character name
    pub account: String,
    /// Coins held, by denomination
    pub holdings: BTreeMap<String, u64>,
}

impl BankRecord {
    /// Holdings as a [`Currency`] over `table`
    pub fn currency(&self, table: &Arc<ExchangeTable>) -> Result<Currency, CurrencyError> {
        Currency::from_coins(
            table.clone(),
            self.holdings.iter().map(|(name, count)| (name.as_str(), *count)),
        )
    }

    /// Record for `account` holding `currency`
    pub fn from_currency(account: &str, currency: &Currency) -> Self {
        Self {
            account: account.to_string(),
            holdings: currency.to_map(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_new_player_rolls_abilities() {
        let mut rng = StdRng::seed_from_u64(11);
        let player = Player::create("Gandalf", "wizard@example.com", &mut rng);
        assert_eq!(player.name, "gandalf");
        assert_eq!(player.display_name, "Gandalf");
        assert_eq!(player.rolls.len(), 6);
        assert!(player.rolls.iter().all(|roll| (3..=18).contains(roll)));
        assert!(player.rolls.windows(2).all(|pair| pair[0] >= pair[1]));
        assert_eq!(player.rerolls, STARTING_REROLLS);
    }

    #[test]
    fn test_rerolls_run_out() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut player = Player::create("Frodo", "ring@example.com", &mut rng);
        player.rerolls = 1;
        assert!(player.reroll_abilities(&mut rng));
        assert!(!player.reroll_abilities(&mut rng));
        assert_eq!(player.rerolls, 0);
    }

    #[test]
    fn test_finalize_assigns_highest_first() {
        let mut player = Player {
            rolls: vec![9, 17, 12, 8, 15, 10],
            ..Player::default()
        };
        let priority = [
            Ability::Wisdom,
            Ability::Strength,
            Ability::Charisma,
            Ability::Dexterity,
            Ability::Intelligence,
            Ability::Constitution,
        ];
        player.finalize_abilities(&priority);
        assert_eq!(player.stats[&Ability::Wisdom], 17);
        assert_eq!(player.stats[&Ability::Strength], 15);
        assert_eq!(player.stats[&Ability::Constitution], 8);
    }

    #[test]
    fn test_missing_for_completion() {
        let mut player = Player {
            name: "frodo".into(),
            ..Player::default()
        };
        assert_eq!(player.missing_for_completion(), Some("Please enter a proper sex."));
        player.sex = Some(Sex::Male);
        player.class = Some("thief".into());
        player.rolls = vec![10; 6];
        player.finalize_abilities(&Ability::ALL);
        assert_eq!(player.missing_for_completion(), Some("Please choose an alignment."));
        player.alignment = Some(ALIGNMENT_GOOD);
        assert_eq!(player.missing_for_completion(), None);
    }

    #[test]
    fn test_player_serializes_stats_by_name() {
        let mut player = Player {
            name: "sam".into(),
            rolls: vec![12; 6],
            ..Player::default()
        };
        player.finalize_abilities(&Ability::ALL);
        let value = serde_json::to_value(&player).unwrap();
        assert_eq!(value["stats"]["strength"], 12);
        let back: Player = serde_json::from_value(value).unwrap();
        assert_eq!(back, player);
    }

    #[test]
    fn test_bank_record_currency() {
        let table = Arc::new(ExchangeTable::standard());
        let currency = Currency::parse(table.clone(), "3gp 4cp").unwrap();
        let record = BankRecord::from_currency("frodo", &currency);
        assert_eq!(record.currency(&table).unwrap(), currency);
    }
}
