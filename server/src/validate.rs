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

//! Input validation for the login flow

use crate::records::Sex;
use regex::{Regex, RegexBuilder};
use sha2::{Digest, Sha512};
use std::sync::LazyLock;

/// Shortest accepted password
pub const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    RegexBuilder::new(r"^([a-z0-9_\-.+]+)@([a-z0-9_\-.]+)\.([a-z]{2,20})$")
        .case_insensitive(true)
        .build()
        .ok()
});

/// Whether `email` looks like a deliverable address
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.as_ref().is_some_and(|pattern| pattern.is_match(email))
}

/// First letter of the first token as a yes/no answer
pub fn yes_no(tokens: &[String]) -> Option<bool> {
    match first_letter(tokens)? {
        'y' => Some(true),
        'n' => Some(false),
        _ => None,
    }
}

/// Hex SHA-512 digest of a password
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha512::digest(password.as_bytes()))
}

/// Hash of the first token, if it is long enough to be a password
pub fn password(tokens: &[String]) -> Option<String> {
    let password = tokens.first()?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return None;
    }
    Some(hash_password(password))
}

/// Whether the first token hashes to `expected`
pub fn password_matches(tokens: &[String], expected: Option<&str>) -> bool {
    match (password(tokens), expected) {
        (Some(hash), Some(expected)) => hash == expected,
        _ => false,
    }
}

/// `M`, `F` or `N`
pub fn sex(tokens: &[String]) -> Option<Sex> {
    match first_letter(tokens)? {
        'm' => Some(Sex::Male),
        'f' => Some(Sex::Female),
        'n' => Some(Sex::Neutral),
        _ => None,
    }
}

/// Character names are two to sixteen ASCII letters
pub fn is_valid_pc_name(name: &str) -> bool {
    (2..=16).contains(&name.len()) && name.chars().all(|ch| ch.is_ascii_alphabetic())
}

fn first_letter(tokens: &[String]) -> Option<char> {
    tokens
        .first()?
        .chars()
        .next()
        .map(|ch| ch.to_ascii_lowercase())
}

/// Outcome of matching user input against a list of names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixMatch<'a> {
    /// Nothing starts with the input
    None,
    /// Exactly one name matched, or the input named one exactly
    Unique(&'a str),
    /// Several names start with the input
    Ambiguous(Vec<&'a str>),
}

/// Case-insensitive unique-prefix lookup. An exact match always wins.
pub fn match_prefix<'a, I>(input: &str, candidates: I) -> PrefixMatch<'a>
where
    I: IntoIterator<Item = &'a str>,
{
    let input = input.to_lowercase();
    if input.is_empty() {
        return PrefixMatch::None;
    }
    let mut matches = Vec::new();
    for candidate in candidates {
        let lower = candidate.to_lowercase();
        if lower == input {
            return PrefixMatch::Unique(candidate);
        }
        if lower.starts_with(&input) {
            matches.push(candidate);
        }
    }
    match matches.len() {
        0 => PrefixMatch::None,
        1 => PrefixMatch::Unique(matches[0]),
        _ => PrefixMatch::Ambiguous(matches),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|word| word.to_string()).collect()
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("newacct@example.com"));
        assert!(is_valid_email("First.Last+mud@mail.example.org"));
        assert!(!is_valid_email("no-at-sign.example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@example.c"));
        assert!(!is_valid_email("us er@example.com"));
    }

    #[test]
    fn test_yes_no() {
        assert_eq!(yes_no(&tokens(&["Yes"])), Some(true));
        assert_eq!(yes_no(&tokens(&["n"])), Some(false));
        assert_eq!(yes_no(&tokens(&["maybe"])), None);
        assert_eq!(yes_no(&[]), None);
    }

    #[test]
    fn test_password_length_and_digest() {
        assert_eq!(password(&tokens(&["short"])), None);
        let hash = password(&tokens(&["longpassword1"])).unwrap();
        assert_eq!(hash.len(), 128);
        assert_eq!(hash, hash_password("longpassword1"));
        assert!(password_matches(&tokens(&["longpassword1"]), Some(&hash)));
        assert!(!password_matches(&tokens(&["wrongpassword"]), Some(&hash)));
        assert!(!password_matches(&tokens(&["longpassword1"]), None));
    }

    #[test]
    fn test_sex() {
        assert_eq!(sex(&tokens(&["female"])), Some(Sex::Female));
        assert_eq!(sex(&tokens(&["N"])), Some(Sex::Neutral));
        assert_eq!(sex(&tokens(&["x"])), None);
    }

    #[test]
    fn test_pc_name() {
        assert!(is_valid_pc_name("Gandalf"));
        assert!(!is_valid_pc_name("G"));
        assert!(!is_valid_pc_name("R2D2"));
        assert!(!is_valid_pc_name("averyveryverylongname"));
    }

    #[test]
    fn test_match_prefix() {
        let names = ["strength", "intelligence", "wisdom", "dexterity", "constitution", "charisma"];
        assert_eq!(match_prefix("S", names), PrefixMatch::Unique("strength"));
        assert_eq!(match_prefix("co", names), PrefixMatch::Unique("constitution"));
        assert_eq!(
            match_prefix("c", names),
            PrefixMatch::Ambiguous(vec!["constitution", "charisma"])
        );
        assert_eq!(match_prefix("x", names), PrefixMatch::None);
        assert_eq!(match_prefix("", names), PrefixMatch::None);
    }

    #[test]
    fn test_exact_match_beats_longer_names() {
        assert_eq!(match_prefix("elf", ["elf", "elfling"]), PrefixMatch::Unique("elf"));
    }
}
