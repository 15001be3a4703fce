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

//! Verb lookup with aliases and unique prefixes

use crate::validate::{PrefixMatch, match_prefix};
use std::collections::{BTreeMap, HashMap};

/// A registered command
#[derive(Debug, Clone)]
pub struct Command<H> {
    verb: String,
    help: Option<String>,
    handler: H,
}

impl<H> Command<H> {
    /// Root verb
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Help text, if any
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Bound handler
    pub fn handler(&self) -> &H {
        &self.handler
    }
}

/// Result of resolving a verb
#[derive(Debug)]
pub enum Lookup<'a, H> {
    /// One command matched
    Found(&'a Command<H>),
    /// No command starts with the verb
    Unknown,
    /// Several commands start with the verb, in verb order
    Ambiguous(Vec<&'a str>),
}

/// Commands keyed by root verb.
///
/// A verb resolves through, in order: an alias, an exact root verb, then a
/// root verb it is the unique prefix of.
///
/// # Example
///
/// ```
/// use havok_server::command::{CommandTable, Lookup};
///
/// let mut table = CommandTable::new();
/// table.register("list", None, 1).register("look", None, 2);
/// table.alias("exit", "quit");
///
/// assert!(matches!(table.lookup("li"), Lookup::Found(command) if *command.handler() == 1));
/// assert!(matches!(table.lookup("l"), Lookup::Ambiguous(names) if names == ["list", "look"]));
/// assert!(matches!(table.lookup("dance"), Lookup::Unknown));
/// ```
#[derive(Debug, Clone)]
pub struct CommandTable<H> {
    commands: BTreeMap<String, Command<H>>,
    aliases: HashMap<String, String>,
}

impl<H> Default for CommandTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> CommandTable<H> {
    /// An empty table
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Bind `verb` to `handler`, replacing any previous binding
    pub fn register(&mut self, verb: &str, help: Option<&str>, handler: H) -> &mut Self {
        let verb = verb.to_lowercase();
        self.commands.insert(
            verb.clone(),
            Command {
                verb,
                help: help.map(str::to_string),
                handler,
            },
        );
        self
    }

    /// Make `alias` resolve to the root verb `root`
    pub fn alias(&mut self, alias: &str, root: &str) -> &mut Self {
        self.aliases.insert(alias.to_lowercase(), root.to_lowercase());
        self
    }

    /// Resolve a verb as typed
    pub fn lookup(&self, verb: &str) -> Lookup<'_, H> {
        let verb = verb.to_lowercase();
        let root = self.aliases.get(&verb).unwrap_or(&verb);
        if let Some(command) = self.commands.get(root) {
            return Lookup::Found(command);
        }
        match match_prefix(root, self.commands.keys().map(String::as_str)) {
            PrefixMatch::Unique(name) => self
                .commands
                .get(name)
                .map_or(Lookup::Unknown, Lookup::Found),
            PrefixMatch::Ambiguous(names) => Lookup::Ambiguous(names),
            PrefixMatch::None => Lookup::Unknown,
        }
    }

    /// Command bound to exactly `verb`
    pub fn get(&self, verb: &str) -> Option<&Command<H>> {
        self.commands.get(&verb.to_lowercase())
    }

    /// Root verbs in order
    pub fn verbs(&self) -> impl Iterator<Item = &str> + '_ {
        self.commands.keys().map(String::as_str)
    }

    /// Number of root verbs
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Line shown for an ambiguous verb
pub fn too_vague(verb: &str, candidates: &[&str]) -> String {
    format!("Command '{}' too vague:  could be any of {}", verb, candidates.join(", "))
}
