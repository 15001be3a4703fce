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

//! Built-in commands and the command handler

use super::{CommandTable, Lookup, too_vague};
use crate::AppContext;
use crate::ledger::{LedgerError, Transfer};
use crate::records::Player;
use async_trait::async_trait;
use havok_currency::Currency;
use havok_mediator::MediatorError;
use havok_service::{BoxError, Handoff, HandlerKind, Session, SessionHandler};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reply to a verb that matches nothing
pub const UNKNOWN_COMMAND: &str = "Unknown command.  Type 'help' to see a list of available commands.";

/// The built-in commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// List connected users
    Look,
    /// Talk to everyone
    Say,
    /// Leave the game
    Quit,
    /// List commands or show one command's help
    Help,
    /// Toggle local echo
    Echo,
    /// Show carried coins
    Balance,
    /// Give coins to another character
    Pay,
    /// Edit the character description
    Describe,
}

/// The command table every player gets
pub fn standard_commands() -> CommandTable<Builtin> {
    let mut table = CommandTable::new();
    table
        .register("look", Some("look - list everyone connected"), Builtin::Look)
        .register("say", Some("say <text> - speak to everyone online"), Builtin::Say)
        .register("quit", Some("quit - leave the game"), Builtin::Quit)
        .register("help", Some("help [command] - list commands or explain one"), Builtin::Help)
        .register("echo", Some("echo - toggle whether your client echoes what you type"), Builtin::Echo)
        .register("balance", Some("balance - count the coins you carry"), Builtin::Balance)
        .register("pay", Some("pay <name> <coins> - give money, e.g. 'pay frodo 2gp 5sp'"), Builtin::Pay)
        .register("describe", Some("describe - edit your description in a text editor"), Builtin::Describe)
        .alias("'", "say")
        .alias("?", "help")
        .alias("exit", "quit");
    table
}

/// Handler for a session that has entered the game.
pub struct CommandHandler {
    ctx: Arc<AppContext>,
    session: Arc<Session>,
    player: Player,
}

impl CommandHandler {
    /// Play `player` on `session`
    pub fn new(ctx: Arc<AppContext>, session: Arc<Session>, player: Player) -> Self {
        session.set_name(Some(player.display_name.clone()));
        Self {
            ctx,
            session,
            player,
        }
    }

    /// The character being played
    pub fn player(&self) -> &Player {
        &self.player
    }

    async fn run(&mut self, builtin: Builtin, tokens: &[String]) -> Result<Handoff, BoxError> {
        debug!(session_id = %self.session.id(), command = ?builtin, "Command");
        match builtin {
            Builtin::Look => self.look(),
            Builtin::Say => self.say(tokens),
            Builtin::Quit => {
                self.session.writeln("Goodbye.");
                return Ok(Handoff::Disconnect);
            }
            Builtin::Help => self.help(tokens),
            Builtin::Echo => {
                let echo = !self.session.echo();
                self.session.set_echo(echo);
                self.session
                    .writeln(if echo { "Echo is now on." } else { "Echo is now off." });
            }
            Builtin::Balance => self.balance().await,
            Builtin::Pay => self.pay(tokens).await?,
            Builtin::Describe => return self.describe().await,
        }
        Ok(Handoff::Stay)
    }

    fn look(&self) {
        let sessions = self.ctx.registry().list();
        self.session
            .writeln(format!("There are {} users connected:", sessions.len()));
        self.session
            .writeln(format!("{:<16} {:<15} {}", "Name", "Host", "Port"));
        self.session.writeln("-".repeat(40));
        for info in sessions {
            self.session.writeln(format!(
                "{:<16} {:<15} {}",
                info.name.as_deref().unwrap_or("Unknown"),
                info.hostname,
                info.peer_addr.port()
            ));
        }
    }

    fn say(&self, tokens: &[String]) {
        let text = tokens[1..].join(" ");
        if text.is_empty() {
            self.session.writeln("Say what?");
            return;
        }
        self.session.writeln(format!("You say: \"{}\"", text));
        self.ctx.registry().broadcast(
            &format!("{} says: \"{}\"", self.player.display_name, text),
            Some(self.session.id()),
        );
    }

    fn help(&self, tokens: &[String]) {
        let commands = self.ctx.commands();
        let Some(topic) = tokens.get(1) else {
            self.session.writeln("Commands:");
            for verb in commands.verbs() {
                self.session.writeln(format!("  {}", verb));
            }
            return;
        };
        match commands.lookup(topic) {
            Lookup::Found(command) => match command.help() {
                Some(help) => self.session.writeln(help),
                None => self
                    .session
                    .writeln(format!("No help available for {}.", command.verb())),
            },
            Lookup::Ambiguous(candidates) => self.session.writeln(too_vague(topic, &candidates)),
            Lookup::Unknown => self
                .session
                .writeln(format!("There is no command called {}.", topic)),
        }
    }

    async fn balance(&self) {
        match self.ctx.ledger().get_balance(&self.player.name).await {
            Ok(balance) => self
                .session
                .writeln(format!("You are carrying {}.", balance)),
            Err(err) => {
                warn!(player = %self.player.name, error = %err, "Balance lookup failed");
                self.session.writeln("The bank is unavailable right now.");
            }
        }
    }

    async fn pay(&self, tokens: &[String]) -> Result<(), BoxError> {
        if tokens.len() < 3 {
            self.session.writeln("Pay whom how much?");
            return Ok(());
        }
        let Ok(amount) = Currency::parse(self.ctx.exchange().clone(), &tokens[2..].join(" ")) else {
            self.session.writeln("That is not an amount of money.");
            return Ok(());
        };
        if amount.convert_to_base() == 0 {
            self.session.writeln("Pay how much?");
            return Ok(());
        }
        let payee = match self.ctx.load_player(&tokens[1]).await? {
            Some(player) if player.complete => player,
            _ => {
                self.session
                    .writeln(format!("There is no one called {}.", tokens[1]));
                return Ok(());
            }
        };

        let transfer = Transfer {
            from: self.player.name.clone(),
            to: payee.name.clone(),
            amount: amount.clone(),
        };
        match self.ctx.ledger().submit_transfer(transfer).await {
            Ok(receipt) => {
                let mut line = format!("You pay {} {} using {}", payee.display_name, amount, receipt.paid);
                if !receipt.change.is_empty() {
                    line.push_str(&format!(" and get {} back", receipt.change));
                }
                line.push('.');
                self.session.writeln(line);
                if let Some(online) = self
                    .ctx
                    .registry()
                    .snapshot()
                    .into_iter()
                    .find(|session| session.name().as_deref() == Some(payee.display_name.as_str()))
                {
                    online.writeln(format!("{} pays you {}.", self.player.display_name, amount));
                }
            }
            Err(MediatorError::Failed(err)) if err.is_insufficient_funds() => {
                self.session.writeln("You can't afford that.");
            }
            Err(MediatorError::Failed(LedgerError::SameAccount(_))) => {
                self.session.writeln("You can't pay yourself.");
            }
            Err(err) => {
                warn!(player = %self.player.name, error = %err, "Transfer failed");
                self.session.writeln("The bank is unavailable right now.");
            }
        }
        Ok(())
    }

    async fn describe(&mut self) -> Result<Handoff, BoxError> {
        if let Some(player) = self.ctx.load_player(&self.player.name).await? {
            self.player = player;
        }
        let ctx = self.ctx.clone();
        let session = self.session.clone();
        let name = self.player.name.clone();
        let editor = self.ctx.editor().clone();
        let process = editor
            .launch(
                &self.player.description,
                Box::new(move |text| {
                    Box::pin(async move {
                        let Some(mut player) = ctx.load_player(&name).await? else {
                            return Ok(());
                        };
                        player.description = text.trim_end().to_string();
                        ctx.save_player(&player).await?;
                        session.writeln("Description saved.");
                        Ok::<(), BoxError>(())
                    })
                }),
            )
            .await?;
        self.session
            .writeln(format!("Starting {}...", editor.program()));
        Ok(Handoff::External(process))
    }
}

#[async_trait]
impl SessionHandler for CommandHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Command
    }

    async fn prompt(&mut self) -> Result<String, BoxError> {
        Ok("> ".to_string())
    }

    async fn handle_input(&mut self, tokens: Vec<String>) -> Result<Handoff, BoxError> {
        let Some(verb) = tokens.first() else {
            return Ok(Handoff::Stay);
        };
        let ctx = self.ctx.clone();
        match ctx.commands().lookup(verb) {
            Lookup::Found(command) => self.run(*command.handler(), &tokens).await,
            Lookup::Ambiguous(candidates) => {
                self.session.writeln(too_vague(verb, &candidates));
                Ok(Handoff::Stay)
            }
            Lookup::Unknown => {
                self.session.writeln(UNKNOWN_COMMAND);
                Ok(Handoff::Stay)
            }
        }
    }
}
