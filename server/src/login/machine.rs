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

use super::LoginState;
use crate::AppContext;
use crate::command::CommandHandler;
use crate::records::{ALIGNMENT_EVIL, ALIGNMENT_GOOD, ALIGNMENT_NEUTRAL, Ability, Account, Player};
use crate::templates::{AccountMenu, CreationMenu, PlayerLine, PlayerList, View};
use crate::validate::{self, PrefixMatch, match_prefix};
use async_trait::async_trait;
use havok_service::{BoxError, Handoff, HandlerKind, Session, SessionHandler};
use metrics::counter;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{info, trace, warn};

const ANSI_BANNER: &str = "$c0012A$c0010N$c0011S$c0014I$c0007 colors enabled.\r\n";

const STATS_HELP: [&str; 4] = [
    "\r\nSelect your stat priority, by listing them from highest to lowest",
    "separated by spaces... don't repeat any stat",
    "For example: 'S I W D Co Ch' would put the highest roll in Strength,",
    "next in Intelligence, Wisdom, Dexterity, Constitution and lastly",
];

const ALIGNMENT_HELP: [&str; 6] = [
    "Your alignment is an indication of how well or poorly your moral conduct",
    "in the game has fared.  It is represented numerically in a range from -1000",
    "($c000RChaotic Evil$c000w) to 1000 ($c000WLawful Good$c000w), with 0 being",
    "neutral.  Generally, if you kill \"Good\" mobs, you will gravitate towards evil",
    "and vice-versa.  Some spells and skills will also affect your alignment when used.",
    "For example, 'backstab' makes you more evil, and the 'heal' spell makes you more good.",
];

const ALIGNMENTS: [(&str, i32); 3] = [
    ("good", ALIGNMENT_GOOD),
    ("neutral", ALIGNMENT_NEUTRAL),
    ("evil", ALIGNMENT_EVIL),
];

/// Result of processing a line or entering a state
enum Step {
    /// Stay in the current state and read the next line
    Wait,
    /// Enter another state
    Goto(LoginState),
    /// Leave the login flow
    Leave(Handoff),
}

/// Outcome of a choice from a configured list
enum Pick {
    Chosen(String),
    Again,
    Back,
}

/// Drives a session from its first line to the game.
///
/// Every line is handled in two phases: the current state processes the
/// tokens and names the next state, then entry actions run for each state
/// entered until one of them waits for input or leaves the flow.
pub struct LoginHandler {
    ctx: Arc<AppContext>,
    session: Arc<Session>,
    state: LoginState,
    account: Option<Account>,
    new_password: Option<String>,
    draft: Option<Player>,
    rng: StdRng,
}

impl LoginHandler {
    /// Start the flow on `session`
    pub fn new(ctx: Arc<AppContext>, session: Arc<Session>) -> Self {
        Self {
            ctx,
            session,
            state: LoginState::Initial,
            account: None,
            new_password: None,
            draft: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Current state
    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Account being logged into, once an email has been given
    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// Character being created, if any
    pub fn draft(&self) -> Option<&Player> {
        self.draft.as_ref()
    }

    async fn run(&mut self, mut step: Step) -> Result<Handoff, BoxError> {
        loop {
            match step {
                Step::Wait => return Ok(Handoff::Stay),
                Step::Leave(handoff) => return Ok(handoff),
                Step::Goto(next) => {
                    trace!(session_id = %self.session.id(), from = %self.state, to = %next, "Login transition");
                    self.state = next;
                    step = self.enter().await?;
                }
            }
        }
    }

    async fn process(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        match self.state {
            LoginState::Initial => Ok(Step::Goto(LoginState::GetEmail)),
            LoginState::GetEmail => self.on_get_email(tokens).await,
            LoginState::ConfirmEmail => Ok(self.on_confirm_email(tokens)),
            LoginState::GetNewUserPassword => self.on_get_new_user_password(tokens),
            LoginState::ConfirmPassword => self.on_confirm_password(tokens),
            LoginState::GetPassword => self.on_get_password(tokens).await,
            LoginState::ChooseAnsi => self.on_choose_ansi(tokens).await,
            LoginState::ShowMotd
            | LoginState::ShowCredits
            | LoginState::ShowPlayerList
            | LoginState::ResendConfirmEmail => Ok(Step::Goto(LoginState::ShowAccountMenu)),
            LoginState::Disconnect => Ok(Step::Leave(Handoff::Disconnect)),
            LoginState::ShowAccountMenu => self.on_account_menu(tokens).await,
            LoginState::GetNewPassword => Ok(self.on_get_new_password(tokens)),
            LoginState::ConfirmNewPassword => self.on_confirm_new_password(tokens).await,
            LoginState::EnterConfirmCode => self.on_enter_confirm_code(tokens).await,
            LoginState::ShowCreationMenu => self.on_creation_menu(tokens).await,
            LoginState::ChooseName => self.on_choose_name(tokens).await,
            LoginState::ChooseSex => self.on_choose_sex(tokens).await,
            LoginState::ChooseRace => self.on_choose_race(tokens).await,
            LoginState::ChooseClass => self.on_choose_class(tokens).await,
            LoginState::ChooseStats => self.on_choose_stats(tokens).await,
            LoginState::ChooseAlignment => self.on_choose_alignment(tokens).await,
            LoginState::RerollAbilities => Ok(Step::Goto(LoginState::ShowCreationMenu)),
            LoginState::Playing => Ok(Step::Goto(LoginState::Playing)),
        }
    }

    async fn on_get_email(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        let Some(first) = tokens.first() else {
            return Ok(Step::Goto(LoginState::Disconnect));
        };
        let email = first.to_lowercase();
        if !validate::is_valid_email(&email) {
            self.session.writeln("Illegal email address, please try again.");
            return Ok(Step::Goto(LoginState::GetEmail));
        }

        let ip = self.session.peer_addr().ip();
        let hostname = self.session.hostname();
        if self.ctx.site_bans().is_banned(ip, &hostname) {
            warn!(session_id = %self.session.id(), email = %email, ip = %ip, hostname = %hostname, "Login from banned site");
            self.session.writeln("Sorry, your site is temporarily banned.");
            return Ok(Step::Goto(LoginState::Disconnect));
        }

        let (mut account, next) = match self.ctx.load_account(&email).await? {
            Some(account) => {
                self.session.set_ansi(account.ansi_mode);
                (account, LoginState::GetPassword)
            }
            None => {
                let wizlock = self.ctx.wizlock();
                if wizlock.is_locked() {
                    self.session
                        .writeln("Sorry, no new accounts at this time, please try again later");
                    if let Some(reason) = wizlock.reason() {
                        self.session.writeln(reason);
                    }
                    return Ok(Step::Goto(LoginState::Disconnect));
                }
                (Account::new(email), LoginState::ConfirmEmail)
            }
        };
        account.ip_address = Some(ip.to_string());
        account.hostname = Some(hostname);
        self.account = Some(account);
        Ok(Step::Goto(next))
    }

    fn on_confirm_email(&mut self, tokens: &[String]) -> Step {
        match validate::yes_no(tokens) {
            None => {
                self.session.write("Please type Y or N: ");
                Step::Wait
            }
            Some(true) => {
                self.session.set_echo(true);
                self.session.writeln("New account.  Welcome!");
                Step::Goto(LoginState::GetNewUserPassword)
            }
            Some(false) => {
                self.session.writeln("OK, then what IS it then?");
                self.account = None;
                Step::Goto(LoginState::GetEmail)
            }
        }
    }

    fn on_get_new_user_password(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        self.session.set_echo(true);
        let Some(hash) = validate::password(tokens) else {
            self.session.writeln("Illegal password.");
            return Ok(Step::Goto(LoginState::GetNewUserPassword));
        };
        require(&mut self.account, "account", self.state)?.password = Some(hash);
        Ok(Step::Goto(LoginState::ConfirmPassword))
    }

    fn on_confirm_password(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        self.session.set_echo(true);
        let account = require(&mut self.account, "account", self.state)?;
        if !validate::password_matches(tokens, account.password.as_deref()) {
            self.session.writeln("Passwords don't match.");
            return Ok(Step::Goto(LoginState::GetNewUserPassword));
        }
        info!(session_id = %self.session.id(), email = %account.email, "New account");
        counter!("havokmud.accounts.created").increment(1);
        Ok(Step::Goto(LoginState::ChooseAnsi))
    }

    async fn on_get_password(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        self.session.set_echo(true);
        if tokens.is_empty() {
            return Ok(Step::Goto(LoginState::Disconnect));
        }
        let account = require(&mut self.account, "account", self.state)?;
        if !validate::password_matches(tokens, account.password.as_deref()) {
            self.session.writeln("Wrong password.");
            warn!(session_id = %self.session.id(), email = %account.email, "Bad password from {}", account.email);
            return Ok(Step::Goto(LoginState::Disconnect));
        }
        info!(
            session_id = %self.session.id(),
            "{} has connected from {} ({})",
            account.email,
            account.ip_address.as_deref().unwrap_or_default(),
            account.hostname.as_deref().unwrap_or_default()
        );
        counter!("havokmud.logins").increment(1);
        self.ctx.save_account(account).await?;
        Ok(Step::Goto(LoginState::ShowAccountMenu))
    }

    async fn on_choose_ansi(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        let Some(answer) = validate::yes_no(tokens) else {
            self.session.write("Please type Y or N: ");
            return Ok(Step::Wait);
        };
        self.session.set_ansi(answer);
        let account = require(&mut self.account, "account", self.state)?;
        account.ansi_mode = answer;
        if answer {
            self.session.writeln(ANSI_BANNER);
        }
        self.ctx.save_account(account).await?;
        if !account.confirmed && account.confcode.is_none() {
            Ok(Step::Goto(LoginState::ResendConfirmEmail))
        } else {
            Ok(Step::Goto(LoginState::ShowAccountMenu))
        }
    }

    async fn on_account_menu(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        let Some(choice) = first_letter(tokens) else {
            return Ok(Step::Goto(LoginState::ShowAccountMenu));
        };
        let account = require(&mut self.account, "account", self.state)?;
        let confirmed = account.confirmed;
        let next = match choice {
            '1' => Some(LoginState::ChooseAnsi),
            '2' => Some(LoginState::GetNewPassword),
            '3' => Some(LoginState::ShowMotd),
            '4' => Some(LoginState::ShowCredits),
            '5' if confirmed => Some(LoginState::ShowPlayerList),
            '6' if confirmed => Some(LoginState::ShowCreationMenu),
            '7' if confirmed => {
                let players = self.ctx.players_of(account).await?;
                if !players.iter().any(|player| player.complete) {
                    self.session
                        .writeln("You need to finish creating a character first.");
                    return Ok(Step::Goto(LoginState::ShowAccountMenu));
                }
                Some(LoginState::Playing)
            }
            'e' if !confirmed => Some(LoginState::EnterConfirmCode),
            'r' if !confirmed => Some(LoginState::ResendConfirmEmail),
            'q' => Some(LoginState::Disconnect),
            _ => None,
        };
        match next {
            Some(state) => Ok(Step::Goto(state)),
            None => {
                self.session.writeln("Invalid Choice...  Try again.");
                Ok(Step::Goto(LoginState::ShowAccountMenu))
            }
        }
    }

    fn on_get_new_password(&mut self, tokens: &[String]) -> Step {
        self.session.set_echo(true);
        match validate::password(tokens) {
            Some(hash) => {
                self.new_password = Some(hash);
                Step::Goto(LoginState::ConfirmNewPassword)
            }
            None => {
                self.session.writeln("Illegal password.");
                Step::Goto(LoginState::GetNewPassword)
            }
        }
    }

    async fn on_confirm_new_password(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        self.session.set_echo(true);
        let new_password = self.new_password.take();
        if !validate::password_matches(tokens, new_password.as_deref()) {
            self.session.writeln("Passwords don't match.");
            return Ok(Step::Goto(LoginState::ShowAccountMenu));
        }
        let account = require(&mut self.account, "account", self.state)?;
        account.password = new_password;
        self.ctx.save_account(account).await?;
        self.session.writeln("Password changed...");
        Ok(Step::Goto(LoginState::ShowAccountMenu))
    }

    async fn on_enter_confirm_code(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        let Some(code) = tokens.first() else {
            self.session.writeln("Entry aborted.");
            return Ok(Step::Goto(LoginState::ShowAccountMenu));
        };
        let account = require(&mut self.account, "account", self.state)?;
        let matches = account
            .confcode
            .as_deref()
            .is_some_and(|expected| expected.eq_ignore_ascii_case(code));
        if matches {
            account.confirmed = true;
            account.confcode = None;
            self.ctx.save_account(account).await?;
            info!(session_id = %self.session.id(), email = %account.email, "Email confirmed");
            self.session
                .writeln("\r\nYour email is now confirmed, you can now play.  Thank you!");
        } else {
            account.confirmed = false;
            self.ctx.save_account(account).await?;
            self.session
                .writeln("\r\nConfirmation code does not match our records.  Please try again,");
            self.session
                .writeln("or resend the confirmation email to get a new code.\r\n");
        }
        Ok(Step::Goto(LoginState::ShowAccountMenu))
    }

    async fn on_creation_menu(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        let Some(choice) = first_letter(tokens) else {
            return Ok(Step::Goto(LoginState::ShowCreationMenu));
        };
        let next = match choice {
            '1' => LoginState::ChooseName,
            '2' => LoginState::ChooseSex,
            '3' => LoginState::ChooseRace,
            '4' => LoginState::ChooseClass,
            '5' => {
                if require(&mut self.draft, "draft", self.state)?.class.is_none() {
                    self.session.writeln("\r\nPlease select a class first.");
                    LoginState::ShowCreationMenu
                } else {
                    LoginState::ChooseStats
                }
            }
            '6' => LoginState::ChooseAlignment,
            'd' => return self.finish_character().await,
            'r' => LoginState::RerollAbilities,
            'q' => LoginState::ShowAccountMenu,
            _ => {
                self.session.writeln("Invalid Choice...  Try again.");
                LoginState::ShowCreationMenu
            }
        };
        Ok(Step::Goto(next))
    }

    async fn finish_character(&mut self) -> Result<Step, BoxError> {
        let draft = require(&mut self.draft, "draft", self.state)?;
        if let Some(missing) = draft.missing_for_completion() {
            self.session.writeln(missing);
            return Ok(Step::Goto(LoginState::ShowCreationMenu));
        }
        draft.complete = true;
        self.ctx.save_player(draft).await?;
        info!(
            session_id = %self.session.id(),
            player = %draft.name,
            "{} [{}] new player",
            draft.display_name,
            self.session.hostname()
        );
        counter!("havokmud.players.created").increment(1);
        if let Err(err) = self
            .ctx
            .ledger()
            .deposit(&draft.name, self.ctx.starting_purse().clone())
            .await
        {
            warn!(player = %draft.name, error = %err, "Starting purse was not deposited");
        }
        self.draft = None;
        Ok(Step::Goto(LoginState::ShowAccountMenu))
    }

    async fn on_choose_name(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        let Some(name) = tokens.first() else {
            self.session.writeln("Never mind then.");
            return Ok(Step::Goto(LoginState::ShowCreationMenu));
        };

        if let Some(existing) = self.ctx.load_player(name).await? {
            return self.name_in_use(existing);
        }

        if !validate::is_valid_pc_name(name) {
            self.session
                .writeln("That name is not acceptable and has been blacklisted");
            return Ok(Step::Goto(LoginState::ShowCreationMenu));
        }

        let mut renamed = require(&mut self.draft, "draft", self.state)?.clone();
        renamed.name = name.to_lowercase();
        renamed.display_name = name.clone();
        if let Some(existing) = self.ctx.claim_player(&renamed).await? {
            return self.name_in_use(existing);
        }

        let account = require(&mut self.account, "account", self.state)?;
        if let Some(previous) = self.draft.replace(renamed) {
            if !previous.name.is_empty() {
                account.remove_player(&previous.name);
            }
        }
        account.add_player(&name.to_lowercase());
        self.ctx.save_account(account).await?;
        Ok(Step::Goto(LoginState::ShowCreationMenu))
    }

    /// A chosen name already has a record: resume it if it is ours.
    fn name_in_use(&mut self, existing: Player) -> Result<Step, BoxError> {
        let account = require(&mut self.account, "account", self.state)?;
        if existing.account != account.email {
            self.session.writeln("Name is already taken.");
            return Ok(Step::Goto(LoginState::ChooseName));
        }
        if existing.complete {
            self.session.writeln("That PC is completed already.");
            return Ok(Step::Goto(LoginState::ShowAccountMenu));
        }
        self.draft = Some(existing);
        Ok(Step::Goto(LoginState::ShowCreationMenu))
    }

    async fn on_choose_sex(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        let Some(sex) = validate::sex(tokens) else {
            self.session.writeln("That's not a valid sex...");
            return Ok(Step::Goto(LoginState::ChooseSex));
        };
        require(&mut self.draft, "draft", self.state)?.sex = Some(sex);
        self.save_draft().await?;
        Ok(Step::Goto(LoginState::ShowCreationMenu))
    }

    async fn on_choose_race(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        let ctx = self.ctx.clone();
        match self.pick(tokens, &ctx.config().game.races, "race") {
            Pick::Chosen(race) => {
                require(&mut self.draft, "draft", self.state)?.race = Some(race);
                self.save_draft().await?;
                Ok(Step::Goto(LoginState::ShowCreationMenu))
            }
            Pick::Again => Ok(Step::Goto(LoginState::ChooseRace)),
            Pick::Back => Ok(Step::Goto(LoginState::ShowCreationMenu)),
        }
    }

    async fn on_choose_class(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        let ctx = self.ctx.clone();
        match self.pick(tokens, &ctx.config().game.classes, "class") {
            Pick::Chosen(class) => {
                require(&mut self.draft, "draft", self.state)?.class = Some(class);
                self.save_draft().await?;
                Ok(Step::Goto(LoginState::ShowCreationMenu))
            }
            Pick::Again => Ok(Step::Goto(LoginState::ChooseClass)),
            Pick::Back => Ok(Step::Goto(LoginState::ShowCreationMenu)),
        }
    }

    fn pick(&self, tokens: &[String], options: &[String], what: &str) -> Pick {
        let Some(choice) = tokens.first() else {
            self.session.writeln("Never mind then.");
            return Pick::Back;
        };
        if choice == "?" {
            self.session
                .writeln(format!("Available choices: {}", options.join(", ")));
            return Pick::Again;
        }
        match match_prefix(choice, options.iter().map(String::as_str)) {
            PrefixMatch::Unique(found) => Pick::Chosen(found.to_string()),
            PrefixMatch::Ambiguous(candidates) => {
                self.session.writeln(too_vague(choice, &candidates));
                Pick::Again
            }
            PrefixMatch::None => {
                self.session.writeln(format!("That's not a valid {}.", what));
                Pick::Again
            }
        }
    }

    async fn on_choose_stats(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        let mut priority = Vec::with_capacity(Ability::ALL.len());
        let mut valid = tokens.len() == Ability::ALL.len();
        for token in tokens {
            match match_prefix(token, Ability::ALL.iter().map(|ability| ability.name())) {
                PrefixMatch::Unique(name) => match Ability::from_name(name) {
                    Some(ability) if !priority.contains(&ability) => priority.push(ability),
                    _ => valid = false,
                },
                PrefixMatch::Ambiguous(candidates) => {
                    self.session.writeln(too_vague(token, &candidates));
                    valid = false;
                }
                PrefixMatch::None => valid = false,
            }
        }
        if valid {
            require(&mut self.draft, "draft", self.state)?.finalize_abilities(&priority);
            self.save_draft().await?;
        } else {
            self.session
                .writeln("These choices are not valid.  Please try again.");
        }
        Ok(Step::Goto(LoginState::ShowCreationMenu))
    }

    async fn on_choose_alignment(&mut self, tokens: &[String]) -> Result<Step, BoxError> {
        let Some(choice) = tokens.first() else {
            self.session.writeln("Never mind then.");
            return Ok(Step::Goto(LoginState::ShowCreationMenu));
        };
        let PrefixMatch::Unique(name) = match_prefix(choice, ALIGNMENTS.iter().map(|(name, _)| *name)) else {
            self.session.writeln("Please choose Good, Neutral or Evil.");
            return Ok(Step::Goto(LoginState::ChooseAlignment));
        };
        let alignment = ALIGNMENTS
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, value)| *value);
        require(&mut self.draft, "draft", self.state)?.alignment = alignment;
        self.save_draft().await?;
        Ok(Step::Goto(LoginState::ShowCreationMenu))
    }

    async fn save_draft(&self) -> Result<(), BoxError> {
        if let Some(draft) = self.draft.as_ref().filter(|draft| !draft.name.is_empty()) {
            self.ctx.save_player(draft).await?;
        }
        Ok(())
    }

    /// Entry actions of the state just entered
    async fn enter(&mut self) -> Result<Step, BoxError> {
        let session = &self.session;
        match self.state {
            LoginState::Initial => Ok(Step::Wait),
            LoginState::GetEmail => {
                session.write("What is your account name (email address)? ");
                Ok(Step::Wait)
            }
            LoginState::ConfirmEmail => {
                let email = self.account.as_ref().map(|account| account.email.as_str());
                session.write(format!(
                    "Did I get that right, {} (Y/N)? ",
                    email.unwrap_or_default()
                ));
                Ok(Step::Wait)
            }
            LoginState::GetNewUserPassword => {
                let email = self.account.as_ref().map(|account| account.email.as_str());
                session.write(format!("Give me a password for {}: ", email.unwrap_or_default()));
                session.set_echo(false);
                Ok(Step::Wait)
            }
            LoginState::ConfirmPassword | LoginState::ConfirmNewPassword => {
                session.write("Please retype password: ");
                session.set_echo(false);
                Ok(Step::Wait)
            }
            LoginState::GetPassword => {
                session.write("Password: ");
                session.set_echo(false);
                Ok(Step::Wait)
            }
            LoginState::ChooseAnsi => {
                session.write("Would you like ANSI colors? (Y/N) ");
                Ok(Step::Wait)
            }
            LoginState::ShowMotd => {
                session.write(self.ctx.motd().await?);
                session.writeln("\r\n\r\n[PRESS RETURN]");
                Ok(Step::Wait)
            }
            LoginState::ShowCredits => {
                session.write(self.ctx.credits().await?);
                session.writeln("\r\n\r\n[PRESS RETURN]");
                Ok(Step::Wait)
            }
            LoginState::Disconnect => {
                session.writeln("Goodbye.");
                Ok(Step::Leave(Handoff::Disconnect))
            }
            LoginState::ShowAccountMenu => {
                let account = require(&mut self.account, "account", self.state)?;
                let view = View::AccountMenu(AccountMenu {
                    mud_name: self.ctx.mud_name().to_string(),
                    email: account.email.clone(),
                    confirmed: account.confirmed,
                });
                session.defer(self.ctx.templates().deferred(view));
                Ok(Step::Wait)
            }
            LoginState::ShowPlayerList => {
                let account = require(&mut self.account, "account", self.state)?;
                let players = self.ctx.players_of(account).await?;
                let view = View::PlayerList(PlayerList {
                    players: players.iter().map(PlayerLine::from).collect(),
                });
                session.defer(self.ctx.templates().deferred(view));
                Ok(Step::Wait)
            }
            LoginState::GetNewPassword => {
                session.write("Please enter new password: ");
                session.set_echo(false);
                Ok(Step::Wait)
            }
            LoginState::EnterConfirmCode => {
                session.write("Please enter the confirmation code you were emailed: ");
                Ok(Step::Wait)
            }
            LoginState::ResendConfirmEmail => {
                let account = require(&mut self.account, "account", self.state)?;
                session.writeln(if account.confcode.is_some() {
                    "Resending your confirmation email..."
                } else {
                    "Sending your confirmation email..."
                });
                self.ctx.send_confirmation(account).await?;
                session.writeln("Hit enter to continue");
                Ok(Step::Wait)
            }
            LoginState::ShowCreationMenu => {
                let email = require(&mut self.account, "account", self.state)?.email.clone();
                let rng = &mut self.rng;
                let draft = self
                    .draft
                    .get_or_insert_with(|| Player::create("", &email, rng));
                let view = View::CreationMenu(CreationMenu::from(&*draft));
                session.defer(self.ctx.templates().deferred(view));
                Ok(Step::Wait)
            }
            LoginState::ChooseName => {
                session.write("Choose the name of your new PC: ");
                Ok(Step::Wait)
            }
            LoginState::ChooseSex => {
                session.write("What is your sex (M)ale/(F)emale/(N)eutral)? ");
                Ok(Step::Wait)
            }
            LoginState::ChooseRace => {
                session.write("For help type '?'- will list the races.\r\n RACE: ");
                require(&mut self.draft, "draft", self.state)?.class = None;
                Ok(Step::Wait)
            }
            LoginState::ChooseClass => {
                session.write("\r\nSelect your class now.\r\nEnter ? for help.\r\n CLASS: ");
                let draft = require(&mut self.draft, "draft", self.state)?;
                draft.alignment = None;
                draft.stats.clear();
                Ok(Step::Wait)
            }
            LoginState::ChooseStats => {
                for line in STATS_HELP {
                    session.writeln(line);
                }
                session.write("Charisma.\r\nYour choices? ");
                Ok(Step::Wait)
            }
            LoginState::ChooseAlignment => {
                for line in ALIGNMENT_HELP {
                    session.writeln(line);
                }
                session.write(
                    "Please select your starting alignment ($c000WGood$c000w/Neutral/$c000REvil$c000w): ",
                );
                Ok(Step::Wait)
            }
            LoginState::RerollAbilities => {
                let draft = require(&mut self.draft, "draft", self.state)?;
                if draft.reroll_abilities(&mut self.rng) {
                    self.save_draft().await?;
                } else {
                    session.writeln("You have no rerolls left.");
                }
                Ok(Step::Goto(LoginState::ShowCreationMenu))
            }
            LoginState::Playing => self.enter_game().await,
        }
    }

    async fn enter_game(&mut self) -> Result<Step, BoxError> {
        let account = require(&mut self.account, "account", self.state)?;
        let players = self.ctx.players_of(account).await?;
        let Some(player) = players.into_iter().find(|player| player.complete) else {
            self.session.writeln("You have no finished characters.");
            return Ok(Step::Goto(LoginState::ShowAccountMenu));
        };
        info!(
            session_id = %self.session.id(),
            email = %account.email,
            player = %player.name,
            "{} has entered the game",
            player.display_name
        );
        counter!("havokmud.players.entered").increment(1);
        let handler = CommandHandler::new(self.ctx.clone(), self.session.clone(), player);
        Ok(Step::Leave(Handoff::Replace(Box::new(handler))))
    }
}

#[async_trait]
impl SessionHandler for LoginHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Login
    }

    async fn prompt(&mut self) -> Result<String, BoxError> {
        if self.state == LoginState::Initial {
            self.run(Step::Goto(LoginState::GetEmail)).await?;
        }
        Ok(String::new())
    }

    async fn handle_input(&mut self, tokens: Vec<String>) -> Result<Handoff, BoxError> {
        let step = self.process(&tokens).await?;
        self.run(step).await
    }
}

fn require<'a, T>(slot: &'a mut Option<T>, what: &str, state: LoginState) -> Result<&'a mut T, BoxError> {
    slot.as_mut()
        .ok_or_else(|| format!("no {} loaded in state {}", what, state).into())
}

fn first_letter(tokens: &[String]) -> Option<char> {
    tokens
        .first()
        .and_then(|token| token.chars().next())
        .map(|letter| letter.to_ascii_lowercase())
}

fn too_vague(choice: &str, candidates: &[&str]) -> String {
    format!("Choice {} too vague:  could be any of {}", choice, candidates.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_letter_is_lowercased() {
        assert_eq!(first_letter(&["Quit".to_string()]), Some('q'));
        assert_eq!(first_letter(&[]), None);
    }

    #[test]
    fn test_require_names_missing_slot() {
        let mut slot: Option<Account> = None;
        let err = require(&mut slot, "account", LoginState::ShowAccountMenu).unwrap_err();
        assert_eq!(err.to_string(), "no account loaded in state SHOW_ACCOUNT_MENU");
    }

    #[test]
    fn test_too_vague_lists_candidates() {
        assert_eq!(
            too_vague("c", &["constitution", "charisma"]),
            "Choice c too vague:  could be any of constitution, charisma"
        );
    }
}
