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

//! Application context
//!
//! Everything a session handler needs beyond its own session: configuration,
//! the live session registry, handles to every resource actor, and the
//! admission policy (wizlock and site bans). Built once at startup and shared
//! behind an `Arc`.

use crate::command::{Builtin, CommandTable};
use crate::config::{EmailMode, EmailSection, MudConfig, StorageBackend, StorageSection};
use crate::editor::Editor;
use crate::ledger::LedgerHandle;
use crate::records::{ACCOUNTS, Account, PLAYERS, Player, SETTINGS, Setting, TABLES};
use crate::templates::{ConfirmationEmail, TemplateHandle, View};
use crate::{MudError, Result};
use havok_currency::{Currency, ExchangeTable};
use havok_mediator::{
    Cache, CacheHandle, DnsHandle, Email, EmailHandle, EmailTransport, MediatorError, Resolver,
    StoreHandle, Table, key,
};
use havok_service::SessionRegistry;
use serde_json::json;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Shown by the MOTD screen when no `motd` setting exists
pub const DEFAULT_MOTD: &str = "Welcome to HavokMud.  There is no message of the day yet.";

/// Shown by the credits screen when no `credits` setting exists
pub const DEFAULT_CREDITS: &str = "HavokMud is brought to you by its builders and players.";

/// Runtime switch refusing new accounts
#[derive(Debug, Default)]
pub struct Wizlock {
    locked: AtomicBool,
    reason: RwLock<Option<String>>,
}

impl Wizlock {
    /// A lock in the given state
    pub fn new(locked: bool, reason: Option<String>) -> Self {
        Self {
            locked: AtomicBool::new(locked),
            reason: RwLock::new(reason),
        }
    }

    /// Whether new accounts are refused
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Explanation shown to refused users
    pub fn reason(&self) -> Option<String> {
        self.reason
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Change the lock
    pub fn set(&self, locked: bool, reason: Option<String>) {
        *self.reason.write().unwrap_or_else(PoisonError::into_inner) = reason;
        self.locked.store(locked, Ordering::Release);
    }
}

/// Banned addresses and hostname suffixes.
///
/// An entry matches an IP address exactly, a hostname exactly, or any
/// hostname ending in `.` followed by the entry. An empty list bans nothing.
#[derive(Debug, Clone, Default)]
pub struct SiteBans {
    entries: Vec<String>,
}

impl SiteBans {
    /// Ban list from config entries
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| entry.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|entry| !entry.is_empty())
                .collect(),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is banned
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a client at `ip` with reverse DNS `hostname` is banned
    pub fn is_banned(&self, ip: IpAddr, hostname: &str) -> bool {
        let ip = ip.to_string();
        let hostname = hostname.to_lowercase();
        self.entries.iter().any(|entry| {
            *entry == ip
                || *entry == hostname
                || hostname
                    .strip_suffix(entry.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// Shared state of a running MUD.
pub struct AppContext {
    config: MudConfig,
    registry: Arc<SessionRegistry>,
    store: StoreHandle,
    dns: DnsHandle,
    email: EmailHandle,
    cache: CacheHandle,
    templates: TemplateHandle,
    ledger: LedgerHandle,
    exchange: Arc<ExchangeTable>,
    starting_purse: Currency,
    wizlock: Wizlock,
    site_bans: SiteBans,
    editor: Editor,
    commands: CommandTable<Builtin>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("sessions", &self.registry.len())
            .field("wizlocked", &self.wizlock.is_locked())
            .field("site_bans", &self.site_bans.len())
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Open every backend named by `config`.
    pub async fn build(config: MudConfig, registry: Arc<SessionRegistry>) -> Result<Arc<AppContext>> {
        let store = open_store(&config.storage).await?;
        let cache = match &config.cache.redis_url {
            Some(url) => Cache::connect(url).await?,
            None => Cache::memory(),
        };
        let email = email_transport(&config.email)?;
        Self::assemble(
            config,
            registry,
            store,
            DnsHandle::spawn(Resolver::System),
            EmailHandle::spawn(email),
            CacheHandle::spawn(cache),
        )
    }

    /// A context with in-memory tables, a static resolver, no email and an
    /// in-memory cache, whatever `config` says about backends.
    pub fn in_memory(config: MudConfig, registry: Arc<SessionRegistry>) -> Result<Arc<AppContext>> {
        let store = StoreHandle::spawn(
            TABLES
                .into_iter()
                .map(|(name, key_field)| (name, Table::in_memory([key_field]))),
        );
        Self::assemble(
            config,
            registry,
            store,
            DnsHandle::spawn(Resolver::Static(HashMap::new())),
            EmailHandle::spawn(EmailTransport::Disabled),
            CacheHandle::spawn(Cache::memory()),
        )
    }

    fn assemble(
        config: MudConfig,
        registry: Arc<SessionRegistry>,
        store: StoreHandle,
        dns: DnsHandle,
        email: EmailHandle,
        cache: CacheHandle,
    ) -> Result<Arc<AppContext>> {
        config.validate()?;
        let exchange = Arc::new(config.currency.exchange.clone());
        let starting_purse = Currency::parse(exchange.clone(), &config.currency.starting_purse)?;
        Ok(Arc::new(AppContext {
            ledger: LedgerHandle::spawn(store.clone(), exchange.clone()),
            templates: TemplateHandle::spawn(),
            wizlock: Wizlock::new(config.server.wizlocked, config.server.wizlock_reason.clone()),
            site_bans: SiteBans::new(&config.server.banned_sites),
            editor: Editor::from_config(&config.editor),
            commands: crate::command::standard_commands(),
            starting_purse,
            exchange,
            config,
            registry,
            store,
            dns,
            email,
            cache,
        }))
    }

    /// Loaded configuration
    pub fn config(&self) -> &MudConfig {
        &self.config
    }

    /// MUD name
    pub fn mud_name(&self) -> &str {
        &self.config.game.name
    }

    /// Live sessions
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Record store
    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Reverse DNS
    pub fn dns(&self) -> &DnsHandle {
        &self.dns
    }

    /// Auth cache
    pub fn cache(&self) -> &CacheHandle {
        &self.cache
    }

    /// Template renderer
    pub fn templates(&self) -> &TemplateHandle {
        &self.templates
    }

    /// Coin ledger
    pub fn ledger(&self) -> &LedgerHandle {
        &self.ledger
    }

    /// Exchange table
    pub fn exchange(&self) -> &Arc<ExchangeTable> {
        &self.exchange
    }

    /// Coins given to every completed character
    pub fn starting_purse(&self) -> &Currency {
        &self.starting_purse
    }

    /// New account switch
    pub fn wizlock(&self) -> &Wizlock {
        &self.wizlock
    }

    /// Banned sites
    pub fn site_bans(&self) -> &SiteBans {
        &self.site_bans
    }

    /// External editor
    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// In-game commands
    pub fn commands(&self) -> &CommandTable<Builtin> {
        &self.commands
    }

    /// Account with `email`, if one exists
    pub async fn load_account(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.store.get(ACCOUNTS, key([("email", email)])).await?)
    }

    /// Persist `account` and refresh its auth cache entries
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        self.store.put(ACCOUNTS, account).await?;
        self.mirror_account(account).await;
        Ok(())
    }

    /// Character named `name`, if one exists
    pub async fn load_player(&self, name: &str) -> Result<Option<Player>> {
        Ok(self
            .store
            .get(PLAYERS, key([("name", name.to_lowercase())]))
            .await?)
    }

    /// Persist `player`
    pub async fn save_player(&self, player: &Player) -> Result<()> {
        Ok(self.store.put(PLAYERS, player).await?)
    }

    /// Store `player` unless its name is taken, returning the holder if it is
    pub async fn claim_player(&self, player: &Player) -> Result<Option<Player>> {
        Ok(self.store.claim(PLAYERS, player).await?)
    }

    /// Characters owned by `account`, in the order they were created
    pub async fn players_of(&self, account: &Account) -> Result<Vec<Player>> {
        let mut players = Vec::with_capacity(account.players.len());
        for name in &account.players {
            if let Some(player) = self.load_player(name).await? {
                players.push(player);
            }
        }
        Ok(players)
    }

    /// Text setting `key`
    pub async fn setting(&self, key_name: &str) -> Result<Option<String>> {
        let setting: Option<Setting> = self.store.get(SETTINGS, key([("key", key_name)])).await?;
        Ok(setting.map(|setting| setting.value))
    }

    /// Store text setting `key`
    pub async fn set_setting(&self, key_name: &str, value: &str) -> Result<()> {
        let setting = Setting {
            key: key_name.to_string(),
            value: value.to_string(),
        };
        Ok(self.store.put(SETTINGS, &setting).await?)
    }

    /// Message of the day
    pub async fn motd(&self) -> Result<String> {
        Ok(self.setting("motd").await?.unwrap_or_else(|| DEFAULT_MOTD.to_string()))
    }

    /// Credits text
    pub async fn credits(&self) -> Result<String> {
        Ok(self
            .setting("credits")
            .await?
            .unwrap_or_else(|| DEFAULT_CREDITS.to_string()))
    }

    /// Write the auth cache entries for every character of `account`.
    pub async fn mirror_account(&self, account: &Account) {
        let domain = &self.config.email.domain;
        for player in &account.players {
            let player = player.to_lowercase();
            let user = json!({ "user": format!("{}@{}", player, domain) });
            self.cache.set(format!("userdb/{}", player), user.to_string()).await;
            if let Some(password) = &account.password {
                let pass = json!({ "password": format!("{{PLAIN}}{}", password) });
                self.cache.set(format!("passdb/{}", player), pass.to_string()).await;
            }
        }
    }

    /// Mirror every stored account into the auth cache. Returns the number of
    /// accounts mirrored.
    pub async fn prime_cache(&self) -> Result<usize> {
        let accounts: Vec<Account> = self.store.scan(ACCOUNTS).await?;
        for account in &accounts {
            self.mirror_account(account).await;
        }
        info!(accounts = accounts.len(), "Auth cache primed");
        Ok(accounts.len())
    }

    /// Email `account` its confirmation code, creating one first if needed.
    ///
    /// Delivery failures are logged and otherwise ignored.
    pub async fn send_confirmation(&self, account: &mut Account) -> Result<()> {
        let confcode = match &account.confcode {
            Some(code) => code.clone(),
            None => {
                let code = Uuid::new_v4().to_string();
                account.confcode = Some(code.clone());
                self.save_account(account).await?;
                code
            }
        };
        if self.config.email.mode == EmailMode::Disabled {
            warn!(email = %account.email, "Email is disabled, confirmation code not sent");
        }
        let body = self
            .templates
            .render(View::ConfirmationEmail(ConfirmationEmail {
                mud_name: self.mud_name().to_string(),
                email: account.email.clone(),
                confcode,
            }))
            .await?;
        let email = Email {
            from: self.config.email.sender(),
            to: account.email.clone(),
            subject: format!("Confirm your email for {}", self.mud_name()),
            html: None,
            text: Some(body),
        };
        if let Err(err) = self.email.send(email).await {
            warn!(email = %account.email, error = %err, "Confirmation email failed");
        }
        Ok(())
    }
}

async fn open_store(config: &StorageSection) -> Result<StoreHandle> {
    if config.backend == StorageBackend::Json {
        tokio::fs::create_dir_all(&config.path)
            .await
            .map_err(|err| MudError::io(&config.path, err))?;
    }
    let mut tables = Vec::with_capacity(TABLES.len());
    for (name, key_field) in TABLES {
        let table = match config.backend {
            StorageBackend::Memory => Table::in_memory([key_field]),
            StorageBackend::Json => Table::open(config.path.join(format!("{}.json", name)), [key_field])
                .await
                .map_err(|err| MudError::Store(MediatorError::Failed(err)))?,
        };
        tables.push((name, table));
    }
    info!(backend = ?config.backend, path = %config.path.display(), "Record store opened");
    Ok(StoreHandle::spawn(tables))
}

fn email_transport(config: &EmailSection) -> Result<EmailTransport> {
    Ok(match config.mode {
        EmailMode::Disabled => EmailTransport::Disabled,
        EmailMode::Outbox => EmailTransport::Outbox(config.outbox_dir.clone()),
        EmailMode::Smtp => {
            let host = config
                .smtp_host
                .as_deref()
                .ok_or_else(|| MudError::Config("email.smtp_host is required in smtp mode".into()))?;
            EmailTransport::smtp(
                host,
                config.smtp_port,
                config.smtp_user.as_deref(),
                config.smtp_password.as_deref(),
                config.starttls,
            )?
        }
    })
}
