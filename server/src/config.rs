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

//! MUD configuration
//!
//! The server reads a single TOML file. Every section and every field has a
//! default, so an empty file (or no file at all) yields a working in-memory
//! server on port 3000.
//!
//! # Example
//!
//! ```
//! use havok_server::MudConfig;
//!
//! let config: MudConfig = toml::from_str(
//!     r#"
//!     [server]
//!     port = 4000
//!     wizlocked = true
//!
//!     [currency.exchange]
//!     gp = 100
//!     cp = 1
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.server.port, 4000);
//! assert_eq!(config.currency.exchange.len(), 2);
//! ```

use crate::{MudError, Result};
use havok_currency::ExchangeTable;
use havok_service::ServiceConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "HAVOKMUD_CONFIG";

/// Top level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MudConfig {
    /// Listener and admission settings
    pub server: ServerSection,
    /// Record store backend
    pub storage: StorageSection,
    /// Outbound email
    pub email: EmailSection,
    /// Auth cache
    pub cache: CacheSection,
    /// Coin denominations and starting money
    pub currency: CurrencySection,
    /// External editor
    pub editor: EditorSection,
    /// Log filter
    pub logging: LoggingSection,
    /// Game content lists
    pub game: GameSection,
}

impl MudConfig {
    /// Parse the file at `path`.
    pub fn load(path: &Path) -> Result<MudConfig> {
        let text = std::fs::read_to_string(path).map_err(|err| MudError::io(path, err))?;
        let config: MudConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Pick the configuration file to read.
    ///
    /// An explicit path always wins, the `--config` flag or [`CONFIG_ENV`].
    /// Otherwise `~/.havokmud/havokmud.toml` is used when it exists.
    pub fn resolve_path(explicit: Option<PathBuf>, home: Option<PathBuf>) -> Option<PathBuf> {
        explicit.or_else(|| {
            home.map(|home| home.join(".havokmud").join("havokmud.toml"))
                .filter(|candidate| candidate.is_file())
        })
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.server.max_sessions == 0 {
            return Err(MudError::Config("server.max_sessions must be greater than 0".into()));
        }
        if self.server.idle_timeout_secs == Some(0) {
            return Err(MudError::Config("server.idle_timeout_secs must be greater than 0".into()));
        }
        if self.game.races.is_empty() || self.game.classes.is_empty() {
            return Err(MudError::Config("game.races and game.classes must not be empty".into()));
        }
        if self.email.mode == EmailMode::Smtp && self.email.smtp_host.is_none() {
            return Err(MudError::Config("email.smtp_host is required in smtp mode".into()));
        }
        Ok(())
    }
}

/// `[server]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address to listen on
    pub bind_ip: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Maximum concurrent sessions
    pub max_sessions: usize,
    /// Disconnect sessions idle for this many seconds
    pub idle_timeout_secs: Option<u64>,
    /// Refuse new accounts
    pub wizlocked: bool,
    /// Shown to refused new accounts
    pub wizlock_reason: Option<String>,
    /// Banned IP addresses and hostname suffixes
    pub banned_sites: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            max_sessions: 1000,
            idle_timeout_secs: None,
            wizlocked: false,
            wizlock_reason: None,
            banned_sites: Vec::new(),
        }
    }
}

impl ServerSection {
    /// Socket address to bind
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Session service settings derived from this section
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::new(self.bind_address())
            .with_max_sessions(self.max_sessions)
            .with_idle_timeout(self.idle_timeout_secs.map(Duration::from_secs))
    }
}

/// Record store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Lost on exit
    #[default]
    Memory,
    /// One JSON file per table under `path`
    Json,
}

/// `[storage]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Backend kind
    pub backend: StorageBackend,
    /// Directory holding the table files
    pub path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("data"),
        }
    }
}

/// How outbound email is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailMode {
    /// Messages are logged and dropped
    #[default]
    Disabled,
    /// Messages are written to `outbox_dir`
    Outbox,
    /// Messages are relayed through an SMTP server
    Smtp,
}

/// `[email]`
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSection {
    /// Delivery mode
    pub mode: EmailMode,
    /// Sender, either a full address or a local part joined with `domain`
    pub from: String,
    /// Mail domain, also used for auth cache user names
    pub domain: String,
    /// SMTP relay host
    pub smtp_host: Option<String>,
    /// SMTP relay port
    pub smtp_port: u16,
    /// SMTP user name
    pub smtp_user: Option<String>,
    /// SMTP password
    pub smtp_password: Option<String>,
    /// Upgrade the SMTP connection with STARTTLS
    pub starttls: bool,
    /// Directory for `outbox` mode
    pub outbox_dir: PathBuf,
}

impl Default for EmailSection {
    fn default() -> Self {
        Self {
            mode: EmailMode::Disabled,
            from: "admin".to_string(),
            domain: "havokmud.org".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_user: None,
            smtp_password: None,
            starttls: true,
            outbox_dir: PathBuf::from("outbox"),
        }
    }
}

impl EmailSection {
    /// Full sender address
    pub fn sender(&self) -> String {
        if self.from.contains('@') {
            self.from.clone()
        } else {
            format!("{}@{}", self.from, self.domain)
        }
    }
}

impl fmt::Debug for EmailSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSection")
            .field("mode", &self.mode)
            .field("from", &self.from)
            .field("domain", &self.domain)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "<redacted>"))
            .field("starttls", &self.starttls)
            .field("outbox_dir", &self.outbox_dir)
            .finish()
    }
}

/// `[cache]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Redis URL, in-memory cache when absent
    pub redis_url: Option<String>,
}

/// `[currency]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencySection {
    /// Denomination name to base unit value
    pub exchange: ExchangeTable,
    /// Coins deposited when a character is completed
    pub starting_purse: String,
}

impl Default for CurrencySection {
    fn default() -> Self {
        Self {
            exchange: ExchangeTable::standard(),
            starting_purse: "10gp".to_string(),
        }
    }
}

/// `[editor]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSection {
    /// Editor executable
    pub program: String,
    /// Arguments placed before the file name
    pub args: Vec<String>,
}

impl Default for EditorSection {
    fn default() -> Self {
        Self {
            program: "nano".to_string(),
            args: vec!["-R".to_string()],
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive, e.g. `info` or `havok_server=debug`
    pub level: Option<String>,
}

/// `[game]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSection {
    /// MUD name shown in menus and email
    pub name: String,
    /// Selectable races
    pub races: Vec<String>,
    /// Selectable classes
    pub classes: Vec<String>,
}

impl Default for GameSection {
    fn default() -> Self {
        let list = |names: &[&str]| names.iter().map(|name| name.to_string()).collect();
        Self {
            name: "HavokMud".to_string(),
            races: list(&["human", "elf", "dwarf", "halfling", "gnome", "half-orc"]),
            classes: list(&["warrior", "cleric", "mage", "thief", "ranger", "paladin"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: MudConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address().port(), 3000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.email.mode, EmailMode::Disabled);
        assert_eq!(config.currency.exchange, ExchangeTable::standard());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config: MudConfig = toml::from_str(
            r#"
            [server]
            bind_ip = "127.0.0.1"
            port = 4000
            idle_timeout_secs = 600
            banned_sites = [".example.net"]

            [storage]
            backend = "json"
            path = "/var/lib/havokmud"

            [email]
            mode = "outbox"
            from = "mud@example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind_address(), "127.0.0.1:4000".parse().unwrap());
        assert_eq!(
            config.server.service_config().idle_timeout,
            Some(Duration::from_secs(600))
        );
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.email.sender(), "mud@example.com");
        assert_eq!(config.server.banned_sites, vec![".example.net".to_string()]);
    }

    #[test]
    fn test_sender_joins_domain() {
        let email = EmailSection::default();
        assert_eq!(email.sender(), "admin@havokmud.org");
    }

    #[test]
    fn test_smtp_password_redacted() {
        let email = EmailSection {
            smtp_password: Some("hunter22".to_string()),
            ..EmailSection::default()
        };
        let debug = format!("{:?}", email);
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_invalid_exchange_rejected() {
        assert!(toml::from_str::<MudConfig>("[currency.exchange]\ngp = 0\n").is_err());
    }

    #[test]
    fn test_validate_rejects_smtp_without_host() {
        let mut config = MudConfig::default();
        config.email.mode = EmailMode::Smtp;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_path_prefers_explicit() {
        let explicit = PathBuf::from("/etc/havokmud.toml");
        assert_eq!(
            MudConfig::resolve_path(Some(explicit.clone()), Some(PathBuf::from("/nonexistent"))),
            Some(explicit)
        );
        assert_eq!(MudConfig::resolve_path(None, Some(PathBuf::from("/nonexistent"))), None);
    }

    #[test]
    fn test_sample_config_parses() {
        let config: MudConfig = toml::from_str(include_str!("../config/havokmud.toml")).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.email.mode, EmailMode::Outbox);
        assert_eq!(config.currency.exchange, ExchangeTable::standard());
        assert_eq!(config.server.idle_timeout_secs, Some(1800));
        assert!(config.validate().is_ok());
    }
}
