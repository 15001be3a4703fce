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

//! HavokMud
//!
//! The game side of the HavokMud telnet server. Sessions accepted by
//! `havok-service` start in the [`LoginHandler`], which walks the player
//! through account login, email confirmation and character creation, then
//! hands the session to the in-game [`CommandHandler`].
//!
//! Shared state lives in one [`AppContext`] built at startup: the record
//! store, the DNS, email, cache and template actors, the coin ledger, the
//! command table and runtime switches such as the wizlock.
//!
//! # Architecture
//!
//! ```text
//! TelnetServer → MudFactory → LoginHandler ─(Playing)→ CommandHandler
//!                                 │                        │
//!                                 └──────── AppContext ────┘
//!                        store · ledger · dns · email · cache · templates
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

pub mod command;
mod config;
mod context;
pub mod dice;
mod editor;
mod error;
mod factory;
mod ledger;
pub mod logging;
mod login;
pub mod records;
pub mod templates;
pub mod validate;

pub use self::command::CommandHandler;
pub use self::config::{
    CONFIG_ENV, CacheSection, CurrencySection, EditorSection, EmailMode, EmailSection, GameSection,
    LoggingSection, MudConfig, ServerSection, StorageBackend, StorageSection,
};
pub use self::context::{AppContext, DEFAULT_CREDITS, DEFAULT_MOTD, SiteBans, Wizlock};
pub use self::editor::{EditCallback, Editor};
pub use self::error::{MudError, Result};
pub use self::factory::MudFactory;
pub use self::ledger::{Ledger, LedgerError, LedgerHandle, LedgerReply, LedgerRequest, Receipt, Transfer};
pub use self::login::{LoginHandler, LoginState};
