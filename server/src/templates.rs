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

//! Text templates and the renderer actor
//!
//! Menus and emails are askama templates compiled into the binary. Sessions
//! queue a [`View`] as deferred output; the writer task asks the renderer
//! actor for the text when it reaches the item, so a menu always reflects
//! state as of the moment it is written. Rendered text uses CRLF line ends.

use crate::records::{Ability, Player};
use askama::Template;
use async_trait::async_trait;
use havok_mediator::{Mediator, MediatorResult, Resource};
use havok_service::DeferredOutput;
use thiserror::Error;
use tracing::warn;

/// Renderer failure
#[derive(Debug, Error)]
pub enum TemplateError {
    /// askama could not render the template
    #[error("Template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

/// The account menu
#[derive(Debug, Clone, Template)]
#[template(path = "account_menu.txt", escape = "none")]
pub struct AccountMenu {
    /// MUD name
    pub mud_name: String,
    /// Account email
    pub email: String,
    /// Whether the email has been confirmed
    pub confirmed: bool,
}

/// One row of the character list
#[derive(Debug, Clone)]
pub struct PlayerLine {
    /// Display name
    pub name: String,
    /// Race or `-`
    pub race: String,
    /// Class or `-`
    pub class: String,
    /// Creation finished
    pub complete: bool,
}

impl From<&Player> for PlayerLine {
    fn from(player: &Player) -> Self {
        Self {
            name: player.display_name.clone(),
            race: player.race.clone().unwrap_or_else(|| "-".to_string()),
            class: player.class.clone().unwrap_or_else(|| "-".to_string()),
            complete: player.complete,
        }
    }
}

/// Characters owned by an account
#[derive(Debug, Clone, Template)]
#[template(path = "player_list.txt", escape = "none")]
pub struct PlayerList {
    /// Rows to show
    pub players: Vec<PlayerLine>,
}

/// The character creation menu
#[derive(Debug, Clone, Template)]
#[template(path = "creation_menu.txt", escape = "none")]
pub struct CreationMenu {
    /// Name or `(none)`
    pub name: String,
    /// Sex or `(none)`
    pub sex: String,
    /// Race or `(none)`
    pub race: String,
    /// Class or `(none)`
    pub class: String,
    /// Assigned abilities or `(none)`
    pub stats: String,
    /// Alignment or `(none)`
    pub alignment: String,
    /// Rolls, highest first
    pub rolls: String,
    /// Rerolls left
    pub rerolls: u32,
}

impl From<&Player> for CreationMenu {
    fn from(player: &Player) -> Self {
        let none = || "(none)".to_string();
        let stats = if player.stats.is_empty() {
            none()
        } else {
            Ability::ALL
                .iter()
                .filter_map(|ability| {
                    let score = player.stats.get(ability)?;
                    Some(format!("{} {}", &ability.name()[..3], score))
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        let rolls: Vec<String> = player.rolls.iter().map(u32::to_string).collect();
        Self {
            name: if player.display_name.is_empty() {
                none()
            } else {
                player.display_name.clone()
            },
            sex: player.sex.map(|sex| sex.to_string()).unwrap_or_else(none),
            race: player.race.clone().unwrap_or_else(none),
            class: player.class.clone().unwrap_or_else(none),
            stats,
            alignment: player
                .alignment
                .map(|alignment| alignment.to_string())
                .unwrap_or_else(none),
            rolls: if rolls.is_empty() { none() } else { rolls.join(" ") },
            rerolls: player.rerolls,
        }
    }
}

/// Body of the email carrying a confirmation code
#[derive(Debug, Clone, Template)]
#[template(path = "confirmation_email.txt", escape = "none")]
pub struct ConfirmationEmail {
    /// MUD name
    pub mud_name: String,
    /// Recipient
    pub email: String,
    /// Code to enter at the account menu
    pub confcode: String,
}

/// Every renderable template
#[derive(Debug, Clone)]
pub enum View {
    /// [`AccountMenu`]
    AccountMenu(AccountMenu),
    /// [`PlayerList`]
    PlayerList(PlayerList),
    /// [`CreationMenu`]
    CreationMenu(CreationMenu),
    /// [`ConfirmationEmail`]
    ConfirmationEmail(ConfirmationEmail),
}

impl View {
    fn render(&self) -> askama::Result<String> {
        match self {
            View::AccountMenu(view) => view.render(),
            View::PlayerList(view) => view.render(),
            View::CreationMenu(view) => view.render(),
            View::ConfirmationEmail(view) => view.render(),
        }
    }
}

/// Convert bare LF line ends to CRLF
pub fn crlf(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 16);
    let mut previous = '\0';
    for ch in text.chars() {
        if ch == '\n' && previous != '\r' {
            out.push('\r');
        }
        out.push(ch);
        previous = ch;
    }
    out
}

/// Renders views, one at a time.
#[derive(Debug, Default)]
pub struct Renderer;

#[async_trait]
impl Resource for Renderer {
    type Request = View;
    type Reply = String;
    type Error = TemplateError;

    async fn handle(&mut self, view: View) -> Result<String, TemplateError> {
        Ok(crlf(&view.render()?))
    }
}

/// Handle to the renderer actor
#[derive(Clone, Debug)]
pub struct TemplateHandle {
    mediator: Mediator<(), Renderer>,
}

impl TemplateHandle {
    /// Spawn the renderer actor
    pub fn spawn() -> TemplateHandle {
        TemplateHandle {
            mediator: Mediator::single("templates", Renderer),
        }
    }

    /// Render `view` now
    pub async fn render(&self, view: View) -> MediatorResult<String, TemplateError> {
        self.mediator.call(view).await
    }

    /// Output item rendering `view` when the session writer reaches it
    pub fn deferred(&self, view: View) -> Box<dyn DeferredOutput> {
        Box::new(DeferredView {
            templates: self.clone(),
            view,
        })
    }
}

struct DeferredView {
    templates: TemplateHandle,
    view: View,
}

#[async_trait]
impl DeferredOutput for DeferredView {
    async fn render(self: Box<Self>) -> String {
        let DeferredView { templates, view } = *self;
        match templates.render(view).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "Deferred template failed to render");
                String::new()
            }
        }
    }
}
