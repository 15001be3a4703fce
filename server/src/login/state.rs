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

use std::fmt;

/// Login flow states.
///
/// `Disconnect` and `Playing` are terminal: the first closes the session and
/// the second hands it to the command handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginState {
    /// Nothing shown yet
    Initial,
    /// Asking for the account email
    GetEmail,
    /// Confirming a new email address
    ConfirmEmail,
    /// First password entry for a new account
    GetNewUserPassword,
    /// Second password entry for a new account
    ConfirmPassword,
    /// Password for an existing account
    GetPassword,
    /// Asking whether to use colour
    ChooseAnsi,
    /// Message of the day
    ShowMotd,
    /// Credits screen
    ShowCredits,
    /// Closing the session
    Disconnect,
    /// Account menu
    ShowAccountMenu,
    /// Characters of the account
    ShowPlayerList,
    /// First entry of a changed password
    GetNewPassword,
    /// Second entry of a changed password
    ConfirmNewPassword,
    /// Entering the emailed confirmation code
    EnterConfirmCode,
    /// (Re)sending the confirmation email
    ResendConfirmEmail,
    /// Character creation menu
    ShowCreationMenu,
    /// Naming a character
    ChooseName,
    /// Choosing sex
    ChooseSex,
    /// Choosing race
    ChooseRace,
    /// Choosing class
    ChooseClass,
    /// Ordering ability rolls
    ChooseStats,
    /// Choosing starting alignment
    ChooseAlignment,
    /// Spending a reroll
    RerollAbilities,
    /// Handed to the game
    Playing,
}

impl LoginState {
    /// Whether the flow ends in this state
    pub fn is_terminal(self) -> bool {
        matches!(self, LoginState::Disconnect | LoginState::Playing)
    }
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoginState::Initial => "INITIAL",
            LoginState::GetEmail => "GET_EMAIL",
            LoginState::ConfirmEmail => "CONFIRM_EMAIL",
            LoginState::GetNewUserPassword => "GET_NEW_USER_PASSWORD",
            LoginState::ConfirmPassword => "CONFIRM_PASSWORD",
            LoginState::GetPassword => "GET_PASSWORD",
            LoginState::ChooseAnsi => "CHOOSE_ANSI",
            LoginState::ShowMotd => "SHOW_MOTD",
            LoginState::ShowCredits => "SHOW_CREDITS",
            LoginState::Disconnect => "DISCONNECT",
            LoginState::ShowAccountMenu => "SHOW_ACCOUNT_MENU",
            LoginState::ShowPlayerList => "SHOW_PLAYER_LIST",
            LoginState::GetNewPassword => "GET_NEW_PASSWORD",
            LoginState::ConfirmNewPassword => "CONFIRM_NEW_PASSWORD",
            LoginState::EnterConfirmCode => "ENTER_CONFIRM_CODE",
            LoginState::ResendConfirmEmail => "RESEND_CONFIRM_EMAIL",
            LoginState::ShowCreationMenu => "SHOW_CREATION_MENU",
            LoginState::ChooseName => "CHOOSE_NAME",
            LoginState::ChooseSex => "CHOOSE_SEX",
            LoginState::ChooseRace => "CHOOSE_RACE",
            LoginState::ChooseClass => "CHOOSE_CLASS",
            LoginState::ChooseStats => "CHOOSE_STATS",
            LoginState::ChooseAlignment => "CHOOSE_ALIGNMENT",
            LoginState::RerollAbilities => "REROLL_ABILITIES",
            LoginState::Playing => "PLAYING",
        })
    }
}
