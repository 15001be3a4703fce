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

use crate::consts;
use bytes::Bytes;

/// Items produced by [`LineCodec`](crate::LineCodec) while decoding a client stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A complete logical line with telnet commands, CR/LF and erasures applied.
    Line(String),
    /// Telnet-stripped bytes passed through unframed while the codec is in passthrough mode.
    Raw(Bytes),
}

/// Items accepted by [`TelnetEncoder`](crate::TelnetEncoder).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelnetOutput {
    /// UTF-8 text, written as-is apart from IAC escaping.
    Text(String),
    /// Opaque bytes, IAC escaped on the wire.
    Raw(Bytes),
    /// `IAC <command> <option>` where command is one of WILL/WONT/DO/DONT.
    Negotiate {
        /// Negotiation verb
        command: u8,
        /// Option code
        option: u8,
    },
    /// `IAC SB <option> <payload> IAC SE`
    Subnegotiate {
        /// Option code
        option: u8,
        /// Subnegotiation parameters (IAC escaped on the wire)
        payload: Bytes,
    },
}

impl TelnetOutput {
    /// Server takes over echo, so the client stops echoing locally (password entry).
    pub fn echo_off() -> TelnetOutput {
        TelnetOutput::Negotiate {
            command: consts::WILL,
            option: consts::option::ECHO,
        }
    }

    /// Server hands echo back to the client.
    pub fn echo_on() -> TelnetOutput {
        TelnetOutput::Negotiate {
            command: consts::WONT,
            option: consts::option::ECHO,
        }
    }

    /// Ask the client to negotiate linemode.
    pub fn request_linemode() -> TelnetOutput {
        TelnetOutput::Negotiate {
            command: consts::DO,
            option: consts::option::LINEMODE,
        }
    }

    /// Put the client into character-at-a-time mode (no local editing).
    pub fn character_mode() -> TelnetOutput {
        TelnetOutput::linemode_mode(0)
    }

    /// Restore client-side line editing with literal echo of control characters.
    pub fn line_mode() -> TelnetOutput {
        TelnetOutput::linemode_mode(consts::linemode::EDIT | consts::linemode::LIT_ECHO)
    }

    fn linemode_mode(mask: u8) -> TelnetOutput {
        TelnetOutput::Subnegotiate {
            option: consts::option::LINEMODE,
            payload: Bytes::copy_from_slice(&[consts::linemode::MODE, mask]),
        }
    }
}

impl From<String> for TelnetOutput {
    fn from(text: String) -> Self {
        TelnetOutput::Text(text)
    }
}

impl From<&str> for TelnetOutput {
    fn from(text: &str) -> Self {
        TelnetOutput::Text(text.to_string())
    }
}
