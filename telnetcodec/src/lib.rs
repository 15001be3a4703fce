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

//! # HavokMud Telnet Line Codec
//!
//! This crate turns a raw telnet byte stream into clean text lines and renders
//! outbound text and option negotiation back onto the wire. It is designed to
//! be used with `tokio_util::codec::FramedRead` / `FramedWrite` over the two
//! halves of a `TcpStream`.
//!
//! ## Overview
//!
//! The Telnet protocol (RFC 854) interleaves `IAC` (0xFF) command sequences
//! with application data. A MUD only cares about the text a player typed, so
//! the decoder:
//!
//! - strips `IAC <cmd>`, `IAC <WILL|WONT|DO|DONT> <opt>` and
//!   `IAC SB ... IAC SE` sequences before any text decoding,
//! - keeps `IAC IAC` as a single literal 0xFF byte,
//! - applies backspace / DEL / `IAC EC` / `IAC EL` erasure to the pending line,
//! - frames on LF, dropping CR and NUL,
//! - decodes each completed line as UTF-8 with replacement of invalid sequences.
//!
//! ## Core Components
//!
//! ### [`LineCodec`]
//!
//! A [`Decoder`](tokio_util::codec::Decoder) yielding [`Inbound`] items. It can be
//! switched into passthrough mode where telnet commands are still stripped
//! but data is handed up unframed as [`Inbound::Raw`].
//!
//! ### [`TelnetEncoder`]
//!
//! An [`Encoder`](tokio_util::codec::Encoder) for [`TelnetOutput`], escaping
//! literal 0xFF bytes and rendering negotiation and subnegotiation frames.
//!
//! ## Usage Example
//!
//! ```rust
//! use havok_telnetcodec::{Inbound, LineCodec};
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//!
//! let mut codec = LineCodec::new();
//! let mut input = BytesMut::from(&b"\xFF\xFD\x01hel\x08lo\r\n"[..]);
//! assert_eq!(
//!     codec.decode(&mut input).unwrap(),
//!     Some(Inbound::Line("helo".to_string()))
//! );
//! ```
//!
//! ## Related RFCs
//!
//! - RFC 854: Telnet Protocol Specification
//! - RFC 857: Telnet Echo Option
//! - RFC 858: Telnet Suppress Go Ahead Option
//! - RFC 1184: Telnet Linemode Option

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod codec;
pub mod consts;
mod event;
mod result;

pub use self::codec::{DEFAULT_MAX_LINE_LENGTH, LineCodec, TelnetEncoder};
pub use self::event::{Inbound, TelnetOutput};
pub use self::result::{CodecError, CodecResult};
