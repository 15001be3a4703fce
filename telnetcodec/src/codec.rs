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

use super::{CodecError, Inbound, TelnetOutput, consts};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

/// Default upper bound on the length of a single input line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// A line-oriented telnet decoder.
///
/// `LineCodec` strips every telnet command sequence from the client stream
/// and accumulates the remaining data bytes into lines. Lines end at LF;
/// CR and NUL bytes are dropped. Backspace, DEL and telnet EC erase the
/// previous character, telnet EL erases the whole pending line. Completed
/// lines are decoded as UTF-8, replacing invalid sequences.
///
/// In passthrough mode the codec keeps stripping telnet commands but stops
/// framing, handing every data byte up as [`Inbound::Raw`]. This is used while
/// an external process owns the terminal.
///
/// Telnet sequences split across reads are reassembled because the decoder
/// state survives between calls.
#[derive(Debug)]
pub struct LineCodec {
    decoder_state: DecoderState,
    line: Vec<u8>,
    max_line_length: usize,
    truncated: bool,
    passthrough: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DecoderState {
    NormalData,
    InterpretAsCommand,
    Negotiate(u8),
    SubnegotiateOption,
    Subnegotiate,
    SubnegotiateIAC,
}

impl LineCodec {
    /// Creates a new `LineCodec` with [`DEFAULT_MAX_LINE_LENGTH`].
    pub fn new() -> LineCodec {
        LineCodec::default()
    }

    /// Creates a new `LineCodec` truncating lines beyond `max_line_length` bytes.
    pub fn with_max_line_length(max_line_length: usize) -> LineCodec {
        LineCodec {
            max_line_length,
            ..LineCodec::default()
        }
    }

    /// Maximum accepted line length in bytes.
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Whether the codec currently passes data through without framing.
    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Switch between line framing and raw passthrough.
    ///
    /// A partially accumulated line is discarded on every switch.
    pub fn set_passthrough(&mut self, passthrough: bool) {
        self.passthrough = passthrough;
        self.line.clear();
        self.truncated = false;
    }

    fn push_data(&mut self, byte: u8) {
        if self.line.len() >= self.max_line_length {
            if !self.truncated {
                warn!(
                    "Input line exceeds {} bytes, truncating",
                    self.max_line_length
                );
                self.truncated = true;
            }
            return;
        }
        self.line.push(byte);
    }

    /// Remove the last character, which may span several UTF-8 bytes.
    fn erase_character(&mut self) {
        while let Some(byte) = self.line.pop() {
            if byte & 0xC0 != 0x80 {
                break;
            }
        }
    }

    fn take_line(&mut self) -> Inbound {
        let line = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        self.truncated = false;
        Inbound::Line(line)
    }

    /// Advance the telnet state machine by one byte, returning the byte if it
    /// turned out to be application data.
    fn strip(&mut self, byte: u8) -> Option<u8> {
        match (self.decoder_state, byte) {
            (DecoderState::NormalData, consts::IAC) => {
                self.decoder_state = DecoderState::InterpretAsCommand;
                None
            }
            (DecoderState::NormalData, _) => Some(byte),
            (DecoderState::InterpretAsCommand, consts::IAC) => {
                self.decoder_state = DecoderState::NormalData;
                Some(consts::IAC)
            }
            (
                DecoderState::InterpretAsCommand,
                consts::WILL | consts::WONT | consts::DO | consts::DONT,
            ) => {
                self.decoder_state = DecoderState::Negotiate(byte);
                None
            }
            (DecoderState::InterpretAsCommand, consts::SB) => {
                self.decoder_state = DecoderState::SubnegotiateOption;
                None
            }
            (DecoderState::InterpretAsCommand, consts::EC) => {
                self.decoder_state = DecoderState::NormalData;
                if !self.passthrough {
                    self.erase_character();
                }
                None
            }
            (DecoderState::InterpretAsCommand, consts::EL) => {
                self.decoder_state = DecoderState::NormalData;
                if !self.passthrough {
                    self.line.clear();
                }
                None
            }
            (DecoderState::InterpretAsCommand, _) => {
                trace!("Ignoring telnet command {:#X}", byte);
                self.decoder_state = DecoderState::NormalData;
                None
            }
            (DecoderState::Negotiate(command), option) => {
                trace!("Ignoring negotiation {:#X} for option {}", command, option);
                self.decoder_state = DecoderState::NormalData;
                None
            }
            (DecoderState::SubnegotiateOption, option) => {
                trace!("Discarding subnegotiation for option {}", option);
                self.decoder_state = DecoderState::Subnegotiate;
                None
            }
            (DecoderState::Subnegotiate, consts::IAC) => {
                self.decoder_state = DecoderState::SubnegotiateIAC;
                None
            }
            (DecoderState::Subnegotiate, _) => None,
            (DecoderState::SubnegotiateIAC, consts::SE) => {
                self.decoder_state = DecoderState::NormalData;
                None
            }
            (DecoderState::SubnegotiateIAC, consts::IAC) => {
                self.decoder_state = DecoderState::Subnegotiate;
                None
            }
            (DecoderState::SubnegotiateIAC, _) => {
                warn!("Aborted subnegotiation with command {:#X}", byte);
                self.decoder_state = DecoderState::NormalData;
                None
            }
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        LineCodec {
            decoder_state: DecoderState::NormalData,
            line: Vec::new(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            truncated: false,
            passthrough: false,
        }
    }
}

impl Decoder for LineCodec {
    type Item = Inbound;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Inbound>, Self::Error> {
        if self.passthrough {
            let mut raw = BytesMut::with_capacity(src.len());
            while src.has_remaining() {
                let byte = src.get_u8();
                if let Some(data) = self.strip(byte) {
                    raw.put_u8(data);
                }
            }
            return Ok((!raw.is_empty()).then(|| Inbound::Raw(raw.freeze())));
        }

        while src.has_remaining() {
            let byte = src.get_u8();
            match self.strip(byte) {
                Some(consts::LF) => return Ok(Some(self.take_line())),
                Some(consts::CR | consts::NUL) => {}
                Some(consts::BS | consts::DEL) => self.erase_character(),
                Some(data) => self.push_data(data),
                None => {}
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Inbound>, Self::Error> {
        match self.decode(buf)? {
            Some(item) => Ok(Some(item)),
            None => {
                if !self.line.is_empty() {
                    trace!("Dropping {} bytes of unterminated input", self.line.len());
                    self.line.clear();
                }
                Ok(None)
            }
        }
    }
}

/// Outbound telnet encoder.
///
/// Escapes literal 0xFF bytes in text and raw data as `IAC IAC` and renders
/// negotiation frames.
#[derive(Clone, Copy, Debug, Default)]
pub struct TelnetEncoder;

impl TelnetEncoder {
    /// Creates a new encoder.
    pub fn new() -> TelnetEncoder {
        TelnetEncoder
    }

    fn put_escaped(data: &[u8], dst: &mut BytesMut) {
        dst.reserve(data.len());
        for &byte in data {
            if byte == consts::IAC {
                dst.put_u8(consts::IAC);
            }
            dst.put_u8(byte);
        }
    }
}

impl Encoder<TelnetOutput> for TelnetEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: TelnetOutput, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            TelnetOutput::Text(text) => TelnetEncoder::put_escaped(text.as_bytes(), dst),
            TelnetOutput::Raw(bytes) => TelnetEncoder::put_escaped(&bytes, dst),
            TelnetOutput::Negotiate { command, option } => {
                if !matches!(
                    command,
                    consts::WILL | consts::WONT | consts::DO | consts::DONT
                ) {
                    return Err(CodecError::InvalidNegotiation(command));
                }
                dst.reserve(3);
                dst.put_u8(consts::IAC);
                dst.put_u8(command);
                dst.put_u8(option);
            }
            TelnetOutput::Subnegotiate { option, payload } => {
                dst.reserve(payload.len() + 5);
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SB);
                dst.put_u8(option);
                TelnetEncoder::put_escaped(&payload, dst);
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SE);
            }
        }
        Ok(())
    }
}

impl Encoder<Bytes> for TelnetEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        TelnetEncoder::put_escaped(&item, dst);
        Ok(())
    }
}
