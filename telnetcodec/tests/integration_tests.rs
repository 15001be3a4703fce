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

//! Integration tests for telnetcodec
//!
//! These tests drive the codec through `FramedRead` / `FramedWrite` and check
//! the stripping invariant over generated input.

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use havok_telnetcodec::{Inbound, LineCodec, TelnetEncoder, TelnetOutput, consts};
use proptest::prelude::*;
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{Decoder, FramedRead, FramedWrite};

// ============================================================================
// Framed Stream Tests
// ============================================================================

#[tokio::test]
async fn framed_read_over_duplex_stream() {
    let (mut client, server) = tokio::io::duplex(64);
    let mut lines = FramedRead::new(server, LineCodec::new());

    client
        .write_all(&[consts::IAC, consts::WILL, consts::option::ECHO])
        .await
        .unwrap();
    client.write_all(b"north\r\nso").await.unwrap();
    client.write_all(b"uth\r\n").await.unwrap();
    drop(client);

    assert_eq!(
        lines.next().await.unwrap().unwrap(),
        Inbound::Line("north".to_string())
    );
    assert_eq!(
        lines.next().await.unwrap().unwrap(),
        Inbound::Line("south".to_string())
    );
    assert!(lines.next().await.is_none());
}

#[tokio::test]
async fn framed_read_reports_eof_with_pending_bytes() {
    let (mut client, server) = tokio::io::duplex(64);
    let mut lines = FramedRead::new(server, LineCodec::new());

    client.write_all(b"unterminated").await.unwrap();
    drop(client);

    assert!(lines.next().await.is_none());
}

#[tokio::test]
async fn framed_write_renders_output() {
    let mut buffer = Vec::new();
    {
        let mut sink = FramedWrite::new(&mut buffer, TelnetEncoder::new());
        sink.send(TelnetOutput::from("Password: ")).await.unwrap();
        sink.send(TelnetOutput::echo_off()).await.unwrap();
    }
    assert_eq!(buffer, b"Password: \xFF\xFB\x01".to_vec());
}

// ============================================================================
// Property Tests
// ============================================================================

#[derive(Clone, Debug)]
enum Segment {
    Data(Vec<u8>),
    Command(u8),
    Negotiation(u8, u8),
    Subnegotiation(u8, Vec<u8>),
    EscapedIac,
}

fn plain_byte() -> impl Strategy<Value = u8> {
    any::<u8>().prop_filter("framing or erasure byte", |b| {
        !matches!(
            *b,
            consts::IAC | consts::CR | consts::LF | consts::NUL | consts::BS | consts::DEL
        )
    })
}

fn segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        prop::collection::vec(plain_byte(), 1..16).prop_map(Segment::Data),
        prop::sample::select(vec![
            consts::NOP,
            consts::DM,
            consts::BRK,
            consts::IP,
            consts::AO,
            consts::AYT,
            consts::GA,
        ])
        .prop_map(Segment::Command),
        (
            prop::sample::select(vec![consts::WILL, consts::WONT, consts::DO, consts::DONT]),
            any::<u8>()
        )
            .prop_map(|(cmd, opt)| Segment::Negotiation(cmd, opt)),
        (any::<u8>(), prop::collection::vec(any::<u8>(), 0..8))
            .prop_map(|(opt, payload)| Segment::Subnegotiation(opt, payload)),
        Just(Segment::EscapedIac),
    ]
}

fn render(segments: &[Segment]) -> (Vec<u8>, Vec<u8>) {
    let mut wire = Vec::new();
    let mut data = Vec::new();
    for segment in segments {
        match segment {
            Segment::Data(bytes) => {
                wire.extend_from_slice(bytes);
                data.extend_from_slice(bytes);
            }
            Segment::Command(cmd) => wire.extend_from_slice(&[consts::IAC, *cmd]),
            Segment::Negotiation(cmd, opt) => wire.extend_from_slice(&[consts::IAC, *cmd, *opt]),
            Segment::Subnegotiation(opt, payload) => {
                wire.extend_from_slice(&[consts::IAC, consts::SB, *opt]);
                for &byte in payload {
                    if byte == consts::IAC {
                        wire.push(consts::IAC);
                    }
                    wire.push(byte);
                }
                wire.extend_from_slice(&[consts::IAC, consts::SE]);
            }
            Segment::EscapedIac => {
                wire.extend_from_slice(&[consts::IAC, consts::IAC]);
                data.push(consts::IAC);
            }
        }
    }
    wire.extend_from_slice(b"\r\n");
    (wire, data)
}

proptest! {
    #[test]
    fn telnet_commands_never_reach_the_line(segments in prop::collection::vec(segment(), 0..24)) {
        let (wire, data) = render(&segments);
        let mut codec = LineCodec::with_max_line_length(usize::MAX);
        let mut buffer = BytesMut::from(&wire[..]);
        let decoded = codec.decode(&mut buffer).unwrap();
        prop_assert_eq!(
            decoded,
            Some(Inbound::Line(String::from_utf8_lossy(&data).into_owned()))
        );
        prop_assert!(buffer.is_empty());
    }

    #[test]
    fn chunking_does_not_change_the_result(
        segments in prop::collection::vec(segment(), 0..24),
        split in any::<prop::sample::Index>(),
    ) {
        let (wire, data) = render(&segments);
        let at = split.index(wire.len());
        let mut codec = LineCodec::with_max_line_length(usize::MAX);
        let mut first = BytesMut::from(&wire[..at]);
        let mut decoded = codec.decode(&mut first).unwrap();
        if decoded.is_none() {
            let mut second = BytesMut::from(&wire[at..]);
            decoded = codec.decode(&mut second).unwrap();
        }
        prop_assert_eq!(
            decoded,
            Some(Inbound::Line(String::from_utf8_lossy(&data).into_owned()))
        );
    }
}
