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

//! Benchmarks for telnetcodec performance

use bytes::{Bytes, BytesMut};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use havok_telnetcodec::{LineCodec, TelnetEncoder, TelnetOutput};
use tokio_util::codec::{Decoder, Encoder};

// ============================================================================
// Decoding Benchmarks
// ============================================================================

fn bench_decode_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_lines");

    for size in [16usize, 256, 4096] {
        let mut input = vec![b'a'; size];
        input.extend_from_slice(b"\r\n");
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            let mut codec = LineCodec::with_max_line_length(usize::MAX);
            b.iter(|| {
                let mut buffer = BytesMut::from(&input[..]);
                black_box(codec.decode(&mut buffer).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_decode_with_negotiation(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_with_negotiation");

    let mut input = Vec::new();
    for _ in 0..64 {
        input.extend_from_slice(b"say hello\xFF\xFD\x01\xFF\xFA\x18\x00xterm\xFF\xF0");
    }
    input.extend_from_slice(b"\r\n");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("mixed", |b| {
        let mut codec = LineCodec::with_max_line_length(usize::MAX);
        b.iter(|| {
            let mut buffer = BytesMut::from(&input[..]);
            black_box(codec.decode(&mut buffer).unwrap());
        });
    });

    group.finish();
}

// ============================================================================
// Encoding Benchmarks
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    let text = "The quick brown fox jumps over the lazy dog.\r\n".repeat(32);
    group.bench_function("text", |b| {
        let mut encoder = TelnetEncoder::new();
        let mut buffer = BytesMut::with_capacity(4096);
        b.iter(|| {
            buffer.clear();
            encoder
                .encode(TelnetOutput::Text(black_box(text.clone())), &mut buffer)
                .unwrap();
        });
    });

    let raw = Bytes::from(vec![0xFFu8; 1024]);
    group.bench_function("raw_all_iac", |b| {
        let mut encoder = TelnetEncoder::new();
        let mut buffer = BytesMut::with_capacity(4096);
        b.iter(|| {
            buffer.clear();
            encoder
                .encode(TelnetOutput::Raw(black_box(raw.clone())), &mut buffer)
                .unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_decode_lines,
    bench_decode_with_negotiation,
    bench_encode
);
criterion_main!(benches);
