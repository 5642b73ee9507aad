//! Criterion benchmarks for the FileShare framing layer.
//!
//! Measures control-line parsing and payload streaming through in-memory
//! readers, so the numbers reflect framing overhead rather than socket cost.
//!
//! Run with:
//! ```bash
//! cargo bench --package fileshare-core --bench framing_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fileshare_core::protocol::framing::{send_payload, LineReader};
use fileshare_core::protocol::messages::{Command, ServerLine};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime must build for benchmark setup")
}

/// Benchmarks parsing of the control lines a client sees most often.
fn bench_parse_server_lines(c: &mut Criterion) {
    let lines: &[(&str, &str)] = &[
        ("FileSize", "FILESIZE 1048576"),
        ("FileDone", "FILE-DONE"),
        ("Files", "FILES a.txt,b.txt,c.bin,notes.md,report.pdf"),
        ("Ack", "missing.txt ACK"),
        (
            "StatusRow",
            "Client01 | 127.0.0.1:50211 | connected=2024-03-09 09:15:02 | disconnected=None",
        ),
    ];

    let mut group = c.benchmark_group("parse_server_line");
    for (name, line) in lines {
        group.bench_with_input(BenchmarkId::new("line", name), line, |b, line| {
            b.iter(|| ServerLine::parse(black_box(line)).expect("parse must succeed"))
        });
    }
    group.finish();
}

/// Benchmarks command classification on the server side.
fn bench_parse_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_command");
    for input in ["status", "LIST", "exit", "quarterly-report.pdf"] {
        group.bench_with_input(BenchmarkId::new("cmd", input), &input, |b, input| {
            b.iter(|| Command::parse(black_box(input)))
        });
    }
    group.finish();
}

/// Benchmarks reading a burst of status-report lines from a buffered stream.
fn bench_recv_lines(c: &mut Criterion) {
    let rt = runtime();
    let mut wire = Vec::new();
    for i in 1..=100 {
        wire.extend_from_slice(
            format!("Client{i:02} | 10.0.0.{i}:4000 | connected=2024-03-09 09:15:02 | disconnected=None\n")
                .as_bytes(),
        );
    }

    let mut group = c.benchmark_group("recv_line");
    group.throughput(Throughput::Bytes(wire.len() as u64));
    group.bench_function("status_report_100_rows", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut reader = LineReader::new(black_box(wire.as_slice()));
                let mut count = 0usize;
                while let Some(line) = reader.recv_line().await.expect("recv must succeed") {
                    count += line.len();
                }
                count
            })
        })
    });
    group.finish();
}

/// Benchmarks streaming payloads of increasing size in both directions.
fn bench_payload_streaming(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("payload");
    for size in [4 * 1024usize, 64 * 1024, 1024 * 1024] {
        let body = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("send_payload", size), &body, |b, body| {
            b.iter(|| {
                rt.block_on(async {
                    let mut src: &[u8] = body;
                    let mut out = Vec::with_capacity(body.len());
                    send_payload(&mut src, &mut out, body.len() as u64)
                        .await
                        .expect("send must succeed");
                    out
                })
            })
        });

        group.bench_with_input(BenchmarkId::new("recv_exact", size), &body, |b, body| {
            b.iter(|| {
                rt.block_on(async {
                    let mut reader = LineReader::new(body.as_slice());
                    reader
                        .recv_exact(black_box(body.len() as u64))
                        .await
                        .expect("recv must succeed")
                })
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse_server_lines,
    bench_parse_commands,
    bench_recv_lines,
    bench_payload_streaming
);
criterion_main!(benches);
