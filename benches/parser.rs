//! Parser throughput benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shellterm::parser::Parser;

/// Output resembling a colored `ls -l` listing
fn listing(lines: usize) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..lines {
        out.push_str(&format!(
            "-rw-r--r--  1 user staff {:>6} Oct 14 12:{:02} \x1b[01;34mfile_{}.rs\x1b[0m\r\n",
            i * 37,
            i % 60,
            i
        ));
    }
    out.into_bytes()
}

fn bench_workloads(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    let workloads: Vec<(&str, Vec<u8>)> = vec![
        ("ascii", "The quick brown fox jumps over the lazy dog. ".repeat(1000).into_bytes()),
        ("listing", listing(500)),
        ("utf8", "日本語のテキスト ça marche ✓ ".repeat(500).into_bytes()),
        (
            "truecolor",
            (0..2000)
                .map(|i| format!("\x1b[38;2;{};{};{}m#", i % 256, (i * 3) % 256, (i * 7) % 256))
                .collect::<String>()
                .into_bytes(),
        ),
        ("osc_titles", "\x1b]0;user@host: ~/src/project\x07$ ".repeat(500).into_bytes()),
    ];

    for (name, input) in &workloads {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            b.iter(|| {
                let mut parser = Parser::new();
                black_box(parser.feed(black_box(input)).count())
            })
        });
    }

    group.finish();
}

fn bench_chunked(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_chunked");
    let input = listing(500);
    group.throughput(Throughput::Bytes(input.len() as u64));

    // Small reads force sequences to resume across calls
    for chunk in [1usize, 16, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut parser = Parser::new();
                let mut count = 0;
                for piece in input.chunks(chunk) {
                    count += parser.feed(black_box(piece)).count();
                }
                black_box(count)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_workloads, bench_chunked);
criterion_main!(benches);
