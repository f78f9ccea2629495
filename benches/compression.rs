use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gzcodec::GZip;

fn generate_test_data(size: usize, pattern: &str) -> Vec<u8> {
    match pattern {
        "random" => (0..size).map(|i| ((i * 7919) % 256) as u8).collect(),
        "repeated" => vec![b'a'; size],
        "text" => {
            let text = b"The quick brown fox jumps over the lazy dog. ";
            text.iter().cycle().take(size).copied().collect()
        }
        "sequential" => (0..size).map(|i| (i % 256) as u8).collect(),
        _ => vec![0; size],
    }
}

fn bench_encode_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for size in [1024, 10 * 1024, 100 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));

        for level in [1, 6, 9] {
            let codec = GZip::new(level);
            for pattern in ["random", "text"] {
                let data = generate_test_data(size, pattern);
                let id = BenchmarkId::new(format!("{}/level{}", pattern, level), size);
                group.bench_with_input(id, &data, |b, data| {
                    b.iter(|| codec.encode(black_box(data)).unwrap());
                });
            }
        }
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let codec = GZip::default();

    for size in [1024, 10 * 1024, 100 * 1024] {
        for pattern in ["random", "repeated", "text", "sequential"] {
            let data = generate_test_data(size, pattern);
            let compressed = codec.encode(&data).unwrap();

            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(pattern, size),
                &compressed,
                |b, compressed| {
                    b.iter(|| codec.decode(black_box(compressed)).unwrap());
                },
            );
        }
    }
    group.finish();
}

fn bench_decode_into(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_into");
    let codec = GZip::default();

    for size in [1024, 10 * 1024, 100 * 1024] {
        for pattern in ["random", "text"] {
            let data = generate_test_data(size, pattern);
            let compressed = codec.encode(&data).unwrap();
            let mut out = vec![0u8; size];

            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(pattern, size),
                &compressed,
                |b, compressed| {
                    b.iter(|| {
                        codec
                            .decode_into(black_box(compressed), &mut out)
                            .unwrap()
                            .len()
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_encode_levels, bench_decode, bench_decode_into);
criterion_main!(benches);
