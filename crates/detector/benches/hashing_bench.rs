//! 위치 해시 벤치마크
//!
//! 큰 `find` 목록의 정규화(정렬)와 SHA-256 비용을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use depprobe_detector::hashing::{ListingOrder, checksum_list_hash, fingerprint_listing};

/// site-packages와 비슷한 모양의 목록을 역순으로 생성
fn synthetic_listing(files: usize) -> String {
    (0..files)
        .rev()
        .map(|i| format!("{} ./pkg{}/module_{}.py \n", (i * 37) % 8192, i % 200, i))
        .collect()
}

fn synthetic_md5sums(files: usize) -> String {
    (0..files)
        .map(|i| format!("{:032x}  usr/lib/file_{i}\n", i * 7919))
        .collect()
}

fn bench_fingerprint_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint_listing");
    for files in [1_000, 10_000, 50_000] {
        let listing = synthetic_listing(files);
        group.throughput(Throughput::Bytes(listing.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(files), &listing, |b, listing| {
            b.iter(|| fingerprint_listing(black_box(listing), ListingOrder::SizeThenPath));
        });
    }
    group.finish();
}

fn bench_checksum_list(c: &mut Criterion) {
    let content = synthetic_md5sums(5_000);
    c.bench_function("checksum_list_hash_5000", |b| {
        b.iter(|| checksum_list_hash(black_box(&content)));
    });
}

criterion_group!(benches, bench_fingerprint_listing, bench_checksum_list);
criterion_main!(benches);
