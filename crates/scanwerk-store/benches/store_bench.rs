// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for payload hashing and archive writes/reads in the
// scanwerk-store crate.

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use scanwerk_core::{CornerSet, EnhancementMode, FinishedDocument};
use scanwerk_store::{DocumentArchive, hash_bytes};

/// Hashing cost from a thumbnail up to a full-resolution page.
fn bench_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_bytes");
    for size in [16 * 1024, 256 * 1024, 4 * 1024 * 1024] {
        let data = vec![0xA5u8; size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| hash_bytes(black_box(data)))
        });
    }
    group.finish();
}

fn bench_store_and_load(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let archive = DocumentArchive::open(dir.path()).expect("open archive");
    let now = Utc::now();
    let mut counter = 0u64;

    c.bench_function("archive_store_and_load", |b| {
        b.iter(|| {
            counter += 1;
            // Distinct bytes per iteration so the payload is actually written.
            let mut processed = vec![0u8; 256 * 1024];
            processed[..8].copy_from_slice(&counter.to_le_bytes());
            let doc = FinishedDocument {
                name: format!("page-{counter}"),
                processed_png: processed,
                original: counter.to_be_bytes().to_vec(),
                corners: CornerSet::inset(640, 480, 0.1),
                mode: EnhancementMode::Enhanced,
                width: 512,
                height: 384,
                created_at: now,
                updated_at: now,
            };
            let id = archive.store(&doc).expect("store");
            black_box(archive.load_processed(&id).expect("load"))
        })
    });
}

criterion_group!(benches, bench_hash, bench_store_and_load);
criterion_main!(benches);
