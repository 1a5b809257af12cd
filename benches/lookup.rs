// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Query-path benchmarks over a synthetic corpus.
//!
//! The corpus is generated from a fixed-seed word mixer so runs are
//! comparable; sizes are small enough to build in-process but large
//! enough that the Elias-Fano quantum seeks and the frequency codeword
//! skips are actually exercised.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;
use tempfile::TempDir;
use trigrams::NgramStore;

const SYLLABLES: &[&str] = &[
    "ba", "ke", "li", "mo", "nu", "ra", "si", "tu", "ve", "yr", "ða", "þo",
];

fn lcg(state: &mut u64, bound: usize) -> usize {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    ((*state >> 33) as usize) % bound
}

/// Skew toward a small hot set, like real token distributions: the rank
/// is the min of two uniform draws, then spelled out in base-12.
fn synth_word(state: &mut u64, zipf: usize) -> String {
    let a = lcg(state, zipf);
    let b = lcg(state, zipf);
    let mut rank = a.min(b) + 1;
    let mut w = String::new();
    loop {
        w.push_str(SYLLABLES[rank % SYLLABLES.len()]);
        rank /= SYLLABLES.len();
        if rank == 0 {
            break;
        }
    }
    w
}

/// Deterministic pseudo-words: a simple LCG over a small syllable set.
fn synth_corpus(sentences: usize) -> String {
    let mut state = 0x2545F491u64;
    let mut out = String::new();
    for _ in 0..sentences {
        let len = 3 + lcg(&mut state, 8);
        let mut tokens: Vec<String> = Vec::with_capacity(len + 4);
        tokens.push(String::new());
        tokens.push(String::new());
        for _ in 0..len {
            tokens.push(synth_word(&mut state, 200));
        }
        tokens.push(String::new());
        tokens.push(String::new());
        for w in tokens.windows(3) {
            out.push_str(&format!("{}\t{}\t{}\t1\n", w[0], w[1], w[2]));
        }
    }
    out
}

fn build_store(dir: &TempDir) -> NgramStore {
    let tsv = dir.path().join("corpus.tsv");
    let bin = dir.path().join("bench.bin");
    fs::write(&tsv, synth_corpus(4000)).expect("write corpus");
    trigrams::compress(&tsv, &bin, false).expect("compress");
    NgramStore::open(&bin).expect("open store")
}

fn bench_queries(c: &mut Criterion) {
    let dir = TempDir::new().expect("tempdir");
    let store = build_store(&dir);

    // Pick probe words that exist, spanning hot and cold ids.
    let hot = store.id_to_word(1).expect("vocab");
    let mid = store
        .id_to_word((store.unigram_count() / 2) as u32)
        .expect("vocab");
    let cold = store
        .id_to_word((store.unigram_count() - 1) as u32)
        .expect("vocab");
    let hot_succ = store.succ(2, &[hot.as_str()]);
    let second = hot_succ.first().map(|s| s.word.clone()).unwrap_or_default();

    c.bench_function("word_to_id/hot", |b| {
        b.iter(|| black_box(store.word_to_id(black_box(&hot))))
    });
    c.bench_function("word_to_id/cold", |b| {
        b.iter(|| black_box(store.word_to_id(black_box(&cold))))
    });
    c.bench_function("freq/unigram", |b| {
        b.iter(|| black_box(store.freq(&[black_box(hot.as_str())])))
    });
    c.bench_function("freq/bigram", |b| {
        b.iter(|| black_box(store.freq(&[hot.as_str(), second.as_str()])))
    });
    c.bench_function("freq/trigram_miss", |b| {
        b.iter(|| black_box(store.freq(&[hot.as_str(), mid.as_str(), cold.as_str()])))
    });
    c.bench_function("logprob/bigram", |b| {
        b.iter(|| black_box(store.logprob(&[hot.as_str(), second.as_str()])))
    });
    c.bench_function("succ/top10", |b| {
        b.iter(|| black_box(store.succ(10, &[black_box(hot.as_str())])))
    });
}

criterion_group!(benches, bench_queries);
criterion_main!(benches);
