// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Trigrams CLI: build, inspect, and query store files.
//!
//! ```bash
//! # Compress a corpus into a store
//! trigrams compress --input trigrams.tsv --output trigrams.bin
//!
//! # Inspect the binary structure
//! trigrams inspect trigrams.bin
//!
//! # Query an n-gram and list successors
//! trigrams query trigrams.bin stjórnarskrá lýðveldisins Íslands
//! trigrams succ trigrams.bin -n 5 stjórnarskrá lýðveldisins
//! ```

use std::process::exit;
use std::time::Instant;

use clap::Parser;
use serde::Serialize;

use trigrams::{header, NgramCompressor, NgramStore};

mod cli;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            add_all_bigrams,
        } => run_compress(&input, &output, add_all_bigrams),
        Commands::Inspect { file, json } => run_inspect(&file, json),
        Commands::Query { file, words } => run_query(&file, &words),
        Commands::Succ { file, count, words } => run_succ(&file, count, &words),
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        exit(1);
    }
}

fn run_compress(input: &str, output: &str, add_all_bigrams: bool) -> trigrams::Result<()> {
    let started = Instant::now();
    let compressor = NgramCompressor::read_tsv(input, add_all_bigrams)?;
    compressor.write_binary(output)?;
    let store = NgramStore::open(output)?;
    println!(
        "wrote {} ({} bytes): {} unigrams, {} bigrams in {:.1}s",
        output,
        store.file_size(),
        store.unigram_count(),
        store.bigram_count(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

#[derive(Serialize)]
struct SectionReport {
    name: &'static str,
    offset: u32,
    bytes: usize,
}

#[derive(Serialize)]
struct InspectReport {
    file_size: usize,
    unigrams: u64,
    bigrams: u64,
    alphabet_chars: usize,
    outer_quantum: u32,
    inner_quantum: u32,
    freq_quantum: u32,
    frequency_buckets: [usize; 4],
    sections: Vec<SectionReport>,
}

fn run_inspect(file: &str, json: bool) -> trigrams::Result<()> {
    let store = NgramStore::open(file)?;
    let h = store.header();

    // Section sizes follow from the gaps between offsets in file order
    // (each section is preceded by its 16-byte tag).
    let offsets = h.offsets();
    let mut order: Vec<usize> = (0..header::SECTION_COUNT).collect();
    order.sort_by_key(|&i| offsets[i]);
    let mut sections = Vec::with_capacity(header::SECTION_COUNT);
    for (pos, &i) in order.iter().enumerate() {
        let end = order
            .get(pos + 1)
            .map(|&next| offsets[next] as usize - 16)
            .unwrap_or(store.file_size());
        sections.push(SectionReport {
            name: header::SECTION_NAMES[i],
            offset: offsets[i],
            bytes: end.saturating_sub(offsets[i] as usize),
        });
    }

    let report = InspectReport {
        file_size: store.file_size(),
        unigrams: store.unigram_count(),
        bigrams: store.bigram_count(),
        alphabet_chars: store.alphabet().len(),
        outer_quantum: h.outer_quantum,
        inner_quantum: h.inner_quantum,
        freq_quantum: h.freq_quantum,
        frequency_buckets: store.bucket_sizes(),
        sections,
    };
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).expect("report serializes")
        );
        return Ok(());
    }
    println!("{file}: {} bytes", report.file_size);
    println!(
        "  unigrams {}  bigrams {}  alphabet {} chars",
        report.unigrams, report.bigrams, report.alphabet_chars
    );
    println!(
        "  quanta: outer {}  inner {}  freq {}",
        report.outer_quantum, report.inner_quantum, report.freq_quantum
    );
    println!(
        "  frequency buckets per level: {:?}",
        report.frequency_buckets
    );
    for s in &report.sections {
        println!("  {:>10}  {:>14}  {} bytes", s.offset, s.name, s.bytes);
    }
    Ok(())
}

fn run_query(file: &str, words: &[String]) -> trigrams::Result<()> {
    let store = NgramStore::open(file)?;
    let words: Vec<&str> = words.iter().map(String::as_str).collect();
    let started = Instant::now();
    let freq = store.freq(&words);
    let prob = store.prob(&words);
    let logprob = store.logprob(&words);
    let elapsed = started.elapsed();
    println!("freq     = {freq}");
    println!("adj_freq = {}", freq + 1);
    println!("prob     = {prob:.6}");
    println!("logprob  = {logprob:.6}");
    println!("({:.1} µs)", elapsed.as_secs_f64() * 1e6);
    Ok(())
}

fn run_succ(file: &str, count: usize, words: &[String]) -> trigrams::Result<()> {
    let store = NgramStore::open(file)?;
    let words: Vec<&str> = words.iter().map(String::as_str).collect();
    let successors = store.succ(count, &words);
    if successors.is_empty() {
        println!("no successors");
        return Ok(());
    }
    for s in &successors {
        let word = if s.word.is_empty() { "''" } else { s.word.as_str() };
        println!("{:>10.5}  {:>8}  {}", s.logprob, s.id, word);
    }
    Ok(())
}
