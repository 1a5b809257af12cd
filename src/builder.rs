// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The offline compressor: a tab-separated trigram corpus in, a packed
//! store file out.
//!
//! Input lines are `w0 <TAB> w1 <TAB> w2 <TAB> count` (whitespace-split
//! is accepted when no field is empty). Empty fields are the sentence
//! sentinel: a sentence `a b` appears in sliding-window data as the
//! trigrams `("", "", a)`, `("", a, b)`, `(a, b, "")`, `(b, "", "")`.
//!
//! The build is two passes. The first counts how often each word appears
//! in the trigram list and derives the alphabet; ids are then assigned in
//! descending order of that activity so the hottest words get the
//! smallest ids (and the shortest codeword prefixes everywhere ids are
//! stored). Id 0 is always the empty-string sentinel. The second pass
//! accumulates the three-level count tree, from which the pointer lists,
//! id lists, and frequency tables are produced exactly in the layout the
//! query engine expects.
//!
//! Trigrams with two sentinels carry the same information as a bigram, so
//! `("", "", w)` is folded into the bigram `("", w)` and `(w, "", "")`
//! into `(w, "")` before anything is written; the query engine performs
//! the mirror-image redirection on lookup.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use crate::alphabet::Alphabet;
use crate::elias_fano;
use crate::error::{Error, Result};
use crate::freqs;
use crate::header::{
    self, FileHeader, DEFAULT_FREQ_QUANTUM, DEFAULT_INNER_QUANTUM, DEFAULT_OUTER_QUANTUM,
};
use crate::partitioned;
use crate::store::MAX_ORDER;
use crate::trie::{Trie, NO_VALUE};
use crate::vocab;

/// One node of the count tree: a level's count plus its children.
#[derive(Default)]
struct Level {
    cnt: u64,
    children: BTreeMap<u32, Level>,
}

/// Corpus state accumulated by [`read_tsv`](NgramCompressor::read_tsv),
/// ready to be written out.
pub struct NgramCompressor {
    alphabet: Alphabet,
    trie: Trie,
    level0: Level,
    // Words as ordinal bytes, in id order; index 0 is the sentinel.
    vocab_words: Vec<Vec<u8>>,
    // Sorted distinct counts per level; level 0 is the corpus total.
    buckets: Vec<Vec<u64>>,
}

impl NgramCompressor {
    /// Read a corpus and build the in-memory count tree.
    pub fn read_tsv<P: AsRef<Path>>(path: P, add_all_bigrams: bool) -> Result<Self> {
        let path = path.as_ref();

        // First pass: per-word activity and the alphabet.
        let spinner = progress("first pass");
        let mut occurrences: HashMap<String, u64> = HashMap::new();
        let mut chars: BTreeSet<char> = BTreeSet::new();
        let mut lines = 0u64;
        for (lineno, line) in BufReader::new(fs::File::open(path)?).lines().enumerate() {
            let line = line?;
            let Some((w0, w1, w2, _)) = parse_line(&line, lineno)? else {
                continue;
            };
            lines += 1;
            for w in [&w0, &w1, &w2] {
                chars.extend(w.chars());
                *occurrences.entry(w.clone()).or_insert(0) += 1;
            }
            spinner.inc(1);
        }
        spinner.finish_with_message(format!(
            "first pass: {lines} trigrams, {} distinct words",
            occurrences.len()
        ));
        let alphabet = Alphabet::from_chars(chars.into_iter().collect())?;

        // Id 0 is always the sentinel; the rest get ids in descending
        // activity order, ties broken by word for determinism.
        occurrences.insert(String::new(), u64::MAX);
        let mut by_activity: Vec<(String, u64)> = occurrences.into_iter().collect();
        by_activity.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut trie = Trie::new(true);
        let mut ids: HashMap<String, u32> = HashMap::new();
        let mut vocab_words: Vec<Vec<u8>> = Vec::new();
        for (expected, (word, _)) in by_activity.into_iter().enumerate() {
            let coded = alphabet
                .encode_word(&word)
                .expect("alphabet was derived from this corpus");
            if expected == 0 {
                debug_assert!(word.is_empty());
                vocab_words.push(Vec::new());
                ids.insert(word, 0);
                continue;
            }
            let id = trie.add(&coded);
            debug_assert_eq!(id as usize, expected);
            ids.insert(word, id);
            vocab_words.push(coded);
        }
        if trie.len() as u64 > NO_VALUE as u64 {
            return Err(Error::Overflow("unigram ids"));
        }

        // Second pass: the count tree.
        let spinner = progress("second pass");
        let mut level0 = Level::default();
        let mut ucnt: u64 = 0;
        for (lineno, line) in BufReader::new(fs::File::open(path)?).lines().enumerate() {
            let line = line?;
            let Some((w0, w1, w2, count)) = parse_line(&line, lineno)? else {
                continue;
            };
            let (i0, i1, i2) = (ids[&w0], ids[&w1], ids[&w2]);
            let d0 = level0.children.entry(i0).or_default();
            d0.cnt += count;
            let d1 = d0.children.entry(i1).or_default();
            d1.cnt += count;
            let d2 = d1.children.entry(i2).or_default();
            d2.cnt += count;
            if add_all_bigrams {
                // The data does not guarantee (w1, w2, *) trigrams, so
                // (w1, w2) and the trailing unigrams are counted here.
                level0.children.entry(i2).or_default().cnt += count;
                let t1 = level0.children.entry(i1).or_default();
                t1.cnt += count;
                t1.children.entry(i2).or_default().cnt += count;
                ucnt += 3 * count;
            } else {
                ucnt += count;
            }
            spinner.inc(1);
        }
        spinner.finish_with_message("second pass done");
        level0.cnt = ucnt;

        collapse_sentinel_trigrams(&mut level0);

        // Bucket the distinct counts of each level.
        let mut sets: Vec<BTreeSet<u64>> = vec![BTreeSet::new(); MAX_ORDER + 1];
        collect_counts(0, &level0, &mut sets);
        // Unigrams that never open a trigram keep frequency 0.
        sets[1].insert(0);
        let buckets: Vec<Vec<u64>> = sets.into_iter().map(|s| s.into_iter().collect()).collect();

        Ok(Self {
            alphabet,
            trie,
            level0,
            vocab_words,
            buckets,
        })
    }

    /// Write the store with the default quanta.
    pub fn write_binary<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_binary_with_quanta(
            path,
            DEFAULT_OUTER_QUANTUM,
            DEFAULT_INNER_QUANTUM,
            DEFAULT_FREQ_QUANTUM,
        )
    }

    /// Write the store with explicit quanta (recorded in the header;
    /// readers take them from there).
    pub fn write_binary_with_quanta<P: AsRef<Path>>(
        &self,
        path: P,
        outer_quantum: u32,
        inner_quantum: u32,
        freq_quantum: u32,
    ) -> Result<()> {
        for buckets in &self.buckets {
            if buckets.len() >= 1 << 16 {
                return Err(Error::Overflow("frequency buckets"));
            }
            if buckets.last().is_some_and(|&v| v >= 1 << 32) {
                return Err(Error::Overflow("frequency counts"));
            }
        }

        let n1 = self.trie.len() as u64;
        let empty = Level::default();
        let child = |id: u32| self.level0.children.get(&id).unwrap_or(&empty);

        // Unigram pointer list: running totals of bigram children.
        let mut ptrs: Vec<u64> = Vec::with_capacity(n1 as usize + 1);
        ptrs.push(0);
        let mut running = 0u64;
        for i in 0..n1 {
            running += child(i as u32).children.len() as u64;
            ptrs.push(running);
        }

        let unigram_ranks: Vec<u16> = (0..n1)
            .map(|i| self.rank_of(1, child(i as u32).cnt))
            .collect();

        // Bigram and trigram levels in one sweep over the count tree.
        let mut bigram_ptrs: Vec<u64> = Vec::new();
        let mut bigram_ids: Vec<u64> = Vec::new();
        let mut trigram_ids: Vec<u64> = Vec::new();
        let mut bigram_ranks: Vec<u16> = Vec::new();
        let mut trigram_ranks: Vec<u16> = Vec::new();
        let mut trigram_total = 0u64;
        let mut bigram_prefix = 0u64;
        let mut trigram_prefix = 0u64;
        let mut child_cache: HashMap<u32, Vec<u32>> = HashMap::new();
        for w0 in 0..n1 {
            let node0 = child(w0 as u32);
            if node0.children.is_empty() {
                continue;
            }
            for (&w1, node1) in &node0.children {
                bigram_ids.push(w1 as u64 + bigram_prefix);
                bigram_ptrs.push(trigram_total);
                bigram_ranks.push(self.rank_of(2, node1.cnt));
                if !node1.children.is_empty() {
                    trigram_total += node1.children.len() as u64;
                    // The Pibiri-Venturini remap: store w2 as its position
                    // among w1's bigram children instead of its raw id.
                    let w1_children = child_cache
                        .entry(w1)
                        .or_insert_with(|| child(w1).children.keys().copied().collect());
                    for (&w2, node2) in &node1.children {
                        let remapped = w1_children.partition_point(|&x| x < w2) as u64;
                        trigram_ids.push(remapped + trigram_prefix);
                        trigram_ranks.push(self.rank_of(3, node2.cnt));
                    }
                    trigram_prefix = *trigram_ids.last().expect("pushed above");
                }
            }
            bigram_prefix = *bigram_ids.last().expect("pushed above");
        }
        bigram_ptrs.push(trigram_total);
        if bigram_ids.len() as u64 >= 1 << 32 || trigram_ids.len() as u64 >= 1 << 32 {
            return Err(Error::Overflow("ngram counts"));
        }

        // Assemble the file: header placeholder, tagged sections, fixup.
        let mut out = vec![0u8; header::SIZE];
        let mut offsets = [0u32; header::SECTION_COUNT];
        let mut section = |out: &mut Vec<u8>, index: usize| {
            write_tag(out, header::SECTION_NAMES[index]);
            offsets[index] = out.len() as u32;
        };

        section(&mut out, 0);
        out.extend_from_slice(&self.alphabet.to_bytes());
        self.trie.write(&mut out);
        align4(&mut out);

        section(&mut out, 1);
        freqs::write_buckets(&self.buckets, &mut out);

        section(&mut out, 2);
        out.extend_from_slice(&elias_fano::encode(&ptrs, inner_quantum));

        section(&mut out, 3);
        out.extend_from_slice(&partitioned::encode(&bigram_ids, outer_quantum, inner_quantum));

        section(&mut out, 4);
        out.extend_from_slice(&elias_fano::encode(&bigram_ptrs, inner_quantum));

        section(&mut out, 5);
        out.extend_from_slice(&partitioned::encode(
            &trigram_ids,
            outer_quantum,
            inner_quantum,
        ));

        section(&mut out, 6);
        out.extend_from_slice(&freqs::encode(&unigram_ranks, freq_quantum));
        align4(&mut out);

        section(&mut out, 7);
        out.extend_from_slice(&freqs::encode(&bigram_ranks, freq_quantum));
        align4(&mut out);

        section(&mut out, 8);
        out.extend_from_slice(&freqs::encode(&trigram_ranks, freq_quantum));
        align4(&mut out);

        section(&mut out, 9);
        out.extend_from_slice(&vocab::encode(&self.vocab_words)?);

        let header = FileHeader {
            trie: offsets[0],
            freqs: offsets[1],
            unigram_ptrs: offsets[2],
            bigrams: offsets[3],
            bigram_ptrs: offsets[4],
            trigrams: offsets[5],
            unigram_freqs: offsets[6],
            bigram_freqs: offsets[7],
            trigram_freqs: offsets[8],
            vocab: offsets[9],
            outer_quantum,
            inner_quantum,
            freq_quantum,
        };
        header.write(&mut out);
        fs::write(path, &out)?;
        Ok(())
    }

    /// Number of distinct unigrams, including the sentinel.
    pub fn unigram_count(&self) -> u64 {
        self.trie.len() as u64
    }

    fn rank_of(&self, level: usize, count: u64) -> u16 {
        self.buckets[level]
            .binary_search(&count)
            .expect("count was bucketed during read_tsv") as u16
    }
}

/// Read a corpus and write a store in one step.
pub fn compress<P: AsRef<Path>, Q: AsRef<Path>>(
    tsv: P,
    output: Q,
    add_all_bigrams: bool,
) -> Result<()> {
    NgramCompressor::read_tsv(tsv, add_all_bigrams)?.write_binary(output)
}

/// Parse one corpus line; blank lines yield `None`.
fn parse_line(line: &str, lineno: usize) -> Result<Option<(String, String, String, u64)>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    // Whitespace split first; a tab split recovers empty sentinel fields.
    let mut fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        fields = line.split('\t').collect();
    }
    if fields.len() != 4 {
        return Err(Error::BadCorpusLine {
            line: lineno + 1,
            reason: format!("expected 4 fields, got {}", fields.len()),
        });
    }
    let count: u64 = fields[3].parse().map_err(|_| Error::BadCorpusLine {
        line: lineno + 1,
        reason: format!("bad count `{}`", fields[3]),
    })?;
    Ok(Some((
        fields[0].to_string(),
        fields[1].to_string(),
        fields[2].to_string(),
        count,
    )))
}

/// Fold double-sentinel trigrams into their bigram equivalents.
fn collapse_sentinel_trigrams(level0: &mut Level) {
    // ("", "", w) -> ("", w)
    if let Some(d0) = level0.children.get_mut(&0) {
        let moved: Vec<(u32, u64)> = d0
            .children
            .get(&0)
            .map(|d00| d00.children.iter().map(|(&w, l)| (w, l.cnt)).collect())
            .unwrap_or_default();
        for (w2, cnt) in moved {
            d0.children.entry(w2).or_default().cnt = cnt;
        }
        if let Some(d00) = d0.children.get_mut(&0) {
            d00.cnt = 0;
            d00.children.clear();
        }
    }
    // (w, "", "") -> (w, "")
    for d0 in level0.children.values_mut() {
        if let Some(w0d) = d0.children.get_mut(&0) {
            if let Some(cnt) = w0d.children.get(&0).map(|l| l.cnt) {
                w0d.cnt = cnt;
                w0d.children.remove(&0);
            }
        }
    }
}

fn collect_counts(depth: usize, level: &Level, sets: &mut [BTreeSet<u64>]) {
    sets[depth].insert(level.cnt);
    for child in level.children.values() {
        collect_counts(depth + 1, child, sets);
    }
}

fn write_tag(out: &mut Vec<u8>, name: &str) {
    align4(out);
    let mut tag = [0u8; 16];
    tag[0] = b'[';
    tag[1..1 + name.len()].copy_from_slice(name.as_bytes());
    tag[1 + name.len()] = b']';
    out.extend_from_slice(&tag);
}

fn align4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn progress(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{pos} lines]")
            .expect("static template"),
    );
    bar.set_message(message);
    bar
}
