// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The n-gram store: memory-mapped loader and query engine.
//!
//! [`NgramStore::open`] maps the file read-only, validates the header and
//! section bounds once, decompresses the vocabulary, and caches the
//! per-level frequency buckets. Everything else happens lazily inside
//! queries, which decode the mapped bytes in place.
//!
//! A `freq(w0, w1, w2)` call resolves each word through the trie, walks
//! the unigram pointer list to the bigram child range of `w0`, bisects
//! that range for `w1`, walks the bigram pointer list to the trigram
//! range, remaps `w2` to its position among `w1`'s children (trigram ids
//! are stored remapped, which is what keeps them small), bisects the
//! trigram range, and finally decodes the match's frequency codeword.
//! Misses at any step short-circuit to zero; the hot path never branches
//! on errors.
//!
//! Queries use only stack-local state, so a loaded store can be shared
//! freely across threads.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::alphabet::Alphabet;
use crate::elias_fano;
use crate::error::{Error, Result};
use crate::freqs;
use crate::header::FileHeader;
use crate::partitioned;
use crate::trie;
use crate::vocab::Vocabulary;

/// Highest n-gram order stored in the file.
pub const MAX_ORDER: usize = 3;

/// One entry of a [`NgramStore::succ`] result.
#[derive(Debug, Clone, PartialEq)]
pub struct Successor {
    pub id: u32,
    pub word: String,
    pub logprob: f64,
}

/// A loaded, immutable trigram store.
pub struct NgramStore {
    mmap: Mmap,
    header: FileHeader,
    alphabet: Alphabet,
    vocab: Vocabulary,
    // Sorted distinct counts per level; level 0 holds the corpus total.
    buckets: Vec<Vec<u64>>,
    trie_root: u32,
    unigram_count: u64,
    bigram_count: u64,
    log_ucnt: f64,
}

impl NgramStore {
    /// Map a store file and validate it for querying.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let header = FileHeader::read(&mmap)?;

        let (alphabet, root_rel) = Alphabet::parse(&mmap[header.trie as usize..])?;
        let trie_root = header.trie + root_rel as u32;
        if trie_root as usize + 4 > mmap.len() {
            return Err(Error::Malformed {
                section: "trie",
                reason: "root node past end of file".into(),
            });
        }

        let buckets = freqs::read_buckets(&mmap[header.freqs as usize..], MAX_ORDER + 1)
            .filter(|levels| !levels[0].is_empty())
            .ok_or_else(|| Error::Malformed {
                section: "freqs",
                reason: "bucket tables truncated".into(),
            })?;

        let vocab = Vocabulary::parse(&mmap[header.vocab as usize..])?;

        let uni_ptr_len = elias_fano::len(&mmap[header.unigram_ptrs as usize..]);
        let bi_ptr_len = elias_fano::len(&mmap[header.bigram_ptrs as usize..]);
        if uni_ptr_len == 0 || bi_ptr_len == 0 {
            return Err(Error::Malformed {
                section: "unigram_ptrs",
                reason: "empty pointer list".into(),
            });
        }

        let log_ucnt = ((buckets[0][0] + 1) as f64).ln();
        Ok(Self {
            mmap,
            header,
            alphabet,
            vocab,
            buckets,
            trie_root,
            unigram_count: uni_ptr_len - 1,
            bigram_count: bi_ptr_len - 1,
            log_ucnt,
        })
    }

    #[inline]
    fn sec(&self, offset: u32) -> &[u8] {
        &self.mmap[offset as usize..]
    }

    /// Number of distinct unigrams, including the sentence sentinel.
    pub fn unigram_count(&self) -> u64 {
        self.unigram_count
    }

    /// Number of distinct bigrams.
    pub fn bigram_count(&self) -> u64 {
        self.bigram_count
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn file_size(&self) -> usize {
        self.mmap.len()
    }

    /// Distinct frequency values per level (level 0 is the corpus total).
    pub fn bucket_sizes(&self) -> [usize; MAX_ORDER + 1] {
        [
            self.buckets[0].len(),
            self.buckets[1].len(),
            self.buckets[2].len(),
            self.buckets[3].len(),
        ]
    }

    /// Resolve a word to its unigram id; the empty string is the
    /// sentence sentinel with id 0.
    pub fn word_to_id(&self, word: &str) -> Option<u32> {
        if word.is_empty() {
            return Some(0);
        }
        let coded = self.alphabet.encode_word(word)?;
        trie::lookup(&self.mmap, self.trie_root, &coded)
    }

    /// Recover the word for a unigram id.
    pub fn id_to_word(&self, id: u32) -> Option<String> {
        if (id as u64) >= self.unigram_count {
            return None;
        }
        self.vocab
            .word_bytes(id)
            .map(|bytes| self.alphabet.decode_word(bytes))
    }

    /// True if the word is a stored unigram (the sentinel is not).
    pub fn contains(&self, word: &str) -> bool {
        !word.is_empty() && self.word_to_id(word).is_some()
    }

    /// Frequency of the 1- to 3-gram given by `words`. With more than
    /// three words, only the last three matter. Absent n-grams have
    /// frequency 0.
    pub fn freq(&self, words: &[&str]) -> u64 {
        let words = tail(words, MAX_ORDER);
        match *words {
            [] => 0,
            [w0] => self.unigram_freq_ids(self.id(w0)),
            [w0, w1] => self.bigram_freq_ids(self.id(w0), self.id(w1)),
            [w0, w1, w2] => self.trigram_freq_ids(self.id(w0), self.id(w1), self.id(w2)),
            _ => unreachable!("tail bounds the slice"),
        }
    }

    /// Laplace-adjusted frequency: every n-gram, present or not, gets +1.
    pub fn adj_freq(&self, words: &[&str]) -> u64 {
        self.freq(words) + 1
    }

    /// Natural log of the probability of the last word given its 0–2
    /// predecessors, with the +1 adjustment in numerator and denominator.
    pub fn logprob(&self, words: &[&str]) -> f64 {
        let words = tail(words, MAX_ORDER);
        match *words {
            [] => -self.log_ucnt,
            [w0] => self.unigram_logprob_ids(self.id(w0)),
            [w0, w1] => self.bigram_logprob_ids(self.id(w0), self.id(w1)),
            [w0, w1, w2] => self.trigram_logprob_ids(self.id(w0), self.id(w1), self.id(w2)),
            _ => unreachable!("tail bounds the slice"),
        }
    }

    /// Probability in (0, 1]: `exp(logprob)`. Never zero because of the
    /// Laplace adjustment.
    pub fn prob(&self, words: &[&str]) -> f64 {
        self.logprob(words).exp()
    }

    /// The up-to-`n` most probable successors of the 1- or 2-word prefix,
    /// in descending log-probability order, ties broken by lower id.
    /// With three or more prefix words, only the last two matter.
    pub fn succ(&self, n: usize, words: &[&str]) -> Vec<Successor> {
        let words = tail(words, MAX_ORDER - 1);
        match *words {
            [] => Vec::new(),
            [w0] => self.unigram_succ(n, self.id(w0)),
            [w0, w1] => self.bigram_succ(n, self.id(w0), self.id(w1)),
            _ => unreachable!("tail bounds the slice"),
        }
    }

    /// Id-level variant of [`freq`](Self::freq) for callers that cache
    /// ids. Out-of-range ids count as missing.
    pub fn freq_ids(&self, ids: &[u32]) -> u64 {
        let ids = tail(ids, MAX_ORDER);
        match *ids {
            [] => 0,
            [i0] => self.unigram_freq_ids(self.checked(i0)),
            [i0, i1] => self.bigram_freq_ids(self.checked(i0), self.checked(i1)),
            [i0, i1, i2] => {
                self.trigram_freq_ids(self.checked(i0), self.checked(i1), self.checked(i2))
            }
            _ => unreachable!("tail bounds the slice"),
        }
    }

    #[inline]
    fn id(&self, word: &str) -> Option<u32> {
        self.word_to_id(word)
    }

    #[inline]
    fn checked(&self, id: u32) -> Option<u32> {
        ((id as u64) < self.unigram_count).then_some(id)
    }

    /// Decode the frequency of codeword `index` in the rank table at
    /// `section`, through the level's bucket array.
    fn rank_frequency(&self, level: usize, section: u32, index: Option<u64>) -> u64 {
        match index {
            None => 0,
            Some(ix) => {
                let rank = freqs::lookup_rank(self.sec(section), self.header.freq_quantum, ix);
                self.buckets[level][rank as usize]
            }
        }
    }

    fn unigram_freq_ids(&self, i0: Option<u32>) -> u64 {
        self.rank_frequency(
            1,
            self.header.unigram_freqs,
            i0.and_then(|i| self.checked(i)).map(u64::from),
        )
    }

    /// Child range of unigram `id` in the bigram array.
    #[inline]
    fn bigram_range(&self, id: u32) -> (u64, u64) {
        elias_fano::lookup_pair(
            self.sec(self.header.unigram_ptrs),
            self.header.inner_quantum,
            id as u64,
        )
    }

    /// Index of the bigram `(i0, i1)` in the bigram array, if present.
    fn bigram_index(&self, i0: u32, i1: u32) -> Option<u64> {
        let (p1, p2) = self.bigram_range(i0);
        partitioned::search_prefix(
            self.sec(self.header.bigrams),
            self.header.outer_quantum,
            self.header.inner_quantum,
            p1,
            p2,
            i1 as u64,
        )
    }

    fn bigram_freq_ids(&self, i0: Option<u32>, i1: Option<u32>) -> u64 {
        let (i0, i1) = match (i0, i1) {
            (Some(a), Some(b)) => (a, b),
            _ => return 0,
        };
        if i0 == 0 && i1 == 0 {
            return 0;
        }
        let index = self.bigram_index(i0, i1);
        self.rank_frequency(2, self.header.bigram_freqs, index)
    }

    fn trigram_freq_ids(&self, i0: Option<u32>, i1: Option<u32>, i2: Option<u32>) -> u64 {
        let (i0, i1, i2) = match (i0, i1, i2) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return 0,
        };
        if i0 == 0 && i1 == 0 && i2 == 0 {
            return 0;
        }
        if i0 == 0 && i1 == 0 {
            // (0, 0, w): the builder collapsed this into the bigram (0, w).
            return self.bigram_freq_ids(Some(i1), Some(i2));
        }
        if i1 == 0 && i2 == 0 {
            // (w, 0, 0): collapsed into the bigram (w, 0).
            return self.bigram_freq_ids(Some(i0), Some(i1));
        }
        let h = &self.header;
        let bigram = match self.bigram_index(i0, i1) {
            Some(ix) => ix,
            None => return 0,
        };
        let (t1, t2) = elias_fano::lookup_pair(self.sec(h.bigram_ptrs), h.inner_quantum, bigram);
        if t1 >= t2 {
            return 0;
        }
        // Trigram ids are remapped: find w2's position among w1's bigram
        // children, then search the trigram range for that position.
        let (q1, _) = self.bigram_range(i1);
        let remapped = match self.bigram_index(i1, i2) {
            Some(ix) => ix,
            None => return 0,
        };
        let index = partitioned::search_prefix(
            self.sec(h.trigrams),
            h.outer_quantum,
            h.inner_quantum,
            t1,
            t2,
            remapped - q1,
        );
        self.rank_frequency(3, h.trigram_freqs, index)
    }

    fn unigram_logprob_ids(&self, i0: Option<u32>) -> f64 {
        ((self.unigram_freq_ids(i0) + 1) as f64).ln() - self.log_ucnt
    }

    fn bigram_logprob_ids(&self, i0: Option<u32>, i1: Option<u32>) -> f64 {
        ((self.bigram_freq_ids(i0, i1) + 1) as f64).ln()
            - ((self.unigram_freq_ids(i0) + 1) as f64).ln()
    }

    fn trigram_logprob_ids(&self, i0: Option<u32>, i1: Option<u32>, i2: Option<u32>) -> f64 {
        ((self.trigram_freq_ids(i0, i1, i2) + 1) as f64).ln()
            - ((self.bigram_freq_ids(i0, i1) + 1) as f64).ln()
    }

    fn unigram_succ(&self, n: usize, i0: Option<u32>) -> Vec<Successor> {
        let i0 = match i0.and_then(|i| self.checked(i)) {
            Some(i) => i,
            None => return Vec::new(),
        };
        let h = &self.header;
        let (p1, p2) = self.bigram_range(i0);
        if p1 >= p2 {
            return Vec::new();
        }
        let lp0 = ((self.rank_frequency(1, h.unigram_freqs, Some(i0 as u64)) + 1) as f64).ln();
        let bigrams = self.sec(h.bigrams);
        let prefix = if p1 > 0 {
            partitioned::lookup(bigrams, h.outer_quantum, h.inner_quantum, p1 - 1)
        } else {
            0
        };
        let mut top = TopN::new(n);
        for i in p1..p2 {
            let id = partitioned::lookup(bigrams, h.outer_quantum, h.inner_quantum, i) - prefix;
            let lpi = ((self.rank_frequency(2, h.bigram_freqs, Some(i)) + 1) as f64).ln();
            top.push(id as u32, lpi - lp0);
        }
        self.resolve(top)
    }

    fn bigram_succ(&self, n: usize, i0: Option<u32>, i1: Option<u32>) -> Vec<Successor> {
        let (i0, i1) = match (
            i0.and_then(|i| self.checked(i)),
            i1.and_then(|i| self.checked(i)),
        ) {
            (Some(a), Some(b)) => (a, b),
            _ => return Vec::new(),
        };
        let h = &self.header;
        let bigram = match self.bigram_index(i0, i1) {
            Some(ix) => ix,
            None => return Vec::new(),
        };
        let (t1, t2) = elias_fano::lookup_pair(self.sec(h.bigram_ptrs), h.inner_quantum, bigram);
        if t1 >= t2 {
            return Vec::new();
        }
        let bigrams = self.sec(h.bigrams);
        let trigrams = self.sec(h.trigrams);
        // The successors' real ids live in w1's bigram child list; the
        // trigram entries only hold positions into it.
        let (q1, _) = self.bigram_range(i1);
        let prefix_bi = if q1 > 0 {
            partitioned::lookup(bigrams, h.outer_quantum, h.inner_quantum, q1 - 1)
        } else {
            0
        };
        let lp0 = ((self.rank_frequency(2, h.bigram_freqs, Some(bigram)) + 1) as f64).ln();
        let prefix_tri = if t1 > 0 {
            partitioned::lookup(trigrams, h.outer_quantum, h.inner_quantum, t1 - 1)
        } else {
            0
        };
        let mut top = TopN::new(n);
        for t in t1..t2 {
            let remapped =
                partitioned::lookup(trigrams, h.outer_quantum, h.inner_quantum, t) - prefix_tri;
            let id = partitioned::lookup(bigrams, h.outer_quantum, h.inner_quantum, q1 + remapped)
                - prefix_bi;
            let lpi = ((self.rank_frequency(3, h.trigram_freqs, Some(t)) + 1) as f64).ln();
            top.push(id as u32, lpi - lp0);
        }
        self.resolve(top)
    }

    fn resolve(&self, top: TopN) -> Vec<Successor> {
        top.into_descending()
            .into_iter()
            .map(|c| Successor {
                id: c.id,
                word: self.id_to_word(c.id).unwrap_or_default(),
                logprob: c.logprob,
            })
            .collect()
    }
}

#[inline]
fn tail<T>(items: &[T], n: usize) -> &[T] {
    if items.len() > n {
        &items[items.len() - n..]
    } else {
        items
    }
}

#[derive(Debug)]
struct Candidate {
    logprob: f64,
    id: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.logprob.total_cmp(&other.logprob).is_eq()
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Greater means better: higher logprob, ties to the lower id.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.logprob
            .total_cmp(&other.logprob)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Bounded top-N accumulator: a min-heap of the best `limit` candidates.
struct TopN {
    heap: BinaryHeap<Reverse<Candidate>>,
    limit: usize,
}

impl TopN {
    fn new(limit: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(limit.min(1024)),
            limit,
        }
    }

    fn push(&mut self, id: u32, logprob: f64) {
        if self.limit == 0 {
            return;
        }
        let candidate = Candidate { logprob, id };
        if self.heap.len() < self.limit {
            self.heap.push(Reverse(candidate));
        } else if let Some(worst) = self.heap.peek() {
            if candidate > worst.0 {
                self.heap.pop();
                self.heap.push(Reverse(candidate));
            }
        }
    }

    fn into_descending(self) -> Vec<Candidate> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(c)| c)
            .collect()
    }
}
