// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Compressed, memory-mapped trigram statistics.
//!
//! This crate stores unigram, bigram, and trigram frequency counts in a
//! single immutable binary blob that is queried in place through a memory
//! map: no decompression pass, no indices built at load time, lookups in
//! the microsecond range for stores of tens of megabytes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌──────────────┐
//! │  bits    │──▶│  elias_fano    │──▶│ partitioned  │
//! │ (select1,│   │ (monotone list │   │ (two-level   │
//! │ retrieve)│   │   decode)      │   │  EF decode)  │
//! └──────────┘   └────────────────┘   └──────────────┘
//!       │                 │                  │
//!       ▼                 ▼                  ▼
//! ┌──────────┐   ┌─────────────────────────────────────┐
//! │  freqs   │   │               store                 │
//! │ (codeword│──▶│  NgramStore: freq / prob / logprob  │
//! │  ranks)  │   │  / succ over the mapped sections    │
//! └──────────┘   └─────────────────────────────────────┘
//!       ▲                 ▲                  ▲
//! ┌──────────┐   ┌────────────────┐   ┌──────────────┐
//! │   trie   │   │    header      │   │ vocab        │
//! │ (word→id)│   │ (offset table) │   │ (id→word)    │
//! └──────────┘   └────────────────┘   └──────────────┘
//! ```
//!
//! The dictionary is a path-compressed trie over per-file alphabet
//! ordinals; child ranges between n-gram levels are Elias-Fano pointer
//! lists; the id lists inside each range are partitioned Elias-Fano; and
//! frequencies are variable-length codewords into per-level bucket
//! tables. [`builder`] produces the file from a tab-separated corpus.
//!
//! # Usage
//!
//! ```no_run
//! use trigrams::NgramStore;
//!
//! let store = NgramStore::open("trigrams.bin")?;
//! let f = store.freq(&["velta", "fyrirtækisins", "er"]);
//! let lp = store.logprob(&["Ísland"]);
//! for s in store.succ(2, &["stjórnarskrá", "lýðveldisins"]) {
//!     println!("{} {:.5}", s.word, s.logprob);
//! }
//! # Ok::<(), trigrams::Error>(())
//! ```
//!
//! A loaded store is immutable and internally unsynchronized; queries
//! take `&self` and keep all state on the stack, so sharing one store
//! across threads needs no locking.

pub mod alphabet;
pub mod bits;
pub mod builder;
pub mod elias_fano;
pub mod error;
pub mod freqs;
pub mod header;
pub mod partitioned;
pub mod store;
pub mod trie;
pub mod vocab;

pub use builder::{compress, NgramCompressor};
pub use error::{Error, Result};
pub use header::FileHeader;
pub use store::{NgramStore, Successor, MAX_ORDER};
