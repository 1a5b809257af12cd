// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Partitioned Elias-Fano: a two-level encoding for long monotone lists.
//!
//! The sequence is cut into chunks of `outer_quantum` elements. Each chunk
//! is its own Elias-Fano image over values relative to the chunk's first
//! element, and an outer Elias-Fano list stores the per-chunk base values.
//! A lookup resolves the chunk with one division, reads the base from the
//! outer list, and decodes the remainder inside the chunk. Chunk-local
//! universes are much smaller than the global one, which is where the
//! space saving over a single flat list comes from.
//!
//! # Image layout
//!
//! ```text
//! chunks: u32 | chunk byte offsets: u32 x chunks (from the image start)
//!     | outer Elias-Fano image | chunk images, in order | pad to 4 bytes
//! ```
//!
//! With a single chunk the outer image is the empty Elias-Fano header; it
//! is never dereferenced because chunk 0 needs no base value.

use crate::bits::u32_at;
use crate::elias_fano;

/// Return the value at `index` within the partitioned sequence.
pub fn lookup(buf: &[u8], outer_quantum: u32, inner_quantum: u32, index: u64) -> u64 {
    let q = (index / outer_quantum as u64) as usize;
    let r = index % outer_quantum as u64;
    let chunks = u32_at(buf, 0) as usize;
    debug_assert!(q < chunks);
    let chunk = &buf[u32_at(buf, 4 + 4 * q) as usize..];
    let prefix = if q > 0 {
        let outer = &buf[4 + 4 * chunks..];
        elias_fano::lookup(outer, inner_quantum, (q - 1) as u64)
    } else {
        0
    };
    prefix + elias_fano::lookup(chunk, inner_quantum, r)
}

/// Return the pair of values at `index` and `index + 1`.
///
/// When the pair straddles a chunk boundary the two values live in
/// different chunks and are fetched separately; otherwise a single
/// in-chunk pair lookup plus one base add suffices.
pub fn lookup_pair(buf: &[u8], outer_quantum: u32, inner_quantum: u32, index: u64) -> (u64, u64) {
    let r = index % outer_quantum as u64;
    if r == outer_quantum as u64 - 1 {
        return (
            lookup(buf, outer_quantum, inner_quantum, index),
            lookup(buf, outer_quantum, inner_quantum, index + 1),
        );
    }
    let q = (index / outer_quantum as u64) as usize;
    let chunks = u32_at(buf, 0) as usize;
    let chunk = &buf[u32_at(buf, 4 + 4 * q) as usize..];
    let prefix = if q > 0 {
        let outer = &buf[4 + 4 * chunks..];
        elias_fano::lookup(outer, inner_quantum, (q - 1) as u64)
    } else {
        0
    };
    let (a, b) = elias_fano::lookup_pair(chunk, inner_quantum, r);
    (prefix + a, prefix + b)
}

/// Binary-search `[lo, hi)` for an element equal to `target`.
pub fn search(
    buf: &[u8],
    outer_quantum: u32,
    inner_quantum: u32,
    mut lo: u64,
    mut hi: u64,
    target: u64,
) -> Option<u64> {
    loop {
        if lo >= hi {
            return None;
        }
        let mid = (lo + hi) / 2;
        let v = lookup(buf, outer_quantum, inner_quantum, mid);
        if v == target {
            return Some(mid);
        }
        if v > target {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
}

/// Like [`search`], but `target` is relative to the prefix sum preceding
/// the range (the value at `lo - 1` is added back before bisecting).
pub fn search_prefix(
    buf: &[u8],
    outer_quantum: u32,
    inner_quantum: u32,
    lo: u64,
    hi: u64,
    target: u64,
) -> Option<u64> {
    if lo >= hi {
        return None;
    }
    let target = if lo > 0 {
        target + lookup(buf, outer_quantum, inner_quantum, lo - 1)
    } else {
        target
    };
    search(buf, outer_quantum, inner_quantum, lo, hi, target)
}

/// Encode a non-decreasing sequence into a partitioned image.
pub fn encode(values: &[u64], outer_quantum: u32, inner_quantum: u32) -> Vec<u8> {
    let oq = outer_quantum as usize;
    // Base value of every chunk after the first, i.e. the outer list.
    let mut bases: Vec<u64> = Vec::new();
    // Byte offset of every chunk image, relative to the merged buffer.
    let mut offsets: Vec<u32> = vec![0];
    let mut merged: Vec<u8> = Vec::new();
    let mut current: Vec<u64> = Vec::new();
    let mut prefix = 0u64;
    for (ix, &item) in values.iter().enumerate() {
        if ix % oq == 0 && ix > 0 {
            bases.push(item);
            prefix = item;
            merged.extend_from_slice(&elias_fano::encode(&current, inner_quantum));
            offsets.push(merged.len() as u32);
            current.clear();
        }
        debug_assert!(item >= prefix, "sequence must be non-decreasing");
        current.push(item - prefix);
    }
    if !current.is_empty() {
        merged.extend_from_slice(&elias_fano::encode(&current, inner_quantum));
    }
    let outer = elias_fano::encode(&bases, inner_quantum);
    let base = (4 + 4 * offsets.len() + outer.len()) as u32;
    let mut out = Vec::with_capacity(base as usize + merged.len() + 4);
    out.extend_from_slice(&(offsets.len() as u32).to_le_bytes());
    for off in &offsets {
        out.extend_from_slice(&(off + base).to_le_bytes());
    }
    out.extend_from_slice(&outer);
    out.extend_from_slice(&merged);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}
