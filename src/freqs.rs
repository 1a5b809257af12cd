// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Frequency storage: codeword-packed rank indices plus bucket tables.
//!
//! N-grams share frequency values heavily, so a level never stores counts
//! directly. Instead:
//!
//! 1. The distinct counts of a level form a sorted *bucket* array, written
//!    once per level in the `freqs` section (`u32` values).
//! 2. Each n-gram stores the index of its bucket. Those indices are first
//!    remapped so the most common bucket gets the shortest code, then
//!    packed as variable-length codewords in the minimal sequence
//!    `0, 1, 00, 01, 10, 11, 000, ...`: the codeword for table position
//!    `i` is `i + 2 - 2^L` in `L = floor(log2(i + 2))` bits.
//! 3. A parallel bit stream marks each codeword's start with a 1-bit, so
//!    the length of codeword `i` is the gap between start bits `i` and
//!    `i + 1`. Every `quantum` codewords the start bit position is
//!    recorded in a small index for O(1) skip plus a bounded scan.
//!
//! The decode path returns the `u16` rank stored in the table; mapping the
//! rank to the actual `u32` count through the bucket array is the caller's
//! one extra array read.
//!
//! # Rank table layout
//!
//! ```text
//! R: u16 | ranks: u16 x R | quanta: u32 | start positions: u32 x quanta
//!     | cw_bytes: u32 | codeword stream (cw_bytes) | start-bit stream
//! ```
//!
//! The two bit streams are padded to the same byte length, so one byte
//! cursor into the start-bit stream addresses both (the codeword byte sits
//! exactly `cw_bytes` earlier).

use std::collections::HashMap;

use crate::bits::{retrieve, select1, u16_at, u32_at, BitWriter, POPCOUNT};

/// Decode the rank stored for codeword `index`.
pub fn lookup_rank(buf: &[u8], quantum: u32, index: u64) -> u16 {
    let num_ranks = u16_at(buf, 0) as usize;
    let mut p = 2 * (num_ranks + 1);
    let num_quanta = u32_at(buf, p) as usize;
    let qbase = p + 4;
    p += (1 + num_quanta) * 4;
    let cw_bytes = u32_at(buf, p) as usize;
    // Advance to the start-bit stream; the codeword stream ends where it
    // begins.
    p += 4 + cw_bytes;

    let mut skip = index;
    let q = (index / quantum as u64) as usize;
    if q > 0 {
        // Fast-forward over whole bytes of the start-bit stream. The
        // recorded position counts q*quantum start bits before it; the
        // ones sitting below the position inside the straddle byte get
        // added back via the mask popcount.
        let bcnt = u32_at(buf, qbase + 4 * (q - 1)) as usize;
        p += bcnt >> 3;
        let mask = ((1u32 << (bcnt & 7)) - 1) as u8;
        skip -= q as u64 * quantum as u64 - POPCOUNT[(buf[p] & mask) as usize] as u64;
    }
    loop {
        let cnt = POPCOUNT[buf[p] as usize] as u64;
        if cnt >= skip {
            break;
        }
        p += 1;
        skip -= cnt;
    }
    // The 1-bits at `skip + 1` and `skip + 2` (1-indexed from p) delimit
    // the codeword.
    let start = select1(&buf[p..], skip as u32 + 1);
    let end = select1(&buf[p..], skip as u32 + 2);
    let width = end - start;
    let cw = retrieve(&buf[p - cw_bytes..], start as usize, width);
    let table_ix = (cw + (1u64 << width) - 2) as usize;
    u16_at(buf, 2 + 2 * table_ix)
}

/// Encode one level's rank indices into a rank table image.
///
/// `rank_indices[i]` is the bucket index of n-gram `i` at this level.
pub fn encode(rank_indices: &[u16], quantum: u32) -> Vec<u8> {
    // Most common bucket first; ties broken by bucket index so the output
    // is deterministic.
    let mut occurrences: HashMap<u16, u64> = HashMap::new();
    for &r in rank_indices {
        *occurrences.entry(r).or_insert(0) += 1;
    }
    let mut by_count: Vec<(u16, u64)> = occurrences.into_iter().collect();
    by_count.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut codebook: HashMap<u16, (u64, u32)> = HashMap::new();
    for (ix, &(rank, _)) in by_count.iter().enumerate() {
        let width = 63 - (ix as u64 + 2).leading_zeros();
        let cw = ix as u64 + 2 - (1 << width);
        codebook.insert(rank, (cw, width));
    }

    let mut cwbits = BitWriter::new();
    let mut startbits = BitWriter::new();
    let mut qindex: Vec<u32> = Vec::new();
    for (ix, r) in rank_indices.iter().enumerate() {
        if ix > 0 && ix % quantum as usize == 0 {
            qindex.push(startbits.num_bits() as u32);
        }
        let (cw, width) = codebook[r];
        cwbits.append(cw, width);
        startbits.append(1, width);
    }
    // Terminate the start-bit stream so the final codeword is bounded,
    // and keep both streams the same byte length.
    startbits.append(1, 1);
    cwbits.append(0, 1);
    let cw = cwbits.finish();
    let sb = startbits.finish();
    debug_assert_eq!(cw.len(), sb.len());

    let mut out = Vec::new();
    debug_assert!(by_count.len() < 1 << 16);
    out.extend_from_slice(&(by_count.len() as u16).to_le_bytes());
    for &(rank, _) in &by_count {
        out.extend_from_slice(&rank.to_le_bytes());
    }
    out.extend_from_slice(&(qindex.len() as u32).to_le_bytes());
    for &pos in &qindex {
        out.extend_from_slice(&pos.to_le_bytes());
    }
    out.extend_from_slice(&(cw.len() as u32).to_le_bytes());
    out.extend_from_slice(&cw);
    out.extend_from_slice(&sb);
    out
}

/// Write the per-level bucket arrays (sorted distinct counts).
pub fn write_buckets(levels: &[Vec<u64>], out: &mut Vec<u8>) {
    for buckets in levels {
        out.extend_from_slice(&(buckets.len() as u32).to_le_bytes());
        for &value in buckets {
            debug_assert!(value < 1 << 32);
            out.extend_from_slice(&(value as u32).to_le_bytes());
        }
    }
}

/// Read `count` bucket arrays back from the `freqs` section.
pub fn read_buckets(buf: &[u8], count: usize) -> Option<Vec<Vec<u64>>> {
    let mut levels = Vec::with_capacity(count);
    let mut p = 0usize;
    for _ in 0..count {
        if p + 4 > buf.len() {
            return None;
        }
        let n = u32_at(buf, p) as usize;
        p += 4;
        if p + 4 * n > buf.len() {
            return None;
        }
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            values.push(u32_at(buf, p) as u64);
            p += 4;
        }
        levels.push(values);
    }
    Some(levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QF: u32 = 32;

    fn roundtrip(indices: &[u16]) {
        let buf = encode(indices, QF);
        for (i, &r) in indices.iter().enumerate() {
            assert_eq!(lookup_rank(&buf, QF, i as u64), r, "index {i}");
        }
    }

    #[test]
    fn skewed_distribution() {
        // Rank 0 dominates, so it should decode through the shortest code.
        let mut indices = vec![0u16; 500];
        for i in 0..40 {
            indices[i * 12] = (i % 7) as u16 + 1;
        }
        roundtrip(&indices);
    }

    #[test]
    fn single_rank() {
        roundtrip(&[3, 3, 3, 3]);
    }

    #[test]
    fn many_distinct_ranks_cross_quanta() {
        let indices: Vec<u16> = (0..200).map(|i| (i % 50) as u16).collect();
        roundtrip(&indices);
    }

    #[test]
    fn bucket_round_trip() {
        let levels = vec![vec![12345u64], vec![0, 1, 7, 42018], vec![2, 4]];
        let mut out = Vec::new();
        write_buckets(&levels, &mut out);
        assert_eq!(read_buckets(&out, 3), Some(levels));
    }
}
