// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! File header: signature, section offset table, and quanta.
//!
//! The header is the single source of truth for the file layout. Every
//! piece of code that reads or writes sections MUST go through it; that
//! is what keeps the write path and the read path from drifting apart.
//!
//! The first 16 bytes are an exact-match signature that doubles as the
//! format version. Ten `u32` offsets follow, one per section, in a fixed
//! order, each pointing at the section's first payload byte (a 16-byte
//! human-readable tag like `[trie]` sits immediately before each section
//! for inspectability; offsets point past it). The final three `u32`
//! fields are the quanta the file was written with: readers must use
//! these, never compiled-in constants, even though the outer and inner
//! Elias-Fano quanta are often the same across files.

use crate::bits::u32_at;
use crate::error::{Error, Result};

/// Exact signature of the only supported format version.
pub const SIGNATURE: [u8; 16] = *b"trigrams 001.00\0";

/// Total header size: signature + 10 offsets + 3 quanta.
pub const SIZE: usize = 16 + 4 * (SECTION_COUNT + 3);

/// Number of section offsets in the table.
pub const SECTION_COUNT: usize = 10;

/// Section names in offset-table order, used for tags and diagnostics.
pub const SECTION_NAMES: [&str; SECTION_COUNT] = [
    "trie",
    "freqs",
    "unigram_ptrs",
    "bigrams",
    "bigram_ptrs",
    "trigrams",
    "unigram_freqs",
    "bigram_freqs",
    "trigram_freqs",
    "vocab",
];

/// Default chunk size of the partitioned lists (`Q_outer`).
pub const DEFAULT_OUTER_QUANTUM: u32 = 1 << 11;

/// Default Elias-Fano select quantum (`Q_inner`), used by the flat
/// pointer lists and inside every partitioned chunk.
pub const DEFAULT_INNER_QUANTUM: u32 = 128;

/// Default frequency codeword quantum (`Q_freq`).
pub const DEFAULT_FREQ_QUANTUM: u32 = 1024;

/// Parsed header of a store file.
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    pub trie: u32,
    pub freqs: u32,
    pub unigram_ptrs: u32,
    pub bigrams: u32,
    pub bigram_ptrs: u32,
    pub trigrams: u32,
    pub unigram_freqs: u32,
    pub bigram_freqs: u32,
    pub trigram_freqs: u32,
    pub vocab: u32,
    pub outer_quantum: u32,
    pub inner_quantum: u32,
    pub freq_quantum: u32,
}

impl FileHeader {
    /// Validate the signature and read the offset table. Every offset is
    /// checked against the file length and the 4-byte alignment
    /// invariant, so later section reads can index without checks.
    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SIZE || bytes[..16] != SIGNATURE {
            return Err(Error::BadSignature);
        }
        let mut offsets = [0u32; SECTION_COUNT];
        for (i, slot) in offsets.iter_mut().enumerate() {
            let off = u32_at(bytes, 16 + 4 * i);
            if (off as usize) < SIZE || off as usize >= bytes.len() || off % 4 != 0 {
                return Err(Error::SectionBounds {
                    name: SECTION_NAMES[i],
                    offset: off,
                    len: bytes.len(),
                });
            }
            *slot = off;
        }
        let quanta_base = 16 + 4 * SECTION_COUNT;
        let outer_quantum = u32_at(bytes, quanta_base);
        let inner_quantum = u32_at(bytes, quanta_base + 4);
        let freq_quantum = u32_at(bytes, quanta_base + 8);
        if outer_quantum == 0 || inner_quantum == 0 || freq_quantum == 0 {
            return Err(Error::Malformed {
                section: "header",
                reason: "zero quantum".into(),
            });
        }
        Ok(Self {
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
        })
    }

    /// Offsets in table order, for writing and for `inspect`.
    pub fn offsets(&self) -> [u32; SECTION_COUNT] {
        [
            self.trie,
            self.freqs,
            self.unigram_ptrs,
            self.bigrams,
            self.bigram_ptrs,
            self.trigrams,
            self.unigram_freqs,
            self.bigram_freqs,
            self.trigram_freqs,
            self.vocab,
        ]
    }

    /// Overwrite the header region at the start of `out`.
    pub fn write(&self, out: &mut [u8]) {
        out[..16].copy_from_slice(&SIGNATURE);
        for (i, off) in self.offsets().into_iter().enumerate() {
            out[16 + 4 * i..16 + 4 * (i + 1)].copy_from_slice(&off.to_le_bytes());
        }
        let quanta_base = 16 + 4 * SECTION_COUNT;
        out[quanta_base..quanta_base + 4].copy_from_slice(&self.outer_quantum.to_le_bytes());
        out[quanta_base + 4..quanta_base + 8].copy_from_slice(&self.inner_quantum.to_le_bytes());
        out[quanta_base + 8..quanta_base + 12].copy_from_slice(&self.freq_quantum.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileHeader {
        FileHeader {
            trie: 80,
            freqs: 120,
            unigram_ptrs: 160,
            bigrams: 200,
            bigram_ptrs: 240,
            trigrams: 280,
            unigram_freqs: 320,
            bigram_freqs: 360,
            trigram_freqs: 400,
            vocab: 440,
            outer_quantum: DEFAULT_OUTER_QUANTUM,
            inner_quantum: DEFAULT_INNER_QUANTUM,
            freq_quantum: DEFAULT_FREQ_QUANTUM,
        }
    }

    #[test]
    fn write_then_read() {
        let mut bytes = vec![0u8; 512];
        sample().write(&mut bytes);
        let h = FileHeader::read(&bytes).unwrap();
        assert_eq!(h.offsets(), sample().offsets());
        assert_eq!(h.inner_quantum, DEFAULT_INNER_QUANTUM);
    }

    #[test]
    fn bad_signature_rejected() {
        let mut bytes = vec![0u8; 512];
        sample().write(&mut bytes);
        bytes[0] ^= 0xFF;
        assert!(matches!(FileHeader::read(&bytes), Err(Error::BadSignature)));
    }

    #[test]
    fn out_of_bounds_offset_rejected() {
        let mut bytes = vec![0u8; 512];
        let mut h = sample();
        h.vocab = 4096;
        h.write(&mut bytes);
        assert!(matches!(
            FileHeader::read(&bytes),
            Err(Error::SectionBounds { name: "vocab", .. })
        ));
    }

    #[test]
    fn misaligned_offset_rejected() {
        let mut bytes = vec![0u8; 512];
        let mut h = sample();
        h.freqs = 121;
        h.write(&mut bytes);
        assert!(matches!(
            FileHeader::read(&bytes),
            Err(Error::SectionBounds { name: "freqs", .. })
        ));
    }
}
