// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The vocabulary section: id back to word.
//!
//! The trie answers word → id; `succ` needs the reverse direction. Words
//! are stored NUL-terminated, as ordinal bytes, in id order, and the
//! whole list is gzip-compressed (it is by far the most redundant data in
//! the file). A sparse offset index makes `id → word` cheap without
//! storing one offset per word: the first [`INDEX_CUTOFF`] ids get a
//! dedicated entry each (ids are assigned by descending n-gram activity,
//! so the low ids are the ones `succ` touches constantly), and beyond the
//! cutoff one entry per [`INDEX_QUANTUM`] words bounds the linear scan.
//!
//! A final sentinel entry holds the uncompressed byte length, so the last
//! sub-cutoff word is delimited like any other.
//!
//! # Section layout
//!
//! ```text
//! entries: u32 | byte offsets: u32 x entries | gzip(words ++ NULs)
//! ```
//!
//! The stream is decompressed once when the store is opened; lookups then
//! read the decompressed buffer in place.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::bits::u32_at;
use crate::error::{Error, Result};

/// Ids below this each get their own index entry.
pub const INDEX_CUTOFF: usize = 1024;

/// Index spacing beyond the cutoff.
pub const INDEX_QUANTUM: usize = 64;

/// Parsed vocabulary: the offset index plus the decompressed word list.
pub struct Vocabulary {
    index: Vec<u32>,
    data: Vec<u8>,
}

impl Vocabulary {
    pub fn parse(section: &[u8]) -> Result<Self> {
        if section.len() < 4 {
            return Err(Error::Malformed {
                section: "vocab",
                reason: "missing index header".into(),
            });
        }
        let entries = u32_at(section, 0) as usize;
        let data_start = 4 + 4 * entries;
        if section.len() < data_start {
            return Err(Error::Malformed {
                section: "vocab",
                reason: "index truncated".into(),
            });
        }
        let index = (0..entries).map(|i| u32_at(section, 4 + 4 * i)).collect();
        let mut data = Vec::new();
        GzDecoder::new(&section[data_start..]).read_to_end(&mut data)?;
        Ok(Self { index, data })
    }

    /// The ordinal bytes of word `id`, or `None` when `id` is outside the
    /// vocabulary.
    pub fn word_bytes(&self, id: u32) -> Option<&[u8]> {
        let id = id as usize;
        let (mut p, end, mut skip) = if id < INDEX_CUTOFF {
            let start = if id == 0 {
                0
            } else {
                *self.index.get(id - 1)? as usize
            };
            // The next word starts one byte past our terminator.
            let end = (*self.index.get(id)? as usize).checked_sub(1)?;
            (start, Some(end), 0usize)
        } else {
            let q = (id - INDEX_CUTOFF) / INDEX_QUANTUM;
            let r = (id - INDEX_CUTOFF) % INDEX_QUANTUM;
            let slot = (INDEX_CUTOFF - 1) + q;
            (*self.index.get(slot)? as usize, None, r)
        };
        while skip > 0 {
            while *self.data.get(p)? != 0 {
                p += 1;
            }
            p += 1;
            skip -= 1;
        }
        let start = p;
        let end = match end {
            Some(end) => end,
            None => {
                let mut e = start;
                while *self.data.get(e)? != 0 {
                    e += 1;
                }
                e
            }
        };
        self.data.get(start..end)
    }
}

/// Serialize the vocabulary section from words in id order.
pub fn encode(words: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut index: Vec<u32> = Vec::new();
    for (ix, word) in words.iter().enumerate() {
        if ix > 0 && (ix < INDEX_CUTOFF || ix % INDEX_QUANTUM == 0) {
            index.push(data.len() as u32);
        }
        data.extend_from_slice(word);
        data.push(0);
    }
    index.push(data.len() as u32);

    let mut out = Vec::new();
    out.extend_from_slice(&(index.len() as u32).to_le_bytes());
    for entry in &index {
        out.extend_from_slice(&entry.to_le_bytes());
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&data)?;
    out.extend_from_slice(&encoder.finish()?);
    Ok(out)
}
