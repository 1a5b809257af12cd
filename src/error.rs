// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Error types for loading and building trigram stores.
//!
//! Queries never return errors: a missing word, bigram, or trigram is a
//! frequency of zero, not a failure. Everything that *can* fail does so
//! either when a store file is opened (bad signature, truncated sections)
//! or when the offline compressor ingests a corpus.

use thiserror::Error;

/// Error variants for store loading and corpus compression.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred while reading or writing a store file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the expected 16-byte signature.
    #[error("bad signature: not a trigram store, or an incompatible version")]
    BadSignature,

    /// A header section offset points outside the file or is misaligned.
    #[error("section `{name}` out of bounds: offset {offset} in a {len}-byte file")]
    SectionBounds {
        name: &'static str,
        offset: u32,
        len: usize,
    },

    /// A section's contents failed load-time validation.
    #[error("malformed `{section}` section: {reason}")]
    Malformed {
        section: &'static str,
        reason: String,
    },

    /// The corpus contains more distinct characters than the trie format
    /// can address (ordinals are 7-bit, with 0 reserved).
    #[error("alphabet too large: {0} distinct characters (the format allows 126)")]
    AlphabetTooLarge(usize),

    /// A corpus line could not be parsed as `w0 <TAB> w1 <TAB> w2 <TAB> count`.
    #[error("corpus line {line}: {reason}")]
    BadCorpusLine { line: usize, reason: String },

    /// A count or sequence outgrew a 32-bit field of the file format.
    #[error("value overflow in {0}: the format stores 32-bit quantities")]
    Overflow(&'static str),
}

/// A specialized Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;
