//! Client-side sparse vector encoding for engines whose lexical index
//! is fed sparse vectors instead of raw text.
//!
//! Tokens are unicode words, lowercased, hashed into a 32-bit index
//! space. Values are raw term frequencies; IDF-style weighting is left
//! to the engine. Hash collisions merge terms, which is acceptable at
//! benchmark corpus sizes.

use std::collections::BTreeMap;
use std::hash::Hasher;

use twox_hash::XxHash64;
use unicode_segmentation::UnicodeSegmentation;

use crate::document::SparseVector;

/// Encodes text into sparse term-frequency vectors.
///
/// The encoder is deterministic: the same text always produces the same
/// vector, so queries and documents agree on term indices. Construct
/// one and share it between a backend and its query side.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparseTextEncoder;

impl SparseTextEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, text: &str) -> SparseVector {
        let mut frequencies: BTreeMap<u32, f32> = BTreeMap::new();
        for word in text.unicode_words() {
            let token = word.to_lowercase();
            *frequencies.entry(term_index(&token)).or_insert(0.0) += 1.0;
        }
        SparseVector {
            indices: frequencies.keys().copied().collect(),
            values: frequencies.values().copied().collect(),
        }
    }
}

fn term_index(token: &str) -> u32 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(token.as_bytes());
    hasher.finish() as u32
}
