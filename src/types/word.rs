//! 256-bit unsigned machine word.

use primitive_types::U256;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// Word length in bytes.
pub const WORD_LEN: usize = 32;

/// Unsigned integer in `[0, 2^256)`, the unit of every stack slot.
///
/// Words are `Copy` values: arithmetic returns a new word and wraps modulo 2^256,
/// so no operation on a word can fail. The canonical byte form is 32 bytes,
/// big-endian, most significant byte first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Word(U256);

impl Word {
    pub const ZERO: Word = Word(U256([0, 0, 0, 0]));
    pub const ONE: Word = Word(U256([1, 0, 0, 0]));
    pub const TWO: Word = Word(U256([2, 0, 0, 0]));
    pub const MAX: Word = Word(U256([u64::MAX; 4]));

    /// Creates a word from a native integer.
    pub fn from_int(value: u64) -> Word {
        Word(U256::from(value))
    }

    /// Interprets `bytes` as a big-endian integer.
    ///
    /// Shorter inputs are zero-padded on the left. Inputs longer than
    /// [`WORD_LEN`] keep only their low-order (trailing) 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Word {
        let start = bytes.len().saturating_sub(WORD_LEN);
        Word(U256::from_big_endian(&bytes[start..]))
    }

    /// Returns the 32-byte big-endian representation.
    pub fn to_bytes(&self) -> [u8; WORD_LEN] {
        let mut out = [0u8; WORD_LEN];
        self.0.to_big_endian(&mut out);
        out
    }

    /// Returns the big-endian bytes with leading zero bytes removed.
    ///
    /// Zero encodes as a single `0x00` byte so the result is never empty.
    pub fn to_minimal_bytes(&self) -> Vec<u8> {
        let bytes = self.to_bytes();
        let skip = self.leading_zero_bytes().min(WORD_LEN - 1);
        bytes[skip..].to_vec()
    }

    /// Number of significant bytes, at least 1.
    pub fn byte_len(&self) -> usize {
        (WORD_LEN - self.leading_zero_bytes()).max(1)
    }

    fn leading_zero_bytes(&self) -> usize {
        (self.0.leading_zeros() / 8) as usize
    }

    /// Returns `self - other` modulo 2^256.
    pub fn subtract(self, other: Word) -> Word {
        self - other
    }

    /// Returns true if the word is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Encodes a boolean as [`Word::ONE`] or [`Word::ZERO`].
    pub fn from_bool(value: bool) -> Word {
        if value { Word::ONE } else { Word::ZERO }
    }
}

impl Add for Word {
    type Output = Word;

    fn add(self, other: Word) -> Word {
        Word(self.0.overflowing_add(other.0).0)
    }
}

impl Sub for Word {
    type Output = Word;

    fn sub(self, other: Word) -> Word {
        Word(self.0.overflowing_sub(other.0).0)
    }
}

impl Ord for Word {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Word {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        Word::from_int(value)
    }
}

impl From<u32> for Word {
    fn from(value: u32) -> Self {
        Word::from_int(value as u64)
    }
}

impl From<u8> for Word {
    fn from(value: u8) -> Self {
        Word::from_int(value as u64)
    }
}

impl From<U256> for Word {
    fn from(value: U256) -> Self {
        Word(value)
    }
}

impl From<&[u8]> for Word {
    fn from(bytes: &[u8]) -> Self {
        Word::from_bytes(bytes)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}
