//! Immutable, reference-counted bytecode buffer.

use crate::virtual_machine::errors::VMError;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Bytecode handed to the machine for one run.
///
/// Wraps `Arc<[u8]>` so a program can be cloned into several machines (or threads)
/// without copying. The buffer is never mutated after construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bytecode(Arc<[u8]>);

impl Bytecode {
    /// Creates a buffer from anything convertible to `Vec<u8>`.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(data.into()))
    }

    /// Parses a hex string, with or without a `0x` prefix.
    ///
    /// ASCII whitespace between digits is ignored.
    pub fn from_hex(text: &str) -> Result<Self, VMError> {
        let digits: Vec<u8> = text
            .trim()
            .trim_start_matches("0x")
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        if digits.len() % 2 != 0 {
            return Err(VMError::InvalidHex {
                text: text.to_string(),
            });
        }
        digits
            .chunks(2)
            .map(|pair| Some((hex_digit(pair[0])? << 4) | hex_digit(pair[1])?))
            .collect::<Option<Vec<u8>>>()
            .map(Self::new)
            .ok_or_else(|| VMError::InvalidHex {
                text: text.to_string(),
            })
    }

    /// Returns the number of bytes in the buffer.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the buffer contents as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

impl Deref for Bytecode {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl From<Vec<u8>> for Bytecode {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<&[u8]> for Bytecode {
    fn from(s: &[u8]) -> Self {
        Self::new(s)
    }
}

impl<const N: usize> From<[u8; N]> for Bytecode {
    fn from(arr: [u8; N]) -> Self {
        Self::new(arr)
    }
}

impl<const N: usize> From<&[u8; N]> for Bytecode {
    fn from(arr: &[u8; N]) -> Self {
        Self::new(arr.as_slice())
    }
}
