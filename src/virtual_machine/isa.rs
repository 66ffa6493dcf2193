//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the canonical
//! list of fixed single-byte instructions and invokes a callback macro for code
//! generation, so the opcode table, the assembler and the ISA fingerprint test all
//! read the same definitions.
//!
//! Three families encode a numeric modifier `N` in a contiguous byte range:
//!
//! | Family  | N       | Bytes          |
//! |---------|---------|----------------|
//! | `PUSHn` | 1..=32  | `0x60..=0x7f`  |
//! | `DUPn`  | 1..=16  | `0x80..=0x8f`  |
//! | `SWAPn` | 1..=16  | `0x90..=0x9f`  |
//!
//! The byte for a family member is `base + (N - 1)`. [`Opcode::to_byte`] and
//! [`Opcode::from_byte`] are the only places that arithmetic lives.
//!
//! # Bytecode Format
//!
//! - Opcode: 1 byte
//! - `PUSHn` operand: the next `n` bytes, big-endian, no padding or length prefix
//! - Every other instruction: no operand

use crate::virtual_machine::errors::VMError;
use std::fmt;

/// First byte of the `PUSHn` family (`PUSH1`).
pub const PUSH1: u8 = 0x60;
/// Last byte of the `PUSHn` family (`PUSH32`).
pub const PUSH32: u8 = 0x7F;
/// First byte of the `DUPn` family (`DUP1`).
pub const DUP1: u8 = 0x80;
/// Last byte of the `DUPn` family (`DUP16`).
pub const DUP16: u8 = 0x8F;
/// First byte of the `SWAPn` family (`SWAP1`).
pub const SWAP1: u8 = 0x90;
/// Last byte of the `SWAPn` family (`SWAP16`).
pub const SWAP16: u8 = 0x9F;

/// Largest `PUSHn` operand width.
pub const MAX_PUSH_WIDTH: u8 = PUSH32 - PUSH1 + 1;
/// Largest `DUPn` / `SWAPn` modifier.
pub const MAX_STACK_REACH: u8 = DUP16 - DUP1 + 1;

/// Invokes a callback macro with the fixed instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Halting
            // =========================
            /// STOP ; halt execution
            Stop = 0x00, "STOP",
            // =========================
            // Arithmetic
            // =========================
            /// ADD ; a = pop, b = pop, push a + b (mod 2^256)
            Add = 0x01, "ADD",
            /// SUB ; a = pop, b = pop, push a - b (mod 2^256)
            Sub = 0x03, "SUB",
            // =========================
            // Comparison
            // =========================
            /// LT ; a = pop, b = pop, push a < b
            Lt = 0x10, "LT",
            /// GT ; a = pop, b = pop, push a > b
            Gt = 0x11, "GT",
            /// EQ ; a = pop, b = pop, push a == b
            Eq = 0x14, "EQ",
            /// ISZERO ; a = pop, push a == 0
            IsZero = 0x15, "ISZERO",
            // =========================
            // Stack
            // =========================
            /// POP ; discard the top word
            Pop = 0x50, "POP",
        }
    };
}

macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $byte:literal, $mnemonic:literal
        ),* $(,)?
    ) => {
        /// Decoded instruction.
        ///
        /// Family members carry their modifier `N`; construct them with
        /// [`Opcode::push`], [`Opcode::dup`] and [`Opcode::swap`] to get range checking.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name,
            )*
            /// PUSHn ; push the next n bytes as a big-endian word
            Push(u8),
            /// DUPn ; push a copy of the word at depth n - 1
            Dup(u8),
            /// SWAPn ; exchange the top word with the word at depth n
            Swap(u8),
        }

        impl Opcode {
            /// Encodes the instruction as its opcode byte.
            pub const fn to_byte(self) -> u8 {
                match self {
                    $( Opcode::$name => $byte, )*
                    Opcode::Push(n) => PUSH1.wrapping_add(n.wrapping_sub(1)),
                    Opcode::Dup(n) => DUP1.wrapping_add(n.wrapping_sub(1)),
                    Opcode::Swap(n) => SWAP1.wrapping_add(n.wrapping_sub(1)),
                }
            }

            /// Decodes an opcode byte.
            ///
            /// The returned [`VMError::InvalidOpcode`] reports offset 0; the machine
            /// rewrites it with the real program counter.
            pub fn from_byte(byte: u8) -> Result<Self, VMError> {
                match byte {
                    $( $byte => Ok(Opcode::$name), )*
                    PUSH1..=PUSH32 => Ok(Opcode::Push(byte - PUSH1 + 1)),
                    DUP1..=DUP16 => Ok(Opcode::Dup(byte - DUP1 + 1)),
                    SWAP1..=SWAP16 => Ok(Opcode::Swap(byte - SWAP1 + 1)),
                    _ => Err(VMError::InvalidOpcode {
                        opcode: byte,
                        offset: 0,
                    }),
                }
            }

            /// Parses an assembly mnemonic such as `ADD`, `PUSH4` or `SWAP16`.
            ///
            /// Matching is case-insensitive.
            pub fn from_mnemonic(name: &str) -> Result<Self, VMError> {
                let upper = name.to_ascii_uppercase();
                match upper.as_str() {
                    $( $mnemonic => return Ok(Opcode::$name), )*
                    _ => {}
                }
                let family = |prefix: &str, build: fn(u8) -> Option<Opcode>| {
                    upper
                        .strip_prefix(prefix)
                        .filter(|digits| !digits.starts_with('0'))
                        .and_then(|digits| digits.parse::<u8>().ok())
                        .and_then(build)
                };
                family("PUSH", Opcode::push)
                    .or_else(|| family("DUP", Opcode::dup))
                    .or_else(|| family("SWAP", Opcode::swap))
                    .ok_or_else(|| VMError::InvalidInstructionName {
                        name: name.to_string(),
                    })
            }

            /// Returns the fixed part of the assembly mnemonic.
            ///
            /// For family members this is the prefix only (`PUSH`, `DUP`, `SWAP`);
            /// `Display` appends the modifier.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                    Opcode::Push(_) => "PUSH",
                    Opcode::Dup(_) => "DUP",
                    Opcode::Swap(_) => "SWAP",
                }
            }
        }
    };
}

for_each_instruction!(define_opcodes);

impl Opcode {
    /// `PUSHn`, if `n` is in `1..=32`.
    pub const fn push(n: u8) -> Option<Self> {
        if n >= 1 && n <= MAX_PUSH_WIDTH {
            Some(Opcode::Push(n))
        } else {
            None
        }
    }

    /// `DUPn`, if `n` is in `1..=16`.
    pub const fn dup(n: u8) -> Option<Self> {
        if n >= 1 && n <= MAX_STACK_REACH {
            Some(Opcode::Dup(n))
        } else {
            None
        }
    }

    /// `SWAPn`, if `n` is in `1..=16`.
    pub const fn swap(n: u8) -> Option<Self> {
        if n >= 1 && n <= MAX_STACK_REACH {
            Some(Opcode::Swap(n))
        } else {
            None
        }
    }

    /// Number of operand bytes that follow the opcode in bytecode.
    pub const fn operand_len(&self) -> usize {
        match self {
            Opcode::Push(n) => *n as usize,
            _ => 0,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Push(n) | Opcode::Dup(n) | Opcode::Swap(n) => {
                write!(f, "{}{}", self.mnemonic(), n)
            }
            _ => f.write_str(self.mnemonic()),
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = VMError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Opcode::from_byte(value)
    }
}
