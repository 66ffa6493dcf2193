//! Deterministic stack machine library.
//!
//! Provides a 256-bit word type, an EVM-style opcode set, a bytecode assembler and
//! the interpreter that executes it.

pub mod types;
pub mod utils;
pub mod virtual_machine;
