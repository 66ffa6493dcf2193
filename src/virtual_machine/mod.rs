//! Stack-based bytecode virtual machine over 256-bit words.
//!
//! The machine executes EVM-style bytecode against a bounded evaluation stack and
//! is fully deterministic: the final stack depends only on the bytecode.
//!
//! # Architecture
//!
//! - **Stack**: up to [`stack::STACK_LIMIT`] [`Word`](crate::types::word::Word)s by
//!   default, indexed from the top
//! - **Instruction format**: 1-byte opcode; `PUSHn` is followed by `n` big-endian
//!   operand bytes
//! - **Execution model**: linear fetch-decode-execute, halting at the end of the
//!   bytecode or on `STOP`; every fault aborts the run
//!
//! # Modules
//!
//! - [`assembler`]: Bytecode builder, textual assembler and disassembler
//! - [`errors`]: Execution and assembly error types
//! - [`isa`]: Opcode table and the family encode/decode pair
//! - [`machine`]: Interpreter, its state machine and configuration
//! - [`stack`]: Bounded evaluation stack

pub mod assembler;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod machine;
pub mod stack;
