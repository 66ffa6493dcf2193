//! Value types shared by the virtual machine.
//!
//! - [`word`]: 256-bit machine word with wrapping arithmetic
//! - [`bytecode`]: immutable, cheaply clonable bytecode buffer

pub mod bytecode;
pub mod word;
