use stackvm_derive::Error;

/// Errors that can occur during execution or assembly.
///
/// Execution faults abort the current run. Each kind is a separate variant so an
/// embedding layer can map it to its own outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    /// An operation needed more elements than the stack holds.
    #[error("stack underflow")]
    StackUnderflow,
    /// A push would exceed the stack capacity.
    #[error("stack overflow: capacity is {capacity}")]
    StackOverflow { capacity: usize },
    /// Positional access beyond the current stack size.
    #[error("stack index {index} out of range for stack of size {size}")]
    IndexOutOfRange { index: usize, size: usize },
    /// A push instruction declares more operand bytes than remain in the bytecode.
    #[error(
        "truncated operand at offset {offset}: requested {requested} bytes, {available} available"
    )]
    TruncatedOperand {
        offset: usize,
        requested: usize,
        available: usize,
    },
    /// Unknown opcode encountered in bytecode.
    #[error("invalid opcode 0x{opcode:02x} at offset {offset}")]
    InvalidOpcode { opcode: u8, offset: usize },
    /// The configured step limit was reached before the program halted.
    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },
    /// Unrecognized instruction mnemonic during assembly.
    #[error("invalid instruction name: {name}")]
    InvalidInstructionName { name: String },
    /// Wrong number of operands for an instruction.
    #[error("{instruction} expects {expected} operand(s), got {actual}")]
    ArityMismatch {
        instruction: String,
        expected: usize,
        actual: usize,
    },
    /// Operand is not a decimal or `0x`-prefixed hex literal.
    #[error("invalid operand: {token}")]
    InvalidOperand { token: String },
    /// Push operand does not fit the declared width.
    #[error("{instruction} operand needs {actual} bytes but the instruction holds {width}")]
    OperandTooWide {
        instruction: String,
        width: usize,
        actual: usize,
    },
    /// Assembly error with line and column context.
    #[error("line {line}: {source}")]
    AssemblyError {
        line: usize,
        offset: usize,
        source: String,
    },
    /// Malformed hex bytecode.
    #[error("invalid hex bytecode: {text}")]
    InvalidHex { text: String },
    /// File I/O error during assembly.
    #[error("io error: {0}")]
    IoError(String),
}

impl VMError {
    /// Returns true for faults raised while executing bytecode, as opposed to
    /// assembling it.
    pub fn is_execution_fault(&self) -> bool {
        matches!(
            self,
            VMError::StackUnderflow
                | VMError::StackOverflow { .. }
                | VMError::IndexOutOfRange { .. }
                | VMError::TruncatedOperand { .. }
                | VMError::InvalidOpcode { .. }
                | VMError::StepLimitExceeded { .. }
        )
    }
}
