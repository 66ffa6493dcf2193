//! Fetch-decode-execute interpreter.
//!
//! The machine walks a [`Bytecode`] buffer left to right. Each [`Machine::step`]
//! decodes the opcode at the program counter, applies its effect to the stack and
//! advances the counter past the opcode and its operand bytes. Reaching the end of
//! the buffer halts the machine; any fault aborts the run and leaves the counter on
//! the faulting instruction.
//!
//! There are no jumps: control flow is strictly linear, so a program of `n` bytes
//! halts after at most `n` steps.

use crate::debug;
use crate::types::bytecode::Bytecode;
use crate::types::word::Word;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Opcode;
use crate::virtual_machine::stack::{STACK_LIMIT, Stack};


/// Execution limits for a [`Machine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MachineConfig {
    /// Maximum number of words on the stack.
    pub stack_capacity: usize,
    /// Maximum number of instructions a single run may execute, if any.
    pub step_limit: Option<u64>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            stack_capacity: STACK_LIMIT,
            step_limit: None,
        }
    }
}

impl MachineConfig {
    pub fn with_stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }
}

/// Whether the machine has more bytecode to execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionState {
    /// The program counter points inside the loaded bytecode.
    Running,
    /// The program counter reached the end of the bytecode.
    Halted,
}

/// Stack machine over 256-bit words.
///
/// The stack is created empty with the machine and survives across runs; loading
/// new bytecode only resets the program counter and step count.
#[derive(Debug)]
pub struct Machine {
    /// Bytecode being executed.
    code: Bytecode,
    /// Program counter (offset of the next opcode).
    pc: usize,
    /// Instructions executed since the last load.
    steps: u64,
    stack: Stack,
    config: MachineConfig,
}

impl Machine {
    /// Creates a machine with an empty stack and the default configuration.
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    /// Creates a machine with an empty stack and the given limits.
    pub fn with_config(config: MachineConfig) -> Self {
        Self {
            code: Bytecode::default(),
            pc: 0,
            steps: 0,
            stack: Stack::new(config.stack_capacity),
            config,
        }
    }

    /// Loads `code` and rewinds the program counter to its first byte.
    pub fn load(&mut self, code: impl Into<Bytecode>) {
        self.code = code.into();
        self.pc = 0;
        self.steps = 0;
    }

    /// Runs `code` until it halts or faults.
    pub fn execute(&mut self, code: impl Into<Bytecode>) -> Result<(), VMError> {
        self.load(code);
        self.run()
    }

    /// Steps the loaded bytecode until it halts or faults.
    pub fn run(&mut self) -> Result<(), VMError> {
        while self.step()? == ExecutionState::Running {}
        debug!(
            "halted after {} steps with {} words on the stack",
            self.steps,
            self.stack.size()
        );
        Ok(())
    }

    /// Executes a single instruction and reports the resulting state.
    ///
    /// Stepping a halted machine does nothing.
    pub fn step(&mut self) -> Result<ExecutionState, VMError> {
        if self.state() == ExecutionState::Halted {
            return Ok(ExecutionState::Halted);
        }
        if let Some(limit) = self.config.step_limit
            && self.steps >= limit
        {
            return Err(VMError::StepLimitExceeded { limit });
        }

        let offset = self.pc;
        let byte = self.code[offset];
        let opcode = Opcode::from_byte(byte).map_err(|_| VMError::InvalidOpcode {
            opcode: byte,
            offset,
        })?;
        debug!("{offset:04x}: {opcode}");

        let operand = self.read_operand(offset, opcode.operand_len())?;
        self.exec(opcode, operand)?;

        // STOP has already moved the counter to the end.
        if self.pc == offset {
            self.pc = offset + 1 + opcode.operand_len();
        }
        self.steps += 1;
        Ok(self.state())
    }

    /// Current state derived from the program counter.
    pub fn state(&self) -> ExecutionState {
        if self.pc >= self.code.len() {
            ExecutionState::Halted
        } else {
            ExecutionState::Running
        }
    }

    /// Offset of the next opcode.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Instructions executed since the last load.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    /// Consumes the machine and returns its stack.
    pub fn into_stack(self) -> Stack {
        self.stack
    }

    /// Returns the `count` operand bytes following the opcode at `offset`.
    fn read_operand(&self, offset: usize, count: usize) -> Result<Word, VMError> {
        if count == 0 {
            return Ok(Word::ZERO);
        }
        let start = offset + 1;
        self.code
            .get(start..start + count)
            .map(Word::from_bytes)
            .ok_or(VMError::TruncatedOperand {
                offset,
                requested: count,
                available: self.code.len().saturating_sub(start),
            })
    }

    /// Executes a single decoded instruction.
    fn exec(&mut self, opcode: Opcode, operand: Word) -> Result<(), VMError> {
        match opcode {
            Opcode::Stop => self.op_stop(),
            Opcode::Add => self.op_binary(|a, b| a + b),
            Opcode::Sub => self.op_binary(|a, b| a - b),
            Opcode::Lt => self.op_binary(|a, b| Word::from_bool(a < b)),
            Opcode::Gt => self.op_binary(|a, b| Word::from_bool(a > b)),
            Opcode::Eq => self.op_binary(|a, b| Word::from_bool(a == b)),
            Opcode::IsZero => self.op_is_zero(),
            Opcode::Pop => self.stack.pop().map(|_| ()),
            Opcode::Push(_) => self.stack.push(operand),
            Opcode::Dup(n) => self.stack.duplicate(n as usize - 1),
            Opcode::Swap(n) => self.stack.swap(n as usize),
        }
    }

    fn op_stop(&mut self) -> Result<(), VMError> {
        self.pc = self.code.len();
        Ok(())
    }

    /// Pops `a` (the top) then `b` and pushes `f(a, b)`.
    fn op_binary(&mut self, f: impl FnOnce(Word, Word) -> Word) -> Result<(), VMError> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        self.stack.push(f(a, b))
    }

    fn op_is_zero(&mut self) -> Result<(), VMError> {
        let value = self.stack.pop()?;
        self.stack.push(Word::from_bool(value.is_zero()))
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}
