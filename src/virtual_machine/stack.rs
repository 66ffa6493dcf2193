//! Bounded evaluation stack of [`Word`]s.
//!
//! Positions are zero-indexed from the top: `element_at(0)` is the most recently
//! pushed word, `element_at(1)` the one below it, and so on.

use crate::types::word::Word;
use crate::virtual_machine::errors::VMError;

/// Default stack capacity.
///
/// Matches the depth limit of EVM-style machines. Configure a different bound through
/// [`MachineConfig`](crate::virtual_machine::machine::MachineConfig).
pub const STACK_LIMIT: usize = 1024;

/// LIFO sequence of words with a fixed maximum size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stack {
    /// Bottom of the stack at index 0, top at the end.
    items: Vec<Word>,
    capacity: usize,
}

impl Stack {
    /// Creates an empty stack holding at most `capacity` words.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    /// Number of words on the stack.
    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of words the stack accepts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pushes `word` on top.
    ///
    /// Returns [`VMError::StackOverflow`] if the stack is full.
    pub fn push(&mut self, word: Word) -> Result<(), VMError> {
        if self.items.len() >= self.capacity {
            return Err(VMError::StackOverflow {
                capacity: self.capacity,
            });
        }
        self.items.push(word);
        Ok(())
    }

    /// Removes and returns the top word.
    ///
    /// Returns [`VMError::StackUnderflow`] if the stack is empty.
    pub fn pop(&mut self) -> Result<Word, VMError> {
        self.items.pop().ok_or(VMError::StackUnderflow)
    }

    /// Returns the top word without removing it.
    ///
    /// Returns [`VMError::StackUnderflow`] if the stack is empty.
    pub fn top(&self) -> Result<Word, VMError> {
        self.items.last().copied().ok_or(VMError::StackUnderflow)
    }

    /// Returns the word `index` positions below the top.
    ///
    /// Returns [`VMError::IndexOutOfRange`] if `index >= size`.
    pub fn element_at(&self, index: usize) -> Result<Word, VMError> {
        self.position(index).map(|pos| self.items[pos])
    }

    /// Pushes a copy of the word at `index`.
    pub fn duplicate(&mut self, index: usize) -> Result<(), VMError> {
        let word = self.element_at(index)?;
        self.push(word)
    }

    /// Exchanges the top word with the word at `index`; every other word keeps its place.
    ///
    /// Returns [`VMError::IndexOutOfRange`] if `index >= size`.
    pub fn swap(&mut self, index: usize) -> Result<(), VMError> {
        let pos = self.position(index)?;
        let top = self.items.len() - 1;
        self.items.swap(pos, top);
        Ok(())
    }

    /// Iterates from the top of the stack to the bottom.
    pub fn iter(&self) -> impl Iterator<Item = &Word> {
        self.items.iter().rev()
    }

    /// Maps a top-relative index onto the backing vector.
    fn position(&self, index: usize) -> Result<usize, VMError> {
        let size = self.items.len();
        if index >= size {
            return Err(VMError::IndexOutOfRange { index, size });
        }
        Ok(size - 1 - index)
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new(STACK_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_of(values: &[u64]) -> Stack {
        let mut stack = Stack::default();
        for &v in values {
            stack.push(Word::from_int(v)).unwrap();
        }
        stack
    }

    #[test]
    fn push_and_pop_are_lifo() {
        let mut stack = stack_of(&[1, 2]);
        assert_eq!(stack.size(), 2);
        assert_eq!(stack.pop().unwrap(), Word::TWO);
        assert_eq!(stack.pop().unwrap(), Word::ONE);
        assert!(stack.is_empty());
    }

    #[test]
    fn pop_and_top_fault_when_empty() {
        let mut stack = Stack::default();
        assert_eq!(stack.pop(), Err(VMError::StackUnderflow));
        assert_eq!(stack.top(), Err(VMError::StackUnderflow));
    }

    #[test]
    fn top_does_not_remove() {
        let stack = stack_of(&[7]);
        assert_eq!(stack.top().unwrap(), Word::from_int(7));
        assert_eq!(stack.size(), 1);
    }

    #[test]
    fn element_at_counts_from_top() {
        let stack = stack_of(&[10, 20, 30]);
        assert_eq!(stack.element_at(0).unwrap(), Word::from_int(30));
        assert_eq!(stack.element_at(2).unwrap(), Word::from_int(10));
    }

    #[test]
    fn positional_access_faults_at_or_beyond_size() {
        for size in 0..4u64 {
            let mut stack = stack_of(&(0..size).collect::<Vec<_>>());
            let s = size as usize;
            for index in s..s + 3 {
                let expected = Err(VMError::IndexOutOfRange { index, size: s });
                assert_eq!(stack.element_at(index), expected);
                assert_eq!(stack.swap(index), expected.clone().map(|_| ()));
                assert_eq!(stack.duplicate(index), expected.map(|_| ()));
            }
            assert_eq!(stack.size(), s);
        }
    }

    #[test]
    fn duplicate_pushes_copy() {
        let mut stack = stack_of(&[1, 2, 3]);
        stack.duplicate(2).unwrap();
        let values: Vec<_> = stack.iter().copied().collect();
        assert_eq!(
            values,
            vec![
                Word::from_int(1),
                Word::from_int(3),
                Word::from_int(2),
                Word::from_int(1)
            ]
        );
    }

    #[test]
    fn swap_only_moves_the_pair() {
        let mut stack = stack_of(&[0, 1, 2, 3, 4]);
        stack.swap(3).unwrap();
        let values: Vec<_> = stack.iter().copied().collect();
        assert_eq!(
            values,
            [1u64, 3, 2, 4, 0].map(Word::from_int).to_vec()
        );
    }

    #[test]
    fn swap_zero_is_noop() {
        let mut stack = stack_of(&[5, 6]);
        stack.swap(0).unwrap();
        assert_eq!(stack, stack_of(&[5, 6]));
    }

    #[test]
    fn push_faults_past_capacity() {
        let mut stack = Stack::new(2);
        stack.push(Word::ONE).unwrap();
        stack.push(Word::ONE).unwrap();
        assert_eq!(
            stack.push(Word::ONE),
            Err(VMError::StackOverflow { capacity: 2 })
        );
        assert_eq!(
            stack.duplicate(0),
            Err(VMError::StackOverflow { capacity: 2 })
        );
        assert_eq!(stack.size(), 2);
    }

    #[test]
    fn default_capacity() {
        assert_eq!(Stack::default().capacity(), STACK_LIMIT);
    }
}
