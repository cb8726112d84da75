//! Stdin queue
//!
//! Single-byte key codes waiting to be read by the guest. Strict FIFO;
//! reading never blocks.

use std::collections::VecDeque;

/// Value returned by [`StdinQueue::read_char`] when no input is buffered
pub const NO_INPUT: i32 = -1;

#[derive(Debug, Clone, Default)]
pub struct StdinQueue {
    bytes: VecDeque<u8>,
}

impl StdinQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) {
        self.bytes.push_back(byte);
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.bytes.extend(bytes);
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.bytes.pop_front()
    }

    /// Pop the head byte, or [`NO_INPUT`]
    pub fn read_char(&mut self) -> i32 {
        self.pop().map_or(NO_INPUT, i32::from)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}
