//! In-progress command line, edited key by key before submission.

use crate::bridge::handshake::{INPUT_CAPACITY, truncate_to_bytes};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandBuffer {
    text: String,
}

impl CommandBuffer {
    /// Longest command, in bytes, that fits the input slot.
    pub const MAX_LEN: usize = INPUT_CAPACITY - 1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Appends as much of `text` as fits. False if nothing was added.
    pub fn append(&mut self, text: &str) -> bool {
        let room = Self::MAX_LEN - self.text.len();
        let accepted = truncate_to_bytes(text, room);
        if accepted.is_empty() {
            return false;
        }
        self.text.push_str(accepted);
        true
    }

    /// Removes the last whole character. False if already empty.
    pub fn backspace(&mut self) -> bool {
        self.text.pop().is_some()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}
