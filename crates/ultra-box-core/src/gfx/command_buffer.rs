//! Append-only, fixed-capacity command buffer.
//!
//! The valid range is `[head, tail)`: `head` is the first word of the backing
//! storage and `tail` is the write cursor. Once closed, the range is frozen
//! until the buffer is reopened for the next frame that selects it.

use core::fmt;

use super::{Gfx, Opcode};

/// Command buffer contract violations. These are programming errors: a
/// buffer sized too small for the frame, or writing outside open/close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferError {
    /// Appending would advance the cursor past capacity. Nothing was written.
    Overflow { capacity: usize },
    /// The buffer is closed (or was never opened).
    Closed,
}

impl fmt::Display for CommandBufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandBufferError::Overflow { capacity } => {
                write!(f, "command buffer overflow (capacity {capacity} words)")
            }
            CommandBufferError::Closed => write!(f, "command buffer is closed"),
        }
    }
}

/// Write side of a command buffer, as handed to game hooks.
pub trait CommandSink {
    fn append(&mut self, op: Opcode) -> Result<(), CommandBufferError>;

    /// Words that can still be appended.
    fn remaining(&self) -> usize;

    fn extend(&mut self, ops: &[Opcode]) -> Result<(), CommandBufferError> {
        for op in ops {
            self.append(*op)?;
        }
        Ok(())
    }
}

/// Fixed-capacity display list of up to `N` words.
pub struct CommandBuffer<const N: usize> {
    words: heapless::Vec<Gfx, N>,
    open: bool,
}

impl<const N: usize> Default for CommandBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CommandBuffer<N> {
    pub const fn new() -> Self {
        Self {
            words: heapless::Vec::new(),
            open: false,
        }
    }

    /// Reset the cursor to `head` and accept appends.
    pub fn open(&mut self) {
        self.words.clear();
        self.open = true;
    }

    pub fn append_word(&mut self, word: Gfx) -> Result<(), CommandBufferError> {
        if !self.open {
            return Err(CommandBufferError::Closed);
        }
        self.words
            .push(word)
            .map_err(|_| CommandBufferError::Overflow { capacity: N })
    }

    /// Append the end-of-list marker and freeze the range.
    pub fn close(&mut self) -> Result<(), CommandBufferError> {
        self.append_word(Opcode::EndDisplayList.encode())?;
        self.open = false;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_closed(&self) -> bool {
        !self.open && !self.words.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of words in `[head, tail)`.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[Gfx] {
        &self.words
    }

    /// Virtual address of `head`.
    pub fn head_addr(&self) -> usize {
        self.words.as_ptr() as usize
    }

    /// Size of `[head, tail)` in bytes.
    pub fn byte_len(&self) -> usize {
        self.words.len() * Gfx::SIZE
    }
}

impl<const N: usize> CommandSink for CommandBuffer<N> {
    fn append(&mut self, op: Opcode) -> Result<(), CommandBufferError> {
        self.append_word(op.encode())
    }

    fn remaining(&self) -> usize {
        N - self.words.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_before_open_is_rejected() {
        let mut buffer = CommandBuffer::<4>::new();
        assert_eq!(
            buffer.append(Opcode::PipeSync),
            Err(CommandBufferError::Closed)
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn close_appends_end_marker() {
        let mut buffer = CommandBuffer::<4>::new();
        buffer.open();
        buffer.append(Opcode::FullSync).unwrap();
        buffer.close().unwrap();

        assert!(buffer.is_closed());
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.words()[1], Opcode::EndDisplayList.encode());
        assert_eq!(buffer.byte_len(), 16);
    }

    #[test]
    fn closed_buffer_rejects_appends() {
        let mut buffer = CommandBuffer::<4>::new();
        buffer.open();
        buffer.close().unwrap();
        assert_eq!(
            buffer.append(Opcode::PipeSync),
            Err(CommandBufferError::Closed)
        );
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn reopen_rewinds_cursor() {
        let mut buffer = CommandBuffer::<4>::new();
        buffer.open();
        buffer.append(Opcode::PipeSync).unwrap();
        buffer.close().unwrap();

        buffer.open();
        assert!(buffer.is_empty());
        assert_eq!(buffer.remaining(), 4);
    }
}
