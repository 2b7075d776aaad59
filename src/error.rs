use std::io;

use thiserror::Error;

/// Errors surfaced while loading a ROM.
///
/// Both variants are recoverable: the machine is left in its freshly-reset
/// state (glyph table in place, everything else zeroed) and the caller may
/// retry with a different source.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source could not be opened or read.
    #[error("failed to read ROM: {0}")]
    Io(#[from] io::Error),

    /// The payload would write past the end of memory. Nothing is copied.
    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },
}

/// Fatal execution faults surfaced from [`crate::Chip8::cycle`].
///
/// A ROM that runs the program counter off the end of memory, unbalances the
/// call stack, or points the index register past 0xFFF has left the domain of
/// behavior the reference hardware defines. These are surfaced rather than
/// silently wrapped; the machine is not usable afterwards without a reload.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The program counter points past the last full opcode in memory.
    #[error("program counter {0:#06X} points past the end of memory")]
    ProgramCounter(u16),

    /// More than 16 nested calls.
    #[error("call stack overflow: more than 16 nested calls")]
    StackOverflow,

    /// A return with no matching call.
    #[error("return with an empty call stack")]
    StackUnderflow,

    /// An index-register relative access would run past the end of memory.
    #[error("memory access out of bounds at address {0:#06X}")]
    MemoryOutOfBounds(u16),
}
