use rand::rngs::StdRng;

use crate::error::Fault;
use crate::opcode::Opcode;
use crate::operations::*;
use crate::state::{Keypad, State};

/// An opcode handler: one pure transition from the fetched state (program
/// counter already advanced) to the next.
pub type Operation = fn(&dyn Opcode, &State, Keypad, &mut StdRng) -> Result<State, Fault>;

/// Selects the handler for an opcode.
///
/// The top nibble picks one of 16 families. Four families carry a secondary
/// code: 0x0, 0x8 and 0xE key on the lowest nibble, 0xF on the lowest byte.
/// Unmapped secondary codes resolve to a no-op.
pub fn from_op(op: &dyn Opcode) -> Operation {
    match op.nibbles().0 {
        0x0 => match op.n() {
            0x0 => clr,
            0xE => rts,
            _ => noop,
        },
        0x1 => jump,
        0x2 => call,
        0x3 => ske,
        0x4 => skne,
        0x5 => skre,
        0x6 => load,
        0x7 => add,
        0x8 => match op.n() {
            0x0 => mv,
            0x1 => or,
            0x2 => and,
            0x3 => xor,
            0x4 => addr,
            0x5 => sub,
            0x6 => shr,
            0x7 => subn,
            0xE => shl,
            _ => noop,
        },
        0x9 => skrne,
        0xA => loadi,
        0xB => jumpi,
        0xC => rand,
        0xD => draw,
        0xE => match op.n() {
            0xE => skpr,
            0x1 => skup,
            _ => noop,
        },
        0xF => match op.nn() {
            0x07 => moved,
            0x0A => keyd,
            0x15 => loads,
            0x18 => ld,
            0x1E => addi,
            0x29 => ldspr,
            0x33 => bcd,
            0x55 => stor,
            0x65 => read,
            _ => noop,
        },
        // a nibble only has 16 values
        _ => noop,
    }
}
