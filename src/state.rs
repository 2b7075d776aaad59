use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, GLYPHS, GLYPH_START, KEY_COUNT, MEMORY_SIZE, PROGRAM_START,
    STACK_DEPTH,
};

/// A snapshot of the machine's internal state
///
/// ## Registers
/// - (v) 16 general-purpose 8-bit registers V0..VF
///     - VF doubles as the carry/borrow/collision flag and is clobbered as a
///       side effect by the ADD/SUB/shift/draw instructions
/// - (i) a 16-bit index register used for memory addressing
/// - (pc) a 16-bit program counter
/// - (sp) the call stack pointer, in 0..=16
///
/// ## Timers
/// - two 8-bit countdown timers (delay & sound), each decremented once per
///   executed cycle and floored at zero
///
/// ## Memory
/// - 4096 bytes of addressable memory; the glyph table is baked in at
///   0x050 and ROMs are copied in at 0x200
/// - a 16-entry stack of return addresses
/// - a 64x32 1-bit frame buffer, only ever mutated by sprite XOR or a bulk
///   clear
///
/// Everything is plain owned data, so a snapshot is `Copy` and a cycle can be
/// expressed as a pure `(State, keypad) -> State` transition.
#[derive(Copy, Clone)]
pub struct State {
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub stack: [u16; STACK_DEPTH],
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
}

impl State {
    /// A freshly-reset machine state: everything zeroed, glyph table written,
    /// program counter at the program origin.
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        let glyph_start = GLYPH_START as usize;
        memory[glyph_start..glyph_start + GLYPHS.len()].copy_from_slice(&GLYPHS);

        State {
            v: [0; 16],
            i: 0,
            pc: PROGRAM_START,
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            stack: [0; STACK_DEPTH],
            memory,
            frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// The frame buffer is indexed as `[y][x]`; cells are 0 or 1.
pub type FrameBuffer = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

/// Pressed status of the 16 keypad keys, indexed by key value.
pub type Keypad = [bool; KEY_COUNT];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_bakes_in_glyphs() {
        let state = State::new();
        // the 0 glyph's first row
        assert_eq!(state.memory[GLYPH_START as usize], 0xF0);
        assert_eq!(
            state.memory[GLYPH_START as usize..GLYPH_START as usize + 80],
            GLYPHS[..]
        );
        // nothing else is written
        assert!(state.memory[..GLYPH_START as usize].iter().all(|&b| b == 0));
        assert!(state.memory[GLYPH_START as usize + 80..]
            .iter()
            .all(|&b| b == 0));
    }

    #[test]
    fn test_new_state_starts_at_program_origin() {
        let state = State::new();
        assert_eq!(state.pc, PROGRAM_START);
        assert_eq!(state.sp, 0);
        assert_eq!(state.i, 0);
    }
}
