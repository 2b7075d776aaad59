//! One function per opcode.
//!
//! Every handler is a pure transition from one [`State`] to the next. The
//! program counter has already been advanced past the opcode by the fetch, so
//! handlers never bump it themselves: skip variants add a further 2, jumps
//! and calls overwrite it, and `wait-key` rewinds it by 2 to re-execute.

use rand::rngs::StdRng;
use rand::Rng;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, GLYPH_HEIGHT, GLYPH_START, MEMORY_SIZE, STACK_DEPTH,
};
use crate::error::Fault;
use crate::opcode::Opcode;
use crate::state::{Keypad, State};

/// Fallback for every unmapped secondary code.
pub fn noop(
    _op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    Ok(*state)
}

/// clear the frame buffer
pub fn clr(
    _op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    Ok(State {
        frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        ..*state
    })
}

/// PC = STACK.pop()
pub fn rts(
    _op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    if state.sp == 0 {
        return Err(Fault::StackUnderflow);
    }
    let sp = state.sp - 1;
    Ok(State {
        pc: state.stack[sp as usize],
        sp,
        ..*state
    })
}

/// PC = nnn
pub fn jump(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    Ok(State {
        pc: op.nnn(),
        ..*state
    })
}

/// STACK.push(PC); PC = nnn
pub fn call(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    if state.sp as usize == STACK_DEPTH {
        return Err(Fault::StackOverflow);
    }
    let mut stack = state.stack;
    stack[state.sp as usize] = state.pc;
    Ok(State {
        pc: op.nnn(),
        sp: state.sp + 1,
        stack,
        ..*state
    })
}

/// if Vx == nn then skip the next instruction
pub fn ske(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    if state.v[op.x() as usize] == op.nn() {
        Ok(State {
            pc: state.pc + 2,
            ..*state
        })
    } else {
        Ok(*state)
    }
}

/// if Vx != nn then skip the next instruction
pub fn skne(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    if state.v[op.x() as usize] != op.nn() {
        Ok(State {
            pc: state.pc + 2,
            ..*state
        })
    } else {
        Ok(*state)
    }
}

/// if Vx == Vy then skip the next instruction
pub fn skre(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    if state.v[op.x() as usize] == state.v[op.y() as usize] {
        Ok(State {
            pc: state.pc + 2,
            ..*state
        })
    } else {
        Ok(*state)
    }
}

/// Vx = nn
pub fn load(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x() as usize] = op.nn();
    Ok(State { v, ..*state })
}

/// Vx += nn (wrapping, no flag)
pub fn add(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x() as usize] = v[op.x() as usize].wrapping_add(op.nn());
    Ok(State { v, ..*state })
}

/// Vx = Vy
pub fn mv(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x() as usize] = v[op.y() as usize];
    Ok(State { v, ..*state })
}

/// Vx |= Vy
pub fn or(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x() as usize] |= v[op.y() as usize];
    Ok(State { v, ..*state })
}

/// Vx &= Vy
pub fn and(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x() as usize] &= v[op.y() as usize];
    Ok(State { v, ..*state })
}

/// Vx ^= Vy
pub fn xor(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x() as usize] ^= v[op.y() as usize];
    Ok(State { v, ..*state })
}

/// Vx += Vy; VF = carry
pub fn addr(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let (res, carry) = state.v[op.x() as usize].overflowing_add(state.v[op.y() as usize]);
    let mut v = state.v;
    v[op.x() as usize] = res;
    v[0xF] = if carry { 1 } else { 0 };
    Ok(State { v, ..*state })
}

/// Vx -= Vy; VF = 1 iff no borrow
pub fn sub(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let (res, borrow) = state.v[op.x() as usize].overflowing_sub(state.v[op.y() as usize]);
    let mut v = state.v;
    v[op.x() as usize] = res;
    v[0xF] = if borrow { 0 } else { 1 };
    Ok(State { v, ..*state })
}

/// Vx >>= 1; VF = pre-shift LSB
pub fn shr(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let mut v = state.v;
    v[0xF] = v[op.x() as usize] & 0x1;
    v[op.x() as usize] >>= 1;
    Ok(State { v, ..*state })
}

/// Vx = Vy - Vx; VF = 1 iff no borrow
pub fn subn(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let (res, borrow) = state.v[op.y() as usize].overflowing_sub(state.v[op.x() as usize]);
    let mut v = state.v;
    v[op.x() as usize] = res;
    v[0xF] = if borrow { 0 } else { 1 };
    Ok(State { v, ..*state })
}

/// Vx <<= 1; VF = pre-shift MSB
pub fn shl(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let mut v = state.v;
    v[0xF] = v[op.x() as usize] >> 7;
    v[op.x() as usize] <<= 1;
    Ok(State { v, ..*state })
}

/// if Vx != Vy then skip the next instruction
pub fn skrne(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    if state.v[op.x() as usize] != state.v[op.y() as usize] {
        Ok(State {
            pc: state.pc + 2,
            ..*state
        })
    } else {
        Ok(*state)
    }
}

/// I = nnn
pub fn loadi(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    Ok(State {
        i: op.nnn(),
        ..*state
    })
}

/// PC = nnn + V0
pub fn jumpi(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    Ok(State {
        pc: op.nnn() + u16::from(state.v[0x0]),
        ..*state
    })
}

/// Vx = uniform_byte() & nn
pub fn rand(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    rng: &mut StdRng,
) -> Result<State, Fault> {
    let byte: u8 = rng.random();
    let mut v = state.v;
    v[op.x() as usize] = byte & op.nn();
    Ok(State { v, ..*state })
}

/// draw_sprite(x=Vx y=Vy rows=n)
///
/// XORs the n-byte sprite at memory[I..] into the frame buffer at
/// (Vx mod 64, Vy mod 32). Bits past the right or bottom edge are dropped
/// rather than wrapped. VF = 1 iff any in-bounds sprite bit lands on a cell
/// that is already set.
pub fn draw(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let rows = op.n() as usize;
    let base = state.i as usize;
    if base + rows > MEMORY_SIZE {
        return Err(Fault::MemoryOutOfBounds(state.i));
    }

    let origin_x = state.v[op.x() as usize] as usize % DISPLAY_WIDTH;
    let origin_y = state.v[op.y() as usize] as usize % DISPLAY_HEIGHT;
    let mut v = state.v;
    let mut frame_buffer = state.frame_buffer;
    v[0xF] = 0;

    for (row, &bits) in state.memory[base..base + rows].iter().enumerate() {
        let y = origin_y + row;
        if y >= DISPLAY_HEIGHT {
            break;
        }
        for col in 0..8 {
            let x = origin_x + col;
            if x >= DISPLAY_WIDTH {
                break;
            }
            let bit = (bits >> (7 - col)) & 1;
            v[0xF] |= bit & frame_buffer[y][x];
            frame_buffer[y][x] ^= bit;
        }
    }

    Ok(State {
        v,
        frame_buffer,
        ..*state
    })
}

/// if key[Vx] is down then skip the next instruction
pub fn skpr(
    op: &dyn Opcode,
    state: &State,
    keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    // key values are masked to the pad's 16 keys
    if keypad[(state.v[op.x() as usize] & 0xF) as usize] {
        Ok(State {
            pc: state.pc + 2,
            ..*state
        })
    } else {
        Ok(*state)
    }
}

/// if key[Vx] is up then skip the next instruction
pub fn skup(
    op: &dyn Opcode,
    state: &State,
    keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    if keypad[(state.v[op.x() as usize] & 0xF) as usize] {
        Ok(*state)
    } else {
        Ok(State {
            pc: state.pc + 2,
            ..*state
        })
    }
}

/// Vx = DT
pub fn moved(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x() as usize] = state.delay_timer;
    Ok(State { v, ..*state })
}

/// Vx = the lowest-indexed key currently down, busy-waiting otherwise
///
/// Level-triggered: a key that is still held from a previous capture triggers
/// again immediately. With no key down the program counter rewinds by 2 so
/// the instruction re-executes next cycle; timers keep ticking meanwhile.
pub fn keyd(
    op: &dyn Opcode,
    state: &State,
    keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    for (key, &pressed) in keypad.iter().enumerate() {
        if pressed {
            let mut v = state.v;
            v[op.x() as usize] = key as u8;
            return Ok(State { v, ..*state });
        }
    }
    Ok(State {
        pc: state.pc - 2,
        ..*state
    })
}

/// DT = Vx
pub fn loads(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    Ok(State {
        delay_timer: state.v[op.x() as usize],
        ..*state
    })
}

/// ST = Vx
pub fn ld(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    Ok(State {
        sound_timer: state.v[op.x() as usize],
        ..*state
    })
}

/// I += Vx
pub fn addi(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    Ok(State {
        i: state.i.wrapping_add(u16::from(state.v[op.x() as usize])),
        ..*state
    })
}

/// I = address of the glyph for the digit in Vx
pub fn ldspr(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    Ok(State {
        i: GLYPH_START + u16::from(state.v[op.x() as usize]) * GLYPH_HEIGHT,
        ..*state
    })
}

/// mem[I..I+3] = bcd(Vx)
pub fn bcd(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let base = state.i as usize;
    if base + 3 > MEMORY_SIZE {
        return Err(Fault::MemoryOutOfBounds(state.i));
    }
    let value = state.v[op.x() as usize];
    let mut memory = state.memory;
    memory[base] = value / 100;
    memory[base + 1] = (value / 10) % 10;
    memory[base + 2] = value % 10;
    Ok(State { memory, ..*state })
}

/// mem[I..=I+x] = V0..=Vx
pub fn stor(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let base = state.i as usize;
    let count = op.x() as usize + 1;
    if base + count > MEMORY_SIZE {
        return Err(Fault::MemoryOutOfBounds(state.i));
    }
    let mut memory = state.memory;
    memory[base..base + count].copy_from_slice(&state.v[..count]);
    Ok(State { memory, ..*state })
}

/// V0..=Vx = mem[I..=I+x]
pub fn read(
    op: &dyn Opcode,
    state: &State,
    _keypad: Keypad,
    _rng: &mut StdRng,
) -> Result<State, Fault> {
    let base = state.i as usize;
    let count = op.x() as usize + 1;
    if base + count > MEMORY_SIZE {
        return Err(Fault::MemoryOutOfBounds(state.i));
    }
    let mut v = state.v;
    v[..count].copy_from_slice(&state.memory[base..base + count]);
    Ok(State { v, ..*state })
}
