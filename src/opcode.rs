/// # Opcodes
///
/// Opcodes are 16-bit words fetched big-endian from memory. The top nibble
/// picks an instruction family; the remaining fields carry operands:
/// - `[_nnn]` a 12-bit memory address
/// - `[_x__]` the register Vx (or the range V0..Vx)
/// - `[__y_]` the register Vy
/// - `[__nn]` an immediate byte
/// - `[___n]` a nibble count (e.g. sprite rows)
///
/// Which fields are meaningful depends on the family; extraction never fails
/// because every field is masked to its width.
pub trait Opcode {
    /// The opcode split into its four component nibbles, high to low.
    fn nibbles(&self) -> (u8, u8, u8, u8);

    /// The second nibble: the Vx register selector.
    /// `[_x__]`
    fn x(&self) -> u8;

    /// The third nibble: the Vy register selector.
    /// `[__y_]`
    fn y(&self) -> u8;

    /// The lowest nibble.
    /// `[___n]`
    fn n(&self) -> u8;

    /// The lowest byte.
    /// `[__nn]`
    fn nn(&self) -> u8;

    /// The low 12 bits: an absolute address.
    /// `[_nnn]`
    fn nnn(&self) -> u16;
}

impl Opcode for u16 {
    fn nibbles(&self) -> (u8, u8, u8, u8) {
        ((self >> 12) as u8, self.x(), self.y(), self.n())
    }

    fn x(&self) -> u8 {
        ((self & 0x0F00) >> 8) as u8
    }

    fn y(&self) -> u8 {
        ((self & 0x00F0) >> 4) as u8
    }

    fn n(&self) -> u8 {
        (self & 0x000F) as u8
    }

    fn nn(&self) -> u8 {
        (self & 0x00FF) as u8
    }

    fn nnn(&self) -> u16 {
        self & 0x0FFF
    }
}

#[cfg(test)]
mod test_opcode {
    use super::*;

    #[test]
    fn test_nibbles() {
        let op: u16 = 0xD123;
        assert_eq!(op.nibbles(), (0xD, 0x1, 0x2, 0x3));
    }

    #[test]
    fn test_x() {
        assert_eq!(0xD123u16.x(), 0x1);
    }

    #[test]
    fn test_y() {
        assert_eq!(0xD123u16.y(), 0x2);
    }

    #[test]
    fn test_n() {
        assert_eq!(0xD123u16.n(), 0x3);
    }

    #[test]
    fn test_nn() {
        assert_eq!(0xD123u16.nn(), 0x23);
    }

    #[test]
    fn test_nnn() {
        assert_eq!(0xD123u16.nnn(), 0x123);
    }
}
