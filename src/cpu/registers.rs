use bitflags::bitflags;

bitflags!(
    /// The Flag register (low nibble of AF) consists of the following bits:
    /// Zero Flag (Z) - Set when the result of a math operation is zero, or two values match when using the CP instruction.
    /// Subtract Flag (N) - This bit is set if a subtraction was performed in the last math instruction.
    /// Half Carry Flag (H) - This bit is set if a carry occurred from the lower nibble in the last math operation.
    /// Carry Flag (C) - This bit is set if a carry occurred from the last math operation or if register A is the smaller value when executing the CP instruction.
    /// The low nibble of F is hardwired to zero and is never set by any instruction.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Flags: u8 {
        const ZERO       = 0b1000_0000;
        const SUBTRACT   = 0b0100_0000;
        const HALF_CARRY = 0b0010_0000;
        const CARRY      = 0b0001_0000;
    }
);

/// Reg8 represents an 8-bit register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg8 {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
}

/// Reg16 represents a 16-bit register pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg16 {
    AF,
    BC,
    DE,
    HL,
    SP,
    PC,
}

/// The Gameboy has eight 8-bit registers (six of which pair up with the
/// accumulator/flags and stack/program counter to form four 16-bit views),
/// plus the dedicated 16-bit SP and PC.
#[derive(Clone, Debug)]
pub struct Registers {
    a: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    f: Flags,
    h: u8,
    l: u8,
    sp: u16,
    pc: u16,
}

impl Registers {
    pub fn new() -> Self {
        Self {
            a: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            f: Flags::empty(),
            h: 0,
            l: 0,
            sp: 0,
            pc: 0,
        }
    }

    /// Install the documented post-boot-ROM register values, used when the
    /// boot ROM is skipped (see spec.md §6 "Post-boot register values").
    pub fn power_up(&mut self) -> &mut Self {
        self.write16(Reg16::AF, 0x01B0);
        self.write16(Reg16::BC, 0x0013);
        self.write16(Reg16::DE, 0x00D8);
        self.write16(Reg16::HL, 0x014D);
        self.sp = 0xFFFE;
        self.pc = 0x0100;
        self
    }

    pub fn read8(&self, reg: Reg8) -> u8 {
        match reg {
            Reg8::A => self.a,
            Reg8::B => self.b,
            Reg8::C => self.c,
            Reg8::D => self.d,
            Reg8::E => self.e,
            Reg8::H => self.h,
            Reg8::L => self.l,
        }
    }

    pub fn write8(&mut self, reg: Reg8, value: u8) {
        match reg {
            Reg8::A => self.a = value,
            Reg8::B => self.b = value,
            Reg8::C => self.c = value,
            Reg8::D => self.d = value,
            Reg8::E => self.e = value,
            Reg8::H => self.h = value,
            Reg8::L => self.l = value,
        }
    }

    /// Read the flags register. The low nibble is always zero.
    pub fn flags(&self) -> Flags {
        self.f
    }

    /// Overwrite the flags register wholesale. The low nibble of the
    /// written byte is masked to zero, per spec.md's `F & 0x0F == 0` invariant.
    pub fn set_flags(&mut self, flags: Flags) {
        self.f = Flags::from_bits_truncate(flags.bits() & 0xF0);
    }

    pub fn read16(&self, reg: Reg16) -> u16 {
        match reg {
            Reg16::AF => ((self.a as u16) << 8) | (self.f.bits() as u16),
            Reg16::BC => ((self.b as u16) << 8) | (self.c as u16),
            Reg16::DE => ((self.d as u16) << 8) | (self.e as u16),
            Reg16::HL => ((self.h as u16) << 8) | (self.l as u16),
            Reg16::SP => self.sp,
            Reg16::PC => self.pc,
        }
    }

    pub fn write16(&mut self, reg: Reg16, value: u16) {
        match reg {
            Reg16::AF => {
                self.a = (value >> 8) as u8;
                self.f = Flags::from_bits_truncate((value as u8) & 0xF0);
            }
            Reg16::BC => {
                self.b = (value >> 8) as u8;
                self.c = value as u8;
            }
            Reg16::DE => {
                self.d = (value >> 8) as u8;
                self.e = value as u8;
            }
            Reg16::HL => {
                self.h = (value >> 8) as u8;
                self.l = value as u8;
            }
            Reg16::SP => self.sp = value,
            Reg16::PC => self.pc = value,
        }
    }

    /// Read PC and advance it past a one-byte opcode. Used by the fetch step.
    pub fn fetch_advance(&mut self) -> u16 {
        let pc = self.pc;
        self.pc = pc.wrapping_add(1);
        pc
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_low_nibble_always_zero() {
        let mut regs = Registers::new();
        for v in 0u8..=255 {
            regs.set_flags(Flags::from_bits_truncate(v));
            assert_eq!(regs.flags().bits() & 0x0F, 0);
            assert_eq!(regs.flags().bits(), v & 0xF0);
        }
    }

    #[test]
    fn af_pop_masks_low_nibble() {
        let mut regs = Registers::new();
        regs.write16(Reg16::AF, 0x12FF);
        assert_eq!(regs.read16(Reg16::AF), 0x12F0);
    }

    #[test]
    fn power_up_matches_documented_values() {
        let mut regs = Registers::new();
        regs.power_up();
        assert_eq!(regs.read8(Reg8::A), 0x01);
        assert_eq!(regs.flags().bits(), 0xB0);
        assert_eq!(regs.read16(Reg16::BC), 0x0013);
        assert_eq!(regs.read16(Reg16::DE), 0x00D8);
        assert_eq!(regs.read16(Reg16::HL), 0x014D);
        assert_eq!(regs.read16(Reg16::SP), 0xFFFE);
        assert_eq!(regs.read16(Reg16::PC), 0x0100);
    }

    #[test]
    fn register_pairs_alias_halves() {
        let mut regs = Registers::new();
        regs.write8(Reg8::B, 0xAB);
        regs.write8(Reg8::C, 0xCD);
        assert_eq!(regs.read16(Reg16::BC), 0xABCD);
        regs.write16(Reg16::HL, 0x1234);
        assert_eq!(regs.read8(Reg8::H), 0x12);
        assert_eq!(regs.read8(Reg8::L), 0x34);
    }
}
