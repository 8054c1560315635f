//! The base (non-CB) 256-entry opcode table, decoded with the standard
//! x/y/z/p/q field split (`opcode = xx yyy zzz`, `y = pp q`) rather than a
//! literal 256-arm match — the regular blocks (loads, ALU) fall out of the
//! register-table indices directly.

use super::alu;
use super::registers::{Flags, Reg16, Reg8};
use super::Cpu;

impl Cpu {
    /// Decode and run one base-table instruction. Returns `None` for the
    /// eleven byte values (0xD3/0xDB/0xDD/0xE3/0xE4/0xEB/0xEC/0xED/0xF4/0xFC/
    /// 0xFD) that correspond to no real instruction, so `step()` can report
    /// a `DecodeError` rather than silently treating them as a NOP.
    pub(super) fn execute(&mut self, opcode: u8) -> Option<u32> {
        let x = opcode >> 6;
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;
        let p = y >> 1;
        let q = y & 1;

        match x {
            0 => Some(self.execute_x0(y, z, p, q)),
            1 => Some(if z == 6 && y == 6 {
                self.halted = true;
                4
            } else {
                let val = self.reg8_get(z);
                self.reg8_set(y, val);
                if z == 6 || y == 6 {
                    8
                } else {
                    4
                }
            }),
            2 => {
                let val = self.reg8_get(z);
                let cycles = if z == 6 { 8 } else { 4 };
                self.alu_op(y, val);
                Some(cycles)
            }
            3 => self.execute_x3(y, z, p, q),
            _ => unreachable!(),
        }
    }

    fn execute_x0(&mut self, y: u8, z: u8, p: u8, q: u8) -> u32 {
        match z {
            0 => match y {
                0 => 4, // NOP
                1 => {
                    // LD (nn),SP
                    let addr = self.fetch16();
                    let sp = self.regs.read16(Reg16::SP);
                    self.write16(addr, sp);
                    20
                }
                2 => {
                    // STOP: a synchronous two-byte NOP (spec.md §9).
                    self.fetch8();
                    4
                }
                3 => {
                    // JR d
                    let d = self.fetch8() as i8;
                    self.jr(d);
                    12
                }
                4..=7 => {
                    // JR cc,d
                    let d = self.fetch8() as i8;
                    if self.condition(y - 4) {
                        self.jr(d);
                        12
                    } else {
                        8
                    }
                }
                _ => unreachable!(),
            },
            1 => {
                if q == 0 {
                    let nn = self.fetch16();
                    self.rp_set(p, nn);
                    12
                } else {
                    let rr = self.rp_get(p);
                    let hl = self.regs.read16(Reg16::HL);
                    let (result, mut flags) = alu::add16(hl, rr);
                    flags.set(Flags::ZERO, self.regs.flags().contains(Flags::ZERO));
                    self.regs.write16(Reg16::HL, result);
                    self.regs.set_flags(flags);
                    8
                }
            }
            2 => {
                let hl = self.regs.read16(Reg16::HL);
                if q == 0 {
                    let addr = match p {
                        0 => self.regs.read16(Reg16::BC),
                        1 => self.regs.read16(Reg16::DE),
                        2 | 3 => hl,
                        _ => unreachable!(),
                    };
                    let a = self.regs.read8(Reg8::A);
                    self.write8(addr, a);
                    if p == 2 {
                        self.regs.write16(Reg16::HL, hl.wrapping_add(1));
                    } else if p == 3 {
                        self.regs.write16(Reg16::HL, hl.wrapping_sub(1));
                    }
                } else {
                    let addr = match p {
                        0 => self.regs.read16(Reg16::BC),
                        1 => self.regs.read16(Reg16::DE),
                        2 | 3 => hl,
                        _ => unreachable!(),
                    };
                    let val = self.read8(addr);
                    self.regs.write8(Reg8::A, val);
                    if p == 2 {
                        self.regs.write16(Reg16::HL, hl.wrapping_add(1));
                    } else if p == 3 {
                        self.regs.write16(Reg16::HL, hl.wrapping_sub(1));
                    }
                }
                8
            }
            3 => {
                let rr = self.rp_get(p);
                if q == 0 {
                    self.rp_set(p, rr.wrapping_add(1));
                } else {
                    self.rp_set(p, rr.wrapping_sub(1));
                }
                8
            }
            4 => {
                let carry = self.regs.flags().contains(Flags::CARRY);
                let v = self.reg8_get(y);
                let (result, mut flags) = alu::inc8(v);
                flags.set(Flags::CARRY, carry);
                self.reg8_set(y, result);
                self.regs.set_flags(flags);
                if y == 6 {
                    12
                } else {
                    4
                }
            }
            5 => {
                let carry = self.regs.flags().contains(Flags::CARRY);
                let v = self.reg8_get(y);
                let (result, mut flags) = alu::dec8(v);
                flags.set(Flags::CARRY, carry);
                self.reg8_set(y, result);
                self.regs.set_flags(flags);
                if y == 6 {
                    12
                } else {
                    4
                }
            }
            6 => {
                let n = self.fetch8();
                self.reg8_set(y, n);
                if y == 6 {
                    12
                } else {
                    8
                }
            }
            7 => {
                self.execute_accumulator_misc(y);
                4
            }
            _ => unreachable!(),
        }
    }

    fn execute_accumulator_misc(&mut self, y: u8) {
        let a = self.regs.read8(Reg8::A);
        let carry_in = self.regs.flags().contains(Flags::CARRY);
        match y {
            0 => {
                let (r, f) = alu::rotate_a(a, alu::RotateKind::Left, carry_in);
                self.regs.write8(Reg8::A, r);
                self.regs.set_flags(f);
            }
            1 => {
                let (r, f) = alu::rotate_a(a, alu::RotateKind::Right, carry_in);
                self.regs.write8(Reg8::A, r);
                self.regs.set_flags(f);
            }
            2 => {
                let (r, f) = alu::rotate_a(a, alu::RotateKind::LeftThroughCarry, carry_in);
                self.regs.write8(Reg8::A, r);
                self.regs.set_flags(f);
            }
            3 => {
                let (r, f) = alu::rotate_a(a, alu::RotateKind::RightThroughCarry, carry_in);
                self.regs.write8(Reg8::A, r);
                self.regs.set_flags(f);
            }
            4 => {
                let (r, f) = alu::daa(a, self.regs.flags());
                self.regs.write8(Reg8::A, r);
                self.regs.set_flags(f);
            }
            5 => {
                let (r, mut f) = alu::cpl(a);
                f.set(Flags::ZERO, self.regs.flags().contains(Flags::ZERO));
                f.set(Flags::CARRY, self.regs.flags().contains(Flags::CARRY));
                self.regs.write8(Reg8::A, r);
                self.regs.set_flags(f);
            }
            6 => {
                let mut f = self.regs.flags();
                f.remove(Flags::SUBTRACT | Flags::HALF_CARRY);
                f.insert(Flags::CARRY);
                self.regs.set_flags(f);
            }
            7 => {
                let mut f = self.regs.flags();
                f.remove(Flags::SUBTRACT | Flags::HALF_CARRY);
                f.toggle(Flags::CARRY);
                self.regs.set_flags(f);
            }
            _ => unreachable!(),
        }
    }

    fn jr(&mut self, d: i8) {
        let pc = self.regs.read16(Reg16::PC);
        self.regs.write16(Reg16::PC, pc.wrapping_add(d as i16 as u16));
    }

    /// ALU[y] A,val: ADD, ADC, SUB, SBC, AND, XOR, OR, CP.
    fn alu_op(&mut self, y: u8, val: u8) {
        let a = self.regs.read8(Reg8::A);
        let carry_in = self.regs.flags().contains(Flags::CARRY) as u8;
        let (result, flags) = match y {
            0 => alu::add8(a, val, 0),
            1 => alu::add8(a, val, carry_in),
            2 => alu::sub8(a, val, 0),
            3 => alu::sub8(a, val, carry_in),
            4 => alu::and8(a, val),
            5 => alu::xor8(a, val),
            6 => alu::or8(a, val),
            7 => {
                let f = alu::cp8(a, val);
                self.regs.set_flags(f);
                return;
            }
            _ => unreachable!(),
        };
        self.regs.write8(Reg8::A, result);
        self.regs.set_flags(flags);
    }

    fn execute_x3(&mut self, y: u8, z: u8, p: u8, q: u8) -> Option<u32> {
        let cycles = match z {
            0 => match y {
                0..=3 => {
                    if self.condition(y) {
                        let pc = self.pop16();
                        self.regs.write16(Reg16::PC, pc);
                        20
                    } else {
                        8
                    }
                }
                4 => {
                    let n = self.fetch8();
                    let a = self.regs.read8(Reg8::A);
                    self.write8(0xFF00 + n as u16, a);
                    12
                }
                5 => {
                    let d = self.fetch8() as i8;
                    let sp = self.regs.read16(Reg16::SP);
                    let (result, flags) = alu::add_sp_e8(sp, d);
                    self.regs.write16(Reg16::SP, result);
                    self.regs.set_flags(flags);
                    16
                }
                6 => {
                    let n = self.fetch8();
                    let val = self.read8(0xFF00 + n as u16);
                    self.regs.write8(Reg8::A, val);
                    12
                }
                7 => {
                    let d = self.fetch8() as i8;
                    let sp = self.regs.read16(Reg16::SP);
                    let (result, flags) = alu::add_sp_e8(sp, d);
                    self.regs.write16(Reg16::HL, result);
                    self.regs.set_flags(flags);
                    12
                }
                _ => unreachable!(),
            },
            1 => {
                if q == 0 {
                    let val = self.pop16();
                    self.rp2_set(p, val);
                    12
                } else {
                    match p {
                        0 => {
                            let pc = self.pop16();
                            self.regs.write16(Reg16::PC, pc);
                            16
                        }
                        1 => {
                            let pc = self.pop16();
                            self.regs.write16(Reg16::PC, pc);
                            self.ime = true;
                            self.ime_delay = 0;
                            16
                        }
                        2 => {
                            let hl = self.regs.read16(Reg16::HL);
                            self.regs.write16(Reg16::PC, hl);
                            4
                        }
                        3 => {
                            let hl = self.regs.read16(Reg16::HL);
                            self.regs.write16(Reg16::SP, hl);
                            8
                        }
                        _ => unreachable!(),
                    }
                }
            }
            2 => match y {
                0..=3 => {
                    let nn = self.fetch16();
                    if self.condition(y) {
                        self.regs.write16(Reg16::PC, nn);
                        16
                    } else {
                        12
                    }
                }
                4 => {
                    let c = self.regs.read8(Reg8::C);
                    let a = self.regs.read8(Reg8::A);
                    self.write8(0xFF00 + c as u16, a);
                    8
                }
                5 => {
                    let addr = self.fetch16();
                    let a = self.regs.read8(Reg8::A);
                    self.write8(addr, a);
                    16
                }
                6 => {
                    let c = self.regs.read8(Reg8::C);
                    let val = self.read8(0xFF00 + c as u16);
                    self.regs.write8(Reg8::A, val);
                    8
                }
                7 => {
                    let addr = self.fetch16();
                    let val = self.read8(addr);
                    self.regs.write8(Reg8::A, val);
                    16
                }
                _ => unreachable!(),
            },
            3 => match y {
                0 => {
                    let nn = self.fetch16();
                    self.regs.write16(Reg16::PC, nn);
                    16
                }
                1 => unreachable!("0xCB is intercepted before execute() is called"),
                // 0xD3/0xDB/0xE3/0xEB have no defined instruction.
                2 | 3 | 4 | 5 => return None,
                6 => {
                    self.ime = false;
                    self.ime_delay = 0;
                    4
                }
                7 => {
                    self.ime_delay = 2;
                    4
                }
                _ => unreachable!(),
            },
            4 => {
                // 0xE4/0xEC/0xF4/0xFC have no defined instruction.
                if y > 3 {
                    return None;
                }
                let nn = self.fetch16();
                if self.condition(y) {
                    let pc = self.regs.read16(Reg16::PC);
                    self.push16(pc);
                    self.regs.write16(Reg16::PC, nn);
                    24
                } else {
                    12
                }
            }
            5 => {
                if q == 0 {
                    let val = self.rp2_get(p);
                    self.push16(val);
                    16
                } else if p == 0 {
                    let nn = self.fetch16();
                    let pc = self.regs.read16(Reg16::PC);
                    self.push16(pc);
                    self.regs.write16(Reg16::PC, nn);
                    24
                } else {
                    // 0xDD/0xED/0xFD have no defined instruction.
                    return None;
                }
            }
            6 => {
                let n = self.fetch8();
                self.alu_op(y, n);
                8
            }
            7 => {
                let pc = self.regs.read16(Reg16::PC);
                self.push16(pc);
                self.regs.write16(Reg16::PC, (y as u16) * 8);
                16
            }
            _ => unreachable!(),
        };
        Some(cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mbc::rom_only::RomOnly;
    use crate::interrupts::InterruptController;
    use crate::joypad::Joypad;
    use crate::mmu::Mmu;
    use crate::ppu::Ppu;
    use crate::timer::Timer;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn cpu_with_rom(rom: Vec<u8>) -> Cpu {
        let if_ = Rc::new(RefCell::new(InterruptController::new()));
        let ppu = Rc::new(RefCell::new(Ppu::new(if_.clone())));
        let timer = Rc::new(RefCell::new(Timer::new(if_.clone())));
        let joypad = Rc::new(RefCell::new(Joypad::new(if_.clone())));
        let mut full_rom = rom;
        full_rom.resize(0x8000, 0);
        let mmu = Rc::new(RefCell::new(Mmu::new(
            Box::new(RomOnly::new(full_rom, 0)),
            None,
            if_.clone(),
            ppu,
            timer,
            joypad,
        )));
        let mut cpu = Cpu::new(mmu, if_);
        cpu.power_up();
        cpu
    }

    #[test]
    fn cycle_counts_are_always_a_multiple_of_four() {
        let mut rom = vec![0u8; 0x200];
        rom[0x0100] = 0x00; // NOP
        rom[0x0101] = 0x04; // INC B
        rom[0x0102] = 0xC3; // JP nn
        rom[0x0103] = 0x00;
        rom[0x0104] = 0x01;
        let mut cpu = cpu_with_rom(rom);
        for _ in 0..3 {
            assert_eq!(cpu.step().unwrap() % 4, 0);
        }
    }

    #[test]
    fn ld_r_hl_and_ld_hl_r_round_trip() {
        let mut rom = vec![0u8; 0x200];
        rom[0x0100] = 0x21; // LD HL,0xC000
        rom[0x0101] = 0x00;
        rom[0x0102] = 0xC0;
        rom[0x0103] = 0x3E; // LD A,0x99
        rom[0x0104] = 0x99;
        rom[0x0105] = 0x77; // LD (HL),A
        rom[0x0106] = 0x46; // LD B,(HL)
        let mut cpu = cpu_with_rom(rom);
        for _ in 0..4 {
            cpu.step().unwrap();
        }
        assert_eq!(cpu.regs.read8(Reg8::B), 0x99);
    }

    #[test]
    fn jp_cc_not_taken_costs_12() {
        let mut rom = vec![0u8; 0x200];
        rom[0x0100] = 0xCA; // JP Z,nn (Z clear after power-up? F=0xB0 has Z set)
        rom[0x0101] = 0x00;
        rom[0x0102] = 0x02;
        let mut cpu = cpu_with_rom(rom);
        // Force Z clear so the branch is not taken.
        let mut f = cpu.regs.flags();
        f.remove(Flags::ZERO);
        cpu.regs.set_flags(f);
        assert_eq!(cpu.step().unwrap(), 12);
        assert_eq!(cpu.regs.read16(Reg16::PC), 0x0103);
    }

    #[test]
    fn rst_pushes_return_address_and_jumps() {
        let mut rom = vec![0u8; 0x200];
        rom[0x0100] = 0xEF; // RST 0x28
        let mut cpu = cpu_with_rom(rom);
        let cycles = cpu.step().unwrap();
        assert_eq!(cycles, 16);
        assert_eq!(cpu.regs.read16(Reg16::PC), 0x0028);
        let sp = cpu.regs.read16(Reg16::SP);
        assert_eq!(cpu.read16(sp), 0x0101);
    }

    #[test]
    fn undefined_opcode_reports_decode_error() {
        let mut rom = vec![0u8; 0x200];
        rom[0x0100] = 0xD3; // has no defined instruction
        let mut cpu = cpu_with_rom(rom);
        let err = cpu.step().unwrap_err();
        assert_eq!(err.pc, 0x0100);
        assert_eq!(err.opcode, 0xD3);
        assert!(!err.cb_prefixed);
    }
}
