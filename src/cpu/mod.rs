//! Fetch-decode-execute for the base and 0xCB-prefixed opcode tables,
//! interrupt dispatch, and HALT/IME handling.
//!
//! The scheduler (not the CPU itself) decides each loop iteration whether
//! to service a pending interrupt, consume a halted tick, or call `step()`
//! — see spec.md §5's scheduling model. `Cpu` exposes the primitives that
//! loop needs: `step`, `service_interrupt`, `wake_from_halt_if_pending`,
//! and `tick_ei_delay`.

pub mod alu;
pub mod cb;
pub mod opcodes;
pub mod registers;

use std::{cell::RefCell, rc::Rc};

use log::trace;

use crate::error::DecodeError;
use crate::interrupts::InterruptController;
use crate::mmu::memory::Memory;
use crate::mmu::Mmu;

use registers::{Reg16, Reg8, Registers};

/// 8-register index ordering used throughout the base and CB opcode
/// tables: B, C, D, E, H, L, (HL), A.
const R8_ORDER: [Option<Reg8>; 8] = [
    Some(Reg8::B),
    Some(Reg8::C),
    Some(Reg8::D),
    Some(Reg8::E),
    Some(Reg8::H),
    Some(Reg8::L),
    None, // (HL)
    Some(Reg8::A),
];

const RP_ORDER: [Reg16; 4] = [Reg16::BC, Reg16::DE, Reg16::HL, Reg16::SP];
const RP2_ORDER: [Reg16; 4] = [Reg16::BC, Reg16::DE, Reg16::HL, Reg16::AF];

pub struct Cpu {
    regs: Registers,
    mmu: Rc<RefCell<Mmu>>,
    if_: Rc<RefCell<InterruptController>>,
    ime: bool,
    /// Counts down to 0 after EI; IME is set when it reaches 0. 0 means no
    /// pending enable.
    ime_delay: u8,
    halted: bool,
}

impl Cpu {
    pub fn new(mmu: Rc<RefCell<Mmu>>, if_: Rc<RefCell<InterruptController>>) -> Self {
        Self {
            regs: Registers::new(),
            mmu,
            if_,
            ime: false,
            ime_delay: 0,
            halted: false,
        }
    }

    /// Install the documented post-boot register values (spec.md §6),
    /// used when the boot ROM is skipped.
    pub fn power_up(&mut self) {
        self.regs.power_up();
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn ime(&self) -> bool {
        self.ime
    }

    fn read8(&self, addr: u16) -> u8 {
        self.mmu.borrow().read8(addr)
    }

    fn write8(&mut self, addr: u16, val: u8) {
        self.mmu.borrow_mut().write8(addr, val);
    }

    fn read16(&self, addr: u16) -> u16 {
        self.mmu.borrow().read16(addr)
    }

    fn write16(&mut self, addr: u16, val: u16) {
        self.mmu.borrow_mut().write16(addr, val);
    }

    fn fetch8(&mut self) -> u8 {
        let pc = self.regs.fetch_advance();
        self.read8(pc)
    }

    fn fetch16(&mut self) -> u16 {
        let lo = self.fetch8();
        let hi = self.fetch8();
        u16::from_le_bytes([lo, hi])
    }

    fn push16(&mut self, val: u16) {
        let sp = self.regs.read16(Reg16::SP).wrapping_sub(2);
        self.regs.write16(Reg16::SP, sp);
        self.write16(sp, val);
    }

    fn pop16(&mut self) -> u16 {
        let sp = self.regs.read16(Reg16::SP);
        let val = self.read16(sp);
        self.regs.write16(Reg16::SP, sp.wrapping_add(2));
        val
    }

    /// Read one of the eight `r[y]`/`r[z]` table slots; index 6 is `(HL)`.
    fn reg8_get(&self, idx: u8) -> u8 {
        match R8_ORDER[idx as usize] {
            Some(r) => self.regs.read8(r),
            None => self.read8(self.regs.read16(Reg16::HL)),
        }
    }

    fn reg8_set(&mut self, idx: u8, val: u8) {
        match R8_ORDER[idx as usize] {
            Some(r) => self.regs.write8(r, val),
            None => {
                let hl = self.regs.read16(Reg16::HL);
                self.write8(hl, val);
            }
        }
    }

    fn rp_get(&self, idx: u8) -> u16 {
        self.regs.read16(RP_ORDER[idx as usize])
    }

    fn rp_set(&mut self, idx: u8, val: u16) {
        self.regs.write16(RP_ORDER[idx as usize], val);
    }

    fn rp2_get(&self, idx: u8) -> u16 {
        self.regs.read16(RP2_ORDER[idx as usize])
    }

    fn rp2_set(&mut self, idx: u8, val: u16) {
        self.regs.write16(RP2_ORDER[idx as usize], val);
    }

    fn condition(&self, idx: u8) -> bool {
        use registers::Flags;
        let f = self.regs.flags();
        match idx {
            0 => !f.contains(Flags::ZERO),
            1 => f.contains(Flags::ZERO),
            2 => !f.contains(Flags::CARRY),
            3 => f.contains(Flags::CARRY),
            _ => unreachable!(),
        }
    }

    /// Fetch, decode and execute exactly one instruction. Returns the
    /// number of master-clock cycles it consumed (always a multiple of 4),
    /// or a `DecodeError` if the fetched byte has no defined instruction
    /// (spec.md §7) — the scheduler is expected to report this and stop.
    pub fn step(&mut self) -> Result<u32, DecodeError> {
        let pc = self.regs.read16(Reg16::PC);
        let opcode = self.fetch8();
        trace!("PC={pc:#06x} opcode={opcode:#04x}");
        if opcode == 0xCB {
            Ok(self.execute_cb())
        } else {
            self.execute(opcode).ok_or(DecodeError {
                pc,
                opcode,
                cb_prefixed: false,
            })
        }
    }

    /// After a `step()` that was EI, IME is armed two ticks later — once
    /// for the boundary right after EI, once more for the boundary after
    /// the instruction that follows it (spec.md §4.2 "EI delay").
    pub fn tick_ei_delay(&mut self) {
        if self.ime_delay > 0 {
            self.ime_delay -= 1;
            if self.ime_delay == 0 {
                self.ime = true;
            }
        }
    }

    /// HALT is cleared by any pending interrupt regardless of IME.
    pub fn wake_from_halt_if_pending(&mut self) {
        if self.halted && self.if_.borrow().any_pending() {
            self.halted = false;
        }
    }

    /// Service the highest-priority pending-and-enabled interrupt: push
    /// PC, jump to its vector, clear IME and its IF bit. Costs 20 cycles.
    /// Returns 0 if nothing was pending (the caller is expected to have
    /// already checked `ime() && any_pending()`).
    pub fn service_interrupt(&mut self) -> u32 {
        let interrupt = match self.if_.borrow().highest_priority() {
            Some(i) => i,
            None => return 0,
        };
        self.if_.borrow_mut().clear(interrupt);
        self.ime = false;
        self.halted = false;
        let pc = self.regs.read16(Reg16::PC);
        self.push16(pc);
        self.regs.write16(Reg16::PC, interrupt.vector());
        20
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mbc::rom_only::RomOnly;
    use crate::joypad::Joypad;
    use crate::ppu::Ppu;
    use crate::timer::Timer;

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
    fn power_up_without_boot_rom_then_nop() {
        let mut cpu = cpu_with_rom(vec![0u8; 0x200]);
        assert_eq!(cpu.regs.read16(Reg16::PC), 0x0100);
        assert_eq!(cpu.regs.read8(Reg8::A), 0x01);
        assert_eq!(cpu.regs.flags().bits(), 0xB0);
        let cycles = cpu.step().unwrap(); // fetches the 0x00 NOP at 0x0100
        assert_eq!(cpu.regs.read16(Reg16::PC), 0x0101);
        assert_eq!(cycles, 4);
    }

    #[test]
    fn tiny_program_sets_sp_writes_and_halts() {
        let mut rom = vec![0u8; 0x200];
        let program = [
            0x31, 0xFE, 0xFF, // LD SP,0xFFFE
            0x21, 0x00, 0xC0, // LD HL,0xC000
            0x36, 0x42, // LD (HL),0x42
            0x3E, 0x42, // LD A,0x42
            0xBE, // CP (HL)
            0xCA, 0x0F, 0x01, // JP Z,0x010F
            0x76, // HALT (0x010E, skipped by the jump)
            0x76, // HALT (0x010F, the jump target)
        ];
        rom[0x0100..0x0100 + program.len()].copy_from_slice(&program);
        let mut cpu = cpu_with_rom(rom);
        for _ in 0..7 {
            cpu.step().unwrap();
        }
        assert_eq!(cpu.regs.read16(Reg16::PC), 0x0110);
        assert!(cpu.halted());
        assert_eq!(cpu.read8(0xC000), 0x42);
    }

    #[test]
    fn interrupt_service_pushes_pc_and_jumps_to_vector() {
        let mut cpu = cpu_with_rom(vec![0u8; 0x200]);
        cpu.if_.borrow_mut().set_ie_raw(0x01);
        cpu.if_.borrow_mut().request(crate::interrupts::Interrupt::VBlank);
        cpu.ime = true;
        cpu.regs.write16(Reg16::PC, 0x1234);
        let cycles = cpu.service_interrupt();
        assert_eq!(cycles, 20);
        assert_eq!(cpu.regs.read16(Reg16::PC), 0x0040);
        assert!(!cpu.ime());
        assert_eq!(cpu.if_.borrow().if_raw() & 0x01, 0);
        let sp = cpu.regs.read16(Reg16::SP);
        assert_eq!(cpu.read16(sp), 0x1234);
    }

    #[test]
    fn ei_takes_effect_after_the_following_instruction() {
        let mut rom = vec![0u8; 0x200];
        rom[0x0100] = 0xFB; // EI
        rom[0x0101] = 0x00; // NOP
        rom[0x0102] = 0x00; // NOP
        let mut cpu = cpu_with_rom(rom);
        cpu.step().unwrap(); // EI
        assert!(!cpu.ime());
        cpu.tick_ei_delay();
        assert!(!cpu.ime());
        cpu.step().unwrap(); // the instruction right after EI
        assert!(!cpu.ime());
        cpu.tick_ei_delay();
        assert!(cpu.ime());
    }

    #[test]
    fn halt_resumes_on_pending_interrupt_even_with_ime_clear() {
        let mut rom = vec![0u8; 0x200];
        rom[0x0100] = 0x76; // HALT
        let mut cpu = cpu_with_rom(rom);
        cpu.step().unwrap();
        assert!(cpu.halted());
        cpu.if_.borrow_mut().set_ie_raw(0x01);
        cpu.if_.borrow_mut().request(crate::interrupts::Interrupt::VBlank);
        cpu.wake_from_halt_if_pending();
        assert!(!cpu.halted());
    }

    #[test]
    fn push_pop_round_trips_with_af_low_nibble_masked() {
        let mut cpu = cpu_with_rom(vec![0u8; 0x200]);
        cpu.regs.write16(Reg16::AF, 0x1234);
        let sp_before = cpu.regs.read16(Reg16::SP);
        let af = cpu.regs.read16(Reg16::AF);
        cpu.push16(af);
        let popped = cpu.pop16();
        cpu.regs.write16(Reg16::AF, popped);
        assert_eq!(cpu.regs.read16(Reg16::AF), 0x1230);
        assert_eq!(cpu.regs.read16(Reg16::SP), sp_before);
    }
}
