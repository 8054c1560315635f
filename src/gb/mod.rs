//! The top-level scheduler: owns the shared hardware state and drives the
//! CPU/PPU/timer one instruction-group at a time (spec.md §5).
//!
//! The DMG-01 didn't have an actual Memory Management Unit, but consolidating
//! memory-mapped I/O behind one `Mmu` makes emulation easier to reason about.
//! The CPU, PPU, timer and joypad all share the interrupt controller and
//! (where relevant) each other through `Rc<RefCell<..>>`, matching how the
//! teacher wired its own single-threaded subsystems together.

use std::cell::RefCell;
use std::rc::Rc;

use log::{error, info, warn};

use crate::cartridge::Cartridge;
use crate::cpu::Cpu;
use crate::error::DecodeError;
use crate::interrupts::InterruptController;
use crate::joypad::{ButtonState, Joypad};
use crate::mmu::Mmu;
use crate::ppu::{Ppu, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::timer::Timer;

/// A full frame's worth of pixels, each a DMG shade index 0-3.
pub type Framebuffer = [u8; SCREEN_WIDTH * SCREEN_HEIGHT];

/// The GameBoy DMG-01 (non-color).
pub struct GameBoy {
    cpu: Cpu,
    mmu: Rc<RefCell<Mmu>>,
    ppu: Rc<RefCell<Ppu>>,
    timer: Rc<RefCell<Timer>>,
    joypad: Rc<RefCell<Joypad>>,
    if_: Rc<RefCell<InterruptController>>,
}

impl GameBoy {
    /// Wire up a fresh console around the given cartridge. If `boot_rom` is
    /// `None`, the CPU and PPU are advanced straight to their documented
    /// post-boot values (spec.md §6) instead of executing boot ROM code.
    pub fn new(cartridge: Box<dyn Cartridge>, boot_rom: Option<Vec<u8>>) -> Self {
        let if_ = Rc::new(RefCell::new(InterruptController::new()));
        let ppu = Rc::new(RefCell::new(Ppu::new(if_.clone())));
        let timer = Rc::new(RefCell::new(Timer::new(if_.clone())));
        let joypad = Rc::new(RefCell::new(Joypad::new(if_.clone())));
        let skip_boot = boot_rom.is_none();
        let mmu = Rc::new(RefCell::new(Mmu::new(
            cartridge,
            boot_rom,
            if_.clone(),
            ppu.clone(),
            timer.clone(),
            joypad.clone(),
        )));
        let mut cpu = Cpu::new(mmu.clone(), if_.clone());
        if skip_boot {
            cpu.power_up();
            ppu.borrow_mut().power_up();
        }
        Self {
            cpu,
            mmu,
            ppu,
            timer,
            joypad,
            if_,
        }
    }

    /// Push the host's latest button snapshot into the joypad register.
    pub fn set_buttons(&mut self, state: ButtonState) {
        self.joypad.borrow_mut().set_state(state);
    }

    /// Persist the cartridge's battery-backed RAM, if any (spec.md §6).
    pub fn save_ram(&self) -> Vec<u8> {
        self.mmu.borrow().cartridge_save_ram()
    }

    /// Restore previously-saved battery-backed RAM (spec.md §6).
    pub fn load_ram(&mut self, data: &[u8]) {
        self.mmu.borrow_mut().cartridge_load_ram(data);
    }

    /// Run until a frame is ready, then return it. Drives the CPU one
    /// fetch-decode-execute step (or one interrupt dispatch, or one HALT
    /// tick) at a time, ticking the PPU/timer/EI-delay by however many
    /// cycles that step consumed — the same unit of work the scheduler
    /// repeats every iteration (spec.md §5).
    pub fn run_until_frame(&mut self) -> Result<Framebuffer, DecodeError> {
        loop {
            let cycles = self.advance_one_unit()?;
            self.ppu.borrow_mut().step(cycles);
            self.timer.borrow_mut().cycle(cycles);
            self.cpu.tick_ei_delay();
            if let Some(frame) = self.ppu.borrow_mut().take_frame() {
                return Ok(frame);
            }
        }
    }

    /// Service a pending interrupt, consume one HALT tick, or step the CPU
    /// — whichever the current IME/HALT state calls for. Returns the
    /// number of master-clock cycles consumed.
    fn advance_one_unit(&mut self) -> Result<u32, DecodeError> {
        self.cpu.wake_from_halt_if_pending();
        if self.cpu.ime() && self.if_.borrow().any_pending() {
            Ok(self.cpu.service_interrupt())
        } else if self.cpu.halted() {
            Ok(4)
        } else {
            self.cpu.step()
        }
    }
}

/// Construct a console from ROM bytes on disk plus optional boot ROM/save
/// paths, reporting the cartridge title for the host's log/window-title use.
pub fn load(
    rom_path: &str,
    boot_rom_path: Option<&str>,
    save_path: Option<&str>,
) -> Result<(GameBoy, String), crate::error::LoadError> {
    let rom_bytes = std::fs::read(rom_path)?;
    let (mut cartridge, header) = crate::cartridge::load(rom_bytes)?;

    if let Some(path) = save_path {
        if header.cartridge_type().map(|t| t.has_battery()).unwrap_or(false) {
            match std::fs::read(path) {
                Ok(data) => {
                    cartridge.load_ram(&data);
                    info!("loaded battery RAM from {path}");
                }
                Err(e) => warn!("no existing save at {path} ({e}), starting fresh"),
            }
        }
    }

    let boot_rom = match boot_rom_path {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            if bytes.len() != 256 {
                return Err(crate::error::LoadError::BootRomSize { actual: bytes.len() });
            }
            Some(bytes)
        }
        None => {
            warn!("no boot ROM supplied, starting from the documented post-boot register values");
            None
        }
    };

    let title = header.title.clone();
    Ok((GameBoy::new(cartridge, boot_rom), title))
}

/// Report a fatal decode fault the way the scheduler is documented to
/// (spec.md §7): log it and let the caller decide how to exit.
pub fn report_decode_error(err: &DecodeError) {
    error!("{err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mbc::rom_only::RomOnly;

    fn console_with_rom(rom: Vec<u8>) -> GameBoy {
        let mut full_rom = rom;
        full_rom.resize(0x8000, 0);
        GameBoy::new(Box::new(RomOnly::new(full_rom, 0)), None)
    }

    #[test]
    fn runs_until_a_frame_is_produced() {
        let mut rom = vec![0u8; 0x200];
        rom[0x0100] = 0x18; // JR -2 (tight loop)
        rom[0x0101] = 0xFE;
        let mut gb = console_with_rom(rom);
        let frame = gb.run_until_frame().unwrap();
        assert_eq!(frame.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
    }

    #[test]
    fn decode_error_surfaces_from_run_until_frame() {
        let mut rom = vec![0u8; 0x200];
        rom[0x0100] = 0xFC; // undefined opcode
        let mut gb = console_with_rom(rom);
        assert!(gb.run_until_frame().is_err());
    }
}
