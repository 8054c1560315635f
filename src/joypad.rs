//! Input latch: the host pushes a button snapshot once per frame; the
//! joypad register at 0xFF00 exposes it through a column-select scheme.

use crate::interrupts::{Interrupt, InterruptController};
use std::cell::RefCell;
use std::rc::Rc;

/// One frame's worth of button state, as pushed by the host collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub right: bool,
    pub left: bool,
    pub up: bool,
    pub down: bool,
    pub a: bool,
    pub b: bool,
    pub select: bool,
    pub start: bool,
}

impl ButtonState {
    fn direction_nibble(&self) -> u8 {
        let mut n = 0u8;
        n |= (!self.right as u8) << 0;
        n |= (!self.left as u8) << 1;
        n |= (!self.up as u8) << 2;
        n |= (!self.down as u8) << 3;
        n
    }

    fn action_nibble(&self) -> u8 {
        let mut n = 0u8;
        n |= (!self.a as u8) << 0;
        n |= (!self.b as u8) << 1;
        n |= (!self.select as u8) << 2;
        n |= (!self.start as u8) << 3;
        n
    }
}

/// FF00 — P1/JOYP: Joypad.
/// Bits 4-5 are the column select (0 = selected, matching real hardware's
/// active-low wiring); bits 0-3 read back the inverted state of whichever
/// row(s) are selected.
pub struct Joypad {
    select_buttons: bool,
    select_dpad: bool,
    state: ButtonState,
    if_: Rc<RefCell<InterruptController>>,
}

impl Joypad {
    pub fn new(if_: Rc<RefCell<InterruptController>>) -> Self {
        Self {
            select_buttons: true,
            select_dpad: true,
            state: ButtonState::default(),
            if_,
        }
    }

    pub fn read(&self) -> u8 {
        let mut low = 0x0F;
        if self.select_dpad {
            low &= self.state.direction_nibble();
        }
        if self.select_buttons {
            low &= self.state.action_nibble();
        }
        let select_bits = ((!self.select_buttons as u8) << 5) | ((!self.select_dpad as u8) << 4);
        0xC0 | select_bits | (low & 0x0F)
    }

    /// Writes to 0xFF00 retain only the two selector bits; the low nibble
    /// is always synthesized from the input latch on read.
    pub fn write(&mut self, val: u8) {
        self.select_buttons = val & 0x20 == 0;
        self.select_dpad = val & 0x10 == 0;
    }

    /// Replace the latched button snapshot. A 1->0 transition (button
    /// newly pressed, active-low) on any observed line requests a Joypad
    /// interrupt, per spec.md §4.6.
    pub fn set_state(&mut self, new_state: ButtonState) {
        let before = self.read() & 0x0F;
        self.state = new_state;
        let after = self.read() & 0x0F;
        if before & !after != 0 {
            self.if_.borrow_mut().request(Interrupt::Joypad);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joypad() -> Joypad {
        Joypad::new(Rc::new(RefCell::new(InterruptController::new())))
    }

    #[test]
    fn no_buttons_pressed_reads_all_ones() {
        let mut jp = joypad();
        jp.write(0x00); // select both rows
        assert_eq!(jp.read() & 0x0F, 0x0F);
    }

    #[test]
    fn pressed_button_clears_its_bit() {
        let mut jp = joypad();
        jp.write(0x10); // select action buttons only (dpad deselected)
        jp.set_state(ButtonState {
            a: true,
            ..Default::default()
        });
        assert_eq!(jp.read() & 0x01, 0x00);
    }

    #[test]
    fn press_transition_requests_interrupt() {
        let if_ = Rc::new(RefCell::new(InterruptController::new()));
        if_.borrow_mut().set_ie_raw(0x1F);
        let mut jp = Joypad::new(if_.clone());
        jp.write(0x00);
        jp.set_state(ButtonState {
            start: true,
            ..Default::default()
        });
        assert!(if_.borrow().any_pending());
    }
}
