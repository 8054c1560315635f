//! Setup-time errors. Runtime execution is total (spec.md §7): the only
//! runtime fault modeled is an unrecognized opcode, which the scheduler
//! treats as fatal and reports rather than silently ignoring.

use std::fmt;

/// Errors that can occur while loading a boot ROM or cartridge image.
#[derive(Debug)]
pub enum LoadError {
    /// Boot ROM was not exactly 256 bytes.
    BootRomSize { actual: usize },
    /// The cartridge file could not be read from disk.
    Io(std::io::Error),
    /// The cartridge image is too small to contain a header.
    CartridgeTooSmall { actual: usize },
    /// The cartridge-type byte at 0x0147 does not match any known MBC and
    /// declares non-trivial ROM/RAM, so it cannot safely fall back to
    /// ROM-only.
    UnknownMbc { cartridge_type: u8 },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::BootRomSize { actual } => {
                write!(f, "boot ROM must be exactly 256 bytes, got {actual}")
            }
            LoadError::Io(e) => write!(f, "failed to read cartridge file: {e}"),
            LoadError::CartridgeTooSmall { actual } => write!(
                f,
                "cartridge image is too small to contain a header ({actual} bytes)"
            ),
            LoadError::UnknownMbc { cartridge_type } => write!(
                f,
                "unknown or unsupported cartridge type byte {cartridge_type:#04x}"
            ),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

/// A fatal decode fault: the CPU fetched a byte that does not correspond
/// to any instruction in the base or CB-prefixed opcode tables. Real
/// hardware would lock up; this is surfaced as a reportable fault to aid
/// development (spec.md §7).
#[derive(Debug, Clone, Copy)]
pub struct DecodeError {
    pub pc: u16,
    pub opcode: u8,
    pub cb_prefixed: bool,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cb_prefixed {
            write!(
                f,
                "unrecognized CB-prefixed opcode {:#04x} at PC={:#06x}",
                self.opcode, self.pc
            )
        } else {
            write!(
                f,
                "unrecognized opcode {:#04x} at PC={:#06x}",
                self.opcode, self.pc
            )
        }
    }
}

impl std::error::Error for DecodeError {}
