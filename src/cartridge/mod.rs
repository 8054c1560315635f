pub mod header;
pub mod mbc;

use log::info;

use crate::error::LoadError;
use header::{CartridgeHeader, MbcKind};
use mbc::mbc1::Mbc1;
use mbc::mbc2::Mbc2;
use mbc::mbc3::Mbc3;
use mbc::mbc5::Mbc5;
use mbc::rom_only::RomOnly;
pub use mbc::Cartridge;

/// Parse a cartridge image and build the appropriately-mapped `Cartridge`.
/// Inspects the header at 0x0147 (MBC tag), 0x0148 (ROM size code), 0x0149
/// (RAM size code), per spec.md §6.
pub fn load(rom: Vec<u8>) -> Result<(Box<dyn Cartridge>, CartridgeHeader), LoadError> {
    let header = CartridgeHeader::parse(&rom)?;

    let cartridge_type = header
        .cartridge_type()
        .ok_or(LoadError::UnknownMbc { cartridge_type: header.cartridge_type })?;
    let ram_size = header
        .ram_size()
        .map(|r| r.total_bytes())
        .unwrap_or(0);

    info!(
        "Loaded cartridge \"{}\": type={:?}, ram={}B",
        header.title, cartridge_type, ram_size
    );

    let cart: Box<dyn Cartridge> = match cartridge_type.mbc_kind() {
        MbcKind::RomOnly => Box::new(RomOnly::new(rom, ram_size)),
        MbcKind::Mbc1 => Box::new(Mbc1::new(rom, ram_size)),
        MbcKind::Mbc2 => Box::new(Mbc2::new(rom)),
        MbcKind::Mbc3 => Box::new(Mbc3::new(rom, ram_size)),
        MbcKind::Mbc5 => Box::new(Mbc5::new(rom, ram_size)),
    };

    Ok((cart, header))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with(cartridge_type: u8, rom_size: u8, ram_size: u8, banks: usize) -> Vec<u8> {
        let mut rom = vec![0u8; banks.max(2) * 0x4000];
        rom[0x0147] = cartridge_type;
        rom[0x0148] = rom_size;
        rom[0x0149] = ram_size;
        rom
    }

    #[test]
    fn rom_only_header_loads() {
        let rom = rom_with(0x00, 0x00, 0x00, 2);
        let (_, header) = load(rom).unwrap();
        assert_eq!(header.cartridge_type().unwrap(), header::CartridgeType::RomOnly);
    }

    #[test]
    fn unknown_cartridge_type_is_rejected() {
        let rom = rom_with(0x6B, 0x00, 0x00, 2);
        assert!(matches!(load(rom), Err(LoadError::UnknownMbc { .. })));
    }
}
