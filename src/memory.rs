//! 64 KiB flat address space: 16 KiB ROM + 48 KiB RAM (`spec.md` §4.1).

use log::debug;

use crate::error::CoreError;

const ROM_SIZE: usize = 0x4000;
const RAM_SIZE: usize = 0x10000 - ROM_SIZE;

/// Offset of the bitmap window within RAM (RAM starts at 0x4000, bitmap at 0x4000).
const BITMAP_OFFSET: usize = 0x0000;
const BITMAP_LEN: usize = 0x1800; // 6,144 bytes
/// Offset of the attribute window within RAM (attributes start at 0x5800).
const ATTR_OFFSET: usize = 0x1800;
const ATTR_LEN: usize = 0x0300; // 768 bytes

/// CPU-facing memory access. Implementations are not required to be a flat
/// ROM+RAM map (a 128K banked variant could implement the same trait), but
/// `Memory48k` below is the only implementation this crate ships.
pub trait Memory {
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);

    fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn write_word(&mut self, addr: u16, value: u16) {
        self.write(addr, value as u8);
        self.write(addr.wrapping_add(1), (value >> 8) as u8);
    }
}

/// The ZX Spectrum 48K's memory map: 0x0000-0x3FFF ROM (read-only), 0x4000-0xFFFF RAM.
pub struct Memory48k {
    rom: [u8; ROM_SIZE],
    ram: [u8; RAM_SIZE],
}

impl Memory48k {
    pub fn new() -> Self {
        Self {
            rom: [0; ROM_SIZE],
            ram: [0; RAM_SIZE],
        }
    }

    /// Replace the ROM region. Must be exactly 16,384 bytes (`spec.md` §4.1, §6).
    pub fn load_rom(&mut self, bytes: &[u8]) -> Result<(), CoreError> {
        if bytes.len() != ROM_SIZE {
            return Err(CoreError::RomSize {
                expected: ROM_SIZE,
                actual: bytes.len(),
            });
        }
        self.rom.copy_from_slice(bytes);
        debug!(
            "loaded ROM image ({} bytes), first bytes 0x{:02X} 0x{:02X}",
            bytes.len(),
            self.rom[0],
            self.rom[1]
        );
        Ok(())
    }

    /// The 6,144-byte bitmap window (0x4000-0x57FF), aliasing RAM.
    pub fn bitmap_view(&self) -> &[u8; BITMAP_LEN] {
        self.ram[BITMAP_OFFSET..BITMAP_OFFSET + BITMAP_LEN]
            .try_into()
            .expect("bitmap window is a fixed-size slice of RAM")
    }

    /// The 768-byte attribute window (0x5800-0x5AFF), aliasing RAM.
    pub fn attribute_view(&self) -> &[u8; ATTR_LEN] {
        self.ram[ATTR_OFFSET..ATTR_OFFSET + ATTR_LEN]
            .try_into()
            .expect("attribute window is a fixed-size slice of RAM")
    }

    /// Mutable form of [`Self::bitmap_view`] — writes through this slice are
    /// visible to subsequent `read()`s, since both alias the same RAM array.
    pub fn bitmap_view_mut(&mut self) -> &mut [u8; BITMAP_LEN] {
        (&mut self.ram[BITMAP_OFFSET..BITMAP_OFFSET + BITMAP_LEN])
            .try_into()
            .expect("bitmap window is a fixed-size slice of RAM")
    }

    /// Mutable form of [`Self::attribute_view`].
    pub fn attribute_view_mut(&mut self) -> &mut [u8; ATTR_LEN] {
        (&mut self.ram[ATTR_OFFSET..ATTR_OFFSET + ATTR_LEN])
            .try_into()
            .expect("attribute window is a fixed-size slice of RAM")
    }
}

impl Default for Memory48k {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory for Memory48k {
    fn read(&self, addr: u16) -> u8 {
        if addr < ROM_SIZE as u16 {
            self.rom[addr as usize]
        } else {
            self.ram[addr as usize - ROM_SIZE]
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        if addr < ROM_SIZE as u16 {
            // Writes to ROM are silently ignored (spec.md §9 Open Questions).
            return;
        }
        self.ram[addr as usize - ROM_SIZE] = value;
    }
}
