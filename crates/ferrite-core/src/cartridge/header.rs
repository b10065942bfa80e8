//! iNES header parsing.
//!
//! The first 16 bytes of every `.nes` ROM are the *iNES header*: how much
//! PRG/CHR data the cartridge exposes, which mapper it needs, and a few
//! compatibility flags. This core targets the original iNES 1.0 layout
//! (magic + bank counts + flags6/flags7 + 8 reserved bytes); the parsed
//! result is presented as a single [`Header`] structure.

use bitflags::bitflags;

use crate::error::Error;

const NES_MAGIC: &[u8; 4] = b"NES\x1A";

/// Size of the fixed iNES header in bytes.
pub const NES_HEADER_LEN: usize = 16;

/// Size of one PRG ROM bank as counted by header byte 4.
pub const PRG_BANK_SIZE: usize = 16 * 1024;
/// Size of one CHR bank as counted by header byte 5.
pub const CHR_BANK_SIZE: usize = 8 * 1024;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags6: u8 {
        const MIRRORING       = 0b0000_0001;
        const BATTERY         = 0b0000_0010;
        const TRAINER         = 0b0000_0100;
        const FOUR_SCREEN     = 0b0000_1000;
        const MAPPER_LOW_MASK = 0b1111_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags7: u8 {
        const VS_UNISYSTEM     = 0b0000_0001;
        const PLAYCHOICE_10    = 0b0000_0010;
        const MAPPER_HIGH_MASK = 0b1111_0000;
    }
}

/// Nametable layout selected by the cartridge hardware.
///
/// The header hardwires horizontal or vertical; the single-screen variants
/// are only ever selected at runtime by mapper control bits (AxROM, MMC1,
/// Color Dreams).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mirroring {
    /// Two horizontal nametables that mirror vertically.
    Horizontal,
    /// Two vertical nametables that mirror horizontally.
    Vertical,
    /// Every nametable address resolves to the lower 1 KiB page.
    SingleScreenLower,
    /// Every nametable address resolves to the upper 1 KiB page.
    SingleScreenUpper,
}

/// High level representation of an iNES cartridge header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// Mapper ID (0 == NROM, 1 == MMC1, ...).
    pub mapper: u16,
    /// How the PPU nametables are mirrored.
    pub mirroring: Mirroring,
    /// Battery bit indicates the cartridge keeps PRG RAM contents when
    /// powered off.
    pub battery_backed_ram: bool,
    /// Whether the 512 byte trainer block sits between header and PRG data.
    pub trainer_present: bool,
    /// Number of 16 KiB PRG ROM banks.
    pub prg_rom_banks: usize,
    /// Number of 8 KiB CHR ROM banks. Zero means the board carries CHR RAM.
    pub chr_rom_banks: usize,
    /// Amount of PRG ROM in bytes.
    pub prg_rom_size: usize,
    /// Amount of CHR ROM in bytes (zero for CHR RAM boards).
    pub chr_rom_size: usize,
    /// Set when the board uses writable CHR RAM instead of CHR ROM.
    pub uses_chr_ram: bool,
}

impl Header {
    /// Parse an iNES header from the given byte slice.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < NES_HEADER_LEN {
            return Err(Error::TooShort {
                actual: bytes.len(),
            });
        }

        if &bytes[0..4] != NES_MAGIC {
            return Err(Error::InvalidFormat);
        }

        let prg_rom_banks = bytes[4] as usize;
        let chr_rom_banks = bytes[5] as usize;
        let flags6 = Flags6::from_bits_truncate(bytes[6]);
        let flags7 = Flags7::from_bits_truncate(bytes[7]);

        let mapper = combine_mapper(flags6, flags7);
        let mirroring = if flags6.contains(Flags6::MIRRORING) {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        Ok(Self {
            mapper,
            mirroring,
            battery_backed_ram: flags6.contains(Flags6::BATTERY),
            trainer_present: flags6.contains(Flags6::TRAINER),
            prg_rom_banks,
            chr_rom_banks,
            prg_rom_size: prg_rom_banks * PRG_BANK_SIZE,
            chr_rom_size: chr_rom_banks * CHR_BANK_SIZE,
            uses_chr_ram: chr_rom_banks == 0,
        })
    }
}

fn combine_mapper(flags6: Flags6, flags7: Flags7) -> u16 {
    let lower = (flags6.bits() >> 4) as u16;
    let upper = (flags7.bits() & 0xF0) as u16;
    upper | lower
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_header() {
        let header_bytes = [
            b'N',
            b'E',
            b'S',
            0x1A,        // magic
            2,           // 2 * 16 KiB PRG ROM
            1,           // 1 * 8 KiB CHR ROM
            0b0000_0001, // vertical mirroring
            0b0000_0000, // mapper 0
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            0, // padding
        ];

        let header = Header::parse(&header_bytes).expect("header parses");

        assert_eq!(header.prg_rom_size, 2 * 16 * 1024);
        assert_eq!(header.chr_rom_size, 8 * 1024);
        assert_eq!(header.mirroring, Mirroring::Vertical);
        assert!(!header.trainer_present);
        assert_eq!(header.mapper, 0);
        assert!(!header.uses_chr_ram);
    }

    #[test]
    fn rejects_invalid_magic() {
        let mut header_bytes = [0u8; NES_HEADER_LEN];
        header_bytes[..4].copy_from_slice(b"NOPE");

        let err = Header::parse(&header_bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat));
    }

    #[test]
    fn combines_mapper_nibbles() {
        let mut header_bytes = [0u8; NES_HEADER_LEN];
        header_bytes[..4].copy_from_slice(NES_MAGIC);
        header_bytes[4] = 1;
        header_bytes[6] = 0b1001_0000; // low nibble 9
        header_bytes[7] = 0b1011_0000; // high nibble B

        let header = Header::parse(&header_bytes).expect("header parses");
        assert_eq!(header.mapper, 0xB9);
    }

    #[test]
    fn chr_ram_flagged_when_no_chr_banks() {
        let mut header_bytes = [0u8; NES_HEADER_LEN];
        header_bytes[..4].copy_from_slice(NES_MAGIC);
        header_bytes[4] = 1;
        header_bytes[5] = 0;

        let header = Header::parse(&header_bytes).expect("header parses");
        assert!(header.uses_chr_ram);
        assert_eq!(header.chr_rom_size, 0);
    }
}
