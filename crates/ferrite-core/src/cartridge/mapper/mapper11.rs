//! Mapper 11 (Color Dreams): combined PRG/CHR banking in one register.
//!
//! Bits 0-1 select a 32 KiB PRG bank, the high nibble selects an 8 KiB CHR
//! bank, and bit 4 doubles as the single-screen nametable select on these
//! unlicensed boards.

use std::borrow::Cow;

use crate::{
    cartridge::{
        Cartridge,
        header::{CHR_BANK_SIZE, Header, Mirroring},
        mapper::{Mapper, MapperState, state_mismatch},
    },
    error::Error,
    memory::cpu as cpu_mem,
};

const PRG_BANK_SIZE_32K: usize = 32 * 1024;

#[derive(Debug, Clone)]
pub struct Mapper11 {
    prg_banks: usize,
    prg_bank: u8,
    chr_bank: u8,
    mirroring: Mirroring,
}

#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapper11State {
    pub prg_bank: u8,
    pub chr_bank: u8,
    pub mirroring: Mirroring,
}

impl Mapper11 {
    pub fn new(header: &Header) -> Self {
        Self {
            prg_banks: (header.prg_rom_size / PRG_BANK_SIZE_32K).max(1),
            prg_bank: 0,
            chr_bank: 0,
            mirroring: Mirroring::SingleScreenLower,
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        self.chr_bank as usize * CHR_BANK_SIZE + (addr & 0x1FFF) as usize
    }
}

impl Mapper for Mapper11 {
    fn cpu_read(&self, cart: &Cartridge, addr: u16) -> Result<u8, Error> {
        let value = match addr {
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => {
                let base = (self.prg_bank as usize % self.prg_banks) * PRG_BANK_SIZE_32K;
                cart.read_prg_rom(base + (addr & 0x7FFF) as usize)
            }
            _ => 0,
        };
        Ok(value)
    }

    fn cpu_write(&mut self, _cart: &mut Cartridge, addr: u16, data: u8) -> Result<(), Error> {
        if addr >= cpu_mem::PRG_ROM_START {
            self.prg_bank = data & 0x03;
            self.chr_bank = (data >> 4) & 0x0F;
            self.mirroring = if data & 0x10 == 0 {
                Mirroring::SingleScreenLower
            } else {
                Mirroring::SingleScreenUpper
            };
        }
        Ok(())
    }

    fn ppu_read(&self, cart: &Cartridge, addr: u16) -> Result<u8, Error> {
        Ok(cart.read_chr(self.chr_offset(addr)))
    }

    fn ppu_write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) -> Result<(), Error> {
        let offset = self.chr_offset(addr);
        cart.write_chr(offset, data)
    }

    fn reset(&mut self) {
        self.prg_bank = 0;
        self.chr_bank = 0;
        self.mirroring = Mirroring::SingleScreenLower;
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_id(&self) -> u16 {
        11
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("Color Dreams")
    }

    fn save_state(&self) -> MapperState {
        MapperState::ColorDreams(Mapper11State {
            prg_bank: self.prg_bank,
            chr_bank: self.chr_bank,
            mirroring: self.mirroring,
        })
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), Error> {
        match state {
            MapperState::ColorDreams(s) => {
                self.prg_bank = s.prg_bank;
                self.chr_bank = s.chr_bank;
                self.mirroring = s.mirroring;
                Ok(())
            }
            _ => Err(state_mismatch()),
        }
    }
}
