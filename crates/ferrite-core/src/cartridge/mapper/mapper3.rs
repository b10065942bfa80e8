//! Mapper 3 (CNROM): 8 KiB CHR banking, fixed PRG.

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

#[derive(Debug, Clone)]
pub struct Mapper3 {
    mirroring: Mirroring,
    chr_bank: u8,
}

#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapper3State {
    pub chr_bank: u8,
}

impl Mapper3 {
    pub fn new(header: &Header) -> Self {
        Self {
            mirroring: header.mirroring,
            chr_bank: 0,
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        self.chr_bank as usize * CHR_BANK_SIZE + (addr & 0x1FFF) as usize
    }
}

impl Mapper for Mapper3 {
    fn cpu_read(&self, cart: &Cartridge, addr: u16) -> Result<u8, Error> {
        let value = match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                cart.read_prg_ram((addr - cpu_mem::PRG_RAM_START) as usize)
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => {
                cart.read_prg_rom((addr - cpu_mem::PRG_ROM_START) as usize)
            }
            _ => 0,
        };
        Ok(value)
    }

    fn cpu_write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) -> Result<(), Error> {
        match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                cart.write_prg_ram((addr - cpu_mem::PRG_RAM_START) as usize, data);
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => {
                // CNROM only decodes two CHR select lines.
                self.chr_bank = data & 0x03;
            }
            _ => {}
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
        self.chr_bank = 0;
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_id(&self) -> u16 {
        3
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("CNROM")
    }

    fn save_state(&self) -> MapperState {
        MapperState::Cnrom(Mapper3State {
            chr_bank: self.chr_bank,
        })
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), Error> {
        match state {
            MapperState::Cnrom(s) => {
                self.chr_bank = s.chr_bank;
                Ok(())
            }
            _ => Err(state_mismatch()),
        }
    }
}
