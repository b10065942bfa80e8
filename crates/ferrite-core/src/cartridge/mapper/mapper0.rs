//! Mapper 0 (NROM): no banking at all.
//!
//! The CPU sees the whole PRG ROM at `$8000-$FFFF` (16 KiB images are
//! mirrored into both halves) and the PPU sees CHR directly.

use std::borrow::Cow;

use crate::{
    cartridge::{
        Cartridge,
        header::{Header, Mirroring},
        mapper::{Mapper, MapperState, state_mismatch},
    },
    error::Error,
    memory::cpu as cpu_mem,
};

#[derive(Debug, Clone)]
pub struct Mapper0 {
    mirroring: Mirroring,
}

impl Mapper0 {
    pub fn new(header: &Header) -> Self {
        Self {
            mirroring: header.mirroring,
        }
    }
}

impl Mapper for Mapper0 {
    fn cpu_read(&self, cart: &Cartridge, addr: u16) -> Result<u8, Error> {
        let value = match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                cart.read_prg_ram((addr - cpu_mem::PRG_RAM_START) as usize)
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => {
                // read_prg_rom wraps, which handles NROM-128 mirroring.
                cart.read_prg_rom((addr - cpu_mem::PRG_ROM_START) as usize)
            }
            _ => 0,
        };
        Ok(value)
    }

    fn cpu_write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) -> Result<(), Error> {
        if let cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END = addr {
            cart.write_prg_ram((addr - cpu_mem::PRG_RAM_START) as usize, data);
        }
        Ok(())
    }

    fn ppu_read(&self, cart: &Cartridge, addr: u16) -> Result<u8, Error> {
        Ok(cart.read_chr(addr as usize))
    }

    fn ppu_write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) -> Result<(), Error> {
        cart.write_chr(addr as usize, data)
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_id(&self) -> u16 {
        0
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("NROM")
    }

    fn save_state(&self) -> MapperState {
        MapperState::Nrom
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), Error> {
        match state {
            MapperState::Nrom => Ok(()),
            _ => Err(state_mismatch()),
        }
    }
}
