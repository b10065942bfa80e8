//! Mapper 7 (AxROM): 32 KiB PRG banking with single-screen mirroring.
//!
//! One register: bits 0-2 pick the 32 KiB PRG bank at `$8000`, bit 4 picks
//! which CIRAM page every nametable address resolves to. There is no PRG RAM
//! on these boards, so `$6000-$7FFF` is open bus.

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

const PRG_BANK_SIZE_32K: usize = 32 * 1024;

#[derive(Debug, Clone)]
pub struct Mapper7 {
    prg_banks: usize,
    prg_bank: u8,
    mirroring: Mirroring,
}

#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapper7State {
    pub prg_bank: u8,
    pub mirroring: Mirroring,
}

impl Mapper7 {
    pub fn new(header: &Header) -> Self {
        Self {
            prg_banks: (header.prg_rom_size / PRG_BANK_SIZE_32K).max(1),
            prg_bank: 0,
            mirroring: Mirroring::SingleScreenLower,
        }
    }
}

impl Mapper for Mapper7 {
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
            self.prg_bank = data & 0x07;
            self.mirroring = if data & 0x10 == 0 {
                Mirroring::SingleScreenLower
            } else {
                Mirroring::SingleScreenUpper
            };
        }
        Ok(())
    }

    fn ppu_read(&self, cart: &Cartridge, addr: u16) -> Result<u8, Error> {
        Ok(cart.read_chr(addr as usize))
    }

    fn ppu_write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) -> Result<(), Error> {
        cart.write_chr(addr as usize, data)
    }

    fn reset(&mut self) {
        self.prg_bank = 0;
        self.mirroring = Mirroring::SingleScreenLower;
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_id(&self) -> u16 {
        7
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("AxROM")
    }

    fn save_state(&self) -> MapperState {
        MapperState::Axrom(Mapper7State {
            prg_bank: self.prg_bank,
            mirroring: self.mirroring,
        })
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), Error> {
        match state {
            MapperState::Axrom(s) => {
                self.prg_bank = s.prg_bank;
                self.mirroring = s.mirroring;
                Ok(())
            }
            _ => Err(state_mismatch()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::load_cartridge;

    #[test]
    fn control_bit_selects_nametable_page() {
        let mut rom = vec![b'N', b'E', b'S', 0x1A, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        rom.extend(vec![0; 32 * 1024]);
        let mut cart = load_cartridge(&rom).expect("cartridge");
        let mut mapper = Mapper7::new(cart.header());

        assert_eq!(mapper.mirroring(), Mirroring::SingleScreenLower);
        mapper.cpu_write(&mut cart, 0x8000, 0x10).expect("write");
        assert_eq!(mapper.mirroring(), Mirroring::SingleScreenUpper);
        mapper.cpu_write(&mut cart, 0x8000, 0x02).expect("write");
        assert_eq!(mapper.mirroring(), Mirroring::SingleScreenLower);
    }

    #[test]
    fn prg_ram_window_is_open_bus() {
        let mut rom = vec![b'N', b'E', b'S', 0x1A, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        rom.extend(vec![0xAB; 32 * 1024]);
        let cart = load_cartridge(&rom).expect("cartridge");
        let mapper = Mapper7::new(cart.header());

        assert_eq!(mapper.cpu_read(&cart, 0x6000).expect("read"), 0);
        assert_eq!(mapper.cpu_read(&cart, 0x8000).expect("read"), 0xAB);
    }
}
