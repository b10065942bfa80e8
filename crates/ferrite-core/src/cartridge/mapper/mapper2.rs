//! Mapper 2 (UxROM): 16 KiB PRG banking.
//!
//! Writes anywhere in `$8000-$FFFF` select the 16 KiB bank visible at
//! `$8000-$BFFF`; the last bank is hardwired to `$C000-$FFFF`. CHR is an
//! unbanked 8 KiB (usually RAM on these boards).

use std::borrow::Cow;

use crate::{
    cartridge::{
        Cartridge,
        header::{Header, Mirroring, PRG_BANK_SIZE},
        mapper::{Mapper, MapperState, state_mismatch},
    },
    error::Error,
    memory::cpu as cpu_mem,
};

#[derive(Debug, Clone)]
pub struct Mapper2 {
    mirroring: Mirroring,
    prg_banks: usize,
    prg_bank: u8,
}

#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapper2State {
    pub prg_bank: u8,
}

impl Mapper2 {
    pub fn new(header: &Header) -> Self {
        Self {
            mirroring: header.mirroring,
            prg_banks: header.prg_rom_banks.max(1),
            prg_bank: 0,
        }
    }

    fn bank_base(&self, bank: usize) -> usize {
        (bank % self.prg_banks) * PRG_BANK_SIZE
    }
}

impl Mapper for Mapper2 {
    fn cpu_read(&self, cart: &Cartridge, addr: u16) -> Result<u8, Error> {
        let value = match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                cart.read_prg_ram((addr - cpu_mem::PRG_RAM_START) as usize)
            }
            0x8000..=0xBFFF => {
                let base = self.bank_base(self.prg_bank as usize);
                cart.read_prg_rom(base + (addr & 0x3FFF) as usize)
            }
            0xC000..=0xFFFF => {
                let base = self.bank_base(self.prg_banks - 1);
                cart.read_prg_rom(base + (addr & 0x3FFF) as usize)
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
                self.prg_bank = data;
            }
            _ => {}
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
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_id(&self) -> u16 {
        2
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("UxROM")
    }

    fn save_state(&self) -> MapperState {
        MapperState::Uxrom(Mapper2State {
            prg_bank: self.prg_bank,
        })
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), Error> {
        match state {
            MapperState::Uxrom(s) => {
                self.prg_bank = s.prg_bank;
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

    fn uxrom_cart(banks: u8) -> Cartridge {
        let mut rom = vec![
            b'N', b'E', b'S', 0x1A, banks, 0, 0b0010_0000, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        for bank in 0..banks {
            rom.extend(vec![bank; PRG_BANK_SIZE]);
        }
        load_cartridge(&rom).expect("cartridge")
    }

    #[test]
    fn switches_lower_window_and_fixes_last_bank() {
        let mut cart = uxrom_cart(4);
        let mut mapper = Mapper2::new(cart.header());

        assert_eq!(mapper.cpu_read(&cart, 0x8000).expect("read"), 0);
        assert_eq!(mapper.cpu_read(&cart, 0xC000).expect("read"), 3);

        mapper.cpu_write(&mut cart, 0x8000, 2).expect("write");
        assert_eq!(mapper.cpu_read(&cart, 0x8000).expect("read"), 2);
        assert_eq!(mapper.cpu_read(&cart, 0xFFFF).expect("read"), 3);
    }

    #[test]
    fn bank_select_wraps_to_available_banks() {
        let mut cart = uxrom_cart(2);
        let mut mapper = Mapper2::new(cart.header());

        mapper.cpu_write(&mut cart, 0x9000, 5).expect("write");
        assert_eq!(mapper.cpu_read(&cart, 0x8000).expect("read"), 1);
    }
}
