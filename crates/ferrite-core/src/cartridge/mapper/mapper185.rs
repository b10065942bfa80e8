//! Mapper 185: CNROM with a CHR copy-protection lockout.
//!
//! These boards wire the CHR enable line through a comparison against the
//! written bank value. Until the game performs the expected unlock writes,
//! every CHR read returns a fixed garbage byte; the boot code checks for
//! exactly that garbage to detect copiers. Two unlock paths are modelled:
//! the `$33` then `$11` sequence, and the latched double-`$3C` write.

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

/// Byte returned by CHR reads while the lockout is engaged.
const LOCKOUT_BYTE: u8 = 0x0F;

const UNLOCK_ARM: u8 = 0x33;
const UNLOCK_CONFIRM: u8 = 0x11;
const UNLOCK_LATCH: u8 = 0x3C;

#[derive(Debug, Clone)]
pub struct Mapper185 {
    mirroring: Mirroring,
    locked: bool,
    /// Set once `$33` has been seen; the next `$11` unlocks.
    armed: bool,
    /// Set once `$3C` has been seen; a second `$3C` unlocks.
    latched: bool,
}

#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapper185State {
    pub locked: bool,
    pub armed: bool,
    pub latched: bool,
}

impl Mapper185 {
    pub fn new(header: &Header) -> Self {
        Self {
            mirroring: header.mirroring,
            locked: true,
            armed: false,
            latched: false,
        }
    }
}

impl Mapper for Mapper185 {
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

    fn cpu_write(&mut self, _cart: &mut Cartridge, addr: u16, data: u8) -> Result<(), Error> {
        if addr < cpu_mem::PRG_ROM_START {
            return Ok(());
        }

        match data {
            UNLOCK_ARM => self.armed = true,
            UNLOCK_CONFIRM if self.armed => self.locked = false,
            UNLOCK_LATCH if self.latched => self.locked = false,
            UNLOCK_LATCH => self.latched = true,
            _ => self.armed = false,
        }
        Ok(())
    }

    fn ppu_read(&self, cart: &Cartridge, addr: u16) -> Result<u8, Error> {
        if self.locked {
            return Ok(LOCKOUT_BYTE);
        }
        Ok(cart.read_chr(addr as usize))
    }

    fn ppu_write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) -> Result<(), Error> {
        cart.write_chr(addr as usize, data)
    }

    fn reset(&mut self) {
        self.locked = true;
        self.armed = false;
        self.latched = false;
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_id(&self) -> u16 {
        185
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("CNROM (lockout)")
    }

    fn save_state(&self) -> MapperState {
        MapperState::Mapper185(Mapper185State {
            locked: self.locked,
            armed: self.armed,
            latched: self.latched,
        })
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), Error> {
        match state {
            MapperState::Mapper185(s) => {
                self.locked = s.locked;
                self.armed = s.armed;
                self.latched = s.latched;
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

    fn cart() -> Cartridge {
        let mut rom = vec![
            b'N', b'E', b'S', 0x1A, 1, 1, 0b1001_0000, 0b1011_0000, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        rom.extend(vec![0; 16 * 1024]);
        rom.extend(vec![0x77; 8 * 1024]);
        load_cartridge(&rom).expect("cartridge")
    }

    #[test]
    fn chr_reads_are_gated_until_unlock_sequence() {
        let mut cart = cart();
        let mut mapper = Mapper185::new(cart.header());

        assert_eq!(mapper.ppu_read(&cart, 0x0000).expect("read"), LOCKOUT_BYTE);

        mapper.cpu_write(&mut cart, 0x8000, UNLOCK_ARM).expect("write");
        assert_eq!(mapper.ppu_read(&cart, 0x0000).expect("read"), LOCKOUT_BYTE);
        mapper
            .cpu_write(&mut cart, 0x8000, UNLOCK_CONFIRM)
            .expect("write");
        assert_eq!(mapper.ppu_read(&cart, 0x0000).expect("read"), 0x77);
    }

    #[test]
    fn double_latch_write_also_unlocks() {
        let mut cart = cart();
        let mut mapper = Mapper185::new(cart.header());

        mapper.cpu_write(&mut cart, 0x8000, UNLOCK_LATCH).expect("write");
        assert_eq!(mapper.ppu_read(&cart, 0x0000).expect("read"), LOCKOUT_BYTE);
        mapper.cpu_write(&mut cart, 0x8000, UNLOCK_LATCH).expect("write");
        assert_eq!(mapper.ppu_read(&cart, 0x0000).expect("read"), 0x77);
    }

    #[test]
    fn stray_write_breaks_the_arm_sequence() {
        let mut cart = cart();
        let mut mapper = Mapper185::new(cart.header());

        mapper.cpu_write(&mut cart, 0x8000, UNLOCK_ARM).expect("write");
        mapper.cpu_write(&mut cart, 0x8000, 0x00).expect("write");
        mapper
            .cpu_write(&mut cart, 0x8000, UNLOCK_CONFIRM)
            .expect("write");
        assert_eq!(mapper.ppu_read(&cart, 0x0000).expect("read"), LOCKOUT_BYTE);
    }
}
