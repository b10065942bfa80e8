//! Mapper 4 (MMC3): fine-grained banking plus a scanline IRQ.
//!
//! Eight bank-data registers sit behind a single bank-select register:
//! bits 0-2 pick which register the next `$8001` write lands in, bit 6
//! chooses which PRG window pair is switchable, and bit 7 swaps the CHR
//! layout between 2x2 KiB + 4x1 KiB and the inverted arrangement.
//!
//! | Area | Address range   | Behaviour                                     |
//! |------|-----------------|-----------------------------------------------|
//! | CPU  | `$6000-$7FFF`   | PRG RAM                                       |
//! | CPU  | `$8000-$9FFF`   | PRG window 0 + bank select/data registers     |
//! | CPU  | `$A000-$BFFF`   | PRG window 1 + mirroring/RAM-protect registers|
//! | CPU  | `$C000-$DFFF`   | PRG window 2 + IRQ latch/reload registers     |
//! | CPU  | `$E000-$FFFF`   | PRG window 3 (fixed last) + IRQ enable/ack    |
//! | PPU  | `$0000-$1FFF`   | 2 KiB/1 KiB CHR windows per the CHR mode      |
//!
//! The IRQ down-counter is clocked by PPU address line A12 rising mid-
//! scanline. This core approximates that edge by clocking once at dot 315
//! of every visible and pre-render scanline while rendering is enabled; the
//! counter reloads from the latch when zero (or when a reload was requested
//! via `$C001`) and asserts the CPU IRQ line when it reaches zero with IRQs
//! enabled.

use std::borrow::Cow;

use crate::{
    cartridge::{
        Cartridge,
        header::{Header, Mirroring},
        mapper::{Mapper, MapperState, PpuDot, state_mismatch},
    },
    error::Error,
    memory::cpu as cpu_mem,
};

/// PRG-ROM bank size exposed to the CPU (8 KiB).
const PRG_BANK_SIZE_8K: usize = 8 * 1024;
/// CHR banking granularity (1 KiB).
const CHR_BANK_SIZE_1K: usize = 1024;

/// PPU dot at which the A12 rise is approximated for the IRQ counter.
const IRQ_CLOCK_DOT: u16 = 315;

#[derive(Debug, Clone)]
pub struct Mapper4 {
    prg_banks: usize,
    chr_banks: usize,

    base_mirroring: Mirroring,
    mirroring: Mirroring,

    /// Bank select register (`$8000`): target register index, PRG mode
    /// (bit 6), CHR inversion (bit 7).
    bank_select: u8,
    /// Bank data registers (`$8001`). 0-5 control CHR, 6-7 the switchable
    /// PRG windows.
    bank_regs: [u8; 8],
    /// PRG-RAM write protection from `$A001` bit 6.
    prg_ram_protect: bool,

    /// Derived 8 KiB offsets for the four CPU windows.
    prg_offsets: [usize; 4],
    /// Derived 1 KiB offsets for the eight PPU windows.
    chr_offsets: [usize; 8],

    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,
}

#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapper4State {
    pub bank_select: u8,
    pub bank_regs: [u8; 8],
    pub mirroring: Mirroring,
    pub prg_ram_protect: bool,
    pub irq_latch: u8,
    pub irq_counter: u8,
    pub irq_reload: bool,
    pub irq_enabled: bool,
    pub irq_pending: bool,
}

impl Mapper4 {
    pub fn new(header: &Header) -> Self {
        let chr_len = if header.uses_chr_ram {
            8 * 1024
        } else {
            header.chr_rom_size
        };
        let mut mapper = Self {
            prg_banks: (header.prg_rom_size / PRG_BANK_SIZE_8K).max(1),
            chr_banks: (chr_len / CHR_BANK_SIZE_1K).max(1),
            base_mirroring: header.mirroring,
            mirroring: header.mirroring,
            bank_select: 0,
            bank_regs: [0; 8],
            prg_ram_protect: false,
            prg_offsets: [0; 4],
            chr_offsets: [0; 8],
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
        };
        mapper.update_offsets();
        mapper
    }

    #[inline]
    fn chr_inverted(&self) -> bool {
        self.bank_select & 0x80 != 0
    }

    #[inline]
    fn prg_swap_at_c000(&self) -> bool {
        self.bank_select & 0x40 != 0
    }

    fn prg_bank(&self, value: u8) -> usize {
        value as usize % self.prg_banks
    }

    fn chr_bank(&self, value: u8) -> usize {
        value as usize % self.chr_banks
    }

    /// Recomputes every window offset from the bank registers and modes.
    fn update_offsets(&mut self) {
        let last = self.prg_banks - 1;
        let second_last = self.prg_banks.saturating_sub(2);
        let r6 = self.prg_bank(self.bank_regs[6]);
        let r7 = self.prg_bank(self.bank_regs[7]);

        let prg_banks = if self.prg_swap_at_c000() {
            // $8000 fixed to the second-last bank, $C000 switchable.
            [second_last, r7, r6, last]
        } else {
            // $8000/$A000 switchable, $C000 fixed to the second-last bank.
            [r6, r7, second_last, last]
        };
        for (slot, bank) in prg_banks.into_iter().enumerate() {
            self.prg_offsets[slot] = bank * PRG_BANK_SIZE_8K;
        }

        // R0/R1 address 2 KiB pairs; hardware forces their low bit to 0.
        let r0 = self.chr_bank(self.bank_regs[0] & !1);
        let r1 = self.chr_bank(self.bank_regs[1] & !1);
        let chr_banks = if self.chr_inverted() {
            [
                self.chr_bank(self.bank_regs[2]),
                self.chr_bank(self.bank_regs[3]),
                self.chr_bank(self.bank_regs[4]),
                self.chr_bank(self.bank_regs[5]),
                r0,
                r0 + 1,
                r1,
                r1 + 1,
            ]
        } else {
            [
                r0,
                r0 + 1,
                r1,
                r1 + 1,
                self.chr_bank(self.bank_regs[2]),
                self.chr_bank(self.bank_regs[3]),
                self.chr_bank(self.bank_regs[4]),
                self.chr_bank(self.bank_regs[5]),
            ]
        };
        for (slot, bank) in chr_banks.into_iter().enumerate() {
            self.chr_offsets[slot] = (bank % self.chr_banks) * CHR_BANK_SIZE_1K;
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        let window = (addr as usize >> 10) & 7;
        self.chr_offsets[window] + (addr & 0x03FF) as usize
    }

    fn write_register(&mut self, addr: u16, data: u8) {
        match (addr, addr & 1) {
            (0x8000..=0x9FFF, 0) => {
                self.bank_select = data;
                self.update_offsets();
            }
            (0x8000..=0x9FFF, _) => {
                let index = (self.bank_select & 0x07) as usize;
                self.bank_regs[index] = data;
                self.update_offsets();
            }
            (0xA000..=0xBFFF, 0) => {
                self.mirroring = if data & 0x01 == 0 {
                    Mirroring::Vertical
                } else {
                    Mirroring::Horizontal
                };
            }
            (0xA000..=0xBFFF, _) => {
                self.prg_ram_protect = data & 0x40 != 0;
            }
            (0xC000..=0xDFFF, 0) => self.irq_latch = data,
            (0xC000..=0xDFFF, _) => {
                // Clearing the counter makes the next clock reload it.
                self.irq_counter = 0;
                self.irq_reload = true;
            }
            (_, 0) => {
                self.irq_enabled = false;
                self.irq_pending = false;
            }
            (_, _) => self.irq_enabled = true,
        }
    }

    /// One IRQ-counter clock, corresponding to a debounced A12 rising edge.
    fn clock_irq_counter(&mut self) {
        if self.irq_reload || self.irq_counter == 0 {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }

        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_pending = true;
        }
    }
}

impl Mapper for Mapper4 {
    fn cpu_read(&self, cart: &Cartridge, addr: u16) -> Result<u8, Error> {
        let value = match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                cart.read_prg_ram((addr - cpu_mem::PRG_RAM_START) as usize)
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => {
                let window = ((addr - cpu_mem::PRG_ROM_START) >> 13) as usize;
                cart.read_prg_rom(self.prg_offsets[window] + (addr & 0x1FFF) as usize)
            }
            _ => 0,
        };
        Ok(value)
    }

    fn cpu_write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) -> Result<(), Error> {
        match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                if !self.prg_ram_protect {
                    cart.write_prg_ram((addr - cpu_mem::PRG_RAM_START) as usize, data);
                }
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => self.write_register(addr, data),
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

    fn tick(&mut self, dot: PpuDot) {
        if !dot.rendering || dot.cycle != IRQ_CLOCK_DOT {
            return;
        }
        // Visible scanlines and the pre-render line clock the counter.
        if dot.scanline <= 239 {
            self.clock_irq_counter();
        }
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn clear_irq(&mut self) {
        self.irq_pending = false;
    }

    fn reset(&mut self) {
        self.bank_select = 0;
        self.bank_regs = [0; 8];
        self.prg_ram_protect = false;
        self.mirroring = self.base_mirroring;
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_reload = false;
        self.irq_enabled = false;
        self.irq_pending = false;
        self.update_offsets();
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_id(&self) -> u16 {
        4
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("MMC3")
    }

    fn save_state(&self) -> MapperState {
        MapperState::Mmc3(Mapper4State {
            bank_select: self.bank_select,
            bank_regs: self.bank_regs,
            mirroring: self.mirroring,
            prg_ram_protect: self.prg_ram_protect,
            irq_latch: self.irq_latch,
            irq_counter: self.irq_counter,
            irq_reload: self.irq_reload,
            irq_enabled: self.irq_enabled,
            irq_pending: self.irq_pending,
        })
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), Error> {
        match state {
            MapperState::Mmc3(s) => {
                self.bank_select = s.bank_select;
                self.bank_regs = s.bank_regs;
                self.mirroring = s.mirroring;
                self.prg_ram_protect = s.prg_ram_protect;
                self.irq_latch = s.irq_latch;
                self.irq_counter = s.irq_counter;
                self.irq_reload = s.irq_reload;
                self.irq_enabled = s.irq_enabled;
                self.irq_pending = s.irq_pending;
                self.update_offsets();
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

    fn mmc3_cart(prg_8k_banks: usize) -> Cartridge {
        let prg_16k = (prg_8k_banks / 2) as u8;
        let mut rom = vec![
            b'N', b'E', b'S', 0x1A, prg_16k, 1, 0b0100_0000, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        for bank in 0..prg_8k_banks {
            rom.extend(vec![bank as u8; PRG_BANK_SIZE_8K]);
        }
        for bank in 0..8u8 {
            rom.extend(vec![0xC0 | bank; CHR_BANK_SIZE_1K]);
        }
        load_cartridge(&rom).expect("cartridge")
    }

    fn select_bank(mapper: &mut Mapper4, cart: &mut Cartridge, reg: u8, value: u8) {
        mapper.cpu_write(cart, 0x8000, reg).expect("bank select");
        mapper.cpu_write(cart, 0x8001, value).expect("bank data");
    }

    #[test]
    fn prg_mode_0_fixes_upper_windows() {
        let mut cart = mmc3_cart(8);
        let mut mapper = Mapper4::new(cart.header());

        select_bank(&mut mapper, &mut cart, 6, 2);
        select_bank(&mut mapper, &mut cart, 7, 5);

        assert_eq!(mapper.cpu_read(&cart, 0x8000).expect("read"), 2);
        assert_eq!(mapper.cpu_read(&cart, 0xA000).expect("read"), 5);
        assert_eq!(mapper.cpu_read(&cart, 0xC000).expect("read"), 6);
        assert_eq!(mapper.cpu_read(&cart, 0xE000).expect("read"), 7);
    }

    #[test]
    fn prg_mode_1_swaps_the_anchored_window() {
        let mut cart = mmc3_cart(8);
        let mut mapper = Mapper4::new(cart.header());

        select_bank(&mut mapper, &mut cart, 6, 2);
        mapper.cpu_write(&mut cart, 0x8000, 0x46).expect("mode bit");

        assert_eq!(mapper.cpu_read(&cart, 0x8000).expect("read"), 6);
        assert_eq!(mapper.cpu_read(&cart, 0xC000).expect("read"), 2);
        assert_eq!(mapper.cpu_read(&cart, 0xE000).expect("read"), 7);
    }

    #[test]
    fn chr_inversion_swaps_pair_and_single_windows() {
        let mut cart = mmc3_cart(4);
        let mut mapper = Mapper4::new(cart.header());

        select_bank(&mut mapper, &mut cart, 0, 2); // 2 KiB pair -> banks 2,3
        select_bank(&mut mapper, &mut cart, 2, 5); // 1 KiB -> bank 5

        assert_eq!(mapper.ppu_read(&cart, 0x0000).expect("read"), 0xC2);
        assert_eq!(mapper.ppu_read(&cart, 0x0400).expect("read"), 0xC3);
        assert_eq!(mapper.ppu_read(&cart, 0x1000).expect("read"), 0xC5);

        // Invert A12: the pair moves to $1000, the single to $0000.
        mapper.cpu_write(&mut cart, 0x8000, 0x80).expect("invert");
        assert_eq!(mapper.ppu_read(&cart, 0x1000).expect("read"), 0xC2);
        assert_eq!(mapper.ppu_read(&cart, 0x0000).expect("read"), 0xC5);
    }

    #[test]
    fn irq_counter_reloads_then_fires_at_zero() {
        let mut cart = mmc3_cart(4);
        let mut mapper = Mapper4::new(cart.header());

        mapper.cpu_write(&mut cart, 0xC000, 2).expect("latch");
        mapper.cpu_write(&mut cart, 0xC001, 0).expect("reload");
        mapper.cpu_write(&mut cart, 0xE001, 0).expect("enable");

        let dot = |scanline| PpuDot {
            scanline,
            cycle: IRQ_CLOCK_DOT,
            rendering: true,
        };

        mapper.tick(dot(0)); // reload to 2
        assert!(!mapper.irq_pending());
        mapper.tick(dot(1)); // 1
        assert!(!mapper.irq_pending());
        mapper.tick(dot(2)); // 0 -> IRQ
        assert!(mapper.irq_pending());

        mapper.clear_irq();
        assert!(!mapper.irq_pending());
    }

    #[test]
    fn irq_counter_ignores_dots_outside_the_clock_point() {
        let mut cart = mmc3_cart(4);
        let mut mapper = Mapper4::new(cart.header());

        mapper.cpu_write(&mut cart, 0xC000, 1).expect("latch");
        mapper.cpu_write(&mut cart, 0xC001, 0).expect("reload");
        mapper.cpu_write(&mut cart, 0xE001, 0).expect("enable");

        mapper.tick(PpuDot {
            scanline: 0,
            cycle: 100,
            rendering: true,
        });
        mapper.tick(PpuDot {
            scanline: 250,
            cycle: IRQ_CLOCK_DOT,
            rendering: true,
        });
        mapper.tick(PpuDot {
            scanline: 0,
            cycle: IRQ_CLOCK_DOT,
            rendering: false,
        });
        assert!(!mapper.irq_pending());
    }

    #[test]
    fn disabling_irqs_acknowledges_pending_line() {
        let mut cart = mmc3_cart(4);
        let mut mapper = Mapper4::new(cart.header());

        mapper.cpu_write(&mut cart, 0xC000, 0).expect("latch");
        mapper.cpu_write(&mut cart, 0xE001, 0).expect("enable");
        mapper.tick(PpuDot {
            scanline: 5,
            cycle: IRQ_CLOCK_DOT,
            rendering: true,
        });
        assert!(mapper.irq_pending());

        mapper.cpu_write(&mut cart, 0xE000, 0).expect("disable");
        assert!(!mapper.irq_pending());
    }
}
