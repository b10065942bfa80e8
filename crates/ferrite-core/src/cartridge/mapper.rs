//! Bank-switching boards ("mappers").
//!
//! Each board is a distinct bit-level protocol, not a configuration of a
//! shared one, so every variant lives in its own module behind the single
//! [`Mapper`] capability trait. The cartridge owns the byte arrays; a mapper
//! only holds its bank-select registers and the byte offsets derived from
//! them.

use std::borrow::Cow;
use std::fmt::Debug;

use dyn_clone::DynClone;
use tracing::debug;

use crate::{
    cartridge::{
        Cartridge,
        header::{Header, Mirroring},
    },
    error::Error,
    memory::ppu as ppu_mem,
};

mod mapper0;
mod mapper1;
mod mapper2;
mod mapper3;
mod mapper4;
mod mapper7;
mod mapper11;
mod mapper66;
mod mapper185;

pub use mapper0::Mapper0;
pub use mapper1::{Mapper1, Mapper1State};
pub use mapper2::{Mapper2, Mapper2State};
pub use mapper3::{Mapper3, Mapper3State};
pub use mapper4::{Mapper4, Mapper4State};
pub use mapper7::{Mapper7, Mapper7State};
pub use mapper11::{Mapper11, Mapper11State};
pub use mapper66::{Mapper66, Mapper66State};
pub use mapper185::{Mapper185, Mapper185State};

/// Raster position handed to [`Mapper::tick`] once per PPU dot.
///
/// Boards that raise scanline interrupts (MMC3) key off this instead of
/// holding a back-reference to the PPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpuDot {
    /// Current scanline; `-1` is the pre-render line, `0..=239` visible.
    pub scanline: i16,
    /// Current dot within the scanline (0..=340).
    pub cycle: u16,
    /// Whether background or sprite rendering is enabled.
    pub rendering: bool,
}

/// Capability contract every board implements.
///
/// CPU-side traffic covers `$4020-$FFFF`: `$6000-$7FFF` is PRG RAM where the
/// board has it, `$8000-$FFFF` is banked PRG ROM, and anything the board does
/// not decode is open bus (reads 0, writes ignored). PPU-side traffic covers
/// CHR space `$0000-$1FFF`.
pub trait Mapper: DynClone + Debug + Send {
    /// CPU read in the cartridge window (`$4020-$FFFF`).
    fn cpu_read(&self, cart: &Cartridge, addr: u16) -> Result<u8, Error>;

    /// CPU write in the cartridge window. Register writes mutate bank state.
    fn cpu_write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) -> Result<(), Error>;

    /// PPU read in CHR space (`$0000-$1FFF`).
    fn ppu_read(&self, cart: &Cartridge, addr: u16) -> Result<u8, Error>;

    /// PPU write in CHR space. Fails with `ReadOnlyMemory` on CHR ROM boards.
    fn ppu_write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) -> Result<(), Error>;

    /// Invoked once per PPU dot. Default no-op.
    fn tick(&mut self, _dot: PpuDot) {}

    /// Translates a nametable address (`$2000-$3EFF`) into a CIRAM index by
    /// applying the active mirroring layout.
    fn vram_index(&self, addr: u16) -> usize {
        mirror_vram_index(self.mirroring(), addr)
    }

    /// Active nametable mirroring; some boards rewrite this at runtime.
    fn mirroring(&self) -> Mirroring;

    /// Whether the board is asserting the CPU IRQ line.
    fn irq_pending(&self) -> bool {
        false
    }

    /// Deasserts the IRQ line after the console has latched it.
    fn clear_irq(&mut self) {}

    /// Returns bank state to its power-on configuration.
    fn reset(&mut self) {}

    /// iNES mapper number implemented by this board.
    fn mapper_id(&self) -> u16;

    /// Human-readable board name.
    fn name(&self) -> Cow<'static, str>;

    /// Captures every register, counter, and in-flight latch.
    fn save_state(&self) -> MapperState;

    /// Restores a snapshot captured by [`Mapper::save_state`].
    fn load_state(&mut self, state: &MapperState) -> Result<(), Error>;
}

dyn_clone::clone_trait_object!(Mapper);

/// Closed set of per-board snapshots used by the save-state bundle.
#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapperState {
    Nrom,
    Mmc1(Mapper1State),
    Uxrom(Mapper2State),
    Cnrom(Mapper3State),
    Mmc3(Mapper4State),
    Axrom(Mapper7State),
    ColorDreams(Mapper11State),
    Gxrom(Mapper66State),
    Mapper185(Mapper185State),
}

/// Builds the board for the header's mapper number.
pub fn select_mapper(header: &Header) -> Result<Box<dyn Mapper>, Error> {
    let mapper: Box<dyn Mapper> = match header.mapper {
        0 => Box::new(Mapper0::new(header)),
        1 => Box::new(Mapper1::new(header)),
        2 => Box::new(Mapper2::new(header)),
        3 => Box::new(Mapper3::new(header)),
        4 => Box::new(Mapper4::new(header)),
        7 => Box::new(Mapper7::new(header)),
        11 => Box::new(Mapper11::new(header)),
        66 => Box::new(Mapper66::new(header)),
        185 => Box::new(Mapper185::new(header)),
        other => return Err(Error::UnsupportedMapper { mapper: other }),
    };
    debug!(mapper = header.mapper, board = %mapper.name(), "mapper selected");
    Ok(mapper)
}

/// Maps a nametable address to a CIRAM byte index under the given layout.
///
/// The four 1 KiB nametable pages in `$2000-$2FFF` collapse onto the two
/// physical CIRAM pages (or one of them, for single-screen boards).
pub fn mirror_vram_index(mode: Mirroring, addr: u16) -> usize {
    let addr = (addr - ppu_mem::NAMETABLE_BASE) & 0x0FFF;
    let page = (addr / ppu_mem::NAMETABLE_SIZE) as usize;
    let offset = (addr & (ppu_mem::NAMETABLE_SIZE - 1)) as usize;

    let physical = match mode {
        Mirroring::Horizontal => [0, 0, 1, 1][page],
        Mirroring::Vertical => [0, 1, 0, 1][page],
        Mirroring::SingleScreenLower => 0,
        Mirroring::SingleScreenUpper => 1,
    };
    physical * ppu_mem::NAMETABLE_SIZE as usize + offset
}

/// The state snapshot names a different board than the live mapper.
pub(crate) fn state_mismatch() -> Error {
    Error::StateMismatch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_mirroring_pairs_pages() {
        let m = Mirroring::Horizontal;
        assert_eq!(mirror_vram_index(m, 0x2000), mirror_vram_index(m, 0x2400));
        assert_eq!(mirror_vram_index(m, 0x2800), mirror_vram_index(m, 0x2C00));
        assert_ne!(mirror_vram_index(m, 0x2000), mirror_vram_index(m, 0x2800));
    }

    #[test]
    fn vertical_mirroring_pairs_pages() {
        let m = Mirroring::Vertical;
        assert_eq!(mirror_vram_index(m, 0x2000), mirror_vram_index(m, 0x2800));
        assert_eq!(mirror_vram_index(m, 0x2400), mirror_vram_index(m, 0x2C00));
        assert_ne!(mirror_vram_index(m, 0x2000), mirror_vram_index(m, 0x2400));
    }

    #[test]
    fn single_screen_collapses_all_pages() {
        for addr in [0x2000u16, 0x2400, 0x2800, 0x2C00] {
            assert_eq!(
                mirror_vram_index(Mirroring::SingleScreenLower, addr + 0x21),
                0x21
            );
            assert_eq!(
                mirror_vram_index(Mirroring::SingleScreenUpper, addr + 0x21),
                0x400 + 0x21
            );
        }
    }

    #[test]
    fn mirrors_3000_range_onto_nametables() {
        let m = Mirroring::Vertical;
        assert_eq!(mirror_vram_index(m, 0x3000), mirror_vram_index(m, 0x2000));
        assert_eq!(mirror_vram_index(m, 0x3EFF), mirror_vram_index(m, 0x2EFF));
    }
}
