//! CPU- and PPU-side memory buses.
//!
//! Both buses are pure address decoders over state owned elsewhere: the
//! console's internal RAM, the PPU, the controllers, and the cartridge with
//! its mapper. The CPU bus is a borrow-splitting view constructed for the
//! duration of one CPU step.

mod cpu;
mod ppu;

pub use cpu::CpuBus;
pub use ppu::PpuBus;
