//! Ferrite core: cycle-stepped NES console emulation.
//!
//! The [`Console`] owns one CPU, one PPU, the 2 KiB internal RAM, two
//! controllers, and the inserted cartridge with its mapper, and drives them
//! in the hardware ratio of three PPU dots per CPU cycle. Hosts call
//! [`Console::run_frame`] once per video frame and receive the finished
//! 256x240 palette-index framebuffer through the draw callback; everything
//! else (windowing, input polling, pacing threads, persistence) lives
//! outside this crate.

use std::path::Path;

use tracing::{debug, trace};

use crate::{
    bus::CpuBus,
    cartridge::{Cartridge, Mapper, select_mapper},
    controller::{Button, Controller},
    cpu::{Bus, Cpu},
    error::Error,
    mem_block::cpu as cpu_ram,
    memory::{cpu as cpu_mem, ppu as ppu_mem},
    ppu::Ppu,
};

pub mod bus;
pub mod cartridge;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod mem_block;
pub mod memory;
pub mod ppu;
pub mod state;

pub use state::{ConsoleSnapshot, SaveState};

/// Framebuffer byte count handed to the draw callback.
pub const FRAME_SIZE: usize = ppu_mem::SCREEN_SIZE;

/// Host callback receiving each completed frame as palette indices (0-63).
pub type DrawCallback = Box<dyn FnMut(&[u8; FRAME_SIZE]) + Send>;

/// Explicit construction-time configuration; there are no global settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleConfig {
    /// Emit a `trace!` event per executed CPU instruction.
    pub trace_cpu: bool,
    /// Emit a `trace!` event per completed frame.
    pub trace_frames: bool,
}

/// The whole console: every component the emulation needs, wired together.
pub struct Console {
    pub(crate) cpu: Cpu,
    pub(crate) ppu: Ppu,
    pub(crate) ram: cpu_ram::Ram,
    pub(crate) cartridge: Option<Cartridge>,
    pub(crate) mapper: Option<Box<dyn Mapper>>,
    pub(crate) controllers: [Controller; 2],
    /// OAM DMA page latched by a `$4014` write, consumed by the CPU core.
    pub(crate) oam_dma: Option<u8>,
    config: ConsoleConfig,
    draw: Option<DrawCallback>,
}

impl Console {
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            cpu: Cpu::new(),
            ppu: Ppu::new(),
            ram: cpu_ram::Ram::new(),
            cartridge: None,
            mapper: None,
            controllers: [Controller::new(), Controller::new()],
            oam_dma: None,
            config,
            draw: None,
        }
    }

    /// Registers the host's per-frame framebuffer callback.
    pub fn set_draw_callback(&mut self, callback: DrawCallback) {
        self.draw = Some(callback);
    }

    /// Parses an iNES image, selects its mapper, and power-cycles the
    /// console. Any previously inserted cartridge is ejected first.
    pub fn load_cartridge(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let cartridge = cartridge::load_cartridge(bytes)?;
        let mapper = select_mapper(cartridge.header())?;

        self.eject_cartridge();
        self.cartridge = Some(cartridge);
        self.mapper = Some(mapper);
        self.reset()?;
        debug!("cartridge inserted and console reset");
        Ok(())
    }

    /// Loads a cartridge image from disk.
    pub fn load_cartridge_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let bytes = std::fs::read(path)?;
        self.load_cartridge(&bytes)
    }

    /// Removes the current cartridge, leaving the console idle.
    pub fn eject_cartridge(&mut self) {
        if let Some(cart) = self.cartridge.as_mut() {
            cart.eject();
        }
        self.cartridge = None;
        self.mapper = None;
        self.cpu = Cpu::new();
        self.ppu.reset();
        self.ram.fill(0);
        self.oam_dma = None;
    }

    /// Full console reset: clears RAM and the PPU, returns the mapper to
    /// its power-on banks, and runs the CPU reset sequence.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.ram.fill(0);
        self.ppu.reset();
        self.oam_dma = None;

        let Some(cart) = self.cartridge.as_mut() else {
            self.cpu = Cpu::new();
            return Ok(());
        };
        let Some(mapper) = self.mapper.as_mut() else {
            return Err(Error::NoCartridge);
        };
        mapper.reset();

        let mut bus = CpuBus::new(
            &mut self.ram,
            &mut self.ppu,
            cart,
            mapper.as_mut(),
            &mut self.controllers,
            &mut self.oam_dma,
        );
        self.cpu.reset(&mut bus)
    }

    /// Executes one CPU step and the matching three PPU dots per cycle,
    /// transferring NMI and mapper IRQ edges to the CPU.
    pub fn step_instruction(&mut self) -> Result<u32, Error> {
        let Some(cart) = self.cartridge.as_mut() else {
            return Err(Error::NoCartridge);
        };
        let Some(mapper) = self.mapper.as_mut() else {
            return Err(Error::NoCartridge);
        };

        if self.config.trace_cpu {
            trace!(
                pc = format_args!("{:04X}", self.cpu.pc()),
                cycles = self.cpu.cycle_count(),
                "step"
            );
        }

        let cycles = {
            let mut bus = CpuBus::new(
                &mut self.ram,
                &mut self.ppu,
                cart,
                mapper.as_mut(),
                &mut self.controllers,
                &mut self.oam_dma,
            );
            self.cpu.step(&mut bus)?
        };

        for _ in 0..cycles * 3 {
            self.ppu.clock(cart, mapper.as_mut())?;
            if self.ppu.take_nmi() {
                self.cpu.trigger_nmi();
            }
            mapper.tick(self.ppu.dot());
            if mapper.irq_pending() {
                self.cpu.trigger_irq();
                mapper.clear_irq();
            }
        }

        Ok(cycles)
    }

    /// Runs the stepping loop until the PPU completes the current frame,
    /// then hands the framebuffer to the draw callback.
    ///
    /// The PPU flips its frame-parity flag exactly once per frame, so the
    /// loop watches for that edge rather than counting cycles.
    pub fn run_frame(&mut self) -> Result<(), Error> {
        let parity = self.ppu.frame_parity();
        while self.ppu.frame_parity() == parity {
            self.step_instruction()?;
        }

        if self.config.trace_frames {
            trace!(frame = self.ppu.frame_count(), "frame complete");
        }
        if let Some(draw) = self.draw.as_mut() {
            draw(self.ppu.frame_buffer());
        }
        Ok(())
    }

    /// Updates one button on one controller port (0 or 1).
    pub fn set_button(&mut self, port: usize, button: Button, pressed: bool) {
        if let Some(pad) = self.controllers.get_mut(port) {
            pad.set_button(button, pressed);
        }
    }

    /// Latest completed frame as palette indices.
    pub fn frame_buffer(&self) -> &[u8; FRAME_SIZE] {
        self.ppu.frame_buffer()
    }

    pub fn frame_count(&self) -> u64 {
        self.ppu.frame_count()
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    /// Current CPU program counter (debugger surface).
    pub fn cpu_pc(&self) -> u16 {
        self.cpu.pc()
    }

    /// Reads a CPU-visible byte without register side effects. PPU and I/O
    /// registers report their bus residue instead of performing the read.
    pub fn peek_cpu_byte(&self, addr: u16) -> Result<u8, Error> {
        let value = match addr {
            0x0000..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram[(addr & cpu_mem::INTERNAL_RAM_MASK) as usize]
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END
            | cpu_mem::IO_REGISTER_BASE..=cpu_mem::TEST_MODE_END => 0,
            cpu_mem::CARTRIDGE_SPACE_BASE..=cpu_mem::CPU_ADDR_END => {
                match (self.cartridge.as_ref(), self.mapper.as_ref()) {
                    (Some(cart), Some(mapper)) => mapper.cpu_read(cart, addr)?,
                    _ => return Err(Error::NoCartridge),
                }
            }
        };
        Ok(value)
    }

    /// Fills `buffer` with consecutive CPU-visible bytes starting at
    /// `base` (hex-viewer surface).
    pub fn peek_cpu_slice(&self, base: u16, buffer: &mut [u8]) -> Result<(), Error> {
        for (offset, byte) in buffer.iter_mut().enumerate() {
            *byte = self.peek_cpu_byte(base.wrapping_add(offset as u16))?;
        }
        Ok(())
    }

    /// Writes a byte through the full CPU bus decode (debugger surface).
    pub fn poke_cpu_byte(&mut self, addr: u16, data: u8) -> Result<(), Error> {
        let Some(cart) = self.cartridge.as_mut() else {
            return Err(Error::NoCartridge);
        };
        let Some(mapper) = self.mapper.as_mut() else {
            return Err(Error::NoCartridge);
        };
        let mut bus = CpuBus::new(
            &mut self.ram,
            &mut self.ppu,
            cart,
            mapper.as_mut(),
            &mut self.controllers,
            &mut self.oam_dma,
        );
        bus.write(addr, data)
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(ConsoleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use ctor::ctor;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    #[ctor]
    fn init_tracing() {
        let subscriber = FmtSubscriber::builder()
            .with_file(true)
            .with_line_number(true)
            .with_max_level(Level::DEBUG)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}
