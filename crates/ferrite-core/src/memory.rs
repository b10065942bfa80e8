//! Shared definitions for the NES memory map.
//!
//! Centralizing address-related constants keeps the hardware layout in one
//! location, prevents magic numbers from sneaking into other modules, and
//! makes it easier to reference the original console documentation while
//! reading the code base.

/// CPU memory map details.
pub mod cpu {
    /// First address of the hardware stack page.
    pub const STACK_PAGE_START: u16 = 0x0100;

    /// NMI vector low byte address (`$FFFA`).
    pub const NMI_VECTOR: u16 = 0xFFFA;
    /// Reset vector low byte address (`$FFFC`).
    pub const RESET_VECTOR: u16 = 0xFFFC;
    /// IRQ/BRK vector low byte address (`$FFFE`).
    pub const IRQ_VECTOR: u16 = 0xFFFE;

    /// Size of the CPU internal RAM block (2 KiB mirrored through `$1FFF`).
    pub const INTERNAL_RAM_SIZE: usize = 0x0800;
    /// Last mirrored internal RAM address visible to the CPU (`$1FFF`).
    pub const INTERNAL_RAM_MIRROR_END: u16 = 0x1FFF;
    /// Mask applied to mirror CPU RAM accesses within `$0000-$1FFF`.
    pub const INTERNAL_RAM_MASK: u16 = (INTERNAL_RAM_SIZE as u16) - 1;

    /// First CPU address mapped to the PPU register mirror.
    pub const PPU_REGISTER_BASE: u16 = 0x2000;
    /// Last CPU address mirrored to the PPU register set.
    pub const PPU_REGISTER_END: u16 = 0x3FFF;

    /// First address of the APU/I-O register block (stubbed; no APU here).
    pub const IO_REGISTER_BASE: u16 = 0x4000;
    /// Last address of the APU/I-O register block.
    pub const IO_REGISTER_END: u16 = 0x4017;
    /// OAM DMA source-page register (`$4014`).
    pub const OAM_DMA: u16 = 0x4014;
    /// Controller port 1 strobe/read address (`$4016`).
    pub const CONTROLLER_PORT_1: u16 = 0x4016;
    /// Controller port 2 read address (`$4017`).
    pub const CONTROLLER_PORT_2: u16 = 0x4017;

    /// Disabled diagnostics I/O range; reads as open bus.
    pub const TEST_MODE_BASE: u16 = 0x4018;
    /// End of the disabled diagnostics I/O range.
    pub const TEST_MODE_END: u16 = 0x401F;

    /// First address handled by the cartridge expansion / PRG window.
    pub const CARTRIDGE_SPACE_BASE: u16 = 0x4020;
    /// Expansion RAM window end address (inclusive).
    pub const EXPANSION_END: u16 = 0x5FFF;
    /// PRG RAM window start address (`$6000`).
    pub const PRG_RAM_START: u16 = 0x6000;
    /// PRG RAM window end address (inclusive).
    pub const PRG_RAM_END: u16 = 0x7FFF;
    /// PRG ROM window start address (`$8000`).
    pub const PRG_ROM_START: u16 = 0x8000;
    /// Final CPU-visible address (`$FFFF`).
    pub const CPU_ADDR_END: u16 = 0xFFFF;
}

/// PPU register layout and VRAM mirror rules.
pub mod ppu {
    /// Mask for decoding register mirrors (`addr & 0x0007`).
    pub const REGISTER_SELECT_MASK: u16 = 0x0007;

    /// Size of the internal nametable RAM (CIRAM). The NES has 2 KiB of
    /// CIRAM mapped into `$2000-$2FFF` with mirroring controlled by the
    /// cartridge; pattern table space is provided by cartridge CHR ROM/RAM.
    pub const CIRAM_SIZE: usize = 0x0800;

    /// Address mask applied to wrap PPU VRAM accesses to the 16 KiB space.
    pub const VRAM_MIRROR_MASK: u16 = 0x3FFF;

    /// Last address routed to CHR pattern tables (`$1FFF`).
    pub const PATTERN_END: u16 = 0x1FFF;
    /// Last address routed to the nametables before palette space begins.
    pub const NAMETABLE_END: u16 = 0x3EFF;

    /// Palette RAM base address (`$3F00`).
    pub const PALETTE_BASE: u16 = 0x3F00;
    /// Palette RAM byte count (32 bytes mirrored every 32 bytes).
    pub const PALETTE_RAM_SIZE: usize = 0x20;
    /// Palette mirroring period.
    pub const PALETTE_STRIDE: u16 = 0x20;

    /// Base address of nametable 0.
    pub const NAMETABLE_BASE: u16 = 0x2000;
    /// Size of a single nametable in bytes.
    pub const NAMETABLE_SIZE: u16 = 0x0400;

    /// Pattern table base address for table 0.
    pub const PATTERN_TABLE_0: u16 = 0x0000;
    /// Pattern table base address for table 1.
    pub const PATTERN_TABLE_1: u16 = 0x1000;

    /// Primary Object Attribute Memory (OAM) byte count.
    pub const OAM_RAM_SIZE: usize = 0x100;

    /// Horizontal resolution of the output frame.
    pub const SCREEN_WIDTH: usize = 256;
    /// Vertical resolution of the output frame.
    pub const SCREEN_HEIGHT: usize = 240;
    /// Framebuffer size in palette-index bytes.
    pub const SCREEN_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

    /// Dots per scanline (0..=340).
    pub const CYCLES_PER_SCANLINE: u16 = 340;
    /// Last scanline index before wrapping back to the pre-render line.
    pub const LAST_SCANLINE: i16 = 260;

    /// CPU-visible PPU register identifiers.
    #[repr(u16)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Register {
        /// `$2000` - PPUCTRL
        Control = 0x2000,
        /// `$2001` - PPUMASK
        Mask = 0x2001,
        /// `$2002` - PPUSTATUS
        Status = 0x2002,
        /// `$2003` - OAMADDR
        OamAddr = 0x2003,
        /// `$2004` - OAMDATA
        OamData = 0x2004,
        /// `$2005` - PPUSCROLL
        Scroll = 0x2005,
        /// `$2006` - PPUADDR
        Addr = 0x2006,
        /// `$2007` - PPUDATA
        Data = 0x2007,
    }

    impl Register {
        /// Raw address backing the register.
        pub const fn addr(self) -> u16 {
            self as u16
        }

        /// Resolves the canonical register for a CPU address in `$2000-$3FFF`.
        pub const fn from_cpu_addr(addr: u16) -> Self {
            match addr & REGISTER_SELECT_MASK {
                0 => Self::Control,
                1 => Self::Mask,
                2 => Self::Status,
                3 => Self::OamAddr,
                4 => Self::OamData,
                5 => Self::Scroll,
                6 => Self::Addr,
                _ => Self::Data,
            }
        }
    }
}
