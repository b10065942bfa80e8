//! Save-state snapshots.
//!
//! A snapshot is the opaque bundle of every mutable register, counter, and
//! RAM block in the console: loading one immediately after saving restores
//! bit-identical state, including in-flight MMC1 shift registers and MMC3
//! IRQ counters. Serialization to bytes/disk stays outside the core; the
//! structs derive `serde` under the `savestate-serde` feature and gain a
//! `postcard` byte codec under `savestate-postcard`.

use crate::{
    Console,
    cartridge::{Cartridge, MapperState},
    controller::Controller,
    cpu::{Cpu, status::Status as CpuStatus},
    error::Error,
    memory::{cpu as cpu_mem, ppu as ppu_mem},
    ppu::{
        Ppu, SpriteLine,
        registers::{Control, Mask, Status, VramAddr},
    },
};

/// Metadata attached to every snapshot for compatibility checks.
#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotMeta {
    /// Version of the snapshot payload layout.
    pub format_version: u32,
    /// Mapper number of the cartridge the snapshot was taken against.
    pub mapper: u16,
    /// PRG ROM CRC-32 of that cartridge.
    pub prg_crc32: u32,
}

/// Bundles snapshot metadata with a payload.
#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T, M = SnapshotMeta> {
    pub meta: M,
    pub data: T,
}

/// Save/load contract implemented by the console.
pub trait SaveState {
    type State;

    /// Version tag for the current snapshot layout.
    const FORMAT_VERSION: u32 = 1;

    fn save(&self) -> Result<Snapshot<Self::State>, Error>;
    fn load(&mut self, snapshot: &Snapshot<Self::State>) -> Result<(), Error>;
}

/// Serializable snapshot of the CPU core.
#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    /// Raw status register bits (NV-BDIZC).
    pub p: u8,
    pub pc: u16,
    pub pending_nmi: bool,
    pub nmi_delay: u8,
    pub pending_irq: bool,
    pub stall: u32,
    pub cycles: u64,
}

/// Serializable snapshot of the PPU, including the bus-side VRAM blocks.
#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpuState {
    pub control: u8,
    pub mask: u8,
    pub status: u8,
    pub oam_addr: u8,
    pub oam: Vec<u8>,
    pub vram_buffer: u8,
    pub last_write: u8,
    pub v: u16,
    pub t: u16,
    pub x: u8,
    pub w: bool,
    pub cycle: u16,
    pub scanline: i16,
    pub frame: u64,
    pub odd_frame: bool,
    pub nt_byte: u8,
    pub at_byte: u8,
    pub pattern_lo: u8,
    pub pattern_hi: u8,
    pub tile_shift: u64,
    pub sprite_count: u8,
    pub sprite_patterns: [u32; 8],
    pub sprite_positions: [u8; 8],
    pub sprite_priorities: [u8; 8],
    pub sprite_indexes: [u8; 8],
    pub nmi_request: bool,
    pub ciram: Vec<u8>,
    pub palette_ram: Vec<u8>,
}

/// Writable cartridge contents (ROM sections are never snapshotted).
#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeState {
    pub prg_ram: Vec<u8>,
    pub chr_ram: Option<Vec<u8>>,
    pub exp_ram: Vec<u8>,
}

/// Full console snapshot.
#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleState {
    pub cpu: CpuState,
    pub ppu: PpuState,
    pub ram: Vec<u8>,
    pub cartridge: CartridgeState,
    pub mapper: MapperState,
    pub controllers: [Controller; 2],
    pub oam_dma: Option<u8>,
}

/// Convenience alias for the console's snapshot bundle.
pub type ConsoleSnapshot = Snapshot<ConsoleState>;

impl SaveState for Console {
    type State = ConsoleState;

    fn save(&self) -> Result<Snapshot<Self::State>, Error> {
        let cart = self.cartridge.as_ref().ok_or(Error::NoCartridge)?;
        let mapper = self.mapper.as_ref().ok_or(Error::NoCartridge)?;

        let meta = SnapshotMeta {
            format_version: Self::FORMAT_VERSION,
            mapper: cart.header().mapper,
            prg_crc32: cart.prg_crc32(),
        };
        let state = ConsoleState {
            cpu: cpu_to_state(&self.cpu),
            ppu: ppu_to_state(&self.ppu),
            ram: self.ram.as_slice().to_vec(),
            cartridge: cartridge_to_state(cart),
            mapper: mapper.save_state(),
            controllers: self.controllers,
            oam_dma: self.oam_dma,
        };
        Ok(Snapshot { meta, data: state })
    }

    fn load(&mut self, snapshot: &Snapshot<Self::State>) -> Result<(), Error> {
        let cart = self.cartridge.as_mut().ok_or(Error::NoCartridge)?;
        let mapper = self.mapper.as_mut().ok_or(Error::NoCartridge)?;

        if snapshot.meta.mapper != cart.header().mapper
            || snapshot.meta.prg_crc32 != cart.prg_crc32()
        {
            return Err(Error::StateMismatch);
        }

        let state = &snapshot.data;
        if state.ram.len() != cpu_mem::INTERNAL_RAM_SIZE {
            return Err(Error::StateMismatch);
        }

        state_to_cpu(&mut self.cpu, &state.cpu);
        state_to_ppu(&mut self.ppu, &state.ppu)?;
        self.ram.as_mut_slice().copy_from_slice(&state.ram);
        state_to_cartridge(cart, &state.cartridge)?;
        mapper.load_state(&state.mapper)?;
        self.controllers = state.controllers;
        self.oam_dma = state.oam_dma;
        Ok(())
    }
}

fn cpu_to_state(cpu: &Cpu) -> CpuState {
    CpuState {
        a: cpu.a,
        x: cpu.x,
        y: cpu.y,
        s: cpu.s,
        p: cpu.p.bits(),
        pc: cpu.pc,
        pending_nmi: cpu.pending_nmi,
        nmi_delay: cpu.nmi_delay,
        pending_irq: cpu.pending_irq,
        stall: cpu.stall,
        cycles: cpu.cycles,
    }
}

fn state_to_cpu(cpu: &mut Cpu, state: &CpuState) {
    cpu.a = state.a;
    cpu.x = state.x;
    cpu.y = state.y;
    cpu.s = state.s;
    cpu.p = CpuStatus::from_bits_truncate(state.p);
    cpu.pc = state.pc;
    cpu.pending_nmi = state.pending_nmi;
    cpu.nmi_delay = state.nmi_delay;
    cpu.pending_irq = state.pending_irq;
    cpu.stall = state.stall;
    cpu.cycles = state.cycles;
}

fn ppu_to_state(ppu: &Ppu) -> PpuState {
    PpuState {
        control: ppu.regs.control.bits(),
        mask: ppu.regs.mask.bits(),
        status: ppu.regs.status.bits(),
        oam_addr: ppu.regs.oam_addr,
        oam: ppu.regs.oam.as_slice().to_vec(),
        vram_buffer: ppu.regs.vram_buffer,
        last_write: ppu.regs.last_write,
        v: ppu.regs.vram.v.raw(),
        t: ppu.regs.vram.t.raw(),
        x: ppu.regs.vram.x,
        w: ppu.regs.vram.w,
        cycle: ppu.cycle,
        scanline: ppu.scanline,
        frame: ppu.frame,
        odd_frame: ppu.odd_frame,
        nt_byte: ppu.nt_byte,
        at_byte: ppu.at_byte,
        pattern_lo: ppu.pattern_lo,
        pattern_hi: ppu.pattern_hi,
        tile_shift: ppu.tile_shift,
        sprite_count: ppu.sprites.count,
        sprite_patterns: ppu.sprites.patterns,
        sprite_positions: ppu.sprites.positions,
        sprite_priorities: ppu.sprites.priorities,
        sprite_indexes: ppu.sprites.indexes,
        nmi_request: ppu.nmi_request,
        ciram: ppu.bus.ciram().to_vec(),
        palette_ram: ppu.bus.palette_ram().to_vec(),
    }
}

fn state_to_ppu(ppu: &mut Ppu, state: &PpuState) -> Result<(), Error> {
    if state.oam.len() != ppu_mem::OAM_RAM_SIZE
        || state.ciram.len() != ppu_mem::CIRAM_SIZE
        || state.palette_ram.len() != ppu_mem::PALETTE_RAM_SIZE
    {
        return Err(Error::StateMismatch);
    }

    ppu.regs.control = Control::from_bits_retain(state.control);
    ppu.regs.mask = Mask::from_bits_retain(state.mask);
    ppu.regs.status = Status::from_bits_truncate(state.status);
    ppu.regs.oam_addr = state.oam_addr;
    ppu.regs.oam.as_mut_slice().copy_from_slice(&state.oam);
    ppu.regs.vram_buffer = state.vram_buffer;
    ppu.regs.last_write = state.last_write;
    ppu.regs.vram.v = VramAddr::from(state.v);
    ppu.regs.vram.t = VramAddr::from(state.t);
    ppu.regs.vram.x = state.x;
    ppu.regs.vram.w = state.w;
    ppu.cycle = state.cycle;
    ppu.scanline = state.scanline;
    ppu.frame = state.frame;
    ppu.odd_frame = state.odd_frame;
    ppu.nt_byte = state.nt_byte;
    ppu.at_byte = state.at_byte;
    ppu.pattern_lo = state.pattern_lo;
    ppu.pattern_hi = state.pattern_hi;
    ppu.tile_shift = state.tile_shift;
    ppu.sprites = SpriteLine {
        count: state.sprite_count,
        patterns: state.sprite_patterns,
        positions: state.sprite_positions,
        priorities: state.sprite_priorities,
        indexes: state.sprite_indexes,
    };
    ppu.nmi_request = state.nmi_request;
    ppu.bus.ciram_mut().copy_from_slice(&state.ciram);
    ppu.bus.palette_ram_mut().copy_from_slice(&state.palette_ram);
    Ok(())
}

fn cartridge_to_state(cart: &Cartridge) -> CartridgeState {
    CartridgeState {
        prg_ram: cart.prg_ram().to_vec(),
        chr_ram: cart.chr_ram().map(<[u8]>::to_vec),
        exp_ram: cart.exp_ram().to_vec(),
    }
}

fn state_to_cartridge(cart: &mut Cartridge, state: &CartridgeState) -> Result<(), Error> {
    if state.prg_ram.len() != cart.prg_ram().len()
        || state.exp_ram.len() != cart.exp_ram().len()
    {
        return Err(Error::StateMismatch);
    }
    cart.prg_ram_mut().copy_from_slice(&state.prg_ram);
    cart.exp_ram_mut().copy_from_slice(&state.exp_ram);

    match (cart.chr_ram_mut(), state.chr_ram.as_ref()) {
        (Some(live), Some(saved)) if live.len() == saved.len() => {
            live.copy_from_slice(saved);
        }
        (None, None) => {}
        _ => return Err(Error::StateMismatch),
    }
    Ok(())
}

#[cfg(feature = "savestate-postcard")]
impl ConsoleSnapshot {
    /// Encodes the snapshot with `postcard`.
    pub fn to_bytes(&self) -> postcard::Result<Vec<u8>> {
        postcard::to_stdvec(self)
    }

    /// Decodes a snapshot produced by [`ConsoleSnapshot::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> postcard::Result<Self> {
        postcard::from_bytes(bytes)
    }
}
