//! CPU-visible bus: RAM, PPU registers, controller I/O, and the mapper.

use crate::{
    cartridge::{Cartridge, Mapper},
    controller::Controller,
    cpu::Bus,
    error::Error,
    mem_block::cpu as cpu_ram,
    memory::cpu as cpu_mem,
    ppu::Ppu,
};

/// Borrowed view over everything the CPU can address.
pub struct CpuBus<'a> {
    ram: &'a mut cpu_ram::Ram,
    ppu: &'a mut Ppu,
    cartridge: &'a mut Cartridge,
    mapper: &'a mut dyn Mapper,
    controllers: &'a mut [Controller; 2],
    /// Source page latched by a `$4014` write, consumed by the CPU core.
    oam_dma: &'a mut Option<u8>,
}

impl<'a> CpuBus<'a> {
    pub(crate) fn new(
        ram: &'a mut cpu_ram::Ram,
        ppu: &'a mut Ppu,
        cartridge: &'a mut Cartridge,
        mapper: &'a mut dyn Mapper,
        controllers: &'a mut [Controller; 2],
        oam_dma: &'a mut Option<u8>,
    ) -> Self {
        Self {
            ram,
            ppu,
            cartridge,
            mapper,
            controllers,
            oam_dma,
        }
    }
}

impl Bus for CpuBus<'_> {
    fn read(&mut self, addr: u16) -> Result<u8, Error> {
        let value = match addr {
            0x0000..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram[(addr & cpu_mem::INTERNAL_RAM_MASK) as usize]
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                self.ppu.register_read(addr, self.cartridge, self.mapper)?
            }
            cpu_mem::CONTROLLER_PORT_1 => self.controllers[0].read(),
            cpu_mem::CONTROLLER_PORT_2 => self.controllers[1].read(),
            // APU and $4014 reads are stubbed: no APU in this core, and the
            // DMA register is write-only.
            cpu_mem::IO_REGISTER_BASE..=cpu_mem::IO_REGISTER_END => 0,
            // Disabled test-mode range reads as open bus.
            cpu_mem::TEST_MODE_BASE..=cpu_mem::TEST_MODE_END => 0,
            cpu_mem::CARTRIDGE_SPACE_BASE..=cpu_mem::CPU_ADDR_END => {
                self.mapper.cpu_read(self.cartridge, addr)?
            }
        };
        Ok(value)
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), Error> {
        match addr {
            0x0000..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram[(addr & cpu_mem::INTERNAL_RAM_MASK) as usize] = data;
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                self.ppu
                    .register_write(addr, data, self.cartridge, self.mapper)?;
            }
            cpu_mem::OAM_DMA => *self.oam_dma = Some(data),
            cpu_mem::CONTROLLER_PORT_1 => {
                // The strobe line is shared by both ports.
                self.controllers[0].write_strobe(data);
                self.controllers[1].write_strobe(data);
            }
            cpu_mem::IO_REGISTER_BASE..=cpu_mem::IO_REGISTER_END => {}
            cpu_mem::TEST_MODE_BASE..=cpu_mem::TEST_MODE_END => {}
            cpu_mem::CARTRIDGE_SPACE_BASE..=cpu_mem::CPU_ADDR_END => {
                self.mapper.cpu_write(self.cartridge, addr, data)?;
            }
        }
        Ok(())
    }

    fn take_oam_dma(&mut self) -> Option<u8> {
        self.oam_dma.take()
    }
}
