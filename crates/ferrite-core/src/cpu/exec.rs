//! Instruction handlers.
//!
//! [`Cpu::execute`] dispatches on the mnemonic from the opcode table. The
//! effective address is already resolved; handlers return any extra cycles
//! they consume (branch instructions only).

use crate::cpu::addressing::Addressing;
use crate::cpu::opcode::Mnemonic;
use crate::cpu::status::Status;
use crate::cpu::{Bus, Cpu, pages_differ};
use crate::error::Error;
use crate::memory::cpu as cpu_mem;

impl Cpu {
    pub(crate) fn execute(
        &mut self,
        bus: &mut impl Bus,
        mnemonic: Mnemonic,
        mode: Addressing,
        addr: u16,
    ) -> Result<u32, Error> {
        use Mnemonic::*;

        let mut extra = 0u32;
        match mnemonic {
            // Loads and stores ------------------------------------------------
            Lda => {
                self.a = bus.read(addr)?;
                self.p.update_zero_negative(self.a);
            }
            Ldx => {
                self.x = bus.read(addr)?;
                self.p.update_zero_negative(self.x);
            }
            Ldy => {
                self.y = bus.read(addr)?;
                self.p.update_zero_negative(self.y);
            }
            Sta => bus.write(addr, self.a)?,
            Stx => bus.write(addr, self.x)?,
            Sty => bus.write(addr, self.y)?,

            // Register transfers ----------------------------------------------
            Tax => {
                self.x = self.a;
                self.p.update_zero_negative(self.x);
            }
            Tay => {
                self.y = self.a;
                self.p.update_zero_negative(self.y);
            }
            Txa => {
                self.a = self.x;
                self.p.update_zero_negative(self.a);
            }
            Tya => {
                self.a = self.y;
                self.p.update_zero_negative(self.a);
            }
            Tsx => {
                self.x = self.s;
                self.p.update_zero_negative(self.x);
            }
            Txs => self.s = self.x,

            // Arithmetic ------------------------------------------------------
            Adc => {
                let value = bus.read(addr)?;
                self.adc(value);
            }
            Sbc => {
                let value = bus.read(addr)?;
                self.adc(!value);
            }
            Cmp => {
                let value = bus.read(addr)?;
                self.compare(self.a, value);
            }
            Cpx => {
                let value = bus.read(addr)?;
                self.compare(self.x, value);
            }
            Cpy => {
                let value = bus.read(addr)?;
                self.compare(self.y, value);
            }

            // Increments and decrements ---------------------------------------
            Inc => {
                let value = bus.read(addr)?.wrapping_add(1);
                bus.write(addr, value)?;
                self.p.update_zero_negative(value);
            }
            Dec => {
                let value = bus.read(addr)?.wrapping_sub(1);
                bus.write(addr, value)?;
                self.p.update_zero_negative(value);
            }
            Inx => {
                self.x = self.x.wrapping_add(1);
                self.p.update_zero_negative(self.x);
            }
            Dex => {
                self.x = self.x.wrapping_sub(1);
                self.p.update_zero_negative(self.x);
            }
            Iny => {
                self.y = self.y.wrapping_add(1);
                self.p.update_zero_negative(self.y);
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                self.p.update_zero_negative(self.y);
            }

            // Logic -----------------------------------------------------------
            And => {
                self.a &= bus.read(addr)?;
                self.p.update_zero_negative(self.a);
            }
            Ora => {
                self.a |= bus.read(addr)?;
                self.p.update_zero_negative(self.a);
            }
            Eor => {
                self.a ^= bus.read(addr)?;
                self.p.update_zero_negative(self.a);
            }
            Bit => {
                let value = bus.read(addr)?;
                self.p.set(Status::ZERO, self.a & value == 0);
                self.p.set(Status::NEGATIVE, value & 0x80 != 0);
                self.p.set(Status::OVERFLOW, value & 0x40 != 0);
            }

            // Shifts and rotates ----------------------------------------------
            Asl => {
                let value = self.read_operand(bus, mode, addr)?;
                let result = self.asl(value);
                self.write_operand(bus, mode, addr, result)?;
            }
            Lsr => {
                let value = self.read_operand(bus, mode, addr)?;
                let result = self.lsr(value);
                self.write_operand(bus, mode, addr, result)?;
            }
            Rol => {
                let value = self.read_operand(bus, mode, addr)?;
                let result = self.rol(value);
                self.write_operand(bus, mode, addr, result)?;
            }
            Ror => {
                let value = self.read_operand(bus, mode, addr)?;
                let result = self.ror(value);
                self.write_operand(bus, mode, addr, result)?;
            }

            // Jumps and subroutines -------------------------------------------
            Jmp => self.pc = addr,
            Jsr => {
                // PC already points past the operand; hardware pushes the
                // address of the last operand byte.
                self.push16(bus, self.pc.wrapping_sub(1))?;
                self.pc = addr;
            }
            Rts => self.pc = self.pull16(bus)?.wrapping_add(1),
            Rti => {
                let flags = self.pull(bus)?;
                self.p = (Status::from_bits_truncate(flags) | Status::UNUSED) - Status::BREAK;
                self.pc = self.pull16(bus)?;
            }
            Brk => {
                // BRK carries a padding byte the return address skips over.
                self.push16(bus, self.pc.wrapping_add(1))?;
                self.push(bus, (self.p | Status::BREAK | Status::UNUSED).bits())?;
                self.p.insert(Status::INTERRUPT);
                self.pc = self.read16(bus, cpu_mem::IRQ_VECTOR)?;
            }

            // Branches --------------------------------------------------------
            Bcc => extra = self.branch(addr, !self.p.contains(Status::CARRY)),
            Bcs => extra = self.branch(addr, self.p.contains(Status::CARRY)),
            Bne => extra = self.branch(addr, !self.p.contains(Status::ZERO)),
            Beq => extra = self.branch(addr, self.p.contains(Status::ZERO)),
            Bpl => extra = self.branch(addr, !self.p.contains(Status::NEGATIVE)),
            Bmi => extra = self.branch(addr, self.p.contains(Status::NEGATIVE)),
            Bvc => extra = self.branch(addr, !self.p.contains(Status::OVERFLOW)),
            Bvs => extra = self.branch(addr, self.p.contains(Status::OVERFLOW)),

            // Stack -----------------------------------------------------------
            Pha => self.push(bus, self.a)?,
            Pla => {
                self.a = self.pull(bus)?;
                self.p.update_zero_negative(self.a);
            }
            Php => self.push(bus, (self.p | Status::BREAK | Status::UNUSED).bits())?,
            Plp => {
                let flags = self.pull(bus)?;
                self.p = (Status::from_bits_truncate(flags) | Status::UNUSED) - Status::BREAK;
            }

            // Flag operations -------------------------------------------------
            Clc => self.p.remove(Status::CARRY),
            Sec => self.p.insert(Status::CARRY),
            Cli => self.p.remove(Status::INTERRUPT),
            Sei => self.p.insert(Status::INTERRUPT),
            Clv => self.p.remove(Status::OVERFLOW),
            Cld => self.p.remove(Status::DECIMAL),
            Sed => self.p.insert(Status::DECIMAL),

            Nop => {
                // The undocumented NOP shapes still perform their operand
                // read; software polls $2002 through them.
                if !matches!(mode, Addressing::Implied | Addressing::Accumulator) {
                    let _ = bus.read(addr)?;
                }
            }

            // Unofficial opcodes ----------------------------------------------
            Lax => {
                let value = bus.read(addr)?;
                self.a = value;
                self.x = value;
                self.p.update_zero_negative(value);
            }
            Sax => bus.write(addr, self.a & self.x)?,
            Dcp => {
                let value = bus.read(addr)?.wrapping_sub(1);
                bus.write(addr, value)?;
                self.compare(self.a, value);
            }
            Isc => {
                let value = bus.read(addr)?.wrapping_add(1);
                bus.write(addr, value)?;
                self.adc(!value);
            }
            Slo => {
                let value = bus.read(addr)?;
                let shifted = self.asl(value);
                bus.write(addr, shifted)?;
                self.a |= shifted;
                self.p.update_zero_negative(self.a);
            }
            Rla => {
                let value = bus.read(addr)?;
                let rotated = self.rol(value);
                bus.write(addr, rotated)?;
                self.a &= rotated;
                self.p.update_zero_negative(self.a);
            }
            Sre => {
                let value = bus.read(addr)?;
                let shifted = self.lsr(value);
                bus.write(addr, shifted)?;
                self.a ^= shifted;
                self.p.update_zero_negative(self.a);
            }
            Rra => {
                let value = bus.read(addr)?;
                let rotated = self.ror(value);
                bus.write(addr, rotated)?;
                self.adc(rotated);
            }
            Anc => {
                self.a &= bus.read(addr)?;
                self.p.update_zero_negative(self.a);
                self.p.set(Status::CARRY, self.a & 0x80 != 0);
            }
            Alr => {
                let value = self.a & bus.read(addr)?;
                self.a = self.lsr(value);
            }
            Arr => {
                let value = self.a & bus.read(addr)?;
                let carry_in = u8::from(self.p.contains(Status::CARRY)) << 7;
                self.a = (value >> 1) | carry_in;
                self.p.update_zero_negative(self.a);
                self.p.set(Status::CARRY, self.a & 0x40 != 0);
                self.p
                    .set(Status::OVERFLOW, ((self.a >> 6) ^ (self.a >> 5)) & 1 != 0);
            }
            Sbx => {
                let value = bus.read(addr)?;
                let masked = self.a & self.x;
                self.p.set(Status::CARRY, masked >= value);
                self.x = masked.wrapping_sub(value);
                self.p.update_zero_negative(self.x);
            }
            Las => {
                let value = bus.read(addr)? & self.s;
                self.a = value;
                self.x = value;
                self.s = value;
                self.p.update_zero_negative(value);
            }
            // The SHx group ANDs a register pair with the high address byte
            // plus one; the unstable address-corruption variants are not
            // modelled.
            Sha => {
                let high = (addr >> 8) as u8;
                bus.write(addr, self.a & self.x & high.wrapping_add(1))?;
            }
            Shx => {
                let high = (addr >> 8) as u8;
                bus.write(addr, self.x & high.wrapping_add(1))?;
            }
            Shy => {
                let high = (addr >> 8) as u8;
                bus.write(addr, self.y & high.wrapping_add(1))?;
            }
            Tas => {
                self.s = self.a & self.x;
                let high = (addr >> 8) as u8;
                bus.write(addr, self.s & high.wrapping_add(1))?;
            }
            Ane => {
                // Highly unstable on silicon; the (A | $EE) & X & imm model
                // is the conventional emulator approximation.
                let value = bus.read(addr)?;
                self.a = (self.a | 0xEE) & self.x & value;
                self.p.update_zero_negative(self.a);
            }
        }

        Ok(extra)
    }

    /// Reads the shift/rotate operand, from A or from memory.
    fn read_operand(&self, bus: &mut impl Bus, mode: Addressing, addr: u16) -> Result<u8, Error> {
        if matches!(mode, Addressing::Accumulator) {
            Ok(self.a)
        } else {
            bus.read(addr)
        }
    }

    /// Writes the shift/rotate result back to A or to memory.
    fn write_operand(
        &mut self,
        bus: &mut impl Bus,
        mode: Addressing,
        addr: u16,
        value: u8,
    ) -> Result<(), Error> {
        if matches!(mode, Addressing::Accumulator) {
            self.a = value;
            Ok(())
        } else {
            bus.write(addr, value)
        }
    }

    /// Add with carry; SBC feeds the operand's complement through here.
    fn adc(&mut self, value: u8) {
        let carry = u8::from(self.p.contains(Status::CARRY));
        let sum = self.a as u16 + value as u16 + carry as u16;
        let result = sum as u8;

        self.p.set(Status::CARRY, sum > 0xFF);
        // Signed overflow: both inputs share a sign the result lacks.
        self.p.set(
            Status::OVERFLOW,
            (self.a ^ result) & (value ^ result) & 0x80 != 0,
        );
        self.a = result;
        self.p.update_zero_negative(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.p.set(Status::CARRY, register >= value);
        self.p.update_zero_negative(register.wrapping_sub(value));
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.p.set(Status::CARRY, value & 0x80 != 0);
        let result = value << 1;
        self.p.update_zero_negative(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.p.set(Status::CARRY, value & 0x01 != 0);
        let result = value >> 1;
        self.p.update_zero_negative(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.p.contains(Status::CARRY));
        self.p.set(Status::CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.p.update_zero_negative(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.p.contains(Status::CARRY)) << 7;
        self.p.set(Status::CARRY, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.p.update_zero_negative(result);
        result
    }

    /// Taken branches cost one extra cycle, two when the target sits on a
    /// different page than the following instruction.
    fn branch(&mut self, addr: u16, taken: bool) -> u32 {
        if !taken {
            return 0;
        }
        let mut extra = 1;
        if pages_differ(self.pc, addr) {
            extra += 1;
        }
        self.pc = addr;
        extra
    }
}
