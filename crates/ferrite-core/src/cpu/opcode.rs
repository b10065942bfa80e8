//! The 6502 opcode dispatch table.
//!
//! One compile-time array of 256 entries, each carrying the addressing
//! mode, instruction size, base cycle cost, and whether an indexed read
//! crossing a page boundary costs one extra cycle. The twelve opcodes that
//! jam the real silicon have no entry; fetching one is an
//! [`IllegalOpcode`](crate::error::Error::IllegalOpcode) error.
//!
//! Branch instructions carry their taken/page-cross cycles in the branch
//! handler rather than the `page_penalty` flag, which only covers the
//! indexed-read penalty applied during address resolution.

use crate::cpu::addressing::Addressing as A;

/// Instruction mnemonics, official set plus the commonly emulated
/// unofficial opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Mnemonic {
    // Official.
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Unofficial.
    Alr, Anc, Ane, Arr, Dcp, Isc, Las, Lax, Rla, Rra, Sax, Sbx, Sha, Shx,
    Shy, Slo, Sre, Tas,
}

/// One dispatch-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: A,
    /// Instruction length in bytes, opcode included.
    pub size: u8,
    /// Base cycle cost before page-cross or branch penalties.
    pub cycles: u8,
    /// Whether an indexed read crossing a page adds one cycle.
    pub page_penalty: bool,
}

// Short aliases to keep the 16x16 table readable.
const IMP: A = A::Implied;
const ACC: A = A::Accumulator;
const IMM: A = A::Immediate;
const REL: A = A::Relative;
const ZP: A = A::ZeroPage;
const ZPX: A = A::ZeroPageX;
const ZPY: A = A::ZeroPageY;
const ABS: A = A::Absolute;
const ABX: A = A::AbsoluteX;
const ABY: A = A::AbsoluteY;
const IND: A = A::Indirect;
const INX: A = A::IndirectX;
const INY: A = A::IndirectY;

macro_rules! op {
    ($m:ident, $mode:ident, $cycles:expr) => {
        Some(Opcode {
            mnemonic: Mnemonic::$m,
            mode: $mode,
            size: $mode.instruction_size(),
            cycles: $cycles,
            page_penalty: false,
        })
    };
    ($m:ident, $mode:ident, $cycles:expr, +) => {
        Some(Opcode {
            mnemonic: Mnemonic::$m,
            mode: $mode,
            size: $mode.instruction_size(),
            cycles: $cycles,
            page_penalty: true,
        })
    };
}

/// The genuinely-undefined opcodes (KIL/JAM on real silicon).
const JAM: Option<Opcode> = None;

#[rustfmt::skip]
pub(crate) static OPCODE_TABLE: [Option<Opcode>; 256] = [
    // 0                  1                  2                  3                  4                  5                  6                  7
    // 8                  9                  A                  B                  C                  D                  E                  F

    // 0x00
    op!(Brk, IMP, 7),  op!(Ora, INX, 6),  JAM,               op!(Slo, INX, 8),  op!(Nop, ZP, 3),   op!(Ora, ZP, 3),   op!(Asl, ZP, 5),   op!(Slo, ZP, 5),
    op!(Php, IMP, 3),  op!(Ora, IMM, 2),  op!(Asl, ACC, 2),  op!(Anc, IMM, 2),  op!(Nop, ABS, 4),  op!(Ora, ABS, 4),  op!(Asl, ABS, 6),  op!(Slo, ABS, 6),

    // 0x10
    op!(Bpl, REL, 2),  op!(Ora, INY, 5, +), JAM,             op!(Slo, INY, 8),  op!(Nop, ZPX, 4),  op!(Ora, ZPX, 4),  op!(Asl, ZPX, 6),  op!(Slo, ZPX, 6),
    op!(Clc, IMP, 2),  op!(Ora, ABY, 4, +), op!(Nop, IMP, 2), op!(Slo, ABY, 7), op!(Nop, ABX, 4, +), op!(Ora, ABX, 4, +), op!(Asl, ABX, 7), op!(Slo, ABX, 7),

    // 0x20
    op!(Jsr, ABS, 6),  op!(And, INX, 6),  JAM,               op!(Rla, INX, 8),  op!(Bit, ZP, 3),   op!(And, ZP, 3),   op!(Rol, ZP, 5),   op!(Rla, ZP, 5),
    op!(Plp, IMP, 4),  op!(And, IMM, 2),  op!(Rol, ACC, 2),  op!(Anc, IMM, 2),  op!(Bit, ABS, 4),  op!(And, ABS, 4),  op!(Rol, ABS, 6),  op!(Rla, ABS, 6),

    // 0x30
    op!(Bmi, REL, 2),  op!(And, INY, 5, +), JAM,             op!(Rla, INY, 8),  op!(Nop, ZPX, 4),  op!(And, ZPX, 4),  op!(Rol, ZPX, 6),  op!(Rla, ZPX, 6),
    op!(Sec, IMP, 2),  op!(And, ABY, 4, +), op!(Nop, IMP, 2), op!(Rla, ABY, 7), op!(Nop, ABX, 4, +), op!(And, ABX, 4, +), op!(Rol, ABX, 7), op!(Rla, ABX, 7),

    // 0x40
    op!(Rti, IMP, 6),  op!(Eor, INX, 6),  JAM,               op!(Sre, INX, 8),  op!(Nop, ZP, 3),   op!(Eor, ZP, 3),   op!(Lsr, ZP, 5),   op!(Sre, ZP, 5),
    op!(Pha, IMP, 3),  op!(Eor, IMM, 2),  op!(Lsr, ACC, 2),  op!(Alr, IMM, 2),  op!(Jmp, ABS, 3),  op!(Eor, ABS, 4),  op!(Lsr, ABS, 6),  op!(Sre, ABS, 6),

    // 0x50
    op!(Bvc, REL, 2),  op!(Eor, INY, 5, +), JAM,             op!(Sre, INY, 8),  op!(Nop, ZPX, 4),  op!(Eor, ZPX, 4),  op!(Lsr, ZPX, 6),  op!(Sre, ZPX, 6),
    op!(Cli, IMP, 2),  op!(Eor, ABY, 4, +), op!(Nop, IMP, 2), op!(Sre, ABY, 7), op!(Nop, ABX, 4, +), op!(Eor, ABX, 4, +), op!(Lsr, ABX, 7), op!(Sre, ABX, 7),

    // 0x60
    op!(Rts, IMP, 6),  op!(Adc, INX, 6),  JAM,               op!(Rra, INX, 8),  op!(Nop, ZP, 3),   op!(Adc, ZP, 3),   op!(Ror, ZP, 5),   op!(Rra, ZP, 5),
    op!(Pla, IMP, 4),  op!(Adc, IMM, 2),  op!(Ror, ACC, 2),  op!(Arr, IMM, 2),  op!(Jmp, IND, 5),  op!(Adc, ABS, 4),  op!(Ror, ABS, 6),  op!(Rra, ABS, 6),

    // 0x70
    op!(Bvs, REL, 2),  op!(Adc, INY, 5, +), JAM,             op!(Rra, INY, 8),  op!(Nop, ZPX, 4),  op!(Adc, ZPX, 4),  op!(Ror, ZPX, 6),  op!(Rra, ZPX, 6),
    op!(Sei, IMP, 2),  op!(Adc, ABY, 4, +), op!(Nop, IMP, 2), op!(Rra, ABY, 7), op!(Nop, ABX, 4, +), op!(Adc, ABX, 4, +), op!(Ror, ABX, 7), op!(Rra, ABX, 7),

    // 0x80
    op!(Nop, IMM, 2),  op!(Sta, INX, 6),  op!(Nop, IMM, 2),  op!(Sax, INX, 6),  op!(Sty, ZP, 3),   op!(Sta, ZP, 3),   op!(Stx, ZP, 3),   op!(Sax, ZP, 3),
    op!(Dey, IMP, 2),  op!(Nop, IMM, 2),  op!(Txa, IMP, 2),  op!(Ane, IMM, 2),  op!(Sty, ABS, 4),  op!(Sta, ABS, 4),  op!(Stx, ABS, 4),  op!(Sax, ABS, 4),

    // 0x90
    op!(Bcc, REL, 2),  op!(Sta, INY, 6),  JAM,               op!(Sha, INY, 6),  op!(Sty, ZPX, 4),  op!(Sta, ZPX, 4),  op!(Stx, ZPY, 4),  op!(Sax, ZPY, 4),
    op!(Tya, IMP, 2),  op!(Sta, ABY, 5),  op!(Txs, IMP, 2),  op!(Tas, ABY, 5),  op!(Shy, ABX, 5),  op!(Sta, ABX, 5),  op!(Shx, ABY, 5),  op!(Sha, ABY, 5),

    // 0xA0
    op!(Ldy, IMM, 2),  op!(Lda, INX, 6),  op!(Ldx, IMM, 2),  op!(Lax, INX, 6),  op!(Ldy, ZP, 3),   op!(Lda, ZP, 3),   op!(Ldx, ZP, 3),   op!(Lax, ZP, 3),
    op!(Tay, IMP, 2),  op!(Lda, IMM, 2),  op!(Tax, IMP, 2),  op!(Lax, IMM, 2),  op!(Ldy, ABS, 4),  op!(Lda, ABS, 4),  op!(Ldx, ABS, 4),  op!(Lax, ABS, 4),

    // 0xB0
    op!(Bcs, REL, 2),  op!(Lda, INY, 5, +), JAM,             op!(Lax, INY, 5, +), op!(Ldy, ZPX, 4), op!(Lda, ZPX, 4), op!(Ldx, ZPY, 4),  op!(Lax, ZPY, 4),
    op!(Clv, IMP, 2),  op!(Lda, ABY, 4, +), op!(Tsx, IMP, 2), op!(Las, ABY, 4, +), op!(Ldy, ABX, 4, +), op!(Lda, ABX, 4, +), op!(Ldx, ABY, 4, +), op!(Lax, ABY, 4, +),

    // 0xC0
    op!(Cpy, IMM, 2),  op!(Cmp, INX, 6),  op!(Nop, IMM, 2),  op!(Dcp, INX, 8),  op!(Cpy, ZP, 3),   op!(Cmp, ZP, 3),   op!(Dec, ZP, 5),   op!(Dcp, ZP, 5),
    op!(Iny, IMP, 2),  op!(Cmp, IMM, 2),  op!(Dex, IMP, 2),  op!(Sbx, IMM, 2),  op!(Cpy, ABS, 4),  op!(Cmp, ABS, 4),  op!(Dec, ABS, 6),  op!(Dcp, ABS, 6),

    // 0xD0
    op!(Bne, REL, 2),  op!(Cmp, INY, 5, +), JAM,             op!(Dcp, INY, 8),  op!(Nop, ZPX, 4),  op!(Cmp, ZPX, 4),  op!(Dec, ZPX, 6),  op!(Dcp, ZPX, 6),
    op!(Cld, IMP, 2),  op!(Cmp, ABY, 4, +), op!(Nop, IMP, 2), op!(Dcp, ABY, 7), op!(Nop, ABX, 4, +), op!(Cmp, ABX, 4, +), op!(Dec, ABX, 7), op!(Dcp, ABX, 7),

    // 0xE0
    op!(Cpx, IMM, 2),  op!(Sbc, INX, 6),  op!(Nop, IMM, 2),  op!(Isc, INX, 8),  op!(Cpx, ZP, 3),   op!(Sbc, ZP, 3),   op!(Inc, ZP, 5),   op!(Isc, ZP, 5),
    op!(Inx, IMP, 2),  op!(Sbc, IMM, 2),  op!(Nop, IMP, 2),  op!(Sbc, IMM, 2),  op!(Cpx, ABS, 4),  op!(Sbc, ABS, 4),  op!(Inc, ABS, 6),  op!(Isc, ABS, 6),

    // 0xF0
    op!(Beq, REL, 2),  op!(Sbc, INY, 5, +), JAM,             op!(Isc, INY, 8),  op!(Nop, ZPX, 4),  op!(Sbc, ZPX, 4),  op!(Inc, ZPX, 6),  op!(Isc, ZPX, 6),
    op!(Sed, IMP, 2),  op!(Sbc, ABY, 4, +), op!(Nop, IMP, 2), op!(Isc, ABY, 7), op!(Nop, ABX, 4, +), op!(Sbc, ABX, 4, +), op!(Inc, ABX, 7), op!(Isc, ABX, 7),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_sizes_match_addressing_modes() {
        for entry in OPCODE_TABLE.iter().flatten() {
            assert_eq!(entry.size, entry.mode.instruction_size());
        }
    }

    #[test]
    fn only_the_twelve_jam_opcodes_are_unmapped() {
        let unmapped: Vec<usize> = OPCODE_TABLE
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.is_none().then_some(i))
            .collect();
        assert_eq!(
            unmapped,
            vec![0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2]
        );
    }

    #[test]
    fn page_penalty_only_applies_to_indexed_reads() {
        for entry in OPCODE_TABLE.iter().flatten() {
            if entry.page_penalty {
                assert!(matches!(
                    entry.mode,
                    A::AbsoluteX | A::AbsoluteY | A::IndirectY
                ));
            }
        }
    }
}
