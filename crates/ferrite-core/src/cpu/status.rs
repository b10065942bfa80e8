use bitflags::bitflags;

bitflags! {
    /// The 8-bit processor status register (P).
    ///
    /// Bit layout:
    /// ```text
    /// 7 6 5 4 3 2 1 0
    /// N V _ B D I Z C
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Carry flag (C). Set when an addition carries out of bit 7 or a
        /// subtraction needs no borrow.
        const CARRY     = 0b0000_0001;

        /// Zero flag (Z). Set when the result of an operation is zero.
        const ZERO      = 0b0000_0010;

        /// Interrupt disable flag (I). When set, IRQs are ignored.
        const INTERRUPT = 0b0000_0100;

        /// Decimal mode flag (D). Storable but without effect on the 2A03.
        const DECIMAL   = 0b0000_1000;

        /// Break flag (B). Only exists in the copy of P pushed by BRK/PHP.
        const BREAK     = 0b0001_0000;

        /// Unused bit; reads as 1 in every pushed copy of P.
        const UNUSED    = 0b0010_0000;

        /// Overflow flag (V). Set when signed arithmetic overflows.
        const OVERFLOW  = 0b0100_0000;

        /// Negative flag (N). Mirrors bit 7 of the last result.
        const NEGATIVE  = 0b1000_0000;
    }
}

impl Status {
    /// Set or clear the Zero and Negative flags from a result byte.
    pub fn update_zero_negative(&mut self, value: u8) {
        self.set(Status::ZERO, value == 0);
        self.set(Status::NEGATIVE, value & 0x80 != 0);
    }
}
