//! STM32F0 register map, limited to the blocks touched during bring-up.
//!
//! Addresses and bit positions follow RM0091 for the STM32F091xC.

/// A contiguous bit-field inside a 32-bit register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    shift: u8,
    width: u8,
}

impl Field {
    /// A field of `width` bits starting at bit `shift`.
    ///
    /// # Panics
    ///
    /// If the field does not fit in 32 bits. In a `const` context this is a
    /// compile error.
    pub const fn new(shift: u8, width: u8) -> Self {
        assert!(width >= 1 && shift as u32 + width as u32 <= 32);
        Field { shift, width }
    }

    /// A single-bit flag.
    pub const fn bit(shift: u8) -> Self {
        Self::new(shift, 1)
    }

    /// The field's bits in register position.
    pub const fn mask(self) -> u32 {
        (((1u64 << self.width) - 1) as u32) << self.shift
    }

    /// `value` moved into register position, truncated to the field width.
    pub const fn encode(self, value: u32) -> u32 {
        (value << self.shift) & self.mask()
    }

    /// The field's value extracted from a full register word.
    pub const fn decode(self, word: u32) -> u32 {
        (word & self.mask()) >> self.shift
    }
}

/// Reset and clock control.
#[allow(missing_docs)]
pub mod rcc {
    use super::Field;

    pub const BASE: usize = 0x4002_1000;
    pub const CR: usize = BASE;
    pub const CFGR: usize = BASE + 0x04;
    pub const AHBENR: usize = BASE + 0x14;
    pub const APB1ENR: usize = BASE + 0x1C;

    pub const CR_PLLON: Field = Field::bit(24);
    pub const CR_PLLRDY: Field = Field::bit(25);

    pub const CFGR_SW: Field = Field::new(0, 2);
    pub const CFGR_SWS: Field = Field::new(2, 2);
    pub const CFGR_HPRE: Field = Field::new(4, 4);
    pub const CFGR_PPRE: Field = Field::new(8, 3);
    pub const CFGR_PLLSRC: Field = Field::new(15, 2);
    pub const CFGR_PLLMUL: Field = Field::new(18, 4);

    /// `SW`/`SWS` encoding for the PLL.
    pub const SW_PLL: u32 = 0b10;
    /// `PLLSRC` encoding for HSI/2.
    pub const PLLSRC_HSI_DIV2: u32 = 0b00;

    pub const AHBENR_IOPAEN: Field = Field::bit(17);
    pub const AHBENR_IOPBEN: Field = Field::bit(18);
    pub const AHBENR_IOPCEN: Field = Field::bit(19);
    pub const AHBENR_IOPDEN: Field = Field::bit(20);
    pub const AHBENR_IOPFEN: Field = Field::bit(22);

    pub const APB1ENR_USART5EN: Field = Field::bit(20);
}

/// Embedded flash interface.
#[allow(missing_docs)]
pub mod flash {
    use super::Field;

    pub const BASE: usize = 0x4002_2000;
    pub const ACR: usize = BASE;

    pub const ACR_LATENCY: Field = Field::new(0, 3);
    pub const ACR_PRFTBE: Field = Field::bit(4);
}

/// General purpose I/O ports. Offsets are relative to a port base.
#[allow(missing_docs)]
pub mod gpio {
    pub const GPIOA: usize = 0x4800_0000;
    pub const GPIOB: usize = 0x4800_0400;
    pub const GPIOC: usize = 0x4800_0800;
    pub const GPIOD: usize = 0x4800_0C00;
    pub const GPIOF: usize = 0x4800_1400;

    pub const MODER: usize = 0x00;
    pub const AFRL: usize = 0x20;
    pub const AFRH: usize = 0x24;
}

/// USART5.
#[allow(missing_docs)]
pub mod usart {
    use super::Field;

    pub const BASE: usize = 0x4000_5000;
    pub const CR1: usize = BASE;
    pub const CR2: usize = BASE + 0x04;
    pub const BRR: usize = BASE + 0x0C;
    pub const ISR: usize = BASE + 0x1C;
    pub const TDR: usize = BASE + 0x28;

    pub const CR1_UE: Field = Field::bit(0);
    pub const CR1_RE: Field = Field::bit(2);
    pub const CR1_TE: Field = Field::bit(3);
    pub const CR1_PCE: Field = Field::bit(10);
    pub const CR1_M0: Field = Field::bit(12);
    pub const CR1_OVER8: Field = Field::bit(15);
    pub const CR1_M1: Field = Field::bit(28);

    pub const CR2_STOP: Field = Field::new(12, 2);

    pub const BRR_BRR: Field = Field::new(0, 16);

    pub const ISR_TC: Field = Field::bit(6);
    pub const ISR_TXE: Field = Field::bit(7);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn field_masks_match_reference_constants() {
        // Values from the CMSIS device header.
        assert_eq!(usart::CR1_M0.mask() | usart::CR1_M1.mask(), 0x1000_1000);
        assert_eq!(usart::CR2_STOP.mask(), 0x0000_3000);
        assert_eq!(usart::ISR_TXE.mask(), 0x0000_0080);
        assert_eq!(rcc::AHBENR_IOPCEN.mask(), 0x0008_0000);
        assert_eq!(rcc::AHBENR_IOPDEN.mask(), 0x0010_0000);
        assert_eq!(rcc::APB1ENR_USART5EN.mask(), 0x0010_0000);
    }

    #[test]
    fn encode_truncates_to_width() {
        let f = Field::new(4, 4);
        assert_eq!(f.encode(0x2), 0x20);
        assert_eq!(f.encode(0x1F), 0xF0);
        assert_eq!(f.decode(0xFFFF_FF2F), 0x2);
    }

    #[test]
    fn full_width_field() {
        let f = Field::new(0, 32);
        assert_eq!(f.mask(), u32::MAX);
        assert_eq!(f.decode(0xDEAD_BEEF), 0xDEAD_BEEF);
    }
}
