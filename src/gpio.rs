//! Pin multiplexing.

use crate::bus::Bus;
use crate::regs::{Field, gpio, rcc};

/// A GPIO port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    /// GPIOA
    A,
    /// GPIOB
    B,
    /// GPIOC
    C,
    /// GPIOD
    D,
    /// GPIOF
    F,
}

impl Port {
    /// Base address of the port's register block.
    pub const fn base(self) -> usize {
        match self {
            Port::A => gpio::GPIOA,
            Port::B => gpio::GPIOB,
            Port::C => gpio::GPIOC,
            Port::D => gpio::GPIOD,
            Port::F => gpio::GPIOF,
        }
    }

    /// The port's clock gate in `RCC_AHBENR`.
    pub const fn clock_enable(self) -> Field {
        match self {
            Port::A => rcc::AHBENR_IOPAEN,
            Port::B => rcc::AHBENR_IOPBEN,
            Port::C => rcc::AHBENR_IOPCEN,
            Port::D => rcc::AHBENR_IOPDEN,
            Port::F => rcc::AHBENR_IOPFEN,
        }
    }
}

/// Pin mode, the 2-bit `MODER` encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// Digital input.
    Input = 0b00,
    /// General purpose output.
    Output = 0b01,
    /// Routed to a peripheral.
    Alternate = 0b10,
    /// Analog.
    Analog = 0b11,
}

/// Alternate function selector, the 4-bit `AFRx` encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AltFn {
    /// AF0
    Af0 = 0,
    /// AF1
    Af1 = 1,
    /// AF2
    Af2 = 2,
    /// AF3
    Af3 = 3,
    /// AF4
    Af4 = 4,
    /// AF5
    Af5 = 5,
    /// AF6
    Af6 = 6,
    /// AF7
    Af7 = 7,
}

/// One pin of one port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pin {
    port: Port,
    index: u8,
}

impl Pin {
    /// Pin `index` of `port`.
    ///
    /// # Panics
    ///
    /// If `index > 15`.
    pub const fn new(port: Port, index: u8) -> Self {
        assert!(index < 16);
        Pin { port, index }
    }

    /// The pin's port.
    pub const fn port(self) -> Port {
        self.port
    }

    /// Address of the port's `MODER`.
    pub const fn moder(self) -> usize {
        self.port.base() + gpio::MODER
    }

    /// This pin's field in `MODER`.
    pub const fn mode_field(self) -> Field {
        Field::new(self.index * 2, 2)
    }

    /// Address of the `AFRL`/`AFRH` register holding this pin's selector.
    pub const fn afr(self) -> usize {
        self.port.base() + if self.index < 8 { gpio::AFRL } else { gpio::AFRH }
    }

    /// This pin's field in its `AFRx`.
    pub const fn af_field(self) -> Field {
        Field::new((self.index % 8) * 4, 4)
    }
}

/// Route `pin` to alternate function `af`.
///
/// Mode and selector are each cleared and then set, as two separate
/// read-modify-writes. The port clock must already be running.
pub fn into_alternate<B: Bus>(bus: &mut B, pin: Pin, af: AltFn) {
    let mode = pin.mode_field();
    let mut moder = bus.reg(pin.moder());
    moder.clear(mode);
    moder.insert(mode, Mode::Alternate as u32);

    let sel = pin.af_field();
    let mut afr = bus.reg(pin.afr());
    afr.clear(sel);
    afr.insert(sel, af as u32);

    trace!("gpio: {} -> {}", pin, af);
}
