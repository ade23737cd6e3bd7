#![no_std]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

// Must stay first so the logging macros are visible in every module.
#[macro_use]
mod fmt;

pub mod bus;
pub mod delay;
pub mod gpio;
pub mod rcc;
pub mod regs;
pub mod script;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod usart;

pub use bus::{Bus, Mmio};
pub use delay::{Settle, SpinDelay};
pub use script::{Sequencer, Step, halt};
pub use usart::{Config, Transmit, Usart};

/// Error returned by [`Usart::try_write_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// `TXE` was not reported within the poll budget.
    Timeout {
        /// Bytes handed to the hardware before giving up.
        sent: usize,
    },
}
