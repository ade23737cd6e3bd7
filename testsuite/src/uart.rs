//! LM3S6965 UART0, standing in for the USART5 line under QEMU.
//!
//! QEMU writes everything sent here to the file given as the first `-serial`
//! argument, which the xtask compares against `expected/<example>.wire`.

use core::ptr::{with_exposed_provenance, with_exposed_provenance_mut};

use usart_script::sim::Wire;

const UART0_BASE: usize = 0x4000_C000;

const UART_DR: usize = UART0_BASE; // Data Register
const UART_FR: usize = UART0_BASE + 0x018; // Flag Register
const UART_FR_TXFF: u32 = 0x20; // Transmit FIFO Full

/// Write one byte to UART0, waiting for FIFO space.
pub fn write_byte(byte: u8) {
    let dr = with_exposed_provenance_mut::<u32>(UART_DR);
    let fr = with_exposed_provenance::<u32>(UART_FR);
    // SAFETY: Fixed, aligned device registers of the emulated board. Nothing
    // else in the testsuite touches UART0.
    unsafe {
        while fr.read_volatile() & UART_FR_TXFF != 0 {}
        dr.write_volatile(u32::from(byte));
    }
}

/// The simulated USART5 line, ending in UART0.
pub struct QemuWire;

impl Wire for QemuWire {
    fn emit(&mut self, byte: u8) {
        write_byte(byte);
    }
}
