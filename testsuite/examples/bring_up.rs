//! Bring-up from dirty register state.
//!
//! Every frame-format bit starts out set and both pins start out analog with
//! AF7 selected. After bring-up the line must be 8N1, 16x oversampling,
//! BRR 416, both pins on AF2, and nothing may have been sent.

#![no_std]
#![no_main]

use testsuite::{entry, exit_success, fresh_bus};
use usart_script::Config;
use usart_script::regs::{rcc, usart};
use usart_script::sim::StopBits;

#[entry]
fn main() -> ! {
    let cfg = Config::REFERENCE;
    let mut bus = fresh_bus();
    bus.preload(usart::CR1, 0xFFFF_FFFF & !usart::CR1_UE.mask());
    bus.preload(usart::CR2, usart::CR2_STOP.mask());
    for pin in [cfg.tx, cfg.rx] {
        bus.preload(pin.moder(), pin.mode_field().mask());
        bus.preload(pin.afr(), pin.af_field().encode(7));
    }

    let bus = testsuite::bring_up(bus).free();

    let line = bus.line_settings();
    defmt::info!("line: {}", line);
    assert_eq!(line.data_bits, 8);
    assert_eq!(line.stop_bits, StopBits::One);
    assert!(!line.parity);
    assert_eq!(line.oversampling, 16);
    assert_eq!(line.divisor, 416);

    for pin in [cfg.tx, cfg.rx] {
        let mode = pin.mode_field().decode(bus.peek(pin.moder()));
        let af = pin.af_field().decode(bus.peek(pin.afr()));
        defmt::info!("{}: mode {=u32} af {=u32}", pin, mode, af);
        assert_eq!(mode, 0b10);
        assert_eq!(af, 2);
    }

    let ahbenr = bus.peek(rcc::AHBENR);
    assert_ne!(ahbenr & rcc::AHBENR_IOPCEN.mask(), 0);
    assert_ne!(ahbenr & rcc::AHBENR_IOPDEN.mask(), 0);
    assert_ne!(bus.peek(rcc::APB1ENR) & rcc::APB1ENR_USART5EN.mask(), 0);

    let cr1 = bus.peek(usart::CR1);
    for flag in [usart::CR1_TE, usart::CR1_RE, usart::CR1_UE] {
        assert_ne!(cr1 & flag.mask(), 0);
    }

    defmt::info!("{=usize} register writes", bus.writes().len());
    assert_eq!(bus.data_writes(), 0);
    exit_success();
}
