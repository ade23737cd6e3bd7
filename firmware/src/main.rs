//! Board image: bring up USART5, play the reference script, halt.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use usart_script::{Config, Mmio, Sequencer, SpinDelay, Usart, halt, script};
use {defmt_rtt as _, panic_halt as _};

/// Pause before each command, long enough for the console peer to react.
const SETTLE_MS: u32 = 1_000;

#[entry]
fn main() -> ! {
    #[allow(unused_mut)]
    let mut bus = defmt::unwrap!(Mmio::take());

    #[cfg(feature = "pll48")]
    usart_script::rcc::configure_sysclk_48mhz(&mut bus);

    let mut usart = Usart::new(bus, Config::REFERENCE);
    let mut delay = SpinDelay::from_millis(usart.config().clock_hz, SETTLE_MS);
    defmt::info!("settle {=u32} cycles", delay.cycles());

    Sequencer::new(script::REFERENCE).run(&mut usart, &mut delay);

    defmt::info!("halted");
    halt()
}
