#![no_std]

mod logger;
pub mod uart;

use panic_semihosting as _;
use cortex_m_semihosting::debug::{self, EXIT_FAILURE, EXIT_SUCCESS};
use usart_script::sim::SimBus;
use usart_script::{Config, Usart};

pub use cortex_m_rt::entry;
pub use uart::QemuWire;

/// USART5 on the simulated register file, wired to UART0.
pub type SimUsart = Usart<SimBus<QemuWire>>;

pub fn exit_success() -> ! {
    debug::exit(EXIT_SUCCESS);
    #[allow(clippy::empty_loop)]
    loop {}
}

pub fn exit_failure() -> ! {
    debug::exit(EXIT_FAILURE);
    #[allow(clippy::empty_loop)]
    loop {}
}

/// A simulated register file in power-on state.
pub fn fresh_bus() -> SimBus<QemuWire> {
    SimBus::new(QemuWire)
}

/// Bring up USART5 with the reference configuration on `bus`.
pub fn bring_up(bus: SimBus<QemuWire>) -> SimUsart {
    Usart::new(bus, Config::REFERENCE)
}

/// Wait until everything was shifted out, check that the transmitter never
/// wrote blind or overran the data register and that no register write went
/// unrecorded, and exit.
pub fn finish(mut usart: SimUsart) -> ! {
    usart.flush();
    let bus = usart.free();

    defmt::info!(
        "{=u32} bytes, {=u32} status polls",
        bus.data_writes(),
        bus.polls()
    );

    if bus.blind_writes() != 0
        || bus.overruns() != 0
        || bus.pending() != 0
        || bus.unlogged_writes() != 0
    {
        defmt::error!(
            "blind writes {=u32}, overruns {=u32}, pending {=usize}, unlogged {=usize}",
            bus.blind_writes(),
            bus.overruns(),
            bus.pending(),
            bus.unlogged_writes()
        );
        exit_failure();
    }
    exit_success();
}
