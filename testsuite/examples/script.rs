//! The full reference script, with a short real delay between commands.

#![no_std]
#![no_main]

use testsuite::{entry, finish, fresh_bus};
use usart_script::{Sequencer, SpinDelay, script};

#[entry]
fn main() -> ! {
    let mut bus = fresh_bus();
    bus.set_shift_polls(3);
    let mut usart = testsuite::bring_up(bus);

    let mut delay = SpinDelay::from_cycles(10_000);
    let mut seq = Sequencer::new(script::REFERENCE);
    seq.run(&mut usart, &mut delay);
    assert_eq!(seq.state(), script::State::Halted);

    finish(usart);
}
