//! Two calls in a row with a slow shift register: the status poll at the
//! start of the second call must wait for the first byte.

#![no_std]
#![no_main]

use testsuite::{entry, finish, fresh_bus};

#[entry]
fn main() -> ! {
    let mut bus = fresh_bus();
    bus.set_shift_polls(20);
    let mut usart = testsuite::bring_up(bus);

    usart.write_cstr(c"A");
    usart.write_cstr(c"B");
    finish(usart);
}
