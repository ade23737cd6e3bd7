//! A line that never reports TXE: the bounded write gives up, nothing is
//! sent, and the line works again once it recovers.

#![no_std]
#![no_main]

use core::fmt::Write as _;

use testsuite::{entry, finish, fresh_bus};
use usart_script::Error;

#[entry]
fn main() -> ! {
    let mut bus = fresh_bus();
    bus.stall(true);
    let mut usart = testsuite::bring_up(bus);

    let res = usart.try_write_bytes(b"lost\n", 1_000);
    defmt::info!("stalled: {}", res);
    assert_eq!(res, Err(Error::Timeout { sent: 0 }));
    assert_eq!(usart.bus().data_writes(), 0);

    usart.bus_mut().stall(false);
    writeln!(usart, "TYPE:{}", "dir").unwrap();
    finish(usart);
}
