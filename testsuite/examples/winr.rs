//! A single command line reaches the wire unchanged.

#![no_std]
#![no_main]

use testsuite::{entry, finish, fresh_bus};

#[entry]
fn main() -> ! {
    let mut usart = testsuite::bring_up(fresh_bus());
    usart.write_cstr(c"WINR\n");
    finish(usart);
}
