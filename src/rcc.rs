//! Clock gating and the 48 MHz system clock.

use crate::bus::Bus;
use crate::gpio::Port;
use crate::regs::{flash, rcc};

/// Frequency of the internal RC oscillator after reset.
pub const HSI_HZ: u32 = 8_000_000;

/// SYSCLK, HCLK and PCLK after [`configure_sysclk_48mhz`].
pub const SYSCLK_48MHZ: u32 = 48_000_000;

/// Ungate the clocks of `ports` with a single write to `RCC_AHBENR`.
pub fn enable_gpio_clocks<B: Bus>(bus: &mut B, ports: &[Port]) {
    let fields = ports.iter().map(|p| p.clock_enable());
    let mask = fields.fold(0, |mask, f| mask | f.mask());
    bus.reg(rcc::AHBENR).modify(|w| w | mask);
}

/// Ungate the USART5 kernel and register clock.
pub fn enable_usart5_clock<B: Bus>(bus: &mut B) {
    bus.reg(rcc::APB1ENR).set_all(&[rcc::APB1ENR_USART5EN]);
}

/// Run SYSCLK, HCLK and PCLK at 48 MHz from the PLL fed by HSI/2.
///
/// Expects the reset clock tree (SYSCLK on HSI, PLL off). Blocks until the
/// PLL locks and the switch is reported.
pub fn configure_sysclk_48mhz<B: Bus>(bus: &mut B) {
    // One wait state is required above 24 MHz.
    let mut acr = bus.reg(flash::ACR);
    acr.replace(flash::ACR_LATENCY, 1);
    acr.set_all(&[flash::ACR_PRFTBE]);

    // HSI/2 * 12, no AHB or APB prescaling.
    bus.reg(rcc::CFGR).modify(|w| {
        let w = w
            & !(rcc::CFGR_PLLSRC.mask()
                | rcc::CFGR_PLLMUL.mask()
                | rcc::CFGR_HPRE.mask()
                | rcc::CFGR_PPRE.mask());
        w | rcc::CFGR_PLLSRC.encode(rcc::PLLSRC_HSI_DIV2) | rcc::CFGR_PLLMUL.encode(12 - 2)
    });

    let mut cr = bus.reg(rcc::CR);
    cr.set_all(&[rcc::CR_PLLON]);
    cr.wait_for(rcc::CR_PLLRDY, 1);

    let mut cfgr = bus.reg(rcc::CFGR);
    cfgr.replace(rcc::CFGR_SW, rcc::SW_PLL);
    cfgr.wait_for(rcc::CFGR_SWS, rcc::SW_PLL);

    debug!("rcc: sysclk {=u32} Hz", SYSCLK_48MHZ);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bus::Bus;
    use crate::sim::{Capture, RegWrite, SimBus};

    #[test]
    fn gpio_clocks_share_one_write() {
        let mut bus = SimBus::new(Capture::<0>::new());
        bus.preload(rcc::AHBENR, 0x0000_0014);

        enable_gpio_clocks(&mut bus, &[Port::C, Port::D]);

        // RCC_AHBENR_GPIOCEN | RCC_AHBENR_GPIODEN on top of the reset value.
        assert_eq!(
            bus.writes(),
            &[RegWrite {
                addr: rcc::AHBENR,
                value: 0x0018_0014
            }]
        );
    }

    #[test]
    fn usart5_clock_leaves_other_gates_alone() {
        let mut bus = SimBus::new(Capture::<0>::new());
        bus.preload(rcc::APB1ENR, 0x0000_0001);
        enable_usart5_clock(&mut bus);
        assert_eq!(bus.peek(rcc::APB1ENR), 0x0010_0001);
    }

    #[test]
    fn pll_runs_at_48mhz_from_hsi() {
        let mut bus = SimBus::new(Capture::<0>::new());
        configure_sysclk_48mhz(&mut bus);

        let cfgr = bus.reg(rcc::CFGR).read();
        let mul = rcc::CFGR_PLLMUL.decode(cfgr) + 2;
        assert_eq!(rcc::CFGR_PLLSRC.decode(cfgr), rcc::PLLSRC_HSI_DIV2);
        assert_eq!(HSI_HZ / 2 * mul, SYSCLK_48MHZ);
        assert_eq!(rcc::CFGR_HPRE.decode(cfgr), 0);
        assert_eq!(rcc::CFGR_PPRE.decode(cfgr), 0);
        assert_eq!(rcc::CFGR_SWS.decode(cfgr), rcc::SW_PLL);

        let acr = bus.peek(flash::ACR);
        assert_eq!(flash::ACR_LATENCY.decode(acr), 1);
        assert_eq!(flash::ACR_PRFTBE.decode(acr), 1);
    }

    #[test]
    fn flash_latency_is_raised_before_the_switch() {
        let mut bus = SimBus::new(Capture::<0>::new());
        configure_sysclk_48mhz(&mut bus);

        let writes = bus.writes();
        let latency = writes.iter().position(|w| w.addr == flash::ACR);
        let switch = writes
            .iter()
            .position(|w| w.addr == rcc::CFGR && rcc::CFGR_SW.decode(w.value) == rcc::SW_PLL);
        assert!(latency.unwrap() < switch.unwrap());
    }
}
