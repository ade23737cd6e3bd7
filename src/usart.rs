//! USART5 bring-up and blocking transmit.

use core::ffi::CStr;

use crate::Error;
use crate::bus::Bus;
use crate::gpio::{self, AltFn, Pin, Port};
use crate::rcc;
use crate::regs::usart::{
    BRR, CR1, CR1_M0, CR1_M1, CR1_OVER8, CR1_PCE, CR1_RE, CR1_TE, CR1_UE, CR2, CR2_STOP, ISR,
    BRR_BRR, ISR_TC, ISR_TXE, TDR,
};

/// Line and pin configuration for USART5.
///
/// The frame format is fixed at 8 data bits, no parity, 1 stop bit and 16x
/// oversampling. `clock_hz / baud` must fit the 16-bit `BRR` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// USART kernel clock (PCLK) in Hz.
    pub clock_hz: u32,
    /// Target baud rate.
    pub baud: u32,
    /// Transmit pin.
    pub tx: Pin,
    /// Receive pin.
    pub rx: Pin,
    /// Alternate function routing both pins to USART5.
    pub af: AltFn,
}

impl Config {
    /// 115200 baud from a 48 MHz clock on PC12 (TX) and PD2 (RX), AF2.
    pub const REFERENCE: Config = Config {
        clock_hz: 48_000_000,
        baud: 115_200,
        tx: Pin::new(Port::C, 12),
        rx: Pin::new(Port::D, 2),
        af: AltFn::Af2,
    };

    /// The value programmed into `BRR`.
    pub const fn divisor(&self) -> u32 {
        divisor(self.clock_hz, self.baud)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// Baud rate divisor for 16x oversampling.
///
/// This is plain truncating division, so `divisor(48_000_000, 115_200)` is
/// 416 and the line runs at 115384 baud (0.16% fast).
///
/// # Panics
///
/// If `baud` is zero.
pub const fn divisor(clock_hz: u32, baud: u32) -> u32 {
    clock_hz / baud
}

/// Something that accepts bytes for transmission.
pub trait Transmit {
    /// Queue `bytes` in order. Returns once the last byte was accepted.
    fn transmit(&mut self, bytes: &[u8]);
}

/// USART5, configured and enabled.
///
/// Only [`Usart::new`] creates this handle, so the transmitter can never run
/// against an unconfigured unit.
pub struct Usart<B: Bus> {
    bus: B,
    config: Config,
}

impl<B: Bus> Usart<B> {
    /// Bring up USART5.
    ///
    /// Debug builds panic if the divisor does not fit `BRR`.
    ///
    /// Enables the GPIO and USART clocks, routes both pins, programs the frame
    /// format and divisor while the unit is disabled and finally enables the
    /// transmitter, receiver and unit together. There is no failure path: a
    /// wrong clock only shows up as garbage on the wire.
    pub fn new(mut bus: B, config: Config) -> Self {
        rcc::enable_gpio_clocks(&mut bus, &[config.tx.port(), config.rx.port()]);
        gpio::into_alternate(&mut bus, config.tx, config.af);
        gpio::into_alternate(&mut bus, config.rx, config.af);
        rcc::enable_usart5_clock(&mut bus);

        // The frame format can only be changed while UE is clear.
        bus.reg(CR1).clear(CR1_UE);
        bus.reg(CR1).clear_all(&[CR1_M0, CR1_M1]);
        bus.reg(CR2).clear(CR2_STOP);
        bus.reg(CR1).clear(CR1_PCE);
        bus.reg(CR1).clear(CR1_OVER8);

        let div = config.divisor();
        debug_assert!(div <= BRR_BRR.mask(), "divisor overflows BRR");
        bus.reg(BRR).write(div);

        // RE is enabled as well, even though nothing reads from the line.
        bus.reg(CR1).set_all(&[CR1_TE, CR1_RE, CR1_UE]);

        debug!(
            "usart5: up, {=u32} baud from {=u32} Hz, brr {=u32}",
            config.baud,
            config.clock_hz,
            div
        );

        Usart { bus, config }
    }

    /// The configuration the unit was brought up with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send one byte, spinning until the data register is free.
    ///
    /// Never returns if the hardware never reports `TXE`.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.bus.reg(ISR).wait_for(ISR_TXE, 1);
        self.bus.reg(TDR).write(u32::from(byte));
    }

    /// Send `bytes` in order.
    ///
    /// Returns when the last byte was accepted into the data register, not
    /// when it has left the shift register. See [`Usart::flush`].
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    /// Send a NUL-terminated string, excluding the terminator.
    pub fn write_cstr(&mut self, s: &CStr) {
        self.write_bytes(s.to_bytes());
    }

    /// Like [`Usart::write_bytes`], but gives up on a byte after `max_polls`
    /// status reads without `TXE`.
    ///
    /// The reference behaviour is to wait forever; this variant is for
    /// callers that prefer an error to a hang. Bytes before the failing one
    /// were already handed to the hardware.
    pub fn try_write_bytes(&mut self, bytes: &[u8], max_polls: u32) -> Result<(), Error> {
        for (sent, &byte) in bytes.iter().enumerate() {
            if !self.poll_txe(max_polls) {
                warn!("usart5: tx timeout after {=usize} bytes", sent);
                return Err(Error::Timeout { sent });
            }
            self.bus.reg(TDR).write(u32::from(byte));
        }
        Ok(())
    }

    /// Spin until the last byte has left the shift register.
    pub fn flush(&mut self) {
        self.bus.reg(ISR).wait_for(ISR_TC, 1);
    }

    /// Give back the bus. The unit stays enabled.
    pub fn free(self) -> B {
        self.bus
    }

    /// The underlying bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// The underlying bus, mutably. Writing registers through it can undo
    /// the bring-up.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn poll_txe(&mut self, max_polls: u32) -> bool {
        let mut isr = self.bus.reg(ISR);
        (0..max_polls).any(|_| isr.is_set(ISR_TXE))
    }
}

impl<B: Bus> Transmit for Usart<B> {
    fn transmit(&mut self, bytes: &[u8]) {
        self.write_bytes(bytes);
    }
}

impl<B: Bus> core::fmt::Write for Usart<B> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use core::fmt::Write as _;

    use super::*;
    use crate::regs::{gpio as gpio_regs, rcc as rcc_regs};
    use crate::sim::{Capture, RegWrite, SimBus, StopBits};

    fn up<const N: usize>() -> Usart<SimBus<Capture<N>>> {
        Usart::new(SimBus::new(Capture::new()), Config::REFERENCE)
    }

    /// Drain the line and check that neither the wire capture nor the write
    /// log overflowed.
    fn sent<const N: usize>(usart: Usart<SimBus<Capture<N>>>) -> SimBus<Capture<N>> {
        let mut bus = usart.free();
        bus.drain();
        assert_eq!(bus.wire().dropped(), 0);
        assert_eq!(bus.unlogged_writes(), 0);
        bus
    }

    #[test]
    fn reference_divisor_truncates() {
        assert_eq!(divisor(48_000_000, 115_200), 416);
        assert_eq!(Config::REFERENCE.divisor(), 416);
        assert_eq!(divisor(8_000_000, 9_600), 833);
    }

    #[test]
    fn bring_up_follows_reference_sequence() {
        let usart = up::<0>();
        let bus = usart.free();

        let w = |addr, value| RegWrite { addr, value };
        assert_eq!(
            bus.writes(),
            &[
                w(rcc_regs::AHBENR, 0x0018_0000),
                // PC12: MODER clear, set; AFRH clear, set.
                w(gpio_regs::GPIOC, 0),
                w(gpio_regs::GPIOC, 0x0200_0000),
                w(gpio_regs::GPIOC + gpio_regs::AFRH, 0),
                w(gpio_regs::GPIOC + gpio_regs::AFRH, 0x0002_0000),
                // PD2: MODER clear, set; AFRL clear, set.
                w(gpio_regs::GPIOD, 0),
                w(gpio_regs::GPIOD, 0x0000_0020),
                w(gpio_regs::GPIOD + gpio_regs::AFRL, 0),
                w(gpio_regs::GPIOD + gpio_regs::AFRL, 0x0000_0200),
                w(rcc_regs::APB1ENR, 0x0010_0000),
                // UE, M, STOP, PCE, OVER8
                w(CR1, 0),
                w(CR1, 0),
                w(CR2, 0),
                w(CR1, 0),
                w(CR1, 0),
                w(BRR, 416),
                w(CR1, 0b1101),
            ]
        );
    }

    #[test]
    fn bring_up_overrides_any_prior_frame_format() {
        let mut bus = SimBus::new(Capture::<0>::new());
        bus.preload(
            CR1,
            CR1_UE.mask() | CR1_M0.mask() | CR1_M1.mask() | CR1_PCE.mask() | CR1_OVER8.mask(),
        );
        bus.preload(CR2, CR2_STOP.mask());
        bus.preload(BRR, 0xFFFF);

        let bus = Usart::new(bus, Config::REFERENCE).free();
        let line = bus.line_settings();
        assert_eq!(line.data_bits, 8);
        assert_eq!(line.stop_bits, StopBits::One);
        assert!(!line.parity);
        assert_eq!(line.oversampling, 16);
        assert_eq!(line.divisor, 416);
        assert_eq!(line.baud(48_000_000), 115_384);

        // UE was dropped before the first frame-format write.
        let writes = bus.writes();
        let first = writes.iter().position(|w| w.addr == CR1).unwrap();
        assert_eq!(writes[first].value & CR1_UE.mask(), 0);
        assert_eq!(writes[first].value & CR1_M0.mask(), CR1_M0.mask());
    }

    #[test]
    fn enable_is_the_last_write() {
        let bus = up::<0>().free();
        let (last, rest) = bus.writes().split_last().unwrap();

        assert_eq!(last.addr, CR1);
        let enable = CR1_TE.mask() | CR1_RE.mask() | CR1_UE.mask();
        assert_eq!(last.value & enable, enable);
        assert!(rest.iter().all(|w| w.addr != CR1 || w.value & CR1_UE.mask() == 0));
        assert!(rest.iter().any(|w| w.addr == BRR));
    }

    #[test]
    fn pins_select_usart5_alternate_function() {
        let bus = up::<0>().free();
        let cfg = Config::REFERENCE;
        for pin in [cfg.tx, cfg.rx] {
            assert_eq!(pin.mode_field().decode(bus.peek(pin.moder())), 0b10);
            assert_eq!(pin.af_field().decode(bus.peek(pin.afr())), 2);
        }
    }

    #[test]
    fn one_wait_then_write_cycle_per_byte() {
        let mut usart = up::<16>();
        usart.write_bytes(b"WINR\n");

        let bus = usart.bus();
        assert_eq!(bus.data_writes(), 5);
        assert_eq!(bus.blind_writes(), 0);
        assert_eq!(bus.overruns(), 0);

        let bus = sent(usart);
        assert_eq!(bus.wire().bytes(), b"WINR\n");
    }

    #[test]
    fn every_length_and_shift_speed() {
        let text: [u8; 32] = *b"TYPE:echo 0123456789 abcdefghij\n";
        for shift_polls in [0, 1, 4, 17] {
            for n in 0..=text.len() {
                let mut bus = SimBus::new(Capture::<32>::new());
                bus.set_shift_polls(shift_polls);
                let mut usart = Usart::new(bus, Config::REFERENCE);

                usart.write_bytes(&text[..n]);

                let bus = usart.bus();
                assert_eq!(bus.data_writes(), n as u32, "n={n} shift={shift_polls}");
                assert_eq!(bus.blind_writes(), 0, "n={n} shift={shift_polls}");
                assert_eq!(bus.overruns(), 0, "n={n} shift={shift_polls}");
                assert_eq!(sent(usart).wire().bytes(), &text[..n]);
            }
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "divisor overflows BRR")]
    fn divisor_wider_than_brr_is_rejected() {
        let config = Config {
            clock_hz: 48_000_000,
            baud: 300,
            ..Config::REFERENCE
        };
        let _ = Usart::new(SimBus::new(Capture::<0>::new()), config);
    }

    #[test]
    fn widest_divisor_fits() {
        let config = Config {
            clock_hz: 0xFFFF,
            baud: 1,
            ..Config::REFERENCE
        };
        let usart = Usart::new(SimBus::new(Capture::<0>::new()), config);
        assert_eq!(usart.config().divisor(), 0xFFFF);
        assert_eq!(usart.free().line_settings().divisor, 0xFFFF);
    }

    #[test]
    fn slow_shift_register_is_waited_for() {
        let mut bus = SimBus::new(Capture::<32>::new());
        bus.set_shift_polls(5);
        let mut usart = Usart::new(bus, Config::REFERENCE);

        usart.write_cstr(c"TYPE:cmd\n");

        let bus = usart.bus();
        assert_eq!(bus.overruns(), 0);
        assert_eq!(bus.blind_writes(), 0);
        // Each byte after the first waits out the previous shift.
        assert!(bus.polls() > 5 * 8);
        assert_eq!(sent(usart).wire().bytes(), b"TYPE:cmd\n");
    }

    #[test]
    fn returns_before_the_last_byte_is_on_the_wire() {
        let mut bus = SimBus::new(Capture::<4>::new());
        bus.set_shift_polls(3);
        let mut usart = Usart::new(bus, Config::REFERENCE);

        usart.write_bytes(b"ok");
        assert!(usart.bus().pending() > 0);

        usart.flush();
        assert_eq!(usart.bus().pending(), 0);
        assert_eq!(usart.bus().wire().bytes(), b"ok");
    }

    #[test]
    fn consecutive_calls_do_not_drop_bytes() {
        let mut usart = up::<4>();
        usart.write_cstr(c"A");
        usart.write_cstr(c"B");
        assert_eq!(sent(usart).wire().bytes(), b"AB");
    }

    #[test]
    fn cstr_stops_at_terminator() {
        let mut usart = up::<8>();
        usart.write_cstr(CStr::from_bytes_until_nul(b"ENTER\n\0junk").unwrap());
        assert_eq!(sent(usart).wire().bytes(), b"ENTER\n");
    }

    #[test]
    fn empty_request_touches_nothing() {
        let mut usart = up::<0>();
        usart.write_bytes(b"");
        assert_eq!(usart.bus().polls(), 0);
        assert_eq!(usart.bus().data_writes(), 0);
    }

    #[test]
    fn bounded_write_reports_stalled_line() {
        let mut usart = up::<8>();
        usart.write_bytes(b"ab");
        usart.bus_mut().stall(true);

        assert_eq!(
            usart.try_write_bytes(b"cd", 100),
            Err(Error::Timeout { sent: 0 })
        );
        assert_eq!(usart.bus().data_writes(), 2);
    }

    #[test]
    fn bounded_write_succeeds_on_healthy_line() {
        let mut usart = up::<8>();
        assert_eq!(usart.try_write_bytes(b"hey", 10), Ok(()));
        assert_eq!(sent(usart).wire().bytes(), b"hey");
    }

    #[test]
    fn timeout_after_partial_progress() {
        let mut bus = SimBus::new(Capture::<8>::new());
        bus.set_shift_polls(50);
        let mut usart = Usart::new(bus, Config::REFERENCE);

        // The first byte goes straight in, the second has to wait for the
        // shift register to empty.
        assert_eq!(
            usart.try_write_bytes(b"xyz", 10),
            Err(Error::Timeout { sent: 2 })
        );
    }

    #[test]
    fn formatted_output() {
        let mut usart = up::<16>();
        writeln!(usart, "TYPE:{}", 42).unwrap();
        assert_eq!(sent(usart).wire().bytes(), b"TYPE:42\n");
    }
}
