//! Register-level simulator for the blocks used by bring-up.
//!
//! [`SimBus`] stores register values in a small fixed table and models the
//! parts of the hardware that the code under test reacts to:
//!
//! - `RCC_CR.PLLRDY` follows `PLLON` and `RCC_CFGR.SWS` follows `SW`.
//! - USART5 has a data register and a shift register. `ISR.TXE` reads set
//!   when the data register is empty, `ISR.TC` when both are. A byte in the
//!   shift register reaches the [`Wire`] after a configurable number of status
//!   polls. Nothing moves unless the unit is enabled (`UE` and `TE`) and the
//!   line is not stalled.
//!
//! Register writes other than to `TDR` are recorded in order so tests can
//! check sequencing.

use crate::regs::{rcc, usart};

/// Receives bytes that leave the simulated shift register.
pub trait Wire {
    /// One byte was put on the line.
    fn emit(&mut self, byte: u8);
}

impl<W: Wire> Wire for &mut W {
    fn emit(&mut self, byte: u8) {
        (**self).emit(byte)
    }
}

/// A fixed-capacity [`Wire`] that keeps the first `N` bytes.
pub struct Capture<const N: usize> {
    buf: [u8; N],
    len: usize,
    dropped: usize,
}

impl<const N: usize> Capture<N> {
    /// An empty capture.
    pub const fn new() -> Self {
        Capture {
            buf: [0; N],
            len: 0,
            dropped: 0,
        }
    }

    /// Bytes captured so far.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Bytes that did not fit.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl<const N: usize> Default for Capture<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Wire for Capture<N> {
    fn emit(&mut self, byte: u8) {
        if self.len < N {
            self.buf[self.len] = byte;
            self.len += 1;
        } else {
            self.dropped += 1;
        }
    }
}

/// One recorded register write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegWrite {
    /// Register address.
    pub addr: usize,
    /// Full value written.
    pub value: u32,
}

/// Stop bit setting decoded from `CR2.STOP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    /// 1 stop bit.
    One,
    /// 0.5 stop bits.
    Half,
    /// 2 stop bits.
    Two,
    /// 1.5 stop bits.
    OneAndHalf,
}

/// Frame settings as the hardware would apply them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineSettings {
    /// Data bits per frame.
    pub data_bits: u8,
    /// Stop bits per frame.
    pub stop_bits: StopBits,
    /// Parity bit present.
    pub parity: bool,
    /// Samples per bit.
    pub oversampling: u8,
    /// `BRR` contents.
    pub divisor: u32,
}

impl LineSettings {
    /// Resulting baud rate for a kernel clock of `clock_hz`.
    ///
    /// Returns 0 while no divisor is programmed.
    pub fn baud(&self, clock_hz: u32) -> u32 {
        if self.divisor == 0 {
            return 0;
        }
        match self.oversampling {
            8 => {
                // BRR[3] must be clear, BRR[2:0] hold USARTDIV[3:0] >> 1.
                let usartdiv = (self.divisor & !0xF) | ((self.divisor & 0x7) << 1);
                2 * clock_hz / usartdiv
            }
            _ => clock_hz / self.divisor,
        }
    }
}

const SLOTS: usize = 24;
const LOG_LEN: usize = 64;

/// Simulated register file. See the module documentation.
pub struct SimBus<W: Wire> {
    regs: [(usize, u32); SLOTS],
    used: usize,
    log: [RegWrite; LOG_LEN],
    logged: usize,
    unlogged: usize,
    wire: W,
    tdr: Option<u8>,
    shifter: Option<(u8, u32)>,
    shift_polls: u32,
    stalled: bool,
    txe_seen: bool,
    polls: u32,
    data_writes: u32,
    blind_writes: u32,
    overruns: u32,
}

impl<W: Wire> SimBus<W> {
    /// A register file in power-on state (every register zero) sending to `wire`.
    pub const fn new(wire: W) -> Self {
        SimBus {
            regs: [(0, 0); SLOTS],
            used: 0,
            log: [RegWrite { addr: 0, value: 0 }; LOG_LEN],
            logged: 0,
            unlogged: 0,
            wire,
            tdr: None,
            shifter: None,
            shift_polls: 0,
            stalled: false,
            txe_seen: false,
            polls: 0,
            data_writes: 0,
            blind_writes: 0,
            overruns: 0,
        }
    }

    /// Set a register without recording a write, to emulate prior state.
    pub fn preload(&mut self, addr: usize, value: u32) {
        self.store(addr, value);
    }

    /// Stored register value, without side effects.
    pub fn peek(&self, addr: usize) -> u32 {
        self.regs[..self.used]
            .iter()
            .find(|(a, _)| *a == addr)
            .map_or(0, |(_, v)| *v)
    }

    /// Number of status polls a byte spends in the shift register.
    pub fn set_shift_polls(&mut self, polls: u32) {
        self.shift_polls = polls;
    }

    /// Freeze the transmitter: `TXE` and `TC` stay clear while stalled.
    pub fn stall(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Recorded register writes, oldest first. `TDR` writes are not recorded.
    pub fn writes(&self) -> &[RegWrite] {
        &self.log[..self.logged]
    }

    /// Writes that did not fit in the log.
    pub fn unlogged_writes(&self) -> usize {
        self.unlogged
    }

    /// Reads of `ISR`.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Writes of `TDR`.
    pub fn data_writes(&self) -> u32 {
        self.data_writes
    }

    /// `TDR` writes not preceded by a read of `ISR` that returned `TXE` set.
    pub fn blind_writes(&self) -> u32 {
        self.blind_writes
    }

    /// `TDR` writes that replaced a byte the hardware had not taken yet.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Bytes accepted by the peripheral that are not on the wire yet.
    pub fn pending(&self) -> usize {
        self.tdr.is_some() as usize + self.shifter.is_some() as usize
    }

    /// Clock the transmitter until everything accepted is on the wire.
    ///
    /// Does nothing while the line is down.
    pub fn drain(&mut self) {
        while self.line_up() && self.pending() > 0 {
            self.tick();
        }
    }

    /// Frame settings decoded from `CR1`, `CR2` and `BRR`.
    pub fn line_settings(&self) -> LineSettings {
        let cr1 = self.peek(usart::CR1);
        let cr2 = self.peek(usart::CR2);
        let m = (usart::CR1_M1.decode(cr1) << 1) | usart::CR1_M0.decode(cr1);
        LineSettings {
            data_bits: match m {
                0b00 => 8,
                0b01 => 9,
                _ => 7,
            },
            stop_bits: match usart::CR2_STOP.decode(cr2) {
                0b00 => StopBits::One,
                0b01 => StopBits::Half,
                0b10 => StopBits::Two,
                _ => StopBits::OneAndHalf,
            },
            parity: usart::CR1_PCE.decode(cr1) != 0,
            oversampling: if usart::CR1_OVER8.decode(cr1) != 0 {
                8
            } else {
                16
            },
            divisor: usart::BRR_BRR.decode(self.peek(usart::BRR)),
        }
    }

    /// The wire sink.
    pub fn wire(&self) -> &W {
        &self.wire
    }

    fn line_up(&self) -> bool {
        let cr1 = self.peek(usart::CR1);
        !self.stalled && cr1 & usart::CR1_UE.mask() != 0 && cr1 & usart::CR1_TE.mask() != 0
    }

    fn tick(&mut self) {
        if !self.line_up() {
            return;
        }
        if let Some((byte, left)) = self.shifter {
            if left == 0 {
                self.wire.emit(byte);
                self.shifter = None;
            } else {
                self.shifter = Some((byte, left - 1));
            }
        }
        if self.shifter.is_none() {
            if let Some(byte) = self.tdr.take() {
                self.shifter = Some((byte, self.shift_polls));
            }
        }
    }

    fn read_isr(&mut self) -> u32 {
        self.polls += 1;
        self.tick();
        let mut isr = self.peek(usart::ISR) & !(usart::ISR_TXE.mask() | usart::ISR_TC.mask());
        if self.line_up() && self.tdr.is_none() {
            isr |= usart::ISR_TXE.mask();
            self.txe_seen = true;
            if self.shifter.is_none() {
                isr |= usart::ISR_TC.mask();
            }
        }
        isr
    }

    fn write_tdr(&mut self, value: u32) {
        self.data_writes += 1;
        if !self.txe_seen {
            self.blind_writes += 1;
        }
        self.txe_seen = false;
        if self.tdr.is_some() {
            self.overruns += 1;
        }
        self.tdr = Some(value as u8);
    }

    fn store(&mut self, addr: usize, value: u32) {
        if let Some(slot) = self.regs[..self.used].iter_mut().find(|(a, _)| *a == addr) {
            slot.1 = value;
            return;
        }
        assert!(self.used < SLOTS, "simulated register file is full");
        self.regs[self.used] = (addr, value);
        self.used += 1;
    }

    fn record(&mut self, addr: usize, value: u32) {
        if self.logged < LOG_LEN {
            self.log[self.logged] = RegWrite { addr, value };
            self.logged += 1;
        } else {
            self.unlogged += 1;
        }
    }
}

impl<W: Wire> crate::bus::Bus for SimBus<W> {
    fn read(&mut self, addr: usize) -> u32 {
        match addr {
            usart::ISR => self.read_isr(),
            usart::TDR => 0,
            rcc::CR => {
                let cr = self.peek(addr);
                let ready = rcc::CR_PLLON.decode(cr);
                (cr & !rcc::CR_PLLRDY.mask()) | rcc::CR_PLLRDY.encode(ready)
            }
            rcc::CFGR => {
                let cfgr = self.peek(addr);
                let sw = rcc::CFGR_SW.decode(cfgr);
                (cfgr & !rcc::CFGR_SWS.mask()) | rcc::CFGR_SWS.encode(sw)
            }
            _ => self.peek(addr),
        }
    }

    fn write(&mut self, addr: usize, value: u32) {
        match addr {
            usart::TDR => self.write_tdr(value),
            // Status register is read-only.
            usart::ISR => self.record(addr, value),
            _ => {
                self.record(addr, value);
                self.store(addr, value);
            }
        }
    }
}
