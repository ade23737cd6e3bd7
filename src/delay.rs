//! Settling delay between commands.

/// Waits for a fixed time budget. Never returns early.
pub trait Settle {
    /// Block until the budget has elapsed.
    fn settle(&mut self);
}

impl<S: Settle> Settle for &mut S {
    fn settle(&mut self) {
        (**self).settle()
    }
}

/// Cycle-counted busy wait on the core.
///
/// Built on [`cortex_m::asm::delay`], which spins for at least the requested
/// number of core cycles. The wait is longer when the core is stalled on flash
/// or interrupted, never shorter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpinDelay {
    cycles: u32,
}

impl SpinDelay {
    /// At least `ms` milliseconds on a core running at `sysclk_hz`.
    ///
    /// Saturates at `u32::MAX` cycles.
    pub const fn from_millis(sysclk_hz: u32, ms: u32) -> Self {
        let cycles = (sysclk_hz as u64 / 1_000) * ms as u64;
        SpinDelay {
            cycles: if cycles > u32::MAX as u64 {
                u32::MAX
            } else {
                cycles as u32
            },
        }
    }

    /// At least `cycles` core cycles.
    pub const fn from_cycles(cycles: u32) -> Self {
        SpinDelay { cycles }
    }

    /// Minimum number of core cycles spent in [`Settle::settle`].
    pub const fn cycles(&self) -> u32 {
        self.cycles
    }
}

impl Settle for SpinDelay {
    fn settle(&mut self) {
        cortex_m::asm::delay(self.cycles);
    }
}
