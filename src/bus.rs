//! Register access.
//!
//! All peripheral state changes go through a [`Bus`]. On hardware this is
//! [`Mmio`], a token for volatile memory-mapped access that can be taken only
//! once. Tests substitute the register simulator.

use core::cell::Cell;
use core::ptr::{with_exposed_provenance, with_exposed_provenance_mut};

use critical_section::Mutex;

use crate::regs::Field;

/// 32-bit register reads and writes at absolute addresses.
pub trait Bus {
    /// Read the register at `addr`.
    fn read(&mut self, addr: usize) -> u32;

    /// Write `value` to the register at `addr`.
    fn write(&mut self, addr: usize, value: u32);

    /// Borrow the register at `addr` for named field operations.
    fn reg(&mut self, addr: usize) -> Reg<'_, Self>
    where
        Self: Sized,
    {
        Reg { bus: self, addr }
    }
}

impl<B: Bus> Bus for &mut B {
    fn read(&mut self, addr: usize) -> u32 {
        (**self).read(addr)
    }

    fn write(&mut self, addr: usize, value: u32) {
        (**self).write(addr, value)
    }
}

/// A single register, borrowed from a [`Bus`].
///
/// [`Reg::read`], [`Reg::field`] and [`Reg::is_set`] are a single read,
/// [`Reg::write`] a single write, and [`Reg::wait_for`] repeated reads with no
/// write. Every other method is exactly one read followed by one write.
pub struct Reg<'a, B: Bus> {
    bus: &'a mut B,
    addr: usize,
}

impl<B: Bus> Reg<'_, B> {
    /// Raw register value.
    pub fn read(&mut self) -> u32 {
        self.bus.read(self.addr)
    }

    /// Overwrite the whole register.
    pub fn write(&mut self, value: u32) {
        self.bus.write(self.addr, value)
    }

    /// Current value of `field`.
    pub fn field(&mut self, field: Field) -> u32 {
        field.decode(self.read())
    }

    /// `true` if any bit of `field` is set.
    pub fn is_set(&mut self, field: Field) -> bool {
        self.read() & field.mask() != 0
    }

    /// Read, transform and write back.
    pub fn modify(&mut self, f: impl FnOnce(u32) -> u32) {
        let value = self.read();
        self.write(f(value));
    }

    /// Clear every bit of `field`.
    pub fn clear(&mut self, field: Field) {
        self.modify(|w| w & !field.mask());
    }

    /// Clear every bit of all `fields` in a single write.
    pub fn clear_all(&mut self, fields: &[Field]) {
        let mask = combined_mask(fields);
        self.modify(|w| w & !mask);
    }

    /// OR `value` into `field` without clearing it first.
    ///
    /// Pair with [`Reg::clear`] to replace a multi-bit field.
    pub fn insert(&mut self, field: Field, value: u32) {
        self.modify(|w| w | field.encode(value));
    }

    /// Set every bit of all `fields` in a single write.
    pub fn set_all(&mut self, fields: &[Field]) {
        let mask = combined_mask(fields);
        self.modify(|w| w | mask);
    }

    /// Clear `field` and store `value` in it in a single write.
    pub fn replace(&mut self, field: Field, value: u32) {
        self.modify(|w| (w & !field.mask()) | field.encode(value));
    }

    /// Spin until `field` reads as `value`.
    pub fn wait_for(&mut self, field: Field, value: u32) {
        while self.field(field) != value {}
    }
}

fn combined_mask(fields: &[Field]) -> u32 {
    fields.iter().fold(0, |mask, f| mask | f.mask())
}

/// Memory-mapped register access.
///
/// Owning an `Mmio` stands for owning every register this crate touches.
pub struct Mmio {
    _private: (),
}

static TAKEN: Mutex<Cell<bool>> = Mutex::new(Cell::new(false));

impl Mmio {
    /// Take the register token. Returns `None` on every call after the first.
    pub fn take() -> Option<Self> {
        critical_section::with(|cs| {
            let taken = TAKEN.borrow(cs);
            if taken.replace(true) {
                None
            } else {
                Some(Mmio { _private: () })
            }
        })
    }
}

impl Bus for Mmio {
    #[inline]
    fn read(&mut self, addr: usize) -> u32 {
        // SAFETY: Owning `Mmio` grants exclusive access to the register block.
        // Callers only pass addresses from `regs`, which are aligned device registers.
        unsafe { with_exposed_provenance::<u32>(addr).read_volatile() }
    }

    #[inline]
    fn write(&mut self, addr: usize, value: u32) {
        // SAFETY: See `read`.
        unsafe { with_exposed_provenance_mut::<u32>(addr).write_volatile(value) }
    }
}
