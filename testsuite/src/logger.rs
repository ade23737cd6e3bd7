//! defmt global logger writing frames to semihosting stdout.
//!
//! The xtask captures QEMU's stdout and decodes it against the example ELF.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering, compiler_fence};

use cortex_m_semihosting::hio::{self, HostStream};
use critical_section::RestoreState;
use defmt::Encoder;

#[defmt::global_logger]
struct Logger;

struct LoggerState {
    cs_state: UnsafeCell<RestoreState>,
    encoder: UnsafeCell<Encoder>,
    stdout: UnsafeCell<Option<HostStream>>,
    /// 0 = idle, 1 = logging, 2+ = reentrant (dropped).
    depth: AtomicUsize,
}

// SAFETY: `cs_state`, `encoder` and `stdout` are only touched between
// `acquire` and `release`, i.e. inside a critical section, and only by the
// outermost (depth 1) logging call.
unsafe impl Sync for LoggerState {}

static STATE: LoggerState = LoggerState {
    cs_state: UnsafeCell::new(RestoreState::invalid()),
    encoder: UnsafeCell::new(Encoder::new()),
    stdout: UnsafeCell::new(None),
    depth: AtomicUsize::new(0),
};

/// # Safety
///
/// Must be called from within the logger's critical section.
unsafe fn write_stdout(bytes: &[u8]) {
    // SAFETY: Caller guarantees we're in a critical section.
    let handle = unsafe { &mut *STATE.stdout.get() };

    // Open once; reopening would truncate the host file.
    if handle.is_none() {
        *handle = hio::hstdout().ok();
    }

    if let Some(stdout) = handle {
        let _ = stdout.write_all(bytes);
    }
}

// SAFETY: `acquire` enters a critical section that `release` leaves, and all
// shared state is only accessed in between.
unsafe impl defmt::Logger for Logger {
    fn acquire() {
        if STATE.depth.fetch_add(1, Ordering::Acquire) > 0 {
            return;
        }

        // SAFETY: Balanced by `critical_section::release` in `release()`.
        let restore = unsafe { critical_section::acquire() };
        compiler_fence(Ordering::SeqCst);

        // SAFETY: Inside the critical section.
        unsafe { STATE.cs_state.get().write(restore) };
        // SAFETY: Inside the critical section.
        unsafe { &mut *STATE.encoder.get() }.start_frame(|b| unsafe { write_stdout(b) });
    }

    unsafe fn flush() {}

    unsafe fn release() {
        if STATE.depth.fetch_sub(1, Ordering::Release) != 1 {
            return;
        }

        // SAFETY: Still inside the critical section from `acquire()`.
        unsafe { &mut *STATE.encoder.get() }.end_frame(|b| unsafe { write_stdout(b) });
        compiler_fence(Ordering::SeqCst);

        // SAFETY: Restores the state saved by `acquire()`.
        unsafe { critical_section::release(STATE.cs_state.get().read()) };
    }

    unsafe fn write(bytes: &[u8]) {
        if STATE.depth.load(Ordering::Relaxed) != 1 {
            return;
        }

        // SAFETY: Called between `acquire()` and `release()`.
        unsafe { &mut *STATE.encoder.get() }.write(bytes, |b| unsafe { write_stdout(b) });
    }
}
