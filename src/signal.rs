//! SIGINT/SIGTERM/SIGHUP driven graceful shutdown.
//!
//! Mirrors `comprestimator.c`'s `cleanup_handler`/`signal()` registration,
//! but the handler itself only flips an async-signal-safe atomic flag —
//! all actual cleanup (draining workers, flushing logs, emitting a partial
//! report) runs on the driver's normal control flow, polled between pool
//! operations, rather than inside the signal handler itself.

use std::sync::atomic::{AtomicI32, Ordering};

static CAUGHT_SIGNAL: AtomicI32 = AtomicI32::new(0);

extern "C" fn handle(sig: libc::c_int) {
    CAUGHT_SIGNAL.store(sig, Ordering::SeqCst);
}

/// Registers the handler for SIGINT, SIGTERM, and SIGHUP. Call once at
/// startup, before any workers are spawned.
pub fn install() {
    unsafe {
        libc::signal(libc::SIGINT, handle as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle as libc::sighandler_t);
        libc::signal(libc::SIGHUP, handle as libc::sighandler_t);
    }
}

/// Returns the signal number that was caught, if any, since the last check.
/// Does not reset the flag — once a shutdown signal has landed, the driver
/// should stay in "shutting down" mode for the rest of its run.
pub fn caught() -> Option<i32> {
    match CAUGHT_SIGNAL.load(Ordering::SeqCst) {
        0 => None,
        sig => Some(sig),
    }
}

/// Process exit status for a signalled shutdown, following the Rust/POSIX
/// convention of `128 + signal number` (standing in for the original tool's
/// raw `exit(sig)`, which this crate's driver cannot emulate exactly since
/// Rust's `std::process::exit` takes an `i32` status rather than re-raising
/// the signal against the default handler).
pub fn exit_status(sig: i32) -> i32 {
    128 + sig
}
