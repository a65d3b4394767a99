//! Best-effort CPU pinning.
//!
//! Pinning the measuring thread to CPU 0 removes migration noise between runs.
//! Failure is reported and never fatal.

use std::io;

use crate::config::pin_requested;

/// Pin the current thread to CPU 0.
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
pub fn pin_to_cpu0() -> io::Result<()> {
    // SAFETY: `cpu_set_t` is plain data, so an all-zero value is a valid empty
    // set; the set outlives the call and its size is passed exactly.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(0, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu0() -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "CPU pinning is only implemented on Linux",
    ))
}

/// Pin when `BOUNDARY_BENCH_PIN` asks for it; returns whether the thread is pinned.
pub fn maybe_pin_thread() -> bool {
    if !pin_requested() {
        return false;
    }
    match pin_to_cpu0() {
        Ok(()) => {
            eprintln!("[harness] pinned to cpu 0");
            true
        }
        Err(err) => {
            eprintln!("[harness] pinning failed: {err}");
            false
        }
    }
}
