//! Host simulation backend.
//!
//! Used by `#[cfg(test)]` and by the `sim` feature so the scheduler, tick
//! handler, semaphores, sleep and FIFOs can be exercised by plain host
//! `#[test]`s. There is no real hardware underneath: "stack
//! pointers" are just the base address of the thread's stack slice, and
//! `request_reschedule` calls straight into the portable scheduler instead
//! of pending a real exception.

use core::sync::atomic::{AtomicBool, Ordering};

use super::StackPtr;

static INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Reset simulated architecture state between tests. Not part of the
/// public API; `#[cfg(test)]` callers reach it via `crate::arch::sim`.
pub fn reset() {
    INTERRUPTS_ENABLED.store(true, Ordering::SeqCst);
}

pub fn interrupts_enabled() -> bool {
    INTERRUPTS_ENABLED.load(Ordering::SeqCst)
}

pub fn disable_interrupts() {
    INTERRUPTS_ENABLED.store(false, Ordering::SeqCst);
}

pub fn enable_interrupts() {
    INTERRUPTS_ENABLED.store(true, Ordering::SeqCst);
}

/// On real hardware this pends PendSV; here there is no asynchronous
/// exception to pend, so a reschedule happens inline, synchronously, which
/// is observationally equivalent for anything that inspects kernel state
/// through the public API rather than by single-stepping silicon.
pub fn request_reschedule() {
    crate::scheduler::schedule_now();
}

/// No real exception frame is needed: nothing in the sim backend ever
/// executes a thread's entry function, so the stack contents are
/// unobserved. The pointer still has to be distinct per thread so
/// identity-sensitive bookkeeping (if any) continues to work.
pub fn seed_stack(stack: &mut [u32], entry: extern "C" fn() -> !) -> StackPtr {
    if let Some(first) = stack.first_mut() {
        *first = entry as usize as u32;
    }
    StackPtr(stack.as_ptr() as usize)
}

pub fn configure_tick(_hz: u32) {}

pub fn set_irq_priority(_irq: u16, _priority: u8) {}

pub fn enable_irq(_irq: u16) {}

pub fn wait_for_interrupt() {
    core::hint::spin_loop();
}

/// Only reachable from the real `launch()` entry point, which sim-mode
/// tests never call (they call `scheduler::launch_for_test` instead, which
/// stops short of this). Parked here so the backend interface stays total.
pub fn start_first_thread(_sp: StackPtr) -> ! {
    loop {
        core::hint::spin_loop();
    }
}
