//! A small preemptive, fixed-priority RTOS core for a single-core 32-bit
//! microcontroller: a fixed thread pool, a priority scheduler, a 1 kHz tick
//! driving periodic events and sleep wakeups, counting semaphores, and
//! fixed-capacity inter-thread FIFOs.
//!
//! Out of scope, by design: board support (GPIO, buttons, sensors),
//! graphics, transport, dynamic thread creation beyond the fixed pool,
//! priority inheritance, MPU support, and multi-core scheduling. Those are
//! the application's problem; this crate only guarantees that its own
//! entry points are safe to call from thread context, and marks the ones
//! that are additionally safe to call from interrupt context.
//!
//! Call order: [`init`] → any number of [`add_thread`]/[`add_periodic_event`]
//! → [`launch`], which never returns on success.
#![cfg_attr(not(test), no_std)]

pub mod aperiodic;
pub mod arch;
pub mod config;
pub mod critical;
pub mod error;
pub mod fifo;
pub mod kernel;
pub mod periodic;
pub mod scheduler;
pub mod semaphore;
pub mod sleep;
pub mod tcb;
pub mod tick;

pub use aperiodic::add_aperiodic_event;
pub use error::{KernelError, KernelResult};
pub use fifo::{fifo_init, fifo_lost_count, fifo_read, fifo_write, Fifo};
pub use kernel::init;
pub use periodic::add_periodic_event;
pub use scheduler::{
    add_thread, get_thread_id, kill_all_but_self, kill_self, kill_thread, launch,
};
pub use semaphore::Semaphore;
pub use sleep::sleep;
pub use tcb::ThreadId;

/// Set a semaphore's initial count. ISR-safe.
pub fn semaphore_init(s: &Semaphore, value: i32) {
    s.init(value);
}

/// Decrement a semaphore's count, blocking if it goes negative.
/// Not ISR-safe.
pub fn semaphore_wait(s: &Semaphore) {
    s.wait();
}

/// Increment a semaphore's count, waking a waiter if one is present.
/// ISR-safe.
pub fn semaphore_signal(s: &Semaphore) {
    s.signal();
}
