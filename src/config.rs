//! Compile-time configuration.
//!
//! Every other module reads its limits from here instead of repeating
//! literals; this is the crate's one knob panel.

/// Size of the fixed thread pool, including the compulsory idle thread.
pub const MAX_THREADS: usize = 24;

/// Size of the fixed periodic-event table.
pub const MAX_PERIODIC_EVENTS: usize = 6;

/// Words (u32) reserved per thread stack.
pub const STACK_WORDS_PER_THREAD: usize = 512;

/// Number of FIFOs the kernel owns.
pub const MAX_FIFOS: usize = 4;

/// Capacity, in 32-bit words, of each FIFO.
pub const FIFO_CAPACITY: usize = 16;

/// Tick period, in milliseconds. The tick handler fires at 1 kHz.
pub const TICK_PERIOD_MS: u32 = 1;

/// Priority reserved for the idle thread. Never assignable to an
/// application thread.
pub const IDLE_PRIORITY: u8 = 255;

/// Lowest hardware-interrupt priority assignable by the application; the
/// kernel's own tick and scheduler interrupts sit below this (numerically
/// higher, i.e. less urgent) on the architectures this crate targets.
pub const OS_INTERRUPT_PRIORITY: u8 = 7;

/// Highest (numerically smallest, most urgent) priority an application may
/// request for an aperiodic event, strictly above `OS_INTERRUPT_PRIORITY`.
pub const MAX_USER_IRQ_PRIORITY: u8 = 6;

/// Bound on a thread's human-readable name, not including the terminator.
pub const THREAD_NAME_MAX: usize = 16;

/// Smallest and largest hardware IRQ numbers an application may bind with
/// `add_aperiodic_event`. Vectors outside this range belong to the kernel
/// or the architecture and are refused.
pub const MIN_USER_IRQ: u16 = 0;
pub const MAX_USER_IRQ: u16 = 239;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_priority_is_worse_than_any_user_priority() {
        assert!(IDLE_PRIORITY as u16 > MAX_USER_IRQ_PRIORITY as u16);
        assert!(IDLE_PRIORITY > OS_INTERRUPT_PRIORITY);
    }

    #[test]
    fn os_priority_is_below_max_user_irq_priority() {
        assert!(MAX_USER_IRQ_PRIORITY < OS_INTERRUPT_PRIORITY);
    }
}
