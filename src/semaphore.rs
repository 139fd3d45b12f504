//! Counting semaphores.
//!
//! A semaphore's identity for the `blocked` back-reference is a small
//! minted handle rather than its own address, so the "wake the first
//! waiter" scan never has to dereference anything.

use spin::Mutex;

use crate::arch;
use crate::critical;
use crate::kernel;
use crate::tcb::NONE;

/// Opaque handle minted by [`Semaphore::init`]. Two semaphores never
/// compare equal, even across re-`init`, because the mint counter never
/// resets within a kernel's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreId(u32);

impl SemaphoreId {
    pub(crate) fn from_raw(raw: u32) -> SemaphoreId {
        SemaphoreId(raw)
    }
}

struct SemState {
    id: Option<SemaphoreId>,
    count: i32,
}

/// A signed counter: non-negative values are an available count, negative
/// values are the number of waiters.
pub struct Semaphore {
    inner: Mutex<SemState>,
}

impl Semaphore {
    pub const fn new() -> Semaphore {
        Semaphore {
            inner: Mutex::new(SemState {
                id: None,
                count: 0,
            }),
        }
    }

    /// Set the counter to `value` and mint this semaphore's handle.
    pub fn init(&self, value: i32) {
        let token = critical::begin_critical();
        let id = kernel::with_kernel_mut(|k| k.next_semaphore_id());
        *self.inner.lock() = SemState {
            id: Some(id),
            count: value,
        };
        critical::end_critical(token);
    }

    /// Decrement the counter; if the result is negative, record the
    /// caller's thread as blocked on this semaphore and request a
    /// reschedule. Not ISR-safe: calling from a thread with no
    /// current-thread context (pre-`launch`) is a programming error and is
    /// treated as a non-blocking decrement with a warning rather than an
    /// out-of-bounds access.
    pub fn wait(&self) {
        let token = critical::begin_critical();
        let (id, must_block) = {
            let mut s = self.inner.lock();
            s.count -= 1;
            (s.id.expect("semaphore used before init"), s.count < 0)
        };
        let blocked = must_block
            && kernel::with_kernel_mut(|k| {
                if k.current == NONE {
                    log::warn!("rtkernel: semaphore wait blocked with no running thread");
                    return false;
                }
                let cur = k.current as usize;
                k.threads[cur].blocked = Some(id);
                true
            });
        critical::end_critical(token);
        if blocked {
            arch::request_reschedule();
        }
    }

    /// Increment the counter; if at least one thread was waiting, wake the
    /// first one in ring order after the current thread. ISR-safe.
    pub fn signal(&self) {
        let token = critical::begin_critical();
        let (id, should_wake) = {
            let mut s = self.inner.lock();
            s.count += 1;
            (s.id.expect("semaphore used before init"), s.count <= 0)
        };
        if should_wake {
            kernel::with_kernel_mut(|k| k.wake_first_blocked_on(id));
        }
        critical::end_critical(token);
        if should_wake {
            arch::request_reschedule();
        }
    }

    /// Current counter value. Used internally by the FIFO's capacity check
    /// and exposed for diagnostics/tests.
    pub fn count(&self) -> i32 {
        self.inner.lock().count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel;
    use crate::scheduler;

    extern "C" fn dummy() -> ! {
        loop {}
    }

    #[test]
    fn signal_without_waiters_just_increments() {
        kernel::reset_for_sim();
        let s = Semaphore::new();
        s.init(0);
        s.signal();
        assert_eq!(s.count(), 1);
    }

    #[test]
    fn waiter_at_head_of_ring_wakes_first() {
        kernel::reset_for_sim();
        let s = Semaphore::new();
        s.init(0);

        let a = scheduler::add_thread(dummy, 2, "a").unwrap();
        let b = scheduler::add_thread(dummy, 3, "b").unwrap();
        let idle = scheduler::add_thread(dummy, 255, "idle").unwrap();
        scheduler::launch_for_test().unwrap();

        // force current onto `a` so its wait() records blocked, then onto
        // `b`, so both enter the wait set in a known order.
        kernel::with_kernel_mut(|k| k.current = a.slot());
        s.wait();
        kernel::with_kernel_mut(|k| k.current = b.slot());
        s.wait();
        assert_eq!(s.count(), -2);

        s.signal();
        assert_eq!(s.count(), -1);
        let a_blocked = kernel::with_kernel(|k| k.threads[a.slot() as usize].blocked);
        let b_blocked = kernel::with_kernel(|k| k.threads[b.slot() as usize].blocked);
        assert!(a_blocked.is_none(), "T_a entered the waiter set first and must wake first");
        assert!(b_blocked.is_some());

        let _ = idle;
    }
}
