//! Single global kernel struct: all scheduler/tick/semaphore/FIFO state
//! lives in one place, owned by this module and reached through a single
//! well-defined entry point rather than scattered standalone statics.
//!
//! Everything the scheduler, tick handler, semaphores, sleep and FIFOs
//! touch lives here, behind one `spin::Mutex`. All kernel entry points take
//! a critical section first (interrupts disabled), so the lock is never
//! contended — it exists to give the borrow checker a single owner, not to
//! arbitrate concurrent access.

use spin::Mutex;

use crate::config;
use crate::error::KernelResult;
use crate::fifo::Fifo;
use crate::periodic::Ptcb;
use crate::tcb::{Tcb, NONE};

pub struct Kernel {
    pub threads: [Tcb; config::MAX_THREADS],
    pub stacks: [[u32; config::STACK_WORDS_PER_THREAD]; config::MAX_THREADS],
    pub ptcbs: [Ptcb; config::MAX_PERIODIC_EVENTS],
    pub ptcb_count: usize,
    pub fifos: [Fifo; config::MAX_FIFOS],
    pub ring_head: u16,
    pub current: u16,
    pub tick: u32,
    pub alive_count: usize,
    pub generation: u16,
    pub launched: bool,
    pub next_semaphore_id: u32,
}

impl Kernel {
    fn new() -> Kernel {
        Kernel {
            threads: [Tcb::dead(); config::MAX_THREADS],
            stacks: [[0u32; config::STACK_WORDS_PER_THREAD]; config::MAX_THREADS],
            ptcbs: [Ptcb::empty(); config::MAX_PERIODIC_EVENTS],
            ptcb_count: 0,
            // `Fifo` holds `UnsafeCell`/atomics and isn't `Copy`, so the
            // array can't be built with a repeat expression.
            fifos: core::array::from_fn(|_| Fifo::empty()),
            ring_head: NONE,
            current: NONE,
            tick: 0,
            alive_count: 0,
            generation: 1,
            launched: false,
            next_semaphore_id: 1,
        }
    }

    pub(crate) fn next_generation(&mut self) -> u16 {
        let g = self.generation;
        self.generation = self.generation.wrapping_add(1);
        g
    }

    pub(crate) fn next_semaphore_id(&mut self) -> crate::semaphore::SemaphoreId {
        let id = self.next_semaphore_id;
        self.next_semaphore_id = self.next_semaphore_id.wrapping_add(1);
        crate::semaphore::SemaphoreId::from_raw(id)
    }

    /// Splice `slot` into the ring of alive TCBs, just before `ring_head`
    /// (i.e. at the tail).
    pub(crate) fn ring_insert(&mut self, slot: u16) {
        if self.ring_head == NONE {
            self.threads[slot as usize].prev = slot;
            self.threads[slot as usize].next = slot;
            self.ring_head = slot;
        } else {
            let head = self.ring_head;
            let tail = self.threads[head as usize].prev;
            self.threads[tail as usize].next = slot;
            self.threads[slot as usize].prev = tail;
            self.threads[slot as usize].next = head;
            self.threads[head as usize].prev = slot;
        }
    }

    /// Remove `slot` from the ring. Caller clears `alive` separately.
    ///
    /// Deliberately leaves `slot`'s own `prev`/`next` untouched instead of
    /// resetting them to `NONE`: if `slot` was `current`, the scheduler's
    /// next decision still needs to walk the ring "from where `current` used
    /// to be", and the stale `next` pointer is exactly that anchor. Nothing
    /// live ever points back into a removed slot, so the stale links are
    /// inert until `ring_insert` overwrites them on reuse.
    pub(crate) fn ring_remove(&mut self, slot: u16) {
        let (prev, next) = {
            let t = &self.threads[slot as usize];
            (t.prev, t.next)
        };
        if prev == slot {
            self.ring_head = NONE;
        } else {
            self.threads[prev as usize].next = next;
            self.threads[next as usize].prev = prev;
            if self.ring_head == slot {
                self.ring_head = next;
            }
        }
    }

    /// Materialize the ring order starting just after `start` (or at
    /// `ring_head` when `start == NONE`, i.e. pre-launch). Returned as a
    /// fixed array rather than a borrowing iterator so callers can freely
    /// mutate `self.threads` while walking the result.
    pub(crate) fn ring_order_from(&self, start: u16) -> ([u16; config::MAX_THREADS], usize) {
        let mut out = [NONE; config::MAX_THREADS];
        let mut next = if start == NONE {
            self.ring_head
        } else {
            self.threads[start as usize].next
        };
        let mut n = 0;
        while n < self.alive_count && next != NONE {
            out[n] = next;
            next = self.threads[next as usize].next;
            n += 1;
        }
        (out, n)
    }

    /// Scan the ring starting after the currently running thread and clear
    /// `blocked` on the first match, so waiters wake in the order they
    /// joined the ring rather than by priority.
    pub(crate) fn wake_first_blocked_on(&mut self, id: crate::semaphore::SemaphoreId) {
        let (order, n) = self.ring_order_from(self.current);
        for &slot in &order[..n] {
            if self.threads[slot as usize].blocked == Some(id) {
                self.threads[slot as usize].blocked = None;
                return;
            }
        }
    }
}

static KERNEL: Mutex<Option<Kernel>> = Mutex::new(None);

/// Wire kernel state to a known-empty configuration. Must be called before
/// any other kernel entry point.
pub fn init() -> KernelResult<()> {
    *KERNEL.lock() = Some(Kernel::new());
    #[cfg(any(test, feature = "sim"))]
    crate::arch::sim::reset();
    log::debug!("rtkernel: init");
    Ok(())
}

/// Diagnostic entry point: count of currently alive threads.
pub fn thread_count() -> usize {
    with_kernel(|k| k.alive_count)
}

/// Current system time in ticks: a monotonically increasing 32-bit
/// counter that wraps on overflow.
pub fn current_tick() -> u32 {
    with_kernel(|k| k.tick)
}

pub(crate) fn with_kernel<R>(f: impl FnOnce(&Kernel) -> R) -> R {
    let guard = KERNEL.lock();
    f(guard.as_ref().expect("rtkernel: kernel::init was not called"))
}

pub(crate) fn with_kernel_mut<R>(f: impl FnOnce(&mut Kernel) -> R) -> R {
    let mut guard = KERNEL.lock();
    f(guard.as_mut().expect("rtkernel: kernel::init was not called"))
}

/// Borrow FIFO `index`'s static storage without holding the kernel lock for
/// the whole call. `Fifo::read`/`write` block on their own internal
/// semaphores, which themselves call back into `with_kernel_mut`; holding
/// the outer lock across that call would deadlock `spin::Mutex`, which is
/// not reentrant. Safe because `Kernel`, once placed by `init`, is never
/// moved or reallocated for the life of the process.
pub(crate) fn fifo(index: usize) -> &'static Fifo {
    let guard = KERNEL.lock();
    let k = guard.as_ref().expect("rtkernel: kernel::init was not called");
    let ptr: *const Fifo = &k.fifos[index];
    drop(guard);
    unsafe { &*ptr }
}

/// Drop all kernel state so each test starts from a clean slate. Visible
/// under `sim` as well as `cfg(test)` so the integration tests in
/// `tests/scenarios.rs`, which consume this crate as an ordinary dependency
/// built with `--features sim`, can reach it too.
#[cfg(any(test, feature = "sim"))]
pub fn reset_for_sim() {
    *KERNEL.lock() = Some(Kernel::new());
    crate::arch::sim::reset();
}
