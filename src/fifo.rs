//! Inter-thread FIFOs.
//!
//! Built on a two-semaphore handshake: `items` is the producer-consumer
//! handshake (its count is exactly the number of buffered words), `mutex`
//! serializes readers. `write` never touches `mutex` and never blocks —
//! it only reads `items`'s count for the capacity check and advances
//! `tail`, both of which only the producer ever touches, so it is safe to
//! call from an interrupt handler.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::config;
use crate::critical;
use crate::kernel;
use crate::semaphore::Semaphore;

pub struct Fifo {
    data: UnsafeCell<[u32; config::FIFO_CAPACITY]>,
    head: AtomicUsize,
    tail: AtomicUsize,
    lost: AtomicU32,
    items: Semaphore,
    mutex: Semaphore,
}

// `data` is only ever written at `tail` by the one producer and read at
// `head` by the one consumer; those indices never alias for a live word.
unsafe impl Sync for Fifo {}

impl Fifo {
    pub const fn empty() -> Fifo {
        Fifo {
            data: UnsafeCell::new([0u32; config::FIFO_CAPACITY]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            lost: AtomicU32::new(0),
            items: Semaphore::new(),
            mutex: Semaphore::new(),
        }
    }

    /// Zero the ring, reset head/tail, and arm the handshake semaphores.
    pub fn init(&self) {
        let token = critical::begin_critical();
        unsafe {
            (*self.data.get()) = [0u32; config::FIFO_CAPACITY];
        }
        self.head.store(0, Ordering::Relaxed);
        self.tail.store(0, Ordering::Relaxed);
        self.lost.store(0, Ordering::Relaxed);
        critical::end_critical(token);
        self.items.init(0);
        self.mutex.init(1);
    }

    /// Block until a word is available, then dequeue it under the reader
    /// mutex. Not ISR-safe (blocks).
    pub fn read(&self) -> u32 {
        self.items.wait();
        self.mutex.wait();
        let head = self.head.load(Ordering::Relaxed);
        let word = unsafe { (*self.data.get())[head] };
        self.head
            .store((head + 1) % config::FIFO_CAPACITY, Ordering::Relaxed);
        self.mutex.signal();
        word
    }

    /// Enqueue a word without blocking. ISR-safe: touches only `tail` and
    /// the non-blocking `items` handshake, never the reader mutex. Returns
    /// `false` (and bumps the lost-data counter) instead of blocking or
    /// waking a reader when the ring is already full; this is
    /// not one of the named `KernelError` variants because it is a
    /// transient capacity condition, not a configuration failure.
    pub fn write(&self, word: u32) -> bool {
        if self.items.count() >= config::FIFO_CAPACITY as i32 {
            self.lost.fetch_add(1, Ordering::Relaxed);
            log::warn!("rtkernel: fifo write dropped, capacity reached");
            return false;
        }
        let tail = self.tail.load(Ordering::Relaxed);
        unsafe {
            (*self.data.get())[tail] = word;
        }
        self.tail
            .store((tail + 1) % config::FIFO_CAPACITY, Ordering::Relaxed);
        self.items.signal();
        true
    }

    /// Count of writes rejected for lack of room.
    pub fn lost_count(&self) -> u32 {
        self.lost.load(Ordering::Relaxed)
    }
}

/// Zero fifo `index`'s ring and arm its handshake semaphores. Indices are
/// a fixed `0..MAX_FIFOS` range owned by the kernel; an
/// out-of-range index is a caller bug and panics via the slice index, same
/// as an out-of-range array access anywhere else in the kernel.
pub fn fifo_init(index: usize) {
    kernel::fifo(index).init();
}

/// Block until fifo `index` has a word, then dequeue it. Not ISR-safe.
pub fn fifo_read(index: usize) -> u32 {
    kernel::fifo(index).read()
}

/// Enqueue `word` on fifo `index` without blocking. ISR-safe.
pub fn fifo_write(index: usize, word: u32) -> bool {
    kernel::fifo(index).write(word)
}

/// Writes rejected for lack of room on fifo `index`.
pub fn fifo_lost_count(index: usize) -> u32 {
    kernel::fifo(index).lost_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel;

    #[test]
    fn round_trip_preserves_order() {
        kernel::reset_for_sim();
        let f = Fifo::empty();
        f.init();
        for i in 0..5 {
            assert!(f.write(i));
        }
        for i in 0..5 {
            assert_eq!(f.read(), i);
        }
    }

    #[test]
    fn overflow_counts_lost_writes() {
        kernel::reset_for_sim();
        let f = Fifo::empty();
        f.init();
        for i in 0..config::FIFO_CAPACITY as u32 {
            assert!(f.write(i));
        }
        for _ in 0..3 {
            assert!(!f.write(999));
        }
        assert_eq!(f.lost_count(), 3);
        assert_eq!(f.read(), 0);
    }

    #[test]
    fn burst_of_32_against_capacity_16_loses_16() {
        // Capacity-16 fifo, burst of 32 writes with no reader draining,
        // then drain.
        kernel::reset_for_sim();
        let f = Fifo::empty();
        f.init();
        for i in 0..32u32 {
            f.write(i);
        }
        assert_eq!(f.lost_count(), 16);
        for i in 0..16u32 {
            assert_eq!(f.read(), i);
        }
    }
}
