//! Periodic events and the PTCB table.
//!
//! The PTCB table is append-only: once added, an event is never removed.
//! Walking the fixed array in insertion order is therefore exactly
//! equivalent to walking a circular doubly linked list of the same
//! entries — there is never a gap or reorder to account for — so no
//! `prev`/`next` bookkeeping is kept for this table.

use crate::config;
use crate::critical;
use crate::error::{KernelError, KernelResult};
use crate::kernel;

#[derive(Clone, Copy)]
pub struct Ptcb {
    pub handler: extern "C" fn(),
    pub period: u32,
    pub next_due: u32,
}

impl Ptcb {
    pub const fn empty() -> Ptcb {
        Ptcb {
            handler: noop,
            period: 0,
            next_due: 0,
        }
    }
}

extern "C" fn noop() {}

/// Register a fixed-period callback invoked from the tick handler.
///
/// First firing is staggered by the event's table slot so that several
/// events added back-to-back at the same tick do not all fire together:
/// `next_due = system_time + slot_index + 1`.
pub fn add_periodic_event(handler: extern "C" fn(), period_ticks: u32) -> KernelResult<()> {
    let token = critical::begin_critical();
    let result = kernel::with_kernel_mut(|k| {
        if k.ptcb_count >= config::MAX_PERIODIC_EVENTS {
            return Err(KernelError::ThreadLimitReached);
        }
        let slot = k.ptcb_count;
        let now = k.tick;
        k.ptcbs[slot] = Ptcb {
            handler,
            period: period_ticks,
            next_due: now.wrapping_add(slot as u32 + 1),
        };
        k.ptcb_count += 1;
        Ok(())
    });
    critical::end_critical(token);
    match result {
        Ok(()) => {
            log::debug!("rtkernel: add_periodic_event period={}", period_ticks);
            Ok(())
        }
        Err(e) => {
            log::warn!("rtkernel: add_periodic_event rejected: {}", e);
            Err(e)
        }
    }
}
