//! Aperiodic (interrupt-driven) event binding.
//!
//! A hardware IRQ's physical vector belongs to the application's own
//! device-crate-generated vector table; what `add_aperiodic_event` owns
//! is the kernel-side half of the binding: a dispatch table keyed by IRQ
//! number that the device crate's own vector calls into via [`dispatch`],
//! plus the interrupt controller's priority and enable bit for that line.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::arch;
use crate::config;
use crate::critical;
use crate::error::{KernelError, KernelResult};

const SLOTS: usize = (config::MAX_USER_IRQ - config::MIN_USER_IRQ + 1) as usize;

static HANDLERS: [AtomicUsize; SLOTS] = [AtomicUsize::new(0); SLOTS];

/// Install `handler` as the handler for hardware IRQ `irq` at `priority`.
/// Validates `irq` against the user-assignable range and `priority`
/// against `MAX_USER_IRQ_PRIORITY`, strictly above the kernel's own
/// reserved priority for the tick and scheduler interrupts.
pub fn add_aperiodic_event(handler: extern "C" fn(), priority: u8, irq: u16) -> KernelResult<()> {
    if irq < config::MIN_USER_IRQ || irq > config::MAX_USER_IRQ {
        log::warn!("rtkernel: add_aperiodic_event rejected: irq {} out of range", irq);
        return Err(KernelError::IrqInvalid);
    }
    if priority > config::MAX_USER_IRQ_PRIORITY {
        log::warn!(
            "rtkernel: add_aperiodic_event rejected: priority {} exceeds MAX_USER_IRQ_PRIORITY",
            priority
        );
        return Err(KernelError::HwiPriorityInvalid);
    }

    let token = critical::begin_critical();
    let slot = (irq - config::MIN_USER_IRQ) as usize;
    HANDLERS[slot].store(handler as usize, Ordering::Release);
    arch::set_irq_priority(irq, priority);
    arch::enable_irq(irq);
    critical::end_critical(token);
    log::debug!(
        "rtkernel: add_aperiodic_event irq={} priority={}",
        irq,
        priority
    );
    Ok(())
}

/// Called from the application's own vector-table entry for `irq`. Looks up
/// and invokes the bound handler, if any; a no-op for an unbound or
/// out-of-range `irq`.
pub fn dispatch(irq: u16) {
    if irq < config::MIN_USER_IRQ || irq > config::MAX_USER_IRQ {
        return;
    }
    let slot = (irq - config::MIN_USER_IRQ) as usize;
    let raw = HANDLERS[slot].load(Ordering::Acquire);
    if raw != 0 {
        let handler: extern "C" fn() = unsafe { core::mem::transmute(raw) };
        handler();
    }
}
