//! Tick handler. Invoked at `TICK_PERIOD_MS` (1 kHz on the
//! target) from the architecture's timer interrupt (`SysTick` on
//! Cortex-M).

use crate::arch;
use crate::config;
use crate::critical;
use crate::kernel;
use crate::tcb::NONE;

/// Advance system time by one tick, fire any periodic events now due, wake
/// any sleepers whose deadline has arrived, and request a reschedule.
///
/// Periodic handlers run with interrupts enabled at the tick's priority —
/// each one's own critical section only brackets reading/advancing its
/// `next_due`, not the handler call itself, so a handler may take longer
/// than one tick period without holding off the rest of the kernel. A
/// handler whose `next_due` falls behind because of such a delay is not
/// caught up: the exact-equality check below silently skips the missed
/// instance rather than bursting it out on the next match.
pub fn tick_handler() {
    let now = {
        let token = critical::begin_critical();
        let now = kernel::with_kernel_mut(|k| {
            k.tick = k.tick.wrapping_add(1);
            k.tick
        });
        critical::end_critical(token);
        now
    };

    for slot in 0..config::MAX_PERIODIC_EVENTS {
        let due_handler = {
            let token = critical::begin_critical();
            let handler = kernel::with_kernel_mut(|k| {
                if slot >= k.ptcb_count || k.ptcbs[slot].next_due != now {
                    return None;
                }
                k.ptcbs[slot].next_due = now.wrapping_add(k.ptcbs[slot].period);
                Some(k.ptcbs[slot].handler)
            });
            critical::end_critical(token);
            handler
        };
        if let Some(handler) = due_handler {
            handler();
        }
    }

    {
        let token = critical::begin_critical();
        kernel::with_kernel_mut(|k| {
            let (order, n) = k.ring_order_from(NONE);
            for &slot in &order[..n] {
                let t = &mut k.threads[slot as usize];
                if t.asleep && t.wake_tick == now {
                    t.asleep = false;
                }
            }
        });
        critical::end_critical(token);
    }

    arch::request_reschedule();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periodic;
    use crate::scheduler;

    extern "C" fn dummy() -> ! {
        loop {}
    }

    #[test]
    fn wakes_sleeper_exactly_at_its_deadline() {
        kernel::reset_for_sim();
        let t = scheduler::add_thread(dummy, 5, "sleeper").unwrap();
        scheduler::add_thread(dummy, 255, "idle").unwrap();
        scheduler::launch_for_test().unwrap();
        kernel::with_kernel_mut(|k| {
            k.current = t.slot();
            let cur = t.slot() as usize;
            k.threads[cur].asleep = true;
            k.threads[cur].wake_tick = 3;
        });

        tick_handler();
        tick_handler();
        assert!(kernel::with_kernel(|k| k.threads[t.slot() as usize].asleep));

        tick_handler();
        assert!(!kernel::with_kernel(|k| k.threads[t.slot() as usize].asleep));
    }

    #[test]
    fn periodic_event_fires_on_exact_tick_and_reschedules() {
        kernel::reset_for_sim();
        scheduler::add_thread(dummy, 255, "idle").unwrap();
        scheduler::launch_for_test().unwrap();

        static HITS: core::sync::atomic::AtomicU32 = core::sync::atomic::AtomicU32::new(0);
        extern "C" fn counting_handler() {
            HITS.fetch_add(1, core::sync::atomic::Ordering::SeqCst);
        }
        periodic::add_periodic_event(counting_handler, 3).unwrap();

        // First firing is staggered to slot 0 + 1 = tick 1.
        tick_handler();
        assert_eq!(HITS.load(core::sync::atomic::Ordering::SeqCst), 1);
        tick_handler();
        tick_handler();
        assert_eq!(HITS.load(core::sync::atomic::Ordering::SeqCst), 1);
        tick_handler();
        assert_eq!(HITS.load(core::sync::atomic::Ordering::SeqCst), 2);
    }
}
