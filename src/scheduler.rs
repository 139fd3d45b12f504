//! Thread table and scheduler: `add_thread`, `kill_thread`/`kill_self`,
//! `launch`, and the priority-ring selection rule.

use crate::arch::{self, StackPtr};
use crate::config;
use crate::critical;
use crate::error::{KernelError, KernelResult};
use crate::kernel::{self, Kernel};
use crate::tcb::{Tcb, ThreadId, ThreadName, NONE};

/// Register a new thread. ISR-safe: callable before `launch`
/// (initial wiring) and after, from a running thread or a handler.
pub fn add_thread(entry: extern "C" fn() -> !, priority: u8, name: &str) -> KernelResult<ThreadId> {
    let token = critical::begin_critical();
    let result = kernel::with_kernel_mut(|k| {
        let free = (0..config::MAX_THREADS as u16).find(|&i| !k.threads[i as usize].alive);
        let slot = match free {
            Some(s) => s,
            None => return Err(KernelError::ThreadLimitReached),
        };
        let generation = k.next_generation();
        let id = ThreadId::pack(generation, slot);
        let sp = arch::seed_stack(&mut k.stacks[slot as usize], entry);
        k.threads[slot as usize] = Tcb {
            sp,
            prev: NONE,
            next: NONE,
            blocked: None,
            wake_tick: 0,
            asleep: false,
            priority,
            alive: true,
            id,
            name: ThreadName::new(name),
        };
        k.ring_insert(slot);
        k.alive_count += 1;
        Ok(id)
    });
    critical::end_critical(token);
    match result {
        Ok(id) => {
            log::debug!("rtkernel: add_thread {} priority={}", name, priority);
            Ok(id)
        }
        Err(e) => {
            log::warn!("rtkernel: add_thread {} rejected: {}", name, e);
            Err(e)
        }
    }
}

/// Kill the thread named by `id`. Refuses when `id` is stale or
/// when it names the last alive thread. If the victim is the currently
/// running thread, a memory/instruction barrier is issued before pending
/// the scheduler so the return path observes the updated ring.
pub fn kill_thread(id: ThreadId) -> KernelResult<()> {
    let token = critical::begin_critical();
    let outcome = kernel::with_kernel_mut(|k| {
        let slot = id.slot();
        if slot as usize >= config::MAX_THREADS {
            return Err(KernelError::ThreadDoesNotExist);
        }
        if !k.threads[slot as usize].alive || k.threads[slot as usize].id != id {
            return Err(KernelError::ThreadDoesNotExist);
        }
        if k.alive_count <= 1 {
            return Err(KernelError::CannotKillLastThread);
        }
        k.ring_remove(slot);
        let t = &mut k.threads[slot as usize];
        t.alive = false;
        t.blocked = None;
        t.asleep = false;
        k.alive_count -= 1;
        Ok(k.current == slot)
    });
    critical::end_critical(token);
    match outcome {
        Ok(killed_current) => {
            log::debug!("rtkernel: kill_thread {:?}", id);
            if killed_current {
                core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
                arch::request_reschedule();
            }
            Ok(())
        }
        Err(e) => {
            log::warn!("rtkernel: kill_thread {:?} rejected: {}", id, e);
            Err(e)
        }
    }
}

/// Kill the calling thread. Never returns: the pended reschedule
/// takes effect on the next context switch, which lands in a different
/// alive thread (the idle thread at minimum).
pub fn kill_self() -> ! {
    let id = get_thread_id();
    let _ = kill_thread(id);
    loop {
        arch::wait_for_interrupt();
    }
}

/// Kill every alive thread except the caller. Not atomic as a
/// whole — each victim is killed under its own critical section, same as a
/// caller looping `kill_thread` by hand.
pub fn kill_all_but_self() {
    let token = critical::begin_critical();
    let victims = kernel::with_kernel(|k| {
        let (order, n) = k.ring_order_from(k.current);
        let mut ids = [ThreadId(0); config::MAX_THREADS];
        let mut count = 0;
        for &slot in &order[..n] {
            if slot != k.current {
                ids[count] = k.threads[slot as usize].id;
                count += 1;
            }
        }
        (ids, count)
    });
    critical::end_critical(token);
    let (ids, count) = victims;
    for &id in &ids[..count] {
        let _ = kill_thread(id);
    }
}

/// The calling thread's identifier, or `ThreadId(0)` if called with no
/// thread currently running (pre-`launch`).
pub fn get_thread_id() -> ThreadId {
    kernel::with_kernel(|k| {
        if k.current == NONE {
            ThreadId(0)
        } else {
            k.threads[k.current as usize].id
        }
    })
}

/// Select the highest-priority runnable thread, walking the ring starting
/// just after `k.current` so ties break round-robin by ring order. Falls
/// back to `k.current` itself if nothing downstream of it looks runnable,
/// which only happens transiently between a self-kill's unlink and the
/// scheduler's next decision.
pub(crate) fn pick_next(k: &Kernel) -> u16 {
    let (order, n) = k.ring_order_from(k.current);
    let mut best: Option<(u8, u16)> = None;
    for &slot in &order[..n] {
        let t = &k.threads[slot as usize];
        if t.is_runnable() && best.map_or(true, |(p, _)| t.priority < p) {
            best = Some((t.priority, slot));
        }
    }
    best.map(|(_, slot)| slot).unwrap_or(k.current)
}

fn has_idle_thread(k: &Kernel) -> bool {
    let (order, n) = k.ring_order_from(NONE);
    order[..n]
        .iter()
        .any(|&s| k.threads[s as usize].priority == config::IDLE_PRIORITY)
}

/// Select the first thread and transfer control into it. Returns
/// only on catastrophic misconfiguration: no threads added, or no idle
/// thread present (`launch`'s precondition).
pub fn launch() -> KernelResult<()> {
    let token = critical::begin_critical();
    let outcome = kernel::with_kernel_mut(|k| -> KernelResult<StackPtr> {
        if k.alive_count == 0 || !has_idle_thread(k) {
            return Err(KernelError::NoThreadsScheduled);
        }
        let first = pick_next(k);
        k.current = first;
        k.launched = true;
        Ok(k.threads[first as usize].sp)
    });
    critical::end_critical(token);

    let sp = match outcome {
        Ok(sp) => sp,
        Err(e) => {
            log::warn!("rtkernel: launch refused: {}", e);
            return Err(e);
        }
    };
    log::info!(
        "rtkernel: launch, arming tick at {} Hz",
        1000 / config::TICK_PERIOD_MS
    );
    arch::configure_tick(1000 / config::TICK_PERIOD_MS);
    arch::start_first_thread(sp)
}

/// Test/sim counterpart of `launch`: runs the same validation and picks the
/// same first thread, but stops short of arming the tick timer and
/// transferring control, since there is no real thread to transfer into on
/// the host.
#[cfg(any(test, feature = "sim"))]
pub fn launch_for_test() -> KernelResult<()> {
    let token = critical::begin_critical();
    let outcome = kernel::with_kernel_mut(|k| {
        if k.alive_count == 0 || !has_idle_thread(k) {
            return Err(KernelError::NoThreadsScheduled);
        }
        let first = pick_next(k);
        k.current = first;
        k.launched = true;
        Ok(())
    });
    critical::end_critical(token);
    outcome
}

/// Re-run the selection rule and swap `current` in place, with no actual
/// stack switch. Used by the `sim` architecture backend's
/// `request_reschedule`, which has no asynchronous exception to pend.
#[cfg(any(test, feature = "sim"))]
pub(crate) fn schedule_now() {
    let token = critical::begin_critical();
    kernel::with_kernel_mut(|k| {
        k.current = pick_next(k);
    });
    critical::end_critical(token);
}

/// Called from the Cortex-M PendSV trampoline with the outgoing thread's
/// saved stack pointer. Records it, picks the next thread, and returns its
/// saved stack pointer for the trampoline to restore.
#[cfg(not(any(test, feature = "sim")))]
pub(crate) fn switch_context(outgoing_sp: StackPtr) -> StackPtr {
    let token = critical::begin_critical();
    let sp = kernel::with_kernel_mut(|k| {
        if k.current != NONE {
            k.threads[k.current as usize].sp = outgoing_sp;
        }
        k.current = pick_next(k);
        k.threads[k.current as usize].sp
    });
    critical::end_critical(token);
    sp
}
