//! ARM Cortex-M port.
//!
//! Context switching uses the standard split-stack model: MSP runs the
//! kernel and the exception handlers, PSP runs threads. On exception entry
//! the hardware automatically stacks r0-r3, r12, lr, pc and xpsr; the
//! PendSV handler below manually saves and restores r4-r11 around a call
//! into the scheduler, which completes the full context save/restore. The
//! scheduler itself runs at the lowest exception priority so that it only
//! takes effect on return from whatever interrupt requested it.

use core::arch::global_asm;
use core::sync::atomic::{AtomicBool, Ordering};

use super::StackPtr;

/// Cached software copy of the interrupt-enable bit. `cortex_m::register`
/// exposes PRIMASK directly; this mirrors it so `interrupts_enabled` is a
/// cheap load instead of a privileged read on every call site.
static INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(true);

pub fn interrupts_enabled() -> bool {
    INTERRUPTS_ENABLED.load(Ordering::Relaxed)
}

pub fn disable_interrupts() {
    cortex_m::interrupt::disable();
    INTERRUPTS_ENABLED.store(false, Ordering::Relaxed);
}

pub fn enable_interrupts() {
    INTERRUPTS_ENABLED.store(true, Ordering::Relaxed);
    unsafe {
        cortex_m::interrupt::enable();
    }
}

/// Set the PendSV-pending bit in the Interrupt Control and State Register.
/// PendSV runs at the lowest priority, so it fires only once no
/// higher-priority handler is active — exactly the "lowest-priority
/// interrupt" the scheduler is specified to run in.
pub fn request_reschedule() {
    const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;
    unsafe {
        core::ptr::write_volatile(ICSR, 1 << 28);
    }
}

/// Stack layout prepared for a brand-new thread (growing down from the top):
///
/// ```text
/// [hardware-stacked frame]   <- initial PSP after seed_stack
///   xpsr  (thumb bit set)
///   pc    (entry)
///   lr    (thread_exit_trampoline)
///   r12, r3, r2, r1, r0  (all zero)
/// [software-saved frame]
///   r11..r4  (all zero)     <- returned stack pointer points here
/// ```
pub fn seed_stack(stack: &mut [u32], entry: extern "C" fn() -> !) -> StackPtr {
    let len = stack.len();
    assert!(len >= 16, "thread stack too small for a seeded frame");

    let frame = &mut stack[len - 16..];
    // software-saved r4-r11
    for reg in frame[0..8].iter_mut() {
        *reg = 0;
    }
    // hardware-stacked r0-r3, r12
    frame[8] = 0;
    frame[9] = 0;
    frame[10] = 0;
    frame[11] = 0;
    frame[12] = 0;
    frame[13] = thread_exit_trampoline as usize as u32; // lr
    frame[14] = entry as usize as u32; // pc
    frame[15] = 0x0100_0000; // xpsr, thumb bit set

    StackPtr(frame.as_ptr() as usize)
}

/// Landing pad for a thread whose entry function returns, which must never
/// happen (entries are `fn() -> !`). Idles rather than falling into
/// undefined territory.
extern "C" fn thread_exit_trampoline() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

pub fn configure_tick(hz: u32) {
    // SysTick reload value assumes the core clock the board layer
    // configured before calling `launch()`; out of scope here beyond
    // arming the counter and its interrupt.
    if let Some(mut cp) = cortex_m::Peripherals::take() {
        let core_hz = cortex_m::peripheral::SYST::get_ticks_per_10ms() * 100;
        let reload = core_hz / hz - 1;
        cp.SYST.set_reload(reload);
        cp.SYST.clear_current();
        cp.SYST
            .set_clock_source(cortex_m::peripheral::syst::SystClkSource::Core);
        cp.SYST.enable_counter();
        cp.SYST.enable_interrupt();
    }

    // PendSV and SysTick both sit at the lowest priority so neither
    // preempts an application-assigned aperiodic handler.
    const SHPR3: *mut u32 = 0xE000_ED20 as *mut u32;
    unsafe {
        let val = core::ptr::read_volatile(SHPR3);
        core::ptr::write_volatile(SHPR3, val | (0xFF << 16) | (0xFF << 24));
    }
}

/// Switch onto the first thread's stack and branch into it. Called once
/// from `launch()`; never returns.
pub fn start_first_thread(sp: StackPtr) -> ! {
    unsafe {
        first_thread_asm(sp.0 as *const u32);
    }
}

unsafe fn first_thread_asm(psp: *const u32) -> ! {
    core::arch::asm!(
        "adds r0, #32",     // skip the 8 software-saved registers
        "msr psp, r0",
        "movs r0, #2",      // CONTROL.SPSEL = 1: thread mode now runs on PSP
        "msr control, r0",
        "isb",
        "pop {{r0-r3, r12}}",
        "pop {{r4}}",       // lr, discarded (entry is noreturn)
        "pop {{r5}}",       // pc: thread entry point
        "pop {{r6}}",       // xpsr, discarded: the processor sets it on entry
        "cpsie i",
        "bx r5",
        in("r0") psp,
        options(noreturn)
    );
}

// Raw PendSV handler: save r4-r11 of the outgoing thread onto its own
// stack, call into the scheduler with the outgoing/incoming stack pointers
// threaded through CURRENT_SP, restore r4-r11 of the incoming thread, and
// return from exception. This is the entire context-switch trampoline;
// everything else about "which thread next" lives in portable Rust.
global_asm!(
    ".global PendSV",
    "PendSV:",
    "mrs r0, psp",
    "subs r0, r0, #32",
    "stm r0, {{r4-r11}}",
    "bl pendsv_save_and_pick_next",
    // r0 now holds the incoming thread's saved stack pointer
    "ldm r0, {{r4-r11}}",
    "adds r0, r0, #32",
    "msr psp, r0",
    "bx lr",
);

extern "C" {
    fn PendSV();
}

/// Address of the raw PendSV stub, exposed for vector-table wiring by the
/// board layer (out of scope for this crate beyond handing over the
/// address).
pub fn pend_sv_addr() -> usize {
    PendSV as usize
}

/// Rust side of the PendSV handler. Receives the outgoing thread's saved
/// stack pointer (after r4-r11 have been pushed), hands it to the
/// scheduler, and returns the incoming thread's stack pointer.
#[no_mangle]
extern "C" fn pendsv_save_and_pick_next(outgoing_sp: *mut u32) -> *mut u32 {
    let outgoing = StackPtr(outgoing_sp as usize);
    let incoming = crate::scheduler::switch_context(outgoing);
    incoming.0 as *mut u32
}

#[no_mangle]
extern "C" fn SysTick() {
    crate::tick::tick_handler();
}

/// Set `irq`'s priority register. Only the top bits are implemented on
/// Cortex-M0/M0+ NVIC priority fields, same caveat as `configure_tick`'s
/// SHPR3 write; shifting the kernel's 0..=6 priority into the high bits
/// keeps it comparable against PendSV/SysTick's 0xFF.
pub fn set_irq_priority(irq: u16, priority: u8) {
    const NVIC_IPR_BASE: usize = 0xE000_E400;
    unsafe {
        let addr = (NVIC_IPR_BASE + irq as usize) as *mut u8;
        core::ptr::write_volatile(addr, priority << 5);
    }
}

/// Unmask `irq` in the NVIC's interrupt set-enable register.
pub fn enable_irq(irq: u16) {
    const NVIC_ISER_BASE: usize = 0xE000_E100;
    unsafe {
        let reg = (NVIC_ISER_BASE + 4 * (irq as usize / 32)) as *mut u32;
        core::ptr::write_volatile(reg, 1 << (irq % 32));
    }
}

pub fn wait_for_interrupt() {
    cortex_m::asm::wfi();
}
