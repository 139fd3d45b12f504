//! Critical-section primitive.
//!
//! `begin_critical` disables interrupts and returns an opaque token holding
//! the prior global interrupt-enable bit; `end_critical` restores it. The
//! pair nests: an inner `begin/end` pair captures "interrupts already
//! disabled" as its prior state, so only the outermost `end_critical`
//! actually re-enables interrupts. No kernel data structure is touched
//! outside of such a region.

use crate::arch;

/// Token returned by [`begin_critical`]. Not `Clone`/`Copy` on purpose —
/// each token may only end the section it started.
#[must_use]
pub struct CriticalSection {
    was_enabled: bool,
}

/// Disable interrupts, returning a token that remembers whether they were
/// enabled beforehand.
#[inline]
pub fn begin_critical() -> CriticalSection {
    let was_enabled = arch::interrupts_enabled();
    arch::disable_interrupts();
    CriticalSection { was_enabled }
}

/// Restore the interrupt-enable state captured by `begin_critical`.
#[inline]
pub fn end_critical(token: CriticalSection) {
    if token.was_enabled {
        arch::enable_interrupts();
    }
}
