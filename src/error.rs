//! Kernel error taxonomy.
//!
//! Callers match on named variants; `From<KernelError> for i32` is kept
//! around for diagnostic surfaces that want a raw integer code.

/// Result of a kernel entry point that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum KernelError {
    Ok = 0,
    ThreadLimitReached = 1,
    NoThreadsScheduled = 2,
    ThreadDoesNotExist = 3,
    CannotKillLastThread = 4,
    IrqInvalid = 5,
    HwiPriorityInvalid = 6,
}

impl core::fmt::Display for KernelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            KernelError::Ok => write!(f, "ok"),
            KernelError::ThreadLimitReached => write!(f, "thread limit reached"),
            KernelError::NoThreadsScheduled => write!(f, "no threads scheduled"),
            KernelError::ThreadDoesNotExist => write!(f, "thread does not exist"),
            KernelError::CannotKillLastThread => write!(f, "cannot kill last thread"),
            KernelError::IrqInvalid => write!(f, "irq invalid"),
            KernelError::HwiPriorityInvalid => write!(f, "hardware interrupt priority invalid"),
        }
    }
}

impl From<KernelError> for i32 {
    fn from(e: KernelError) -> i32 {
        e as i32
    }
}

/// Shorthand used throughout the kernel for fallible entry points.
pub type KernelResult<T> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_across_releases() {
        assert_eq!(i32::from(KernelError::Ok), 0);
        assert_eq!(i32::from(KernelError::ThreadLimitReached), 1);
        assert_eq!(i32::from(KernelError::NoThreadsScheduled), 2);
        assert_eq!(i32::from(KernelError::ThreadDoesNotExist), 3);
        assert_eq!(i32::from(KernelError::CannotKillLastThread), 4);
        assert_eq!(i32::from(KernelError::IrqInvalid), 5);
        assert_eq!(i32::from(KernelError::HwiPriorityInvalid), 6);
    }

    #[test]
    fn display_is_human_readable() {
        extern crate std;
        use std::string::ToString;
        assert_eq!(KernelError::CannotKillLastThread.to_string(), "cannot kill last thread");
    }
}
