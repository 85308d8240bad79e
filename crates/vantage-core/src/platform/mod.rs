//! # Host Platform Helpers
//!
//! The few places where the core talks to the host OS directly instead of
//! going through the debugger engine:
//!
//! - **term**: terminal geometry (`TIOCGWINSZ`) and the `SIGWINCH` flag
//! - **linux**: segment-base reads through `ptrace(PTRACE_ARCH_PRCTL)`
//!   - See: [ptrace(2) man page](https://man7.org/linux/man-pages/man2/ptrace.2.html)
//!
//! Hosts without `PTRACE_ARCH_PRCTL` report no segment base.

pub mod term;

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
mod linux;

/// Which segment base to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentBase
{
    /// `fs` (`ARCH_GET_FS`)
    Fs,
    /// `gs` (`ARCH_GET_GS`)
    Gs,
}

impl SegmentBase
{
    /// `arch_prctl` sub-function code.
    pub const fn code(self) -> u64
    {
        match self {
            SegmentBase::Fs => 0x1003,
            SegmentBase::Gs => 0x1004,
        }
    }

    /// Register name of the base on x86-64 (`fs_base`/`gs_base`).
    pub const fn register(self) -> &'static str
    {
        match self {
            SegmentBase::Fs => "fs_base",
            SegmentBase::Gs => "gs_base",
        }
    }
}

/// Read a segment base of the traced thread `lwpid` straight from the kernel.
///
/// `None` when the call fails or the host has no way to do it.
pub fn read_segment_base(lwpid: u64, which: SegmentBase) -> Option<u64>
{
    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    {
        linux::arch_prctl_base(lwpid, which)
    }

    #[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
    {
        tracing::trace!(lwpid, ?which, "No PTRACE_ARCH_PRCTL on this host");
        None
    }
}
