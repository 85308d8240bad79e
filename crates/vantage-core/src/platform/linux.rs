//! `ptrace` based register reads for Linux x86-64 hosts.

use tracing::debug;

use super::SegmentBase;

const PTRACE_ARCH_PRCTL: libc::c_uint = 30;

/// `ptrace(PTRACE_ARCH_PRCTL, lwpid, &value, ARCH_GET_FS/GS)`.
///
/// The engine already traces `lwpid`, and we live in the engine's process,
/// so the request is accepted without attaching again.
pub(super) fn arch_prctl_base(lwpid: u64, which: SegmentBase) -> Option<u64>
{
    let pid = libc::pid_t::try_from(lwpid).ok()?;
    let mut value: libc::c_ulong = 0;

    // SAFETY: `value` outlives the call and is the only memory the kernel
    // writes to for this request.
    let result = unsafe {
        libc::ptrace(
            PTRACE_ARCH_PRCTL as _,
            pid,
            &mut value as *mut libc::c_ulong,
            which.code() as libc::c_ulong,
        )
    };

    if result == 0 {
        Some(u64::from(value))
    } else {
        debug!(
            lwpid,
            ?which,
            error = %std::io::Error::last_os_error(),
            "PTRACE_ARCH_PRCTL failed"
        );
        None
    }
}
