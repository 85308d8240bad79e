//! Thread identifiers.

use std::fmt;

/// Process/thread identifier triple, as debugger engines report it
///
/// GDB identifies a thread by `(pid, lwp, tid)`: the process id, the
/// lightweight-process (kernel thread) id, and a thread-library id. The
/// segment-base fallback needs the `lwp` part, since that is what
/// `ptrace` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ptid
{
    /// Process id of the inferior
    pub pid: u32,
    /// Kernel thread id (0 when the engine does not know it)
    pub lwp: u64,
    /// Thread-library id (0 when unused)
    pub tid: u64,
}

impl Ptid
{
    /// Create a new identifier.
    pub const fn new(pid: u32, lwp: u64, tid: u64) -> Self
    {
        Self { pid, lwp, tid }
    }

    /// The id `ptrace` should be given for this thread.
    ///
    /// This is the LWP when known, otherwise the process id (single-threaded
    /// targets report `lwp == 0`). `None` when neither is known.
    pub fn lwpid(&self) -> Option<u64>
    {
        match (self.lwp, self.pid) {
            (0, 0) => None,
            (0, pid) => Some(u64::from(pid)),
            (lwp, _) => Some(lwp),
        }
    }
}

impl fmt::Display for Ptid
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "({}, {}, {})", self.pid, self.lwp, self.tid)
    }
}
