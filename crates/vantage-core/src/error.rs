//! # Error Types
//!
//! General error handling for the abstraction core.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! ## Absent data is not an error
//!
//! A register that does not exist on the current architecture, a Thumb bit on
//! AArch64, or an address that fails a readability probe are reported as
//! `None` (or an empty buffer), never as a `DebuggerError`. Callers probe such
//! things speculatively all the time.

use thiserror::Error;

/// Main error type for debugger operations
///
/// Every operation that talks to the engine can fail with one of these. The
/// variants exist for diagnostics: callers are expected to treat all of them
/// as "operation failed" and move on, never to branch on the exact kind.
///
/// ## Error Categories
///
/// 1. **Engine errors**: Engine (bad expression, refused command, ...)
/// 2. **Memory errors**: MemoryRead, MemoryWrite
/// 3. **Selection errors**: StaleHandle, NoProcess, NoThread, NoFrame
/// 4. **Lookup errors**: UnknownArchitecture, TypeNotFound
/// 5. **Argument errors**: InvalidArgument
/// 6. **I/O errors**: Io
#[derive(Error, Debug)]
pub enum DebuggerError
{
    /// The engine rejected the operation
    ///
    /// This is the single backend-defined error kind: a malformed expression,
    /// an engine command that failed, a value that cannot be converted. The
    /// string is the engine's own message.
    #[error("Engine error: {0}")]
    Engine(String),

    /// Reading target memory failed
    ///
    /// At least one byte of `[address, address + size)` could not be read.
    /// Typed scalar reads never return truncated data; they fail with this.
    #[error("Cannot read {size} bytes at 0x{address:x}")]
    MemoryRead
    {
        /// First address of the failed transfer
        address: u64,
        /// Number of bytes requested
        size: usize,
    },

    /// Writing target memory failed
    #[error("Cannot write {size} bytes at 0x{address:x}")]
    MemoryWrite
    {
        /// First address of the failed transfer
        address: u64,
        /// Number of bytes requested
        size: usize,
    },

    /// A frame, thread or value handle no longer refers to anything
    ///
    /// Handles are views onto engine-side objects. Once the engine discards
    /// them (the thread exited, the inferior was restarted) every operation
    /// on the handle fails with this error.
    #[error("Stale handle: {0}")]
    StaleHandle(String),

    /// There is no live inferior
    #[error("No process is being debugged")]
    NoProcess,

    /// There is no selected thread
    #[error("No thread selected")]
    NoThread,

    /// There is no selected frame (e.g. the inferior is not running)
    #[error("No frame selected")]
    NoFrame,

    /// The engine reported an architecture this crate has no model for
    #[error("Unknown architecture: {0}")]
    UnknownArchitecture(String),

    /// A type lookup by name failed
    #[error("Type '{0}' not found")]
    TypeNotFound(String),

    /// Invalid argument passed to a helper
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error (terminal queries and similar)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DebuggerError
{
    /// Shorthand for [`DebuggerError::Engine`].
    pub fn engine(message: impl Into<String>) -> Self
    {
        Self::Engine(message.into())
    }
}

/// Convenience type alias for `Result<T, DebuggerError>`
///
/// ```rust
/// use vantage_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DebuggerError>;
