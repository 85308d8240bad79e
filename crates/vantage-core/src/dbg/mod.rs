//! # Debugger Abstraction
//!
//! The engine-agnostic interface every backend implements.
//!
//! The rest of the crate (register façade, memory helpers, architecture
//! resolution) talks only to these traits, so it works the same whether the
//! engine underneath is GDB or LLDB. Each engine provides one implementation
//! of each trait; see [`crate::backend::gdb`] for GDB.
//!
//! ## Handles are views
//!
//! [`Frame`], [`Thread`], [`Process`], [`Value`] and [`Type`] are views onto
//! engine-side objects. They do not own the inferior and may outlive the
//! object they point to. Any operation on such a stale handle fails with an
//! error rather than crashing.
//!
//! ## Threading
//!
//! Everything here runs on the engine's command thread. Handles are `!Send`
//! and shared through `Rc`.

mod events;

use std::any::Any;
use std::fmt;
use std::rc::Rc;

pub use events::{EventHandler, EventRegistry, EventType, HandlerId};

use crate::arch::Arch;
use crate::error::Result;
use crate::types::{MemoryPage, Ptid};

/// Coarse classification of a [`Type`]
///
/// Backends translate their native type codes into this taxonomy through a
/// fixed table. A native code outside the table is a programming error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode
{
    /// Integer (any width, signed or not)
    Int,
    /// `union`
    Union,
    /// `struct` / `class`
    Struct,
    /// `enum`
    Enum,
    /// Typedef alias
    Typedef,
    /// Pointer
    Pointer,
    /// Fixed-size array
    Array,
}

/// One field of a structured [`Type`].
#[derive(Debug)]
pub struct TypeField
{
    /// Offset of the field in bits from the start of the parent
    pub bitpos: u64,
    /// Field name (`None` for anonymous members)
    pub name: Option<String>,
    /// Type of the field
    pub ty: Box<dyn Type>,
    /// Type that declares the field
    pub parent_type: Box<dyn Type>,
    /// Enumerator value, for fields of an enum type
    pub enumval: Option<i64>,
    /// Compiler-generated field (vtable pointers and the like)
    pub artificial: bool,
    /// The field is a base class subobject
    pub is_base_class: bool,
    /// Width in bits for bitfields, 0 otherwise
    pub bitsize: u32,
}

/// Engine-native type descriptor
///
/// Structural operations (`array`, `pointer`, `strip_typedefs`, `target`)
/// return new handles and never modify `self`.
pub trait Type: fmt::Debug
{
    /// Type name, when the engine knows one.
    fn name(&self) -> Option<String>;

    /// Size in bytes.
    fn sizeof(&self) -> usize;

    /// Alignment in bytes.
    fn alignof(&self) -> usize;

    /// Coarse classification.
    ///
    /// ## Panics
    ///
    /// Panics if the engine reports a type code with no mapping; that is a
    /// defect in the backend, not a runtime condition.
    fn code(&self) -> TypeCode;

    /// Fields in declaration order.
    fn fields(&self) -> Result<Vec<TypeField>>;

    /// An array of `count` elements of this type.
    fn array(&self, count: usize) -> Result<Box<dyn Type>>;

    /// A pointer to this type.
    fn pointer(&self) -> Result<Box<dyn Type>>;

    /// This type with every typedef layer removed.
    fn strip_typedefs(&self) -> Result<Box<dyn Type>>;

    /// The pointee of a pointer, the element of an array, the aliased type of a
    /// typedef.
    fn target(&self) -> Result<Box<dyn Type>>;

    /// Downcasting hook for backends that need their own handle back.
    fn as_any(&self) -> &dyn Any;
}

/// Engine-native runtime value
///
/// None of these operations changes the engine's thread or frame selection.
pub trait Value: fmt::Debug
{
    /// Address of the value in target memory, if it lives there.
    fn address(&self) -> Result<Option<u64>>;

    /// Whether the compiler optimised the value away.
    fn is_optimized_out(&self) -> bool;

    /// Type of the value.
    fn value_type(&self) -> Box<dyn Type>;

    /// Follow a pointer.
    fn dereference(&self) -> Result<Box<dyn Value>>;

    /// Read the value as a string (the engine decides the encoding).
    fn string(&self) -> Result<String>;

    /// Force a lazily-fetched value to be read from the target.
    fn fetch_lazy(&self) -> Result<()>;

    /// Numeric conversion. Wide enough for any 64-bit signed or unsigned
    /// value.
    fn to_int(&self) -> Result<i128>;

    /// Reinterpret the value as `ty`.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if `ty` was produced by a different backend.
    fn cast(&self, ty: &dyn Type) -> Result<Box<dyn Value>>;
}

/// One activation record of a thread's call stack
pub trait Frame
{
    /// Evaluate `expression` in this frame's lexical scope.
    ///
    /// The engine's selected frame is the same before and after the call,
    /// whether or not evaluation succeeds.
    fn evaluate_expression(&self, expression: &str) -> Result<Box<dyn Value>>;

    /// Read a register in this frame. `Ok(None)` means the frame has no
    /// register with that name.
    fn read_register(&self, name: &str) -> Result<Option<Box<dyn Value>>>;

    /// Write a register in this frame. `Ok(false)` means there is no register
    /// with that name.
    fn reg_write(&self, name: &str, value: u64) -> Result<bool>;

    /// Distance from the innermost frame (0 for the innermost).
    fn level(&self) -> Result<usize>;
}

/// A thread of the inferior
pub trait Thread
{
    /// The innermost frame of this thread.
    ///
    /// Does not change the engine's selected thread.
    fn bottom_frame(&self) -> Result<Box<dyn Frame>>;

    /// Process-unique identifier, or `None` if the engine cannot provide one.
    fn ptid(&self) -> Option<Ptid>;
}

/// The debugged program (GDB's "inferior")
pub trait Process
{
    /// Evaluate `expression` in process-wide (global) scope.
    fn evaluate_expression(&self, expression: &str) -> Result<Box<dyn Value>>;

    /// Read `size` bytes at `address`.
    ///
    /// With `partial == false` the whole range must be readable or the call
    /// fails with `MemoryRead`. With `partial == true` the readable prefix is
    /// returned (possibly empty).
    fn read_memory(&self, address: u64, size: usize, partial: bool) -> Result<Vec<u8>>;

    /// Write `data` at `address`.
    ///
    /// With `partial == true` the write stops silently at the first page that
    /// cannot be written.
    fn write_memory(&self, address: u64, data: &[u8], partial: bool) -> Result<()>;

    /// Make a value holding `value`.
    fn create_value(&self, value: u64) -> Result<Box<dyn Value>>;

    /// Architecture of this inferior.
    fn arch(&self) -> Result<Arch>;

    /// Mapped address ranges, as far as the engine can tell.
    fn vmmap(&self) -> Result<Vec<MemoryPage>>;

    /// Send a command to the target's monitor and return its output.
    fn send_monitor(&self, command: &str) -> Result<String>;

    /// Whether the target is reached over a remote protocol.
    fn is_remote(&self) -> bool;

    /// Whether the target is a QEMU system-mode (kernel) stub.
    fn is_qemu_kernel(&self) -> bool;

    /// Whether the target runs with the Linux ABI.
    fn is_linux(&self) -> bool;

    /// The engine's own listing of the ELF auxiliary vector, one `AT_*`
    /// entry per line.
    fn auxv_listing(&self) -> Result<String>;

    /// All threads of the inferior.
    fn threads(&self) -> Result<Vec<Box<dyn Thread>>>;

    /// Currently selected thread.
    fn selected_thread(&self) -> Option<Box<dyn Thread>>;

    /// Currently selected frame.
    fn selected_frame(&self) -> Option<Box<dyn Frame>>;

    /// Look up a type by name.
    ///
    /// ## Errors
    ///
    /// `TypeNotFound` when no such type is known.
    fn lookup_type(&self, name: &str) -> Result<Box<dyn Type>>;
}

/// One entry of the command history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry
{
    /// History number as the engine shows it
    pub index: u32,
    /// The command line
    pub command: String,
}

/// The interactive session
pub trait Session
{
    /// Recent command history, oldest first.
    fn history(&self) -> Result<Vec<HistoryEntry>>;

    /// Split a command line into arguments the way the engine would.
    fn lex_args(&self, command_line: &str) -> Result<Vec<String>>;

    /// Currently selected thread.
    fn selected_thread(&self) -> Option<Box<dyn Thread>>;

    /// Currently selected frame.
    fn selected_frame(&self) -> Option<Box<dyn Frame>>;
}

/// Handle to a command registered with [`Debugger::add_command`]
pub trait CommandHandle
{
    /// Unregister the command, where the engine supports it.
    fn remove(&self);
}

/// Handler of a user command: receives the debugger, the raw argument string
/// and whether the command was typed at the terminal.
pub type CommandHandler = Rc<dyn Fn(&dyn Debugger, &str, bool) -> Result<()>>;

/// Entry point of an engine backend
pub trait Debugger
{
    /// One-time engine configuration. Calling it again is a no-op.
    fn setup(&self) -> Result<()>;

    /// Register a user command.
    fn add_command(&self, name: &str, handler: CommandHandler) -> Result<Box<dyn CommandHandle>>;

    /// The interactive session.
    fn session(&self) -> Box<dyn Session>;

    /// The selected inferior.
    ///
    /// ## Errors
    ///
    /// `NoProcess` when there is none.
    fn inferior(&self) -> Result<Box<dyn Process>>;

    /// Evaluate `expression` in global scope.
    fn evaluate_expression(&self, expression: &str) -> Result<Box<dyn Value>>;

    /// Format `address` as zero-padded hex sized to the pointer width.
    fn addrsz(&self, address: u64) -> String;

    /// Size (lines, columns) of the TUI command window, when the TUI is
    /// active.
    fn get_cmd_window_size(&self) -> (Option<u32>, Option<u32>);

    /// Toggle verbose engine-side diagnostics for extension errors.
    fn set_diagnostics(&self, enabled: bool) -> Result<()>;

    /// Subscribe `handler` to `events`.
    fn register_event_handler(&self, events: &[EventType], handler: EventHandler) -> HandlerId;

    /// Remove a subscription made with
    /// [`register_event_handler`](Self::register_event_handler).
    fn remove_event_handler(&self, id: HandlerId) -> bool;
}

/// Zero-padded hex for a pointer of `ptrsize` bytes.
///
/// ```rust
/// use vantage_core::dbg::format_address;
///
/// assert_eq!(format_address(0x401000, 8), "0x0000000000401000");
/// assert_eq!(format_address(0x1_0000_0040, 4), "0x00000040");
/// ```
pub fn format_address(address: u64, ptrsize: usize) -> String
{
    let digits = ptrsize * 2;
    let masked = if ptrsize >= 8 { address } else { address & ((1u64 << (ptrsize * 8)) - 1) };
    format!("{masked:#0width$x}", width = digits + 2)
}
