//! The native GDB surface the adapter is written against.
//!
//! [`GdbEngine`] mirrors the parts of GDB's extension API the adapter needs:
//! selection get/set, `parse_and_eval`, `execute`, register and memory
//! access, and the value/type object model. Engine objects are referred to
//! through opaque `Copy` handles; a handle whose object GDB has discarded
//! makes every call fail with `StaleHandle`.
//!
//! A binding layer embedded in GDB implements this trait. The integration
//! tests implement it with a scripted in-memory engine.

use crate::arch::Endian;
use crate::dbg::TypeCode;
use crate::error::Result;
use crate::types::{MemoryPage, Ptid};

macro_rules! native_handle {
    ($(#[$doc:meta] $name:ident),* $(,)?) => {
        $(
            #[$doc]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub u64);
        )*
    };
}

native_handle!(
    /// Handle to a `gdb.Inferior`
    NativeInferior,
    /// Handle to a `gdb.InferiorThread`
    NativeThread,
    /// Handle to a `gdb.Frame`
    NativeFrame,
    /// Handle to a `gdb.Value`
    NativeValue,
    /// Handle to a `gdb.Type`
    NativeType,
);

/// GDB's `TYPE_CODE_*` constants the adapter understands
pub mod type_code
{
    /// `gdb.TYPE_CODE_PTR`
    pub const PTR: i32 = 1;
    /// `gdb.TYPE_CODE_ARRAY`
    pub const ARRAY: i32 = 2;
    /// `gdb.TYPE_CODE_STRUCT`
    pub const STRUCT: i32 = 3;
    /// `gdb.TYPE_CODE_UNION`
    pub const UNION: i32 = 4;
    /// `gdb.TYPE_CODE_ENUM`
    pub const ENUM: i32 = 5;
    /// `gdb.TYPE_CODE_INT`
    pub const INT: i32 = 8;
    /// `gdb.TYPE_CODE_TYPEDEF`
    pub const TYPEDEF: i32 = 23;
}

/// Translate a GDB type code into a [`TypeCode`].
///
/// ## Panics
///
/// Panics on a code outside the table. The adapter only hands out types the
/// rest of the crate can classify, so an unknown code is a backend defect.
pub fn map_type_code(code: i32) -> TypeCode
{
    match code {
        type_code::INT => TypeCode::Int,
        type_code::UNION => TypeCode::Union,
        type_code::STRUCT => TypeCode::Struct,
        type_code::ENUM => TypeCode::Enum,
        type_code::TYPEDEF => TypeCode::Typedef,
        type_code::PTR => TypeCode::Pointer,
        type_code::ARRAY => TypeCode::Array,
        other => panic!("missing mapping for GDB type code {other}"),
    }
}

/// How GDB reaches the inferior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connection
{
    /// Native process or core file
    Native,
    /// `target remote` to a gdbserver-like stub
    Remote,
    /// QEMU user-mode stub
    QemuUser,
    /// QEMU system-mode stub (a kernel or firmware target)
    QemuSystem,
}

impl Connection
{
    /// Whether the target is behind a remote protocol.
    pub const fn is_remote(self) -> bool
    {
        !matches!(self, Connection::Native)
    }
}

/// Raw architecture report of an inferior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeArch
{
    /// `gdb.Architecture.name()`
    pub name: String,
    /// Size of `void *`
    pub ptrsize: usize,
    /// Byte order
    pub endian: Endian,
}

/// A field as `gdb.Type.fields()` reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeField
{
    pub bitpos: u64,
    pub name: Option<String>,
    pub ty: NativeType,
    pub parent_type: NativeType,
    pub enumval: Option<i64>,
    pub artificial: bool,
    pub is_base_class: bool,
    pub bitsize: u32,
}

/// Callback run when a registered command is invoked: argument string and
/// from-tty flag.
pub type NativeCommand = Box<dyn Fn(&str, bool) -> Result<()>>;

/// GDB's extension API, as seen by the adapter
pub trait GdbEngine
{
    /// `(major, minor)` of the running GDB.
    fn version(&self) -> (u32, u32);

    /// `gdb.execute(command, from_tty, to_string)`.
    fn execute(&self, command: &str, from_tty: bool, to_string: bool) -> Result<String>;

    /// `gdb.parse_and_eval(expression, global_context)`.
    ///
    /// With `global_context == false` the expression is evaluated in the
    /// selected frame.
    fn parse_and_eval(&self, expression: &str, global_context: bool) -> Result<NativeValue>;

    /// `gdb.string_to_argv`.
    fn string_to_argv(&self, line: &str) -> Result<Vec<String>>;

    /// Define a user command (`gdb.Command` subclass).
    fn register_command(&self, name: &str, invoke: NativeCommand) -> Result<()>;

    /// `gdb.selected_inferior()`, `None` when no program is loaded.
    fn selected_inferior(&self) -> Option<NativeInferior>;

    /// Architecture of `inferior`.
    fn inferior_arch(&self, inferior: NativeInferior) -> Result<NativeArch>;

    /// `gdb.Inferior.threads()`.
    fn inferior_threads(&self, inferior: NativeInferior) -> Result<Vec<NativeThread>>;

    /// `gdb.Inferior.read_memory`: all bytes or an error.
    fn read_memory(&self, inferior: NativeInferior, address: u64, size: usize) -> Result<Vec<u8>>;

    /// `gdb.Inferior.write_memory`: all bytes or an error.
    fn write_memory(&self, inferior: NativeInferior, address: u64, data: &[u8]) -> Result<()>;

    /// Parsed `info proc mappings` (or the target's memory map).
    fn memory_map(&self, inferior: NativeInferior) -> Result<Vec<MemoryPage>>;

    /// How the inferior is connected.
    fn connection(&self, inferior: NativeInferior) -> Connection;

    /// `gdb.selected_thread()`.
    fn selected_thread(&self) -> Option<NativeThread>;

    /// `gdb.InferiorThread.switch()`.
    fn switch_thread(&self, thread: NativeThread) -> Result<()>;

    /// `gdb.InferiorThread.ptid`.
    fn thread_ptid(&self, thread: NativeThread) -> Result<Ptid>;

    /// `gdb.selected_frame()`; fails when there is no stack.
    fn selected_frame(&self) -> Result<NativeFrame>;

    /// `gdb.newest_frame()` of the selected thread.
    fn newest_frame(&self) -> Result<NativeFrame>;

    /// `gdb.Frame.select()`.
    fn select_frame(&self, frame: NativeFrame) -> Result<()>;

    /// `gdb.Frame.level()`.
    fn frame_level(&self, frame: NativeFrame) -> Result<usize>;

    /// `gdb.Frame.read_register`; `Ok(None)` when the name is unknown.
    fn frame_read_register(&self, frame: NativeFrame, name: &str) -> Result<Option<NativeValue>>;

    /// Assign a register in `frame`; `Ok(false)` when the name is unknown.
    fn frame_write_register(&self, frame: NativeFrame, name: &str, value: u64) -> Result<bool>;

    /// `gdb.Value(value)`.
    fn create_value(&self, value: u64) -> Result<NativeValue>;

    /// `int(gdb.Value.address)`, `None` for non-lvalues.
    fn value_address(&self, value: NativeValue) -> Result<Option<u64>>;

    /// `gdb.Value.is_optimized_out`.
    fn value_is_optimized_out(&self, value: NativeValue) -> bool;

    /// `gdb.Value.type`.
    fn value_type(&self, value: NativeValue) -> NativeType;

    /// `gdb.Value.dereference()`.
    fn value_dereference(&self, value: NativeValue) -> Result<NativeValue>;

    /// `gdb.Value.string()`.
    fn value_string(&self, value: NativeValue) -> Result<String>;

    /// `gdb.Value.fetch_lazy()`.
    fn value_fetch_lazy(&self, value: NativeValue) -> Result<()>;

    /// `int(gdb.Value)`.
    fn value_to_int(&self, value: NativeValue) -> Result<i128>;

    /// `gdb.Value.cast(type)`.
    fn value_cast(&self, value: NativeValue, ty: NativeType) -> Result<NativeValue>;

    /// `gdb.Type.name`.
    fn type_name(&self, ty: NativeType) -> Option<String>;

    /// `gdb.Type.sizeof`.
    fn type_sizeof(&self, ty: NativeType) -> usize;

    /// `gdb.Type.alignof`.
    fn type_alignof(&self, ty: NativeType) -> usize;

    /// `gdb.Type.code`.
    fn type_code(&self, ty: NativeType) -> i32;

    /// `gdb.Type.fields()`.
    fn type_fields(&self, ty: NativeType) -> Result<Vec<NativeField>>;

    /// `gdb.Type.array(count - 1)`.
    fn type_array(&self, ty: NativeType, count: usize) -> Result<NativeType>;

    /// `gdb.Type.pointer()`.
    fn type_pointer(&self, ty: NativeType) -> Result<NativeType>;

    /// `gdb.Type.strip_typedefs()`.
    fn type_strip_typedefs(&self, ty: NativeType) -> Result<NativeType>;

    /// `gdb.Type.target()`.
    fn type_target(&self, ty: NativeType) -> Result<NativeType>;

    /// `gdb.lookup_type(name)`; `TypeNotFound` on a miss.
    fn lookup_type(&self, name: &str) -> Result<NativeType>;
}
