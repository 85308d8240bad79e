//! GDB implementations of the handle traits.
//!
//! Every handle pairs a shared reference to the engine with one opaque
//! native handle. Operations that GDB performs relative to the selection
//! take a selection guard first, see [`super::guards`].

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use super::engine::{
    map_type_code, GdbEngine, NativeFrame, NativeInferior, NativeThread, NativeType, NativeValue,
};
use super::current_osabi;
use super::guards::{FrameSelectionGuard, ThreadSelectionGuard};
use crate::arch::{Arch, ArchName};
use crate::dbg::{
    CommandHandle, Frame, HistoryEntry, Process, Session, Thread, Type, TypeCode, TypeField, Value,
};
use crate::error::{DebuggerError, Result};
use crate::types::{page_align, MemoryPage, Ptid, PAGE_SIZE};

/// `gdb.Frame`
pub struct GdbFrame
{
    engine: Rc<dyn GdbEngine>,
    inner: NativeFrame,
}

impl GdbFrame
{
    pub(crate) fn new(engine: Rc<dyn GdbEngine>, inner: NativeFrame) -> Self
    {
        Self { engine, inner }
    }

    /// The native handle.
    pub fn native(&self) -> NativeFrame
    {
        self.inner
    }
}

impl Frame for GdbFrame
{
    fn evaluate_expression(&self, expression: &str) -> Result<Box<dyn Value>>
    {
        let _guard = FrameSelectionGuard::select(self.engine.as_ref(), self.inner)?;
        let value = self.engine.parse_and_eval(expression, false)?;
        Ok(Box::new(GdbValue::new(self.engine.clone(), value)))
    }

    fn read_register(&self, name: &str) -> Result<Option<Box<dyn Value>>>
    {
        let value = self.engine.frame_read_register(self.inner, name)?;
        Ok(value.map(|value| Box::new(GdbValue::new(self.engine.clone(), value)) as Box<dyn Value>))
    }

    fn reg_write(&self, name: &str, value: u64) -> Result<bool>
    {
        trace!(register = name, value = format_args!("{value:#x}"), "Writing register");
        self.engine.frame_write_register(self.inner, name, value)
    }

    fn level(&self) -> Result<usize>
    {
        self.engine.frame_level(self.inner)
    }
}

/// `gdb.InferiorThread`
pub struct GdbThread
{
    engine: Rc<dyn GdbEngine>,
    inner: NativeThread,
}

impl GdbThread
{
    pub(crate) fn new(engine: Rc<dyn GdbEngine>, inner: NativeThread) -> Self
    {
        Self { engine, inner }
    }

    /// The native handle.
    pub fn native(&self) -> NativeThread
    {
        self.inner
    }
}

impl Thread for GdbThread
{
    fn bottom_frame(&self) -> Result<Box<dyn Frame>>
    {
        let _guard = ThreadSelectionGuard::switch(self.engine.as_ref(), self.inner)?;
        let frame = self.engine.newest_frame()?;
        Ok(Box::new(GdbFrame::new(self.engine.clone(), frame)))
    }

    fn ptid(&self) -> Option<Ptid>
    {
        self.engine.thread_ptid(self.inner).ok()
    }
}

/// `gdb.Inferior`
pub struct GdbProcess
{
    engine: Rc<dyn GdbEngine>,
    inner: NativeInferior,
}

impl GdbProcess
{
    pub(crate) fn new(engine: Rc<dyn GdbEngine>, inner: NativeInferior) -> Self
    {
        Self { engine, inner }
    }

    /// Page-bounded spans of `[address, address + size)`, clipped at the top
    /// of the address space.
    fn page_chunks(address: u64, size: usize) -> impl Iterator<Item = (u64, usize)>
    {
        let end = address.saturating_add(size as u64);
        let mut cursor = address;
        std::iter::from_fn(move || {
            if cursor >= end {
                return None;
            }
            let page_end = page_align(cursor).checked_add(PAGE_SIZE).map_or(end, |next| next.min(end));
            let chunk = (cursor, (page_end - cursor) as usize);
            cursor = page_end;
            Some(chunk)
        })
    }
}

impl Process for GdbProcess
{
    fn evaluate_expression(&self, expression: &str) -> Result<Box<dyn Value>>
    {
        let value = self.engine.parse_and_eval(expression, true)?;
        Ok(Box::new(GdbValue::new(self.engine.clone(), value)))
    }

    fn read_memory(&self, address: u64, size: usize, partial: bool) -> Result<Vec<u8>>
    {
        if !partial {
            return self.engine.read_memory(self.inner, address, size).map_err(|error| {
                trace!(address = format_args!("{address:#x}"), size, %error, "Memory read failed");
                DebuggerError::MemoryRead { address, size }
            });
        }

        let mut data = Vec::with_capacity(size);
        for (chunk_address, chunk_size) in Self::page_chunks(address, size) {
            match self.engine.read_memory(self.inner, chunk_address, chunk_size) {
                Ok(bytes) => data.extend_from_slice(&bytes),
                Err(_) => break,
            }
        }
        Ok(data)
    }

    fn write_memory(&self, address: u64, data: &[u8], partial: bool) -> Result<()>
    {
        if !partial {
            return self.engine.write_memory(self.inner, address, data).map_err(|error| {
                debug!(address = format_args!("{address:#x}"), size = data.len(), %error, "Memory write failed");
                DebuggerError::MemoryWrite {
                    address,
                    size: data.len(),
                }
            });
        }

        let mut offset = 0;
        for (chunk_address, chunk_size) in Self::page_chunks(address, data.len()) {
            let chunk = &data[offset..offset + chunk_size];
            if self.engine.write_memory(self.inner, chunk_address, chunk).is_err() {
                break;
            }
            offset += chunk_size;
        }
        Ok(())
    }

    fn create_value(&self, value: u64) -> Result<Box<dyn Value>>
    {
        let value = self.engine.create_value(value)?;
        Ok(Box::new(GdbValue::new(self.engine.clone(), value)))
    }

    fn arch(&self) -> Result<Arch>
    {
        let native = self.engine.inferior_arch(self.inner)?;
        let name = ArchName::from_engine_name(&native.name)?;
        Ok(Arch::new(name, native.ptrsize, native.endian))
    }

    fn vmmap(&self) -> Result<Vec<MemoryPage>>
    {
        self.engine.memory_map(self.inner)
    }

    fn send_monitor(&self, command: &str) -> Result<String>
    {
        self.engine.execute(&format!("monitor {command}"), false, true)
    }

    fn is_remote(&self) -> bool
    {
        self.engine.connection(self.inner).is_remote()
    }

    fn is_qemu_kernel(&self) -> bool
    {
        self.engine.connection(self.inner) == super::engine::Connection::QemuSystem
    }

    fn is_linux(&self) -> bool
    {
        match self.engine.execute("show osabi", false, true) {
            Ok(output) => current_osabi(&output) == Some("GNU/Linux"),
            Err(error) => {
                debug!(%error, "Could not query the OS ABI");
                false
            }
        }
    }

    fn auxv_listing(&self) -> Result<String>
    {
        self.engine.execute("info auxv", false, true)
    }

    fn threads(&self) -> Result<Vec<Box<dyn Thread>>>
    {
        Ok(self
            .engine
            .inferior_threads(self.inner)?
            .into_iter()
            .map(|thread| Box::new(GdbThread::new(self.engine.clone(), thread)) as Box<dyn Thread>)
            .collect())
    }

    fn selected_thread(&self) -> Option<Box<dyn Thread>>
    {
        selected_thread(&self.engine)
    }

    fn selected_frame(&self) -> Option<Box<dyn Frame>>
    {
        selected_frame(&self.engine)
    }

    fn lookup_type(&self, name: &str) -> Result<Box<dyn Type>>
    {
        let ty = self.engine.lookup_type(name)?;
        Ok(Box::new(GdbType::new(self.engine.clone(), ty)))
    }
}

fn selected_thread(engine: &Rc<dyn GdbEngine>) -> Option<Box<dyn Thread>>
{
    engine
        .selected_thread()
        .map(|thread| Box::new(GdbThread::new(engine.clone(), thread)) as Box<dyn Thread>)
}

fn selected_frame(engine: &Rc<dyn GdbEngine>) -> Option<Box<dyn Frame>>
{
    // "No stack." is an error in GDB; here it is just absence
    engine
        .selected_frame()
        .ok()
        .map(|frame| Box::new(GdbFrame::new(engine.clone(), frame)) as Box<dyn Frame>)
}

/// The GDB interactive session
pub struct GdbSession
{
    engine: Rc<dyn GdbEngine>,
}

impl GdbSession
{
    pub(crate) fn new(engine: Rc<dyn GdbEngine>) -> Self
    {
        Self { engine }
    }
}

/// Parse `show commands` output: `"   12  print $rip"` per line.
pub(crate) fn parse_history(output: &str) -> Vec<HistoryEntry>
{
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let split = line.find(char::is_whitespace)?;
            let index = line[..split].parse().ok()?;
            Some(HistoryEntry {
                index,
                command: line[split..].trim().to_string(),
            })
        })
        .collect()
}

impl Session for GdbSession
{
    fn history(&self) -> Result<Vec<HistoryEntry>>
    {
        let output = self.engine.execute("show commands", false, true)?;
        Ok(parse_history(&output))
    }

    fn lex_args(&self, command_line: &str) -> Result<Vec<String>>
    {
        self.engine.string_to_argv(command_line)
    }

    fn selected_thread(&self) -> Option<Box<dyn Thread>>
    {
        selected_thread(&self.engine)
    }

    fn selected_frame(&self) -> Option<Box<dyn Frame>>
    {
        selected_frame(&self.engine)
    }
}

/// Handle of a command registered with GDB
pub struct GdbCommandHandle
{
    name: String,
}

impl GdbCommandHandle
{
    pub(crate) fn new(name: &str) -> Self
    {
        Self { name: name.to_string() }
    }

    /// Command name.
    pub fn name(&self) -> &str
    {
        &self.name
    }
}

impl CommandHandle for GdbCommandHandle
{
    fn remove(&self)
    {
        // GDB has no API for removing a command once defined
        debug!(command = %self.name, "Command removal is not supported by GDB");
    }
}

/// `gdb.Type`
pub struct GdbType
{
    engine: Rc<dyn GdbEngine>,
    inner: NativeType,
}

impl GdbType
{
    pub(crate) fn new(engine: Rc<dyn GdbEngine>, inner: NativeType) -> Self
    {
        Self { engine, inner }
    }

    /// The native handle.
    pub fn native(&self) -> NativeType
    {
        self.inner
    }

    fn wrap(&self, ty: NativeType) -> Box<dyn Type>
    {
        Box::new(GdbType::new(self.engine.clone(), ty))
    }
}

impl fmt::Debug for GdbType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("GdbType")
            .field("handle", &self.inner.0)
            .field("name", &self.engine.type_name(self.inner))
            .finish()
    }
}

impl Type for GdbType
{
    fn name(&self) -> Option<String>
    {
        self.engine.type_name(self.inner)
    }

    fn sizeof(&self) -> usize
    {
        self.engine.type_sizeof(self.inner)
    }

    fn alignof(&self) -> usize
    {
        self.engine.type_alignof(self.inner)
    }

    fn code(&self) -> TypeCode
    {
        map_type_code(self.engine.type_code(self.inner))
    }

    fn fields(&self) -> Result<Vec<TypeField>>
    {
        Ok(self
            .engine
            .type_fields(self.inner)?
            .into_iter()
            .map(|field| TypeField {
                bitpos: field.bitpos,
                name: field.name,
                ty: self.wrap(field.ty),
                parent_type: self.wrap(field.parent_type),
                enumval: field.enumval,
                artificial: field.artificial,
                is_base_class: field.is_base_class,
                bitsize: field.bitsize,
            })
            .collect())
    }

    fn array(&self, count: usize) -> Result<Box<dyn Type>>
    {
        if count == 0 {
            return Err(DebuggerError::InvalidArgument("array of zero elements".to_string()));
        }
        Ok(self.wrap(self.engine.type_array(self.inner, count)?))
    }

    fn pointer(&self) -> Result<Box<dyn Type>>
    {
        Ok(self.wrap(self.engine.type_pointer(self.inner)?))
    }

    fn strip_typedefs(&self) -> Result<Box<dyn Type>>
    {
        Ok(self.wrap(self.engine.type_strip_typedefs(self.inner)?))
    }

    fn target(&self) -> Result<Box<dyn Type>>
    {
        Ok(self.wrap(self.engine.type_target(self.inner)?))
    }

    fn as_any(&self) -> &dyn Any
    {
        self
    }
}

/// `gdb.Value`
pub struct GdbValue
{
    engine: Rc<dyn GdbEngine>,
    inner: NativeValue,
}

impl GdbValue
{
    pub(crate) fn new(engine: Rc<dyn GdbEngine>, inner: NativeValue) -> Self
    {
        Self { engine, inner }
    }

    /// The native handle.
    pub fn native(&self) -> NativeValue
    {
        self.inner
    }
}

impl fmt::Debug for GdbValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("GdbValue").field("handle", &self.inner.0).finish()
    }
}

impl Value for GdbValue
{
    fn address(&self) -> Result<Option<u64>>
    {
        self.engine.value_address(self.inner)
    }

    fn is_optimized_out(&self) -> bool
    {
        self.engine.value_is_optimized_out(self.inner)
    }

    fn value_type(&self) -> Box<dyn Type>
    {
        Box::new(GdbType::new(self.engine.clone(), self.engine.value_type(self.inner)))
    }

    fn dereference(&self) -> Result<Box<dyn Value>>
    {
        let value = self.engine.value_dereference(self.inner)?;
        Ok(Box::new(GdbValue::new(self.engine.clone(), value)))
    }

    fn string(&self) -> Result<String>
    {
        self.engine.value_string(self.inner)
    }

    fn fetch_lazy(&self) -> Result<()>
    {
        self.engine.value_fetch_lazy(self.inner)
    }

    fn to_int(&self) -> Result<i128>
    {
        self.engine.value_to_int(self.inner)
    }

    fn cast(&self, ty: &dyn Type) -> Result<Box<dyn Value>>
    {
        let ty = ty
            .as_any()
            .downcast_ref::<GdbType>()
            .ok_or_else(|| DebuggerError::InvalidArgument(format!("{ty:?} is not a GDB type")))?;
        let value = self.engine.value_cast(self.inner, ty.inner)?;
        Ok(Box::new(GdbValue::new(self.engine.clone(), value)))
    }
}
