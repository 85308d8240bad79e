//! Scripted in-memory GDB engine for the integration tests
//!
//! `FakeGdb` implements [`GdbEngine`] over plain data: a page map, a list of
//! frames with their registers, and value/type arenas. Tests set the scene
//! through the helper methods, hand the engine to [`Gdb::new`], and inspect
//! what the adapter did (executed commands, selection changes) afterwards.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use vantage_core::arch::Endian;
use vantage_core::backend::gdb::engine::type_code;
use vantage_core::backend::gdb::{
    Connection, Gdb, GdbEngine, NativeArch, NativeCommand, NativeField, NativeFrame, NativeInferior, NativeThread,
    NativeType, NativeValue,
};
use vantage_core::config::CoreConfig;
use vantage_core::error::{DebuggerError, Result};
use vantage_core::types::{Address, MemoryPage, Permissions, Ptid, PAGE_SIZE};

#[derive(Debug, Clone)]
struct FakePage
{
    data: Vec<u8>,
    writable: bool,
}

#[derive(Debug, Clone)]
struct FakeFrame
{
    thread: NativeThread,
    level: usize,
    registers: BTreeMap<String, (u64, usize)>,
}

#[derive(Debug, Clone)]
struct FakeType
{
    name: Option<String>,
    size: usize,
    code: i32,
    target: Option<NativeType>,
    signed: bool,
}

#[derive(Debug, Clone)]
struct FakeValue
{
    bits: u64,
    ty: NativeType,
    address: Option<u64>,
}

#[derive(Debug)]
struct FakeState
{
    arch: NativeArch,
    connection: Connection,
    version: (u32, u32),
    has_inferior: bool,
    threads: Vec<(NativeThread, Ptid)>,
    selected_thread: Option<NativeThread>,
    frames: Vec<FakeFrame>,
    selected_frame: Option<NativeFrame>,
    aliases: HashMap<String, String>,
    pages: BTreeMap<u64, FakePage>,
    types: Vec<FakeType>,
    values: Vec<FakeValue>,
    executed: Vec<String>,
    failing_commands: Vec<String>,
    monitor_output: String,
    info_win: Option<String>,
    command_output: HashMap<String, String>,
}

/// The scripted engine
pub struct FakeGdb
{
    state: RefCell<FakeState>,
    commands: RefCell<HashMap<String, NativeCommand>>,
    selection_changes: Cell<usize>,
}

const BASE_TYPES: &[(&str, usize, bool)] = &[
    ("unsigned char", 1, false),
    ("unsigned short", 2, false),
    ("unsigned int", 4, false),
    ("unsigned long long", 8, false),
    ("char", 1, true),
    ("short", 2, true),
    ("int", 4, true),
    ("long", 8, true),
];

const LINUX_OSABI: &str = "The current OS ABI is \"auto\" (currently \"GNU/Linux\").\nThe default OS ABI is \"GNU/Linux\".\n";

fn engine_error(message: impl Into<String>) -> DebuggerError
{
    DebuggerError::Engine(message.into())
}

impl FakeGdb
{
    /// An inferior of architecture `arch` with one thread and one frame.
    pub fn new(arch: &str, ptrsize: usize, endian: Endian) -> Rc<Self>
    {
        let main = NativeThread(1);
        let types = BASE_TYPES
            .iter()
            .map(|&(name, size, signed)| FakeType {
                name: Some(name.to_string()),
                size,
                code: type_code::INT,
                target: None,
                signed,
            })
            .collect();

        Rc::new(Self {
            state: RefCell::new(FakeState {
                arch: NativeArch {
                    name: arch.to_string(),
                    ptrsize,
                    endian,
                },
                connection: Connection::Native,
                version: (12, 1),
                has_inferior: true,
                threads: vec![(main, Ptid::new(4242, 4242, 0))],
                selected_thread: Some(main),
                frames: vec![FakeFrame {
                    thread: main,
                    level: 0,
                    registers: BTreeMap::new(),
                }],
                selected_frame: Some(NativeFrame(0)),
                aliases: HashMap::new(),
                pages: BTreeMap::new(),
                types,
                values: Vec::new(),
                executed: Vec::new(),
                failing_commands: Vec::new(),
                monitor_output: String::new(),
                info_win: None,
                command_output: HashMap::from([(
                    "show osabi".to_string(),
                    LINUX_OSABI.to_string(),
                )]),
            }),
            commands: RefCell::new(HashMap::new()),
            selection_changes: Cell::new(0),
        })
    }

    /// 64-bit x86 with `pc`/`sp` aliasing `rip`/`rsp`.
    pub fn x86_64() -> Rc<Self>
    {
        let fake = Self::new("i386:x86-64", 8, Endian::Little);
        fake.alias("pc", "rip");
        fake.alias("sp", "rsp");
        fake
    }

    /// 32-bit x86 with `pc`/`sp` aliasing `eip`/`esp`.
    pub fn i386() -> Rc<Self>
    {
        let fake = Self::new("i386", 4, Endian::Little);
        fake.alias("pc", "eip");
        fake.alias("sp", "esp");
        fake
    }

    /// Wrap in a [`Gdb`] with the default configuration.
    pub fn debugger(self: &Rc<Self>) -> Rc<Gdb>
    {
        Gdb::new(self.clone(), CoreConfig::default())
    }

    pub fn alias(&self, alias: &str, register: &str)
    {
        self.state
            .borrow_mut()
            .aliases
            .insert(alias.to_string(), register.to_string());
    }

    pub fn set_connection(&self, connection: Connection)
    {
        self.state.borrow_mut().connection = connection;
    }

    pub fn set_version(&self, major: u32, minor: u32)
    {
        self.state.borrow_mut().version = (major, minor);
    }

    pub fn remove_inferior(&self)
    {
        self.state.borrow_mut().has_inferior = false;
    }

    pub fn set_monitor_output(&self, output: &str)
    {
        self.state.borrow_mut().monitor_output = output.to_string();
    }

    pub fn set_info_win(&self, output: Option<&str>)
    {
        self.state.borrow_mut().info_win = output.map(str::to_string);
    }

    /// Make `command` print `output`.
    pub fn set_command_output(&self, command: &str, output: &str)
    {
        self.state
            .borrow_mut()
            .command_output
            .insert(command.to_string(), output.to_string());
    }

    pub fn fail_command(&self, prefix: &str)
    {
        self.state.borrow_mut().failing_commands.push(prefix.to_string());
    }

    /// Register `name` of `frame`, pointer-sized.
    pub fn set_register(&self, frame: NativeFrame, name: &str, value: u64)
    {
        let size = self.state.borrow().arch.ptrsize;
        self.set_register_sized(frame, name, value, size);
    }

    pub fn set_register_sized(&self, frame: NativeFrame, name: &str, value: u64, size: usize)
    {
        let mut state = self.state.borrow_mut();
        let index = usize::try_from(frame.0).unwrap();
        state.frames[index].registers.insert(name.to_string(), (value, size));
    }

    /// Register of the innermost frame of the main thread.
    pub fn set_reg(&self, name: &str, value: u64)
    {
        self.set_register(NativeFrame(0), name, value);
    }

    pub fn register(&self, frame: NativeFrame, name: &str) -> Option<u64>
    {
        let state = self.state.borrow();
        let index = usize::try_from(frame.0).unwrap();
        state.frames[index].registers.get(name).map(|(value, _)| *value)
    }

    /// Add a thread with one frame; returns both handles.
    pub fn add_thread(&self, ptid: Ptid) -> (NativeThread, NativeFrame)
    {
        let mut state = self.state.borrow_mut();
        let thread = NativeThread(state.threads.len() as u64 + 1);
        state.threads.push((thread, ptid));
        let frame = NativeFrame(state.frames.len() as u64);
        state.frames.push(FakeFrame {
            thread,
            level: 0,
            registers: BTreeMap::new(),
        });
        (thread, frame)
    }

    /// Add an outer frame to `thread` at the next level.
    pub fn add_frame(&self, thread: NativeThread) -> NativeFrame
    {
        let mut state = self.state.borrow_mut();
        let level = state.frames.iter().filter(|frame| frame.thread == thread).count();
        let frame = NativeFrame(state.frames.len() as u64);
        state.frames.push(FakeFrame {
            thread,
            level,
            registers: BTreeMap::new(),
        });
        frame
    }

    pub fn selected(&self) -> (Option<NativeThread>, Option<NativeFrame>)
    {
        let state = self.state.borrow();
        (state.selected_thread, state.selected_frame)
    }

    pub fn select(&self, thread: NativeThread, frame: NativeFrame)
    {
        let mut state = self.state.borrow_mut();
        state.selected_thread = Some(thread);
        state.selected_frame = Some(frame);
    }

    /// Number of thread switches and frame selections performed by the
    /// adapter.
    pub fn selection_changes(&self) -> usize
    {
        self.selection_changes.get()
    }

    /// Map `count` zero-filled pages at `start`.
    pub fn map(&self, start: u64, count: u64, writable: bool)
    {
        let mut state = self.state.borrow_mut();
        for page in 0..count {
            state.pages.insert(
                start + page * PAGE_SIZE,
                FakePage {
                    data: vec![0; PAGE_SIZE as usize],
                    writable,
                },
            );
        }
    }

    /// Store `data` at `address` regardless of permissions.
    pub fn poke_bytes(&self, address: u64, data: &[u8])
    {
        let mut state = self.state.borrow_mut();
        for (offset, byte) in data.iter().enumerate() {
            let at = address + offset as u64;
            let page = state
                .pages
                .get_mut(&(at & !(PAGE_SIZE - 1)))
                .expect("poke_bytes outside mapped memory");
            page.data[(at & (PAGE_SIZE - 1)) as usize] = *byte;
        }
    }

    pub fn executed(&self) -> Vec<String>
    {
        self.state.borrow().executed.clone()
    }

    /// Run a registered command the way GDB would.
    pub fn invoke(&self, name: &str, arguments: &str) -> Result<()>
    {
        let commands = self.commands.borrow();
        let command = commands
            .get(name)
            .ok_or_else(|| engine_error(format!("Undefined command: \"{name}\"")))?;
        command(arguments, true)
    }

    fn frame_index(state: &FakeState, frame: NativeFrame) -> Result<usize>
    {
        let index = usize::try_from(frame.0).map_err(|_| DebuggerError::StaleHandle("frame".into()))?;
        if index < state.frames.len() {
            Ok(index)
        } else {
            Err(DebuggerError::StaleHandle(format!("frame {}", frame.0)))
        }
    }

    fn value(&self, value: NativeValue) -> Result<FakeValue>
    {
        let state = self.state.borrow();
        state
            .values
            .get(value.0 as usize)
            .cloned()
            .ok_or_else(|| DebuggerError::StaleHandle(format!("value {}", value.0)))
    }

    fn ty(&self, ty: NativeType) -> Result<FakeType>
    {
        let state = self.state.borrow();
        state
            .types
            .get(ty.0 as usize)
            .cloned()
            .ok_or_else(|| DebuggerError::StaleHandle(format!("type {}", ty.0)))
    }

    fn push_value(&self, value: FakeValue) -> NativeValue
    {
        let mut state = self.state.borrow_mut();
        state.values.push(value);
        NativeValue(state.values.len() as u64 - 1)
    }

    fn push_type(&self, ty: FakeType) -> NativeType
    {
        let mut state = self.state.borrow_mut();
        state.types.push(ty);
        NativeType(state.types.len() as u64 - 1)
    }

    fn signed_type(&self, size: usize) -> NativeType
    {
        let name = match size {
            1 => "char",
            2 => "short",
            4 => "int",
            _ => "long",
        };
        self.lookup_type(name).unwrap()
    }

    fn mask(size: usize) -> u64
    {
        if size >= 8 {
            u64::MAX
        } else {
            (1u64 << (size * 8)) - 1
        }
    }

    fn read_bytes(state: &FakeState, address: u64, size: usize) -> Result<Vec<u8>>
    {
        let mut data = Vec::with_capacity(size);
        for offset in 0..size as u64 {
            let at = address
                .checked_add(offset)
                .ok_or_else(|| engine_error("Cannot access memory"))?;
            let page = state
                .pages
                .get(&(at & !(PAGE_SIZE - 1)))
                .ok_or_else(|| engine_error(format!("Cannot access memory at address {at:#x}")))?;
            data.push(page.data[(at & (PAGE_SIZE - 1)) as usize]);
        }
        Ok(data)
    }
}

impl GdbEngine for FakeGdb
{
    fn version(&self) -> (u32, u32)
    {
        self.state.borrow().version
    }

    fn execute(&self, command: &str, _from_tty: bool, _to_string: bool) -> Result<String>
    {
        let mut state = self.state.borrow_mut();
        state.executed.push(command.to_string());
        if state.failing_commands.iter().any(|prefix| command.starts_with(prefix.as_str())) {
            return Err(engine_error(format!("command failed: {command}")));
        }
        if command.starts_with("monitor ") {
            return Ok(state.monitor_output.clone());
        }
        if let Some(output) = state.command_output.get(command) {
            return Ok(output.clone());
        }
        match command {
            "info win" => state
                .info_win
                .clone()
                .ok_or_else(|| engine_error("Undefined info command: \"win\".")),
            "show commands" => Ok("    1  file ./a.out\n    2  break main\n    3  run\n".to_string()),
            _ => Ok(String::new()),
        }
    }

    fn parse_and_eval(&self, expression: &str, global_context: bool) -> Result<NativeValue>
    {
        let expression = expression.trim();
        if let Some(name) = expression.strip_prefix('$') {
            if global_context {
                return Err(engine_error("registers need a frame"));
            }
            let frame = self.selected_frame()?;
            return self
                .frame_read_register(frame, name)?
                .ok_or_else(|| engine_error(format!("Invalid register `{name}'")));
        }
        let parsed = match expression.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => expression.parse(),
        };
        let value = parsed.map_err(|_| engine_error(format!("No symbol \"{expression}\" in current context.")))?;
        self.create_value(value)
    }

    fn string_to_argv(&self, line: &str) -> Result<Vec<String>>
    {
        Ok(line.split_whitespace().map(str::to_string).collect())
    }

    fn register_command(&self, name: &str, invoke: NativeCommand) -> Result<()>
    {
        self.commands.borrow_mut().insert(name.to_string(), invoke);
        Ok(())
    }

    fn selected_inferior(&self) -> Option<NativeInferior>
    {
        self.state.borrow().has_inferior.then_some(NativeInferior(1))
    }

    fn inferior_arch(&self, _inferior: NativeInferior) -> Result<NativeArch>
    {
        Ok(self.state.borrow().arch.clone())
    }

    fn inferior_threads(&self, _inferior: NativeInferior) -> Result<Vec<NativeThread>>
    {
        Ok(self.state.borrow().threads.iter().map(|(thread, _)| *thread).collect())
    }

    fn read_memory(&self, _inferior: NativeInferior, address: u64, size: usize) -> Result<Vec<u8>>
    {
        Self::read_bytes(&self.state.borrow(), address, size)
    }

    fn write_memory(&self, _inferior: NativeInferior, address: u64, data: &[u8]) -> Result<()>
    {
        let mut state = self.state.borrow_mut();
        for offset in 0..data.len() as u64 {
            let at = address + offset;
            match state.pages.get(&(at & !(PAGE_SIZE - 1))) {
                Some(page) if page.writable => {}
                _ => return Err(engine_error(format!("Cannot access memory at address {at:#x}"))),
            }
        }
        for (offset, byte) in data.iter().enumerate() {
            let at = address + offset as u64;
            if let Some(page) = state.pages.get_mut(&(at & !(PAGE_SIZE - 1))) {
                page.data[(at & (PAGE_SIZE - 1)) as usize] = *byte;
            }
        }
        Ok(())
    }

    fn memory_map(&self, _inferior: NativeInferior) -> Result<Vec<MemoryPage>>
    {
        let state = self.state.borrow();
        let mut pages: Vec<MemoryPage> = Vec::new();
        for (&start, page) in &state.pages {
            let permissions = Permissions {
                read: true,
                write: page.writable,
                execute: false,
            };
            match pages.last_mut() {
                Some(last) if last.end.value() == start && last.permissions == permissions => {
                    last.end = Address::new(start + PAGE_SIZE);
                }
                _ => pages.push(MemoryPage::new(
                    Address::new(start),
                    Address::new(start + PAGE_SIZE),
                    permissions,
                    None,
                )),
            }
        }
        Ok(pages)
    }

    fn connection(&self, _inferior: NativeInferior) -> Connection
    {
        self.state.borrow().connection
    }

    fn selected_thread(&self) -> Option<NativeThread>
    {
        self.state.borrow().selected_thread
    }

    fn switch_thread(&self, thread: NativeThread) -> Result<()>
    {
        let mut state = self.state.borrow_mut();
        if !state.threads.iter().any(|(known, _)| *known == thread) {
            return Err(DebuggerError::StaleHandle(format!("thread {}", thread.0)));
        }
        state.selected_thread = Some(thread);
        state.selected_frame = state
            .frames
            .iter()
            .position(|frame| frame.thread == thread && frame.level == 0)
            .map(|index| NativeFrame(index as u64));
        self.selection_changes.set(self.selection_changes.get() + 1);
        Ok(())
    }

    fn thread_ptid(&self, thread: NativeThread) -> Result<Ptid>
    {
        self.state
            .borrow()
            .threads
            .iter()
            .find(|(known, _)| *known == thread)
            .map(|(_, ptid)| *ptid)
            .ok_or_else(|| DebuggerError::StaleHandle(format!("thread {}", thread.0)))
    }

    fn selected_frame(&self) -> Result<NativeFrame>
    {
        self.state
            .borrow()
            .selected_frame
            .ok_or_else(|| engine_error("No stack."))
    }

    fn newest_frame(&self) -> Result<NativeFrame>
    {
        let state = self.state.borrow();
        let thread = state.selected_thread.ok_or_else(|| engine_error("No thread selected."))?;
        state
            .frames
            .iter()
            .position(|frame| frame.thread == thread && frame.level == 0)
            .map(|index| NativeFrame(index as u64))
            .ok_or_else(|| engine_error("No stack."))
    }

    fn select_frame(&self, frame: NativeFrame) -> Result<()>
    {
        let mut state = self.state.borrow_mut();
        Self::frame_index(&state, frame)?;
        state.selected_frame = Some(frame);
        self.selection_changes.set(self.selection_changes.get() + 1);
        Ok(())
    }

    fn frame_level(&self, frame: NativeFrame) -> Result<usize>
    {
        let state = self.state.borrow();
        let index = Self::frame_index(&state, frame)?;
        Ok(state.frames[index].level)
    }

    fn frame_read_register(&self, frame: NativeFrame, name: &str) -> Result<Option<NativeValue>>
    {
        let found = {
            let state = self.state.borrow();
            let index = Self::frame_index(&state, frame)?;
            let registers = &state.frames[index].registers;
            registers
                .get(name)
                .or_else(|| state.aliases.get(name).and_then(|target| registers.get(target)))
                .copied()
        };
        Ok(found.map(|(bits, size)| {
            let ty = self.signed_type(size);
            self.push_value(FakeValue {
                bits,
                ty,
                address: None,
            })
        }))
    }

    fn frame_write_register(&self, frame: NativeFrame, name: &str, value: u64) -> Result<bool>
    {
        let mut state = self.state.borrow_mut();
        let index = Self::frame_index(&state, frame)?;
        let name = match state.aliases.get(name) {
            Some(target) if !state.frames[index].registers.contains_key(name) => target.clone(),
            _ => name.to_string(),
        };
        match state.frames[index].registers.get_mut(&name) {
            Some((bits, size)) => {
                *bits = value & Self::mask(*size);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn create_value(&self, value: u64) -> Result<NativeValue>
    {
        let ty = self.signed_type(8);
        Ok(self.push_value(FakeValue {
            bits: value,
            ty,
            address: None,
        }))
    }

    fn value_address(&self, value: NativeValue) -> Result<Option<u64>>
    {
        Ok(self.value(value)?.address)
    }

    fn value_is_optimized_out(&self, _value: NativeValue) -> bool
    {
        false
    }

    fn value_type(&self, value: NativeValue) -> NativeType
    {
        self.value(value).map(|value| value.ty).unwrap_or(NativeType(u64::MAX))
    }

    fn value_dereference(&self, value: NativeValue) -> Result<NativeValue>
    {
        let value = self.value(value)?;
        let ty = self.ty(value.ty)?;
        let target = match (ty.code, ty.target) {
            (type_code::PTR, Some(target)) => target,
            _ => return Err(engine_error("Attempt to take contents of a non-pointer value.")),
        };
        let size = self.ty(target)?.size;
        let bytes = {
            let state = self.state.borrow();
            let bytes = Self::read_bytes(&state, value.bits, size)?;
            (bytes, state.arch.endian)
        };
        let (bytes, endian) = bytes;
        let bits = match endian {
            Endian::Little => bytes.iter().rev().fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)),
            Endian::Big => bytes.iter().fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)),
        };
        Ok(self.push_value(FakeValue {
            bits,
            ty: target,
            address: Some(value.bits),
        }))
    }

    fn value_string(&self, value: NativeValue) -> Result<String>
    {
        let value = self.value(value)?;
        let ty = self.ty(value.ty)?;
        let is_char_pointer = match (ty.code, ty.target) {
            (type_code::PTR, Some(target)) => self.ty(target)?.size == 1,
            _ => false,
        };
        if !is_char_pointer {
            return Err(engine_error("Trying to read string with inappropriate type."));
        }
        let state = self.state.borrow();
        let mut bytes = Vec::new();
        for offset in 0.. {
            let at = value.bits.checked_add(offset).ok_or_else(|| engine_error("Cannot access memory"))?;
            match Self::read_bytes(&state, at, 1)?[0] {
                0 => break,
                byte => bytes.push(byte),
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn value_fetch_lazy(&self, value: NativeValue) -> Result<()>
    {
        self.value(value).map(|_| ())
    }

    fn value_to_int(&self, value: NativeValue) -> Result<i128>
    {
        let value = self.value(value)?;
        let ty = self.ty(value.ty)?;
        let bits = value.bits & Self::mask(ty.size);
        if !ty.signed {
            return Ok(i128::from(bits));
        }
        let shift = 128 - (ty.size.min(8) * 8) as u32;
        Ok((i128::from(bits) << shift) >> shift)
    }

    fn value_cast(&self, value: NativeValue, ty: NativeType) -> Result<NativeValue>
    {
        let source = self.value(value)?;
        let size = self.ty(ty)?.size;
        Ok(self.push_value(FakeValue {
            bits: source.bits & Self::mask(size),
            ty,
            address: None,
        }))
    }

    fn type_name(&self, ty: NativeType) -> Option<String>
    {
        self.ty(ty).ok().and_then(|ty| ty.name)
    }

    fn type_sizeof(&self, ty: NativeType) -> usize
    {
        self.ty(ty).map_or(0, |ty| ty.size)
    }

    fn type_alignof(&self, ty: NativeType) -> usize
    {
        self.ty(ty).map_or(1, |ty| ty.size.clamp(1, 8))
    }

    fn type_code(&self, ty: NativeType) -> i32
    {
        self.ty(ty).map_or(type_code::INT, |ty| ty.code)
    }

    fn type_fields(&self, _ty: NativeType) -> Result<Vec<NativeField>>
    {
        Ok(Vec::new())
    }

    fn type_array(&self, ty: NativeType, count: usize) -> Result<NativeType>
    {
        let element = self.ty(ty)?;
        Ok(self.push_type(FakeType {
            name: None,
            size: element.size * count,
            code: type_code::ARRAY,
            target: Some(ty),
            signed: false,
        }))
    }

    fn type_pointer(&self, ty: NativeType) -> Result<NativeType>
    {
        self.ty(ty)?;
        let size = self.state.borrow().arch.ptrsize;
        Ok(self.push_type(FakeType {
            name: None,
            size,
            code: type_code::PTR,
            target: Some(ty),
            signed: false,
        }))
    }

    fn type_strip_typedefs(&self, ty: NativeType) -> Result<NativeType>
    {
        let resolved = self.ty(ty)?;
        match (resolved.code, resolved.target) {
            (type_code::TYPEDEF, Some(target)) => Ok(target),
            _ => Ok(ty),
        }
    }

    fn type_target(&self, ty: NativeType) -> Result<NativeType>
    {
        self.ty(ty)?
            .target
            .ok_or_else(|| engine_error("Type does not have a target."))
    }

    fn lookup_type(&self, name: &str) -> Result<NativeType>
    {
        self.state
            .borrow()
            .types
            .iter()
            .position(|ty| ty.name.as_deref() == Some(name))
            .map(|index| NativeType(index as u64))
            .ok_or_else(|| DebuggerError::TypeNotFound(name.to_string()))
    }
}
