//! # Memory Access Helpers
//!
//! Typed and untyped access to the inferior's memory on top of
//! [`Process::read_memory`](crate::dbg::Process::read_memory).
//!
//! ## Reads
//!
//! Scalar reads (`u8` .. `u64`, `s8` .. `s64`, `pvoid`, [`Memory::u`]) need
//! every byte to be readable and decode with the inferior's endianness. Reads
//! of C types go through the engine ([`Memory::readtype`],
//! [`Memory::get_typed_pointer_value`]).
//!
//! ## Probing
//!
//! [`Memory::peek`], [`Memory::poke`] and [`Memory::is_readable_address`]
//! answer "can this byte be read (written)?" without failing.
//! [`Memory::find_upper_boundary`] and [`Memory::find_lower_boundary`] walk
//! page by page to find the extent of the mapping around an address.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::rc::Rc;
//!
//! use vantage_core::cache::CacheRegistry;
//! use vantage_core::config::CoreConfig;
//! use vantage_core::dbg::Debugger;
//! use vantage_core::memory::Memory;
//!
//! # fn debugger() -> Rc<dyn Debugger> { unimplemented!() }
//! let caches = CacheRegistry::new();
//! let memory = Memory::new(debugger(), &caches, &CoreConfig::default());
//!
//! let word = memory.u64(0x601000)?;
//! let name = memory.string(0x402004, None);
//! let end = memory.find_upper_boundary(0x601000, None);
//! # Ok::<(), vantage_core::error::DebuggerError>(())
//! ```

use std::rc::Rc;

use tracing::{debug, trace};

use crate::arch::decode_uint;
use crate::cache::{CacheRegistry, LifecycleCache};
use crate::config::CoreConfig;
use crate::dbg::{Debugger, EventType, Process, Type, Value};
use crate::error::{DebuggerError, Result};
use crate::types::{Address, PAGE_SIZE};

/// A C type given either by name or as an engine handle
#[derive(Debug, Clone, Copy)]
pub enum TypeRef<'a>
{
    /// Looked up with [`Process::lookup_type`]
    Name(&'a str),
    /// Used as is
    Handle(&'a dyn Type),
}

impl<'a> From<&'a str> for TypeRef<'a>
{
    fn from(name: &'a str) -> Self
    {
        TypeRef::Name(name)
    }
}

impl<'a> From<&'a dyn Type> for TypeRef<'a>
{
    fn from(ty: &'a dyn Type) -> Self
    {
        TypeRef::Handle(ty)
    }
}

/// Memory helpers bound to a debugger
pub struct Memory
{
    debugger: Rc<dyn Debugger>,
    string_max: usize,
    max_pages: usize,
    readable: Rc<LifecycleCache<u64, bool>>,
    upper: Rc<LifecycleCache<(u64, usize), u64>>,
    lower: Rc<LifecycleCache<(u64, usize), u64>>,
}

impl Memory
{
    /// Create the helpers, registering their caches with `caches`.
    pub fn new(debugger: Rc<dyn Debugger>, caches: &CacheRegistry, config: &CoreConfig) -> Self
    {
        Self {
            debugger,
            string_max: config.string_max,
            max_pages: config.boundary_max_pages,
            readable: caches.register("readable-addresses", &[EventType::Stop]),
            upper: caches.register("upper-boundaries", &[EventType::Stop]),
            lower: caches.register("lower-boundaries", &[EventType::Stop]),
        }
    }

    fn inferior(&self) -> Result<Box<dyn Process>>
    {
        self.debugger.inferior()
    }

    /// Read `count` bytes at `address`.
    ///
    /// With `partial` the readable prefix is returned instead of an error.
    pub fn read(&self, address: u64, count: usize, partial: bool) -> Result<Vec<u8>>
    {
        self.inferior()?.read_memory(address, count, partial)
    }

    /// Write `data` at `address`; every byte must be writable.
    pub fn write(&self, address: u64, data: &[u8]) -> Result<()>
    {
        self.inferior()?.write_memory(address, data, false)
    }

    /// The byte at `address`, or `None` if it can't be read.
    pub fn peek(&self, address: u64) -> Option<u8>
    {
        self.read(address, 1, false).ok()?.first().copied()
    }

    /// Whether the byte at `address` can be rewritten in place.
    ///
    /// Reads the byte and writes the same value back, so memory is unchanged
    /// either way.
    pub fn poke(&self, address: u64) -> bool
    {
        let Some(byte) = self.peek(address) else {
            return false;
        };
        match self.write(address, &[byte]) {
            Ok(()) => true,
            Err(error) => {
                trace!(address = format_args!("{address:#x}"), %error, "Poke failed");
                false
            }
        }
    }

    /// Whether `address` lies in a known mapping and can be read.
    ///
    /// Cached until the next stop.
    pub fn is_readable_address(&self, address: u64) -> bool
    {
        self.readable.get_or_insert_with(address, || {
            let mapped = self
                .inferior()
                .and_then(|inferior| inferior.vmmap())
                .map(|pages| pages.iter().any(|page| page.contains(Address::from(address))))
                .unwrap_or(false);
            mapped && self.peek(address).is_some()
        })
    }

    /// NUL-terminated byte string at `address`, at most `max` bytes
    /// (`string_max` from the configuration by default).
    ///
    /// An unreadable start gives an empty string. Without a NUL inside the
    /// readable part, everything that could be read is returned.
    pub fn string(&self, address: u64, max: Option<usize>) -> Vec<u8>
    {
        if self.peek(address).is_none() {
            return Vec::new();
        }
        let max = max.unwrap_or(self.string_max);
        let mut data = self.read(address, max, true).unwrap_or_default();
        if let Some(nul) = data.iter().position(|&byte| byte == 0) {
            data.truncate(nul);
        }
        data
    }

    fn read_scalar(&self, address: u64, size: usize) -> Result<u64>
    {
        let inferior = self.inferior()?;
        let arch = inferior.arch()?;
        let bytes = inferior.read_memory(address, size, false)?;
        if bytes.len() != size {
            return Err(DebuggerError::MemoryRead { address, size });
        }
        decode_uint(&bytes, arch.endian).ok_or(DebuggerError::MemoryRead { address, size })
    }

    /// Unsigned byte.
    pub fn u8(&self, address: u64) -> Result<u8>
    {
        self.read_scalar(address, 1).map(|value| value as u8)
    }

    /// Unsigned 16-bit integer.
    pub fn u16(&self, address: u64) -> Result<u16>
    {
        self.read_scalar(address, 2).map(|value| value as u16)
    }

    /// Unsigned 32-bit integer.
    pub fn u32(&self, address: u64) -> Result<u32>
    {
        self.read_scalar(address, 4).map(|value| value as u32)
    }

    /// Unsigned 64-bit integer.
    pub fn u64(&self, address: u64) -> Result<u64>
    {
        self.read_scalar(address, 8)
    }

    /// Signed byte.
    pub fn s8(&self, address: u64) -> Result<i8>
    {
        self.u8(address).map(|value| value as i8)
    }

    /// Signed 16-bit integer.
    pub fn s16(&self, address: u64) -> Result<i16>
    {
        self.u16(address).map(|value| value as i16)
    }

    /// Signed 32-bit integer.
    pub fn s32(&self, address: u64) -> Result<i32>
    {
        self.u32(address).map(|value| value as i32)
    }

    /// Signed 64-bit integer.
    pub fn s64(&self, address: u64) -> Result<i64>
    {
        self.u64(address).map(|value| value as i64)
    }

    /// Alias of [`u8`](Self::u8).
    pub fn byte(&self, address: u64) -> Result<u8>
    {
        self.u8(address)
    }

    /// Alias of [`u8`](Self::u8).
    pub fn uchar(&self, address: u64) -> Result<u8>
    {
        self.u8(address)
    }

    /// Alias of [`u16`](Self::u16).
    pub fn ushort(&self, address: u64) -> Result<u16>
    {
        self.u16(address)
    }

    /// Alias of [`u32`](Self::u32).
    pub fn uint(&self, address: u64) -> Result<u32>
    {
        self.u32(address)
    }

    /// Pointer-sized unsigned integer.
    pub fn pvoid(&self, address: u64) -> Result<u64>
    {
        let ptrsize = self.inferior()?.arch()?.ptrsize;
        self.read_scalar(address, ptrsize)
    }

    /// Unsigned integer of `bits` bits (pointer width when `None`).
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` for a width other than 8, 16, 32 or 64.
    pub fn u(&self, address: u64, bits: Option<u32>) -> Result<u64>
    {
        let bits = match bits {
            Some(bits) => bits,
            None => self.inferior()?.arch()?.ptrbits(),
        };
        match bits {
            8 => self.u8(address).map(u64::from),
            16 => self.u16(address).map(u64::from),
            32 => self.u32(address).map(u64::from),
            64 => self.u64(address),
            other => Err(DebuggerError::InvalidArgument(format!("unsupported integer width {other}"))),
        }
    }

    /// `address` as a value of type `ty *`.
    pub fn cast_pointer(&self, ty: &dyn Type, address: u64) -> Result<Box<dyn Value>>
    {
        let pointer = ty.pointer()?;
        self.inferior()?.create_value(address)?.cast(pointer.as_ref())
    }

    /// Like [`cast_pointer`](Self::cast_pointer), with the type given by
    /// name or handle.
    ///
    /// ## Errors
    ///
    /// `TypeNotFound` when a named type doesn't exist.
    pub fn get_typed_pointer<'a>(&self, ty: impl Into<TypeRef<'a>>, address: u64) -> Result<Box<dyn Value>>
    {
        match ty.into() {
            TypeRef::Name(name) => {
                let resolved = self.inferior()?.lookup_type(name)?;
                self.cast_pointer(resolved.as_ref(), address)
            }
            TypeRef::Handle(handle) => self.cast_pointer(handle, address),
        }
    }

    /// The object of type `ty` stored at `address`.
    pub fn get_typed_pointer_value<'a>(&self, ty: impl Into<TypeRef<'a>>, address: u64) -> Result<Box<dyn Value>>
    {
        self.get_typed_pointer(ty, address)?.dereference()
    }

    /// Integer value of the object of type `ty` at `address`.
    pub fn readtype<'a>(&self, ty: impl Into<TypeRef<'a>>, address: u64) -> Result<i128>
    {
        let value = self.get_typed_pointer_value(ty, address)?;
        value.fetch_lazy()?;
        value.to_int()
    }

    /// First address past the readable mapping that contains `address`.
    ///
    /// Walks up at most `max_pages` pages (`boundary_max_pages` from the
    /// configuration by default), returning where the walk stopped. Running
    /// off the top of the address space returns the pointer mask. Cached
    /// until the next stop.
    pub fn find_upper_boundary(&self, address: u64, max_pages: Option<usize>) -> u64
    {
        let max_pages = max_pages.unwrap_or(self.max_pages);
        self.upper
            .get_or_insert_with((address, max_pages), || self.scan_up(address, max_pages))
    }

    fn scan_up(&self, address: u64, max_pages: usize) -> u64
    {
        let start = Address::from(address).page_align(PAGE_SIZE);
        let Ok(inferior) = self.inferior() else {
            return start.value();
        };
        let mask = inferior.arch().map_or(u64::MAX, |arch| arch.ptrmask());

        let mut cursor = start;
        for _ in 0..max_pages {
            if inferior.read_memory(cursor.value(), 1, false).is_err() {
                break;
            }
            match cursor.checked_add(PAGE_SIZE) {
                Some(next) if next.value() <= mask => cursor = next,
                _ => return mask,
            }
        }
        debug!(from = %start, to = %cursor, "Upper boundary");
        cursor.value()
    }

    /// Start of the lowest readable page of the mapping that contains
    /// `address`.
    ///
    /// Walks down at most `max_pages` pages. Reaching address zero returns
    /// zero; an unreadable start page returns the start page. Cached until
    /// the next stop.
    pub fn find_lower_boundary(&self, address: u64, max_pages: Option<usize>) -> u64
    {
        let max_pages = max_pages.unwrap_or(self.max_pages);
        self.lower
            .get_or_insert_with((address, max_pages), || self.scan_down(address, max_pages))
    }

    fn scan_down(&self, address: u64, max_pages: usize) -> u64
    {
        let start = Address::from(address).page_align(PAGE_SIZE);
        let Ok(inferior) = self.inferior() else {
            return start.value();
        };

        let mut lowest = start;
        let mut cursor = start;
        for _ in 0..max_pages {
            if inferior.read_memory(cursor.value(), 1, false).is_err() {
                break;
            }
            lowest = cursor;
            match cursor.checked_sub(PAGE_SIZE) {
                Some(previous) => cursor = previous,
                None => return 0,
            }
        }
        debug!(from = %start, to = %lowest, "Lower boundary");
        lowest.value()
    }
}
