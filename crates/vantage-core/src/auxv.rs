//! # Auxiliary Vector
//!
//! The ELF auxiliary vector the kernel leaves on a new process's stack:
//! `(AT_*, value)` pairs between the environment pointers and the argument
//! strings, terminated by an `AT_NULL` pair.
//!
//! [`AuxvReader::get`] asks the engine first (`info auxv`). When the engine
//! lists nothing, the vector is recovered from the stack of a Linux target:
//!
//! 1. [`find_stack_boundary`] finds the top of the stack mapping
//! 2. walking down from there, the first all-zero pair is taken as `AT_NULL`
//! 3. further down, the `AT_BASE` entry anchors the vector, whose start is
//!    the lowest pair with a known `AT_*` number
//! 4. the pairs are read forward up to `AT_NULL`
//!
//! A walk that finds nothing is retried one word lower, for stacks where the
//! pairs are not aligned to the top of the mapping. `AT_EXECFN` missing from
//! a walked vector is filled in from the file name at the very top of the
//! stack.
//!
//! The vector is cached until the next `Start` or `NewModule` event.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::rc::Rc;
//!
//! use vantage_core::auxv::AT_ENTRY;
//! use vantage_core::config::CoreConfig;
//! use vantage_core::context::Context;
//! use vantage_core::dbg::Debugger;
//!
//! # fn debugger() -> Rc<dyn Debugger> { unimplemented!() }
//! let context = Context::attach(debugger(), CoreConfig::from_env())?;
//! let auxv = context.auxv().get();
//!
//! if let Some(entry) = auxv.int(AT_ENTRY) {
//!     println!("entry point {entry:#x}");
//! }
//! print!("{auxv}");
//! # Ok::<(), vantage_core::error::DebuggerError>(())
//! ```

use std::borrow::Cow;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::cache::{CacheRegistry, LifecycleCache};
use crate::dbg::{Debugger, EventType, Process};
use crate::error::{DebuggerError, Result};
use crate::memory::Memory;
use crate::registers::Registers;
use crate::types::{page_align, PAGE_SIZE};

pub const AT_NULL: u64 = 0;
pub const AT_PHDR: u64 = 3;
pub const AT_PAGESZ: u64 = 6;
pub const AT_BASE: u64 = 7;
pub const AT_ENTRY: u64 = 9;
pub const AT_PLATFORM: u64 = 15;
pub const AT_RANDOM: u64 = 25;
pub const AT_EXECFN: u64 = 31;
pub const AT_SYSINFO_EHDR: u64 = 33;

/// Pairs numbered at or above this are not taken as part of a walked vector.
const AT_LIMIT: u64 = 37;

/// Pairs inspected while looking for `AT_BASE` below `AT_NULL`.
const MAX_BASE_SEARCH: usize = 1024;

/// Longest file name read back from the top of the stack.
const EXECFN_MAX: usize = 1024;

const AT_NAMES: &[(u64, &str)] = &[
    (0, "AT_NULL"),
    (1, "AT_IGNORE"),
    (2, "AT_EXECFD"),
    (3, "AT_PHDR"),
    (4, "AT_PHENT"),
    (5, "AT_PHNUM"),
    (6, "AT_PAGESZ"),
    (7, "AT_BASE"),
    (8, "AT_FLAGS"),
    (9, "AT_ENTRY"),
    (10, "AT_NOTELF"),
    (11, "AT_UID"),
    (12, "AT_EUID"),
    (13, "AT_GID"),
    (14, "AT_EGID"),
    (15, "AT_PLATFORM"),
    (16, "AT_HWCAP"),
    (17, "AT_CLKTCK"),
    (18, "AT_FPUCW"),
    (19, "AT_DCACHEBSIZE"),
    (20, "AT_ICACHEBSIZE"),
    (21, "AT_UCACHEBSIZE"),
    (22, "AT_IGNOREPPC"),
    (23, "AT_SECURE"),
    (24, "AT_BASE_PLATFORM"),
    (25, "AT_RANDOM"),
    (31, "AT_EXECFN"),
    (32, "AT_SYSINFO"),
    (33, "AT_SYSINFO_EHDR"),
    (34, "AT_L1I_CACHESHAPE"),
    (35, "AT_L1D_CACHESHAPE"),
    (36, "AT_L2_CACHESHAPE"),
    (37, "AT_L3_CACHESHAPE"),
];

/// Symbolic name of an `AT_*` number; unknown numbers read `AT_UNKNOWN<n>`.
///
/// ```rust
/// use vantage_core::auxv::at_name;
///
/// assert_eq!(at_name(9), "AT_ENTRY");
/// assert_eq!(at_name(51), "AT_UNKNOWN51");
/// ```
pub fn at_name(kind: u64) -> Cow<'static, str>
{
    AT_NAMES
        .iter()
        .find(|(number, _)| *number == kind)
        .map_or_else(|| Cow::Owned(format!("AT_UNKNOWN{kind}")), |(_, name)| Cow::Borrowed(*name))
}

/// Value of one auxiliary-vector entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuxvValue
{
    Int(u64),
    /// `AT_EXECFN`/`AT_PLATFORM`, read back as a C string
    Str(String),
    /// A string entry whose pointer could not be followed
    Unreadable(u64),
}

impl fmt::Display for AuxvValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            AuxvValue::Int(value) => write!(f, "{value:#x}"),
            AuxvValue::Str(text) => write!(f, "{text:?}"),
            AuxvValue::Unreadable(address) => write!(f, "{address:#x} <unreadable>"),
        }
    }
}

/// A decoded auxiliary vector, in the order the entries were found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Auxv
{
    entries: Vec<(u64, AuxvValue)>,
}

impl Auxv
{
    /// Store an entry, replacing an earlier one of the same number.
    pub fn insert(&mut self, kind: u64, value: AuxvValue)
    {
        match self.entries.iter_mut().find(|(number, _)| *number == kind) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((kind, value)),
        }
    }

    /// Store a raw pair, following the string pointers of `AT_EXECFN` and
    /// `AT_PLATFORM` through `process`.
    pub fn set(&mut self, process: &dyn Process, kind: u64, value: u64)
    {
        let value = match kind {
            AT_EXECFN | AT_PLATFORM => match read_c_string(process, value) {
                Ok(text) => AuxvValue::Str(text),
                Err(error) => {
                    debug!(entry = %at_name(kind), address = format_args!("{value:#x}"), %error, "Unreadable auxv string");
                    AuxvValue::Unreadable(value)
                }
            },
            _ => AuxvValue::Int(value),
        };
        self.insert(kind, value);
    }

    pub fn get(&self, kind: u64) -> Option<&AuxvValue>
    {
        self.entries
            .iter()
            .find(|(number, _)| *number == kind)
            .map(|(_, value)| value)
    }

    /// Look an entry up by its `AT_*` name.
    pub fn get_by_name(&self, name: &str) -> Option<&AuxvValue>
    {
        self.entries
            .iter()
            .find(|(number, _)| at_name(*number) == name)
            .map(|(_, value)| value)
    }

    /// Integer value of an entry; string entries have none.
    pub fn int(&self, kind: u64) -> Option<u64>
    {
        match self.get(kind)? {
            AuxvValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Text of a string entry.
    pub fn string(&self, kind: u64) -> Option<&str>
    {
        match self.get(kind)? {
            AuxvValue::Str(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// File name the program was executed as.
    pub fn execfn(&self) -> Option<&str>
    {
        self.string(AT_EXECFN)
    }

    /// Load address of the program interpreter.
    pub fn base(&self) -> Option<u64>
    {
        self.int(AT_BASE)
    }

    /// Entry point of the program.
    pub fn entry(&self) -> Option<u64>
    {
        self.int(AT_ENTRY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &AuxvValue)>
    {
        self.entries.iter().map(|(kind, value)| (*kind, value))
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}

impl fmt::Display for Auxv
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        for (kind, value) in self.iter() {
            writeln!(f, "{:<20} {value}", at_name(kind))?;
        }
        Ok(())
    }
}

fn read_c_string(process: &dyn Process, address: u64) -> Result<String>
{
    let pointer = process.lookup_type("char")?.pointer()?;
    process.create_value(address)?.cast(pointer.as_ref())?.string()
}

/// Split `info auxv` output into `(AT_*, value)` pairs.
///
/// ```text
/// 33   AT_SYSINFO_EHDR      System-supplied DSO's ELF header 0x7ffff7fc1000
/// 6    AT_PAGESZ            System page size               4096
/// 31   AT_EXECFN            File name of executable        0x7fffffffefe3 "/bin/true"
/// 0    AT_NULL              End of vector                  0x0
/// ```
///
/// The value is the first `0x` number after the entry number, or else a
/// decimal number ending the line. Lines matching neither are skipped.
pub fn parse_info_auxv(listing: &str) -> Vec<(u64, u64)>
{
    let mut pairs = Vec::new();
    for line in listing.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_auxv_line(line) {
            Some(pair) => pairs.push(pair),
            None => warn!(line, "Skipping unrecognized auxv line"),
        }
    }
    pairs
}

fn parse_auxv_line(line: &str) -> Option<(u64, u64)>
{
    let mut tokens = line.split_whitespace();
    let kind = tokens.next().filter(|token| is_decimal(token))?.parse().ok()?;
    let rest: Vec<&str> = tokens.collect();

    let hex = rest.iter().find_map(|token| {
        let digits = token.strip_prefix("0x")?;
        let end = digits
            .find(|c: char| !matches!(c, '0'..='9' | 'a'..='f'))
            .unwrap_or(digits.len());
        u64::from_str_radix(&digits[..end], 16).ok()
    });
    let value = match hex {
        Some(value) => value,
        None => rest.last().filter(|token| is_decimal(token))?.parse().ok()?,
    };
    Some((kind, value))
}

fn is_decimal(token: &str) -> bool
{
    !token.is_empty() && token.bytes().all(|byte| byte.is_ascii_digit())
}

/// Top of the stack mapping that contains `address`.
///
/// Walks up page by page and stops at the first page that cannot be read or
/// that starts with an ELF header (the vDSO is often mapped right above the
/// stack).
pub fn find_stack_boundary(memory: &Memory, address: u64) -> u64
{
    let mut cursor = page_align(address);
    loop {
        match memory.read(cursor, 4, false) {
            Ok(bytes) if bytes == b"\x7fELF" => break,
            Ok(_) => {}
            Err(_) => break,
        }
        match cursor.checked_add(PAGE_SIZE) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    trace!(from = format_args!("{address:#x}"), to = format_args!("{cursor:#x}"), "Stack boundary");
    cursor
}

/// Reads and caches the auxiliary vector of the selected inferior
pub struct AuxvReader
{
    debugger: Rc<dyn Debugger>,
    registers: Rc<Registers>,
    memory: Rc<Memory>,
    cache: Rc<LifecycleCache<(), Auxv>>,
}

impl AuxvReader
{
    /// Create the reader, registering its cache with `caches`.
    pub fn new(
        debugger: Rc<dyn Debugger>,
        registers: Rc<Registers>,
        memory: Rc<Memory>,
        caches: &CacheRegistry,
    ) -> Self
    {
        Self {
            debugger,
            registers,
            memory,
            cache: caches.register("auxv", &[EventType::Start, EventType::NewModule]),
        }
    }

    /// The auxiliary vector; empty when neither the engine nor the stack
    /// gives one.
    pub fn get(&self) -> Auxv
    {
        self.cache.get_or_insert_with((), || self.collect())
    }

    fn collect(&self) -> Auxv
    {
        let inferior = match self.debugger.inferior() {
            Ok(inferior) => inferior,
            Err(error) => {
                debug!(%error, "No inferior for auxv");
                return Auxv::default();
            }
        };
        if let Some(auxv) = self.from_listing(inferior.as_ref()) {
            debug!(entries = auxv.len(), "Auxv from engine listing");
            return auxv;
        }
        let auxv = self.walk_stack(inferior.as_ref()).unwrap_or_default();
        debug!(entries = auxv.len(), "Auxv from stack walk");
        auxv
    }

    fn from_listing(&self, inferior: &dyn Process) -> Option<Auxv>
    {
        let listing = match inferior.auxv_listing() {
            Ok(listing) => listing,
            Err(error) => {
                debug!(%error, "Engine has no auxv listing");
                return None;
            }
        };
        let mut auxv = Auxv::default();
        for (kind, value) in parse_info_auxv(&listing) {
            auxv.set(inferior, kind, value);
        }
        (!auxv.is_empty()).then_some(auxv)
    }

    fn walk_stack(&self, inferior: &dyn Process) -> Option<Auxv>
    {
        if !inferior.is_linux() || inferior.is_qemu_kernel() {
            return None;
        }

        let mut auxv = self.walk_from(inferior, 0);
        if auxv.is_empty() {
            auxv = self.walk_from(inferior, 1);
        }
        if auxv.execfn().map_or(true, str::is_empty) {
            if let Some(path) = self.execfn_from_stack() {
                auxv.insert(AT_EXECFN, AuxvValue::Str(path));
            }
        }
        (!auxv.is_empty()).then_some(auxv)
    }

    fn walk_from(&self, inferior: &dyn Process, skew: u64) -> Auxv
    {
        match self.scan_stack(inferior, skew) {
            Ok(auxv) => auxv,
            Err(error) => {
                debug!(skew, %error, "Auxv stack walk failed");
                Auxv::default()
            }
        }
    }

    /// Recover the vector from the stack, starting `skew` words below the
    /// top of the stack mapping.
    fn scan_stack(&self, inferior: &dyn Process, skew: u64) -> Result<Auxv>
    {
        let Some(sp) = self.registers.sp() else {
            return Ok(Auxv::default());
        };
        let word = inferior.arch()?.ptrsize as u64;
        let read = |address: u64| self.memory.pvoid(address);
        let down = |address: u64, words: u64| {
            address
                .checked_sub(words * word)
                .ok_or(DebuggerError::MemoryRead { address, size: word as usize })
        };
        let up = |address: u64, words: u64| {
            address
                .checked_add(words * word)
                .ok_or(DebuggerError::MemoryRead { address, size: word as usize })
        };

        let end = find_stack_boundary(&self.memory, sp);
        let mut cursor = down(end, skew + 2)?;
        while read(cursor)? != AT_NULL || read(up(cursor, 1)?)? != 0 {
            cursor = down(cursor, 2)?;
        }

        let mut found = false;
        for _ in 0..MAX_BASE_SEARCH {
            if read(cursor)? == AT_BASE {
                found = true;
                break;
            }
            cursor = down(cursor, 2)?;
        }
        if !found {
            return Ok(Auxv::default());
        }

        while read(down(cursor, 2)?)? < AT_LIMIT {
            cursor = down(cursor, 2)?;
        }

        let mut auxv = Auxv::default();
        loop {
            let kind = read(cursor)?;
            if kind == AT_NULL {
                break;
            }
            auxv.set(inferior, kind, read(up(cursor, 1)?)?);
            cursor = up(cursor, 2)?;
        }
        Ok(auxv)
    }

    /// The file name the kernel copies to the very top of the stack.
    fn execfn_from_stack(&self) -> Option<String>
    {
        let sp = self.registers.sp()?;
        self.memory.peek(sp)?;

        let mut address = self.memory.find_upper_boundary(sp, None);
        while self.memory.byte(address.checked_sub(1)?).ok()? == 0 {
            address -= 1;
        }
        while self.memory.byte(address.checked_sub(1)?).ok()? != 0 {
            address -= 1;
        }

        let name = self.memory.string(address, Some(EXECFN_MAX));
        if name.is_empty() {
            return None;
        }
        Some(absolute_path(&String::from_utf8_lossy(&name)))
    }
}

/// `path` made absolute against the working directory, with `.` and `..`
/// resolved lexically.
fn absolute_path(path: &str) -> String
{
    let path = Path::new(path);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normal = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other),
        }
    }
    normal.to_string_lossy().into_owned()
}
