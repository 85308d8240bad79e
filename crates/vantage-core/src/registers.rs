//! # Register Access Façade
//!
//! Named, architecture-independent access to the live registers of the
//! selected frame.
//!
//! ## Resolution
//!
//! [`Registers::get`] strips a leading `$`, asks the selected frame for the
//! name as given and then upper-cased (`xpsr` additionally falls back to
//! `xPSR`). The raw value is cast to the smallest unsigned type of 8, 16, 32
//! or 64 bits that holds it and masked to the pointer width. A register the
//! frame doesn't have, or one that can't be read right now, is `None`.
//!
//! ## Caching
//!
//! Values are cached until the next `Stop`, `Prompt` or `RegisterChanged`
//! event, keyed by the selected thread and frame level so a selection change
//! never serves another frame's value. Writing through [`Registers::write`]
//! clears the register and segment-base caches at once.
//!
//! ## Change tracking
//!
//! On every `Continue` and `Stop` the context calls
//! [`Registers::update_last`]: `last` moves to `previous` and `last` becomes a
//! fresh snapshot of the architecture's common registers. [`Registers::changed`]
//! lists the common registers whose value now differs from `previous`.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::arch::{self, Arch, ArchName, ThumbMode};
use crate::cache::{CacheRegistry, LifecycleCache};
use crate::dbg::{Debugger, EventType, Frame, Value};
use crate::error::{DebuggerError, Result};
use crate::platform::{self, SegmentBase};
use crate::regset::{register_set, BitFlags, RegisterSet};
use crate::types::Ptid;

/// Register name and value, `None` when unreadable.
pub type RegisterValue = (&'static str, Option<u64>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegisterKey
{
    ptid: Option<Ptid>,
    level: Option<usize>,
    name: String,
}

#[derive(Debug, Default)]
struct Snapshots
{
    previous: Vec<RegisterValue>,
    last: Vec<RegisterValue>,
}

/// Live register view of the selected frame
pub struct Registers
{
    debugger: Rc<dyn Debugger>,
    values: Rc<LifecycleCache<RegisterKey, Option<u64>>>,
    bases: Rc<LifecycleCache<(Option<Ptid>, SegmentBase), u64>>,
    descriptors: Rc<LifecycleCache<&'static str, Option<u64>>>,
    snapshots: RefCell<Snapshots>,
}

impl Registers
{
    /// Create the façade, registering its caches with `caches`.
    pub fn new(debugger: Rc<dyn Debugger>, caches: &CacheRegistry) -> Self
    {
        Self {
            debugger,
            values: caches.register(
                "registers",
                &[EventType::Stop, EventType::Prompt, EventType::RegisterChanged],
            ),
            bases: caches.register("segment-bases", &[EventType::Stop]),
            descriptors: caches.register("qemu-descriptors", &[EventType::Stop]),
            snapshots: RefCell::new(Snapshots::default()),
        }
    }

    fn arch(&self) -> Option<Arch>
    {
        arch::current(self.debugger.as_ref()).ok()
    }

    /// Register set of the current architecture.
    pub fn current(&self) -> Option<&'static RegisterSet>
    {
        self.arch().map(|arch| register_set(arch.name))
    }

    /// Value of register `name` in the selected frame.
    pub fn get(&self, name: &str) -> Option<u64>
    {
        let name = name.trim_start_matches('$');
        let session = self.debugger.session();
        let frame = session.selected_frame()?;
        let key = RegisterKey {
            ptid: session.selected_thread().and_then(|thread| thread.ptid()),
            level: frame.level().ok(),
            name: name.to_string(),
        };
        self.values
            .get_or_insert_with(key, || self.resolve(frame.as_ref(), name))
    }

    fn resolve(&self, frame: &dyn Frame, name: &str) -> Option<u64>
    {
        let value = read_raw(frame, name).or_else(|| {
            if name.eq_ignore_ascii_case("xpsr") {
                read_raw(frame, "xPSR")
            } else {
                None
            }
        })?;

        let arch = self.arch()?;
        let unsigned = self
            .debugger
            .inferior()
            .and_then(|inferior| inferior.lookup_type(unsigned_type_name(value.value_type().sizeof())))
            .ok()?;
        let mut raw = value
            .cast(unsigned.as_ref())
            .and_then(|value| value.to_int())
            .map_err(|error| trace!(register = name, %error, "Register value not convertible"))
            .ok()?;

        // real mode: the flat program counter is cs:ip
        if name == "pc" && arch.name == ArchName::I8086 {
            let cs = self.get("cs")?;
            raw += i128::from(cs) * 16;
        }

        u64::try_from(raw & i128::from(arch.ptrmask())).ok()
    }

    /// Subscript-style access: the name is lower-cased and the value masked
    /// to the pointer width.
    pub fn lookup(&self, name: &str) -> Option<u64>
    {
        let name = name.trim_start_matches('$').to_lowercase();
        let mask = self.arch().map_or(u64::MAX, |arch| arch.ptrmask());
        self.get(&name).map(|value| value & mask)
    }

    /// Whether `name` belongs to the current register set (or is `pc`/`sp`).
    pub fn contains(&self, name: &str) -> bool
    {
        self.current()
            .is_some_and(|set| name == "pc" || name == "sp" || set.contains(name))
    }

    /// Every name of the current register set plus `pc` and `sp`, without
    /// duplicates.
    pub fn names(&self) -> Vec<&'static str>
    {
        let Some(set) = self.current() else {
            return Vec::new();
        };
        let mut names = set.members();
        for alias in ["pc", "sp"] {
            if !names.contains(&alias) {
                names.push(alias);
            }
        }
        names
    }

    /// Write `value` to register `name` of the selected frame.
    ///
    /// ## Errors
    ///
    /// - `NoFrame`: nothing is selected
    /// - `InvalidArgument`: the frame has no such register
    /// - whatever the engine reports for the write itself
    pub fn write(&self, name: &str, value: u64) -> Result<()>
    {
        let name = name.trim_start_matches('$');
        let frame = self.debugger.session().selected_frame().ok_or(DebuggerError::NoFrame)?;
        if !frame.reg_write(name, value)? {
            return Err(DebuggerError::InvalidArgument(format!("no register named '{name}'")));
        }
        debug!(register = name, value = format_args!("{value:#x}"), "Register written");
        self.values.clear();
        self.bases.clear();
        Ok(())
    }

    /// General-purpose registers.
    pub fn gpr(&self) -> &'static [&'static str]
    {
        self.current().map_or(&[], |set| set.gpr)
    }

    /// Registers tracked across stops.
    pub fn common(&self) -> &'static [&'static str]
    {
        self.current().map_or(&[], |set| set.common.as_slice())
    }

    /// Frame-pointer register.
    pub fn frame(&self) -> Option<&'static str>
    {
        self.current().and_then(|set| set.frame)
    }

    /// Return-address registers.
    pub fn retaddr(&self) -> &'static [&'static str]
    {
        self.current().map_or(&[], |set| set.retaddr)
    }

    /// Flag registers and their layouts.
    pub fn flags(&self) -> &'static [(&'static str, BitFlags)]
    {
        self.current().map_or(&[], |set| set.flags)
    }

    /// Secondary flag registers.
    pub fn extra_flags(&self) -> &'static [(&'static str, BitFlags)]
    {
        self.current().map_or(&[], |set| set.extra_flags)
    }

    /// Stack-pointer register.
    pub fn stack(&self) -> Option<&'static str>
    {
        self.current().map(|set| set.stack)
    }

    /// Return-value register.
    pub fn retval(&self) -> Option<&'static str>
    {
        self.current().and_then(|set| set.retval)
    }

    /// pc, stack, frame, retaddr, flags, gpr, misc, in that order.
    ///
    /// This is a plain concatenation: a register listed in two groups is
    /// listed twice.
    pub fn all(&self) -> Vec<&'static str>
    {
        self.current().map(RegisterSet::all).unwrap_or_default()
    }

    /// Program counter.
    pub fn pc(&self) -> Option<u64>
    {
        self.get("pc")
    }

    /// Stack pointer.
    pub fn sp(&self) -> Option<u64>
    {
        self.get("sp")
    }

    /// Prefix every bare register name in `expression` with `$`.
    ///
    /// Only whole identifiers are rewritten: in `maxebx + ebx` the second
    /// token becomes `$ebx` and `maxebx` is left alone.
    pub fn fix(&self, expression: &str) -> String
    {
        match self.current() {
            Some(set) => fix_expression(expression, &set.all()),
            None => expression.to_string(),
        }
    }

    /// Every register of [`all`](Self::all) with its current value.
    pub fn items(&self) -> Vec<RegisterValue>
    {
        self.all().into_iter().map(|name| (name, self.lookup(name))).collect()
    }

    /// Snapshot taken at the most recent `Continue`/`Stop`.
    pub fn last(&self) -> Vec<RegisterValue>
    {
        self.snapshots.borrow().last.clone()
    }

    /// The snapshot before [`last`](Self::last).
    pub fn previous(&self) -> Vec<RegisterValue>
    {
        self.snapshots.borrow().previous.clone()
    }

    /// Common registers whose current value differs from
    /// [`previous`](Self::previous).
    pub fn changed(&self) -> SmallVec<[&'static str; 8]>
    {
        let previous = self.previous();
        previous
            .into_iter()
            .filter(|(name, value)| self.lookup(name) != *value)
            .map(|(name, _)| name)
            .collect()
    }

    /// Shift `last` into `previous` and snapshot the common registers.
    pub fn update_last(&self)
    {
        let snapshot: Vec<RegisterValue> = self
            .common()
            .iter()
            .map(|&name| (name, self.lookup(name)))
            .collect();
        trace!(registers = snapshot.len(), "Register snapshot");

        let mut snapshots = self.snapshots.borrow_mut();
        snapshots.previous = std::mem::replace(&mut snapshots.last, snapshot);
    }

    /// Drop both snapshots.
    pub fn reset(&self)
    {
        *self.snapshots.borrow_mut() = Snapshots::default();
    }

    /// Base of the `fs` segment (0 when it can't be determined).
    pub fn fsbase(&self) -> u64
    {
        self.segment_base(SegmentBase::Fs)
    }

    /// Base of the `gs` segment (0 when it can't be determined).
    pub fn gsbase(&self) -> u64
    {
        self.segment_base(SegmentBase::Gs)
    }

    fn segment_base(&self, which: SegmentBase) -> u64
    {
        let ptid = self
            .debugger
            .session()
            .selected_thread()
            .and_then(|thread| thread.ptid());
        self.bases
            .get_or_insert_with((ptid, which), || self.resolve_segment_base(which, ptid))
    }

    fn resolve_segment_base(&self, which: SegmentBase, ptid: Option<Ptid>) -> u64
    {
        let Some(arch) = self.arch() else {
            return 0;
        };
        if arch.name == ArchName::X86_64 {
            return self.get(which.register()).unwrap_or(0);
        }

        // A remote stub gives no way to ask the kernel
        let is_remote = self.debugger.inferior().map_or(true, |inferior| inferior.is_remote());
        if is_remote {
            return 0;
        }

        let Some(lwpid) = ptid.and_then(|ptid| ptid.lwpid()) else {
            return 0;
        };
        platform::read_segment_base(lwpid, which).map_or(0, |base| base & arch.ptrmask())
    }

    /// Base of the interrupt descriptor table, from the QEMU monitor.
    ///
    /// Only available for x86 QEMU system targets.
    pub fn idt(&self) -> Option<u64>
    {
        self.descriptors
            .get_or_insert_with("IDT", || self.read_descriptor().map(|(base, _)| base))
    }

    /// Limit of the interrupt descriptor table, from the QEMU monitor.
    pub fn idt_limit(&self) -> Option<u64>
    {
        self.descriptors
            .get_or_insert_with("IDT_LIMIT", || self.read_descriptor().map(|(_, limit)| limit))
    }

    fn read_descriptor(&self) -> Option<(u64, u64)>
    {
        let inferior = self.debugger.inferior().ok()?;
        if !inferior.is_qemu_kernel() {
            return None;
        }
        let arch = inferior.arch().ok()?;
        if !matches!(arch.name, ArchName::I386 | ArchName::X86_64) {
            return None;
        }
        inferior.selected_frame()?;
        let output = inferior.send_monitor("info registers").ok()?;
        parse_descriptor(&output, "IDT")
    }

    /// Thumb bit of the current Arm core, see [`arch::thumb_bit`].
    pub fn thumb_bit(&self) -> Option<u8>
    {
        let arch = self.arch()?;
        arch::thumb_bit(arch.name, |name| self.get(name))
    }

    /// `thumb`/`arm` for 32-bit Arm cores, `None` elsewhere.
    pub fn thumb_mode(&self) -> Option<ThumbMode>
    {
        arch::thumb_mode(self.thumb_bit())
    }
}

fn read_raw(frame: &dyn Frame, name: &str) -> Option<Box<dyn Value>>
{
    frame
        .read_register(name)
        .ok()
        .flatten()
        .or_else(|| frame.read_register(&name.to_uppercase()).ok().flatten())
}

/// Name of the unsigned C type used to normalise a register of `size` bytes.
pub fn unsigned_type_name(size: usize) -> &'static str
{
    match size {
        1 => "unsigned char",
        2 => "unsigned short",
        3 | 4 => "unsigned int",
        _ => "unsigned long long",
    }
}

/// Find `NAME=  <base> <limit>` in QEMU's `info registers` output.
pub fn parse_descriptor(output: &str, name: &str) -> Option<(u64, u64)>
{
    let marker = format!("{name}=");
    let start = output.find(&marker)? + marker.len();
    let mut fields = output[start..].split_whitespace();
    let base = u64::from_str_radix(fields.next()?, 16).ok()?;
    let limit = u64::from_str_radix(fields.next()?, 16).ok()?;
    Some((base, limit))
}

fn is_word_char(c: char) -> bool
{
    c.is_alphanumeric() || c == '_'
}

/// Rewrite whole-word occurrences of `registers` (and `sp`/`pc`) as
/// `$name`. Names already carrying a `$` are left as they are.
///
/// ```rust
/// use vantage_core::registers::fix_expression;
///
/// assert_eq!(fix_expression("eax + maxebx", &["eax", "ebx"]), "$eax + maxebx");
/// assert_eq!(fix_expression("*(sp+8)", &[]), "*($sp+8)");
/// ```
pub fn fix_expression(expression: &str, registers: &[&str]) -> String
{
    let is_register = |word: &str| word == "sp" || word == "pc" || registers.contains(&word);

    let mut fixed = String::with_capacity(expression.len() + 8);
    let mut rest = expression;
    while let Some(start) = rest.find(is_word_char) {
        let (before, tail) = rest.split_at(start);
        fixed.push_str(before);

        let end = tail.find(|c: char| !is_word_char(c)).unwrap_or(tail.len());
        let word = &tail[..end];
        if is_register(word) && !before.ends_with('$') {
            fixed.push('$');
        }
        fixed.push_str(word);
        rest = &tail[end..];
    }
    fixed.push_str(rest);
    fixed
}
