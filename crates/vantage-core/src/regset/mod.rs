//! # Register Set Catalog
//!
//! Declarative, per-architecture description of register names and their
//! roles: general-purpose registers, flag registers (with bit layouts), the
//! program counter, stack and frame pointers, the return-address chain and
//! the odds and ends that don't fit anywhere else.
//!
//! The catalog is pure data. Whether the live engine can actually resolve a
//! name is a separate question; a name the backend does not know simply
//! reads as absent through [`crate::registers::Registers`].

mod catalog;

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::arch::ArchName;

/// A named field of a flag register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flag
{
    /// Flag mnemonic (`"ZF"`, `"N"`, `"EL"`, ...)
    pub name: &'static str,
    /// Position of the least significant bit
    pub bit: u8,
    /// Field width in bits (1 for single-bit flags)
    pub width: u8,
}

impl Flag
{
    /// A single-bit flag.
    pub const fn bit(name: &'static str, bit: u8) -> Self
    {
        Self { name, bit, width: 1 }
    }

    /// A multi-bit field.
    pub const fn field(name: &'static str, bit: u8, width: u8) -> Self
    {
        Self { name, bit, width }
    }

    /// Extract this field from a register value.
    pub const fn extract(&self, value: u64) -> u64
    {
        let mask = if self.width >= 64 { u64::MAX } else { (1u64 << self.width) - 1 };
        (value >> self.bit) & mask
    }
}

/// Bit layout of one flag register
///
/// ```rust
/// use vantage_core::regset::{BitFlags, Flag};
///
/// const FLAGS: BitFlags = BitFlags::new(&[Flag::bit("Z", 30), Flag::field("EL", 2, 2)]);
/// let decoded = FLAGS.decode(0x4000_0008);
/// assert_eq!(decoded, vec![("Z", 1), ("EL", 2)]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitFlags(&'static [Flag]);

impl BitFlags
{
    /// A layout with no named fields (the register is tracked but not decoded).
    pub const EMPTY: BitFlags = BitFlags(&[]);

    /// Wrap a static flag table.
    pub const fn new(flags: &'static [Flag]) -> Self
    {
        Self(flags)
    }

    /// The fields, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &'static Flag>
    {
        self.0.iter()
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<Flag>
    {
        self.0.iter().copied().find(|flag| flag.name == name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize
    {
        self.0.len()
    }

    /// Whether the layout has no fields.
    pub fn is_empty(&self) -> bool
    {
        self.0.is_empty()
    }

    /// Value of every field in `value`, in declaration order.
    pub fn decode(&self, value: u64) -> Vec<(&'static str, u64)>
    {
        self.0.iter().map(|flag| (flag.name, flag.extract(value))).collect()
    }
}

/// Static description of one architecture's registers
///
/// `common` is derived at construction: the general-purpose registers, then
/// the frame pointer, stack pointer, program counter and flag registers, with
/// duplicates removed. It is the subset the register façade snapshots on
/// every stop for change tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterSet
{
    /// Program counter
    pub pc: &'static str,
    /// Stack pointer
    pub stack: &'static str,
    /// Frame pointer, where the ABI has a dedicated one
    pub frame: Option<&'static str>,
    /// Return-address chain (link registers), innermost first
    pub retaddr: &'static [&'static str],
    /// Flag registers and their layouts
    pub flags: &'static [(&'static str, BitFlags)],
    /// Secondary flag/status registers, kept apart from `flags`
    pub extra_flags: &'static [(&'static str, BitFlags)],
    /// General-purpose registers
    pub gpr: &'static [&'static str],
    /// Everything else worth showing (segment registers, sub-registers, ...)
    pub misc: &'static [&'static str],
    /// Argument registers of the default calling convention
    pub args: &'static [&'static str],
    /// Return-value register
    pub retval: Option<&'static str>,
    /// Registers tracked across stops
    pub common: Vec<&'static str>,
}

/// Compile-time form of a [`RegisterSet`] (everything except `common`).
#[derive(Debug, Clone, Copy)]
pub struct RegisterSetDef
{
    pub pc: &'static str,
    pub stack: &'static str,
    pub frame: Option<&'static str>,
    pub retaddr: &'static [&'static str],
    pub flags: &'static [(&'static str, BitFlags)],
    pub extra_flags: &'static [(&'static str, BitFlags)],
    pub gpr: &'static [&'static str],
    pub misc: &'static [&'static str],
    pub args: &'static [&'static str],
    pub retval: Option<&'static str>,
}

impl From<RegisterSetDef> for RegisterSet
{
    fn from(def: RegisterSetDef) -> Self
    {
        let mut common: Vec<&'static str> = Vec::new();
        let candidates = def
            .gpr
            .iter()
            .copied()
            .chain(def.frame)
            .chain([def.stack, def.pc])
            .chain(def.flags.iter().map(|(name, _)| *name));
        for name in candidates {
            if !common.contains(&name) {
                common.push(name);
            }
        }

        Self {
            pc: def.pc,
            stack: def.stack,
            frame: def.frame,
            retaddr: def.retaddr,
            flags: def.flags,
            extra_flags: def.extra_flags,
            gpr: def.gpr,
            misc: def.misc,
            args: def.args,
            retval: def.retval,
            common,
        }
    }
}

impl RegisterSet
{
    /// Layout of a flag register, searching `flags` then `extra_flags`.
    pub fn flag_layout(&self, register: &str) -> Option<BitFlags>
    {
        self.flags
            .iter()
            .chain(self.extra_flags)
            .find(|(name, _)| *name == register)
            .map(|(_, layout)| *layout)
    }

    /// The fixed-order enumeration: pc, stack, frame, retaddr, flag names,
    /// gpr, misc.
    ///
    /// This is a plain concatenation. A register listed in more than one
    /// group shows up more than once, and callers must tolerate that.
    pub fn all(&self) -> Vec<&'static str>
    {
        let mut names = vec![self.pc, self.stack];
        names.extend(self.frame);
        names.extend_from_slice(self.retaddr);
        names.extend(self.flags.iter().map(|(name, _)| *name));
        names.extend_from_slice(self.gpr);
        names.extend_from_slice(self.misc);
        names
    }

    /// Every distinct name the set mentions: common, retaddr, flags, extra
    /// flags, misc, args and retval, first occurrence wins.
    pub fn members(&self) -> Vec<&'static str>
    {
        let mut names: Vec<&'static str> = Vec::new();
        let candidates = self
            .common
            .iter()
            .copied()
            .chain(self.retaddr.iter().copied())
            .chain(self.flags.iter().map(|(name, _)| *name))
            .chain(self.extra_flags.iter().map(|(name, _)| *name))
            .chain(self.misc.iter().copied())
            .chain(self.args.iter().copied())
            .chain(self.retval);
        for name in candidates {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Whether `name` is mentioned anywhere in the set.
    pub fn contains(&self, name: &str) -> bool
    {
        self.members().contains(&name)
    }
}

static REGISTER_SETS: Lazy<HashMap<ArchName, RegisterSet>> = Lazy::new(|| {
    ArchName::ALL
        .iter()
        .map(|&arch| (arch, RegisterSet::from(catalog::definition_for(arch))))
        .collect()
});

/// The register set of `arch`.
///
/// Every supported architecture has one, so this never fails.
pub fn register_set(arch: ArchName) -> &'static RegisterSet
{
    &REGISTER_SETS[&arch]
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_common_is_gpr_then_frame_stack_pc_flags()
    {
        let set = register_set(ArchName::I386);
        assert_eq!(
            set.common,
            vec!["eax", "ebx", "ecx", "edx", "edi", "esi", "ebp", "esp", "eip", "eflags"]
        );
    }

    #[test]
    fn test_all_is_fixed_order_concatenation()
    {
        let set = register_set(ArchName::Aarch64);
        let all = set.all();
        assert_eq!(&all[..5], &["pc", "sp", "x29", "lr", "cpsr"]);
        assert_eq!(all[5], "x0");
        assert_eq!(all.last().copied(), set.misc.last().copied());
        assert_eq!(all.len(), 5 + set.gpr.len() + set.misc.len());
    }

    #[test]
    fn test_all_keeps_duplicates()
    {
        // PowerPC's stack pointer is r1, which is also a general-purpose
        // register; lr is both the return address and a misc register
        let all = register_set(ArchName::PowerPc).all();
        assert_eq!(all.iter().filter(|name| **name == "r1").count(), 2);
        assert_eq!(all.iter().filter(|name| **name == "lr").count(), 2);

        let all = register_set(ArchName::X86_64).all();
        assert_eq!(all.iter().filter(|name| **name == "rsp").count(), 1);
    }

    #[test]
    fn test_members_are_unique()
    {
        for arch in ArchName::ALL {
            let members = register_set(arch).members();
            let mut sorted = members.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), members.len(), "{arch}");
        }
    }

    #[test]
    fn test_every_architecture_has_pc_and_stack_in_common()
    {
        for arch in ArchName::ALL {
            let set = register_set(arch);
            assert!(set.common.contains(&set.pc), "{arch}");
            assert!(set.common.contains(&set.stack), "{arch}");
        }
    }

    #[test]
    fn test_flag_layout_lookup()
    {
        let set = register_set(ArchName::X86_64);
        let eflags = set.flag_layout("eflags").unwrap();
        assert_eq!(eflags.get("ZF"), Some(Flag::bit("ZF", 6)));
        assert!(set.flag_layout("rax").is_none());

        let aarch64 = register_set(ArchName::Aarch64);
        assert!(aarch64.flag_layout("fpsr").is_some());
    }

    #[test]
    fn test_decode_multi_bit_field()
    {
        let cpsr = register_set(ArchName::Aarch64).flag_layout("cpsr").unwrap();
        let decoded = cpsr.decode(0x6000_0005);
        assert!(decoded.contains(&("Z", 1)));
        assert!(decoded.contains(&("C", 1)));
        assert!(decoded.contains(&("N", 0)));
        assert!(decoded.contains(&("EL", 1)));
        assert!(decoded.contains(&("SP", 1)));
    }
}
