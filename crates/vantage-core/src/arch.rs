//! # Architecture Model
//!
//! Static per-architecture metadata and the registry of supported
//! architecture identifiers.
//!
//! There is deliberately no process-wide "current architecture" value.
//! [`current`] asks the selected inferior every time, so switching inferiors
//! (or attaching to a different target) can never leave a stale descriptor
//! behind.
//!
//! ## Thumb mode
//!
//! 32-bit Arm cores can execute either A32 ("arm") or T32 ("thumb")
//! instructions. The mode lives in a status-register bit:
//!
//! - **arm**: bit 5 of `cpsr`
//! - **armcm** (Cortex-M): bit 24 of `xpsr` (always 1 on real hardware, the
//!   profile only supports Thumb)
//! - everything else, AArch64 included: the concept does not apply

use std::fmt;
use std::str::FromStr;

use crate::dbg::Debugger;
use crate::error::{DebuggerError, Result};

/// Identifier of a supported architecture
///
/// The string forms match the names debugger engines use
/// (`"x86-64"`, `"aarch64"`, `"riscv:rv64"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArchName
{
    /// 64-bit x86
    X86_64,
    /// 32-bit x86
    I386,
    /// 16-bit real-mode x86
    I8086,
    /// 64-bit Arm
    Aarch64,
    /// MIPS (32 or 64 bit)
    Mips,
    /// PowerPC
    PowerPc,
    /// SPARC
    Sparc,
    /// 32-bit Arm (A/R profiles)
    Arm,
    /// 32-bit Arm Cortex-M (M profile)
    ArmCm,
    /// RISC-V, 32-bit
    RiscvRv32,
    /// RISC-V, 64-bit
    RiscvRv64,
    /// RISC-V, width not reported by the engine
    Riscv,
}

impl ArchName
{
    /// Every supported architecture, in registry order.
    pub const ALL: [ArchName; 12] = [
        ArchName::X86_64,
        ArchName::I386,
        ArchName::I8086,
        ArchName::Aarch64,
        ArchName::Mips,
        ArchName::PowerPc,
        ArchName::Sparc,
        ArchName::Arm,
        ArchName::ArmCm,
        ArchName::RiscvRv32,
        ArchName::RiscvRv64,
        ArchName::Riscv,
    ];

    /// Engine-facing name of the architecture.
    pub const fn as_str(self) -> &'static str
    {
        match self {
            ArchName::X86_64 => "x86-64",
            ArchName::I386 => "i386",
            ArchName::I8086 => "i8086",
            ArchName::Aarch64 => "aarch64",
            ArchName::Mips => "mips",
            ArchName::PowerPc => "powerpc",
            ArchName::Sparc => "sparc",
            ArchName::Arm => "arm",
            ArchName::ArmCm => "armcm",
            ArchName::RiscvRv32 => "riscv:rv32",
            ArchName::RiscvRv64 => "riscv:rv64",
            ArchName::Riscv => "riscv",
        }
    }

    /// Pointer size implied by the name alone.
    ///
    /// `None` for families that come in both widths (MIPS, PowerPC, SPARC,
    /// unqualified RISC-V); only the live inferior knows those.
    pub const fn fixed_ptrsize(self) -> Option<usize>
    {
        match self {
            ArchName::X86_64 | ArchName::Aarch64 | ArchName::RiscvRv64 => Some(8),
            ArchName::I386 | ArchName::Arm | ArchName::ArmCm | ArchName::RiscvRv32 => Some(4),
            ArchName::I8086 => Some(2),
            ArchName::Mips | ArchName::PowerPc | ArchName::Sparc | ArchName::Riscv => None,
        }
    }

    /// Whether this is one of the x86 family members.
    pub const fn is_x86(self) -> bool
    {
        matches!(self, ArchName::X86_64 | ArchName::I386 | ArchName::I8086)
    }

    /// Map an engine's own architecture string onto the registry.
    ///
    /// GDB reports BFD names such as `i386:x86-64`, `armv7e-m`,
    /// `mips:isa64r2` or `powerpc:common64`; every registry name is accepted
    /// as well.
    ///
    /// ```rust
    /// use vantage_core::arch::ArchName;
    ///
    /// assert_eq!(ArchName::from_engine_name("i386:x86-64").unwrap(), ArchName::X86_64);
    /// assert_eq!(ArchName::from_engine_name("armv7e-m").unwrap(), ArchName::ArmCm);
    /// assert_eq!(ArchName::from_engine_name("armv7").unwrap(), ArchName::Arm);
    /// ```
    pub fn from_engine_name(engine_name: &str) -> Result<Self>
    {
        let name = engine_name.trim().to_ascii_lowercase();
        if let Ok(arch) = name.parse::<ArchName>() {
            return Ok(arch);
        }

        let arch = if name.starts_with("i386:x86-64") || name == "x86_64" {
            ArchName::X86_64
        } else if name.starts_with("i386") {
            ArchName::I386
        } else if name.starts_with("i8086") {
            ArchName::I8086
        } else if name.starts_with("aarch64") {
            ArchName::Aarch64
        } else if name.starts_with("arm") && name.contains("-m") {
            ArchName::ArmCm
        } else if name.starts_with("arm") {
            ArchName::Arm
        } else if name.starts_with("mips") {
            ArchName::Mips
        } else if name.starts_with("powerpc") || name.starts_with("rs6000") {
            ArchName::PowerPc
        } else if name.starts_with("sparc") {
            ArchName::Sparc
        } else if name.starts_with("riscv") {
            ArchName::Riscv
        } else {
            return Err(DebuggerError::UnknownArchitecture(engine_name.to_string()));
        };
        Ok(arch)
    }
}

impl fmt::Display for ArchName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchName
{
    type Err = DebuggerError;

    fn from_str(s: &str) -> Result<Self>
    {
        ArchName::ALL
            .iter()
            .copied()
            .find(|arch| arch.as_str() == s)
            .ok_or_else(|| DebuggerError::UnknownArchitecture(s.to_string()))
    }
}

/// Byte order of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian
{
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl fmt::Display for Endian
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Endian::Little => f.write_str("little"),
            Endian::Big => f.write_str("big"),
        }
    }
}

/// Architecture descriptor of a live inferior
///
/// Immutable once resolved. Obtain a fresh one through [`current`] (or
/// [`crate::dbg::Process::arch`]) whenever the selected inferior may have
/// changed.
///
/// ## Example
///
/// ```rust
/// use vantage_core::arch::{Arch, ArchName, Endian};
///
/// let arch = Arch::new(ArchName::I386, 4, Endian::Little);
/// assert_eq!(arch.ptrmask(), 0xffff_ffff);
/// assert_eq!(arch.unpack(&[0x78, 0x56, 0x34, 0x12]), Some(0x1234_5678));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arch
{
    /// Which architecture this is
    pub name: ArchName,
    /// Pointer size in bytes (2, 4 or 8)
    pub ptrsize: usize,
    /// Byte order
    pub endian: Endian,
}

impl Arch
{
    /// Create a descriptor.
    pub const fn new(name: ArchName, ptrsize: usize, endian: Endian) -> Self
    {
        Self { name, ptrsize, endian }
    }

    /// Pointer width in bits.
    pub const fn ptrbits(&self) -> u32
    {
        (self.ptrsize * 8) as u32
    }

    /// Mask covering the target's address space (`(1 << ptrbits) - 1`).
    pub const fn ptrmask(&self) -> u64
    {
        if self.ptrsize >= 8 {
            u64::MAX
        } else {
            (1u64 << (self.ptrsize * 8)) - 1
        }
    }

    /// Encode a pointer-width integer in target byte order.
    ///
    /// The value is masked to the pointer width first.
    pub fn pack(&self, value: u64) -> Vec<u8>
    {
        let value = value & self.ptrmask();
        let size = self.ptrsize.min(8);
        match self.endian {
            Endian::Little => value.to_le_bytes()[..size].to_vec(),
            Endian::Big => value.to_be_bytes()[8 - size..].to_vec(),
        }
    }

    /// Decode up to eight bytes in target byte order.
    ///
    /// Returns `None` for an empty slice or one longer than eight bytes.
    pub fn unpack(&self, bytes: &[u8]) -> Option<u64>
    {
        decode_uint(bytes, self.endian)
    }
}

impl fmt::Display for Arch
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} ({}-bit, {} endian)", self.name, self.ptrbits(), self.endian)
    }
}

/// Decode an unsigned integer of 1..=8 bytes in the given byte order.
pub fn decode_uint(bytes: &[u8], endian: Endian) -> Option<u64>
{
    if bytes.is_empty() || bytes.len() > 8 {
        return None;
    }

    let mut buffer = [0u8; 8];
    Some(match endian {
        Endian::Little => {
            buffer[..bytes.len()].copy_from_slice(bytes);
            u64::from_le_bytes(buffer)
        }
        Endian::Big => {
            buffer[8 - bytes.len()..].copy_from_slice(bytes);
            u64::from_be_bytes(buffer)
        }
    })
}

/// Resolve the architecture of the currently selected inferior.
///
/// Nothing is cached: every call re-queries the engine.
///
/// ## Errors
///
/// - `NoProcess`: there is no selected inferior
/// - `UnknownArchitecture`: the engine reports an architecture outside the registry
pub fn current(debugger: &dyn Debugger) -> Result<Arch>
{
    debugger.inferior()?.arch()
}

/// Instruction-set mode of a 32-bit Arm core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbMode
{
    /// A32 instructions
    Arm,
    /// T32 instructions
    Thumb,
}

impl ThumbMode
{
    /// `"arm"` or `"thumb"`.
    pub const fn as_str(self) -> &'static str
    {
        match self {
            ThumbMode::Arm => "arm",
            ThumbMode::Thumb => "thumb",
        }
    }
}

impl fmt::Display for ThumbMode
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

/// Extract the Thumb bit for `arch`.
///
/// `read_register` resolves a register name to its current value (or `None`
/// when it is unreadable). Returns `None` when the bit does not apply to the
/// architecture, or when the status register can't be read yet (right after
/// the process starts, `cpsr` is often unavailable).
///
/// ```rust
/// use vantage_core::arch::{thumb_bit, ArchName};
///
/// assert_eq!(thumb_bit(ArchName::Arm, |_| Some(0x6000_0030)), Some(1));
/// assert_eq!(thumb_bit(ArchName::Arm, |_| None), None);
/// assert_eq!(thumb_bit(ArchName::Aarch64, |_| Some(u64::MAX)), None);
/// ```
pub fn thumb_bit(arch: ArchName, read_register: impl Fn(&str) -> Option<u64>) -> Option<u8>
{
    match arch {
        ArchName::Arm => read_register("cpsr").map(|cpsr| ((cpsr >> 5) & 1) as u8),
        ArchName::ArmCm => read_register("xpsr").map(|xpsr| ((xpsr >> 24) & 1) as u8),
        _ => None,
    }
}

/// Map a Thumb bit to the instruction-set mode.
pub fn thumb_mode(bit: Option<u8>) -> Option<ThumbMode>
{
    bit.map(|bit| if bit == 1 { ThumbMode::Thumb } else { ThumbMode::Arm })
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_arch_name_round_trip()
    {
        for arch in ArchName::ALL {
            assert_eq!(arch.as_str().parse::<ArchName>().unwrap(), arch);
        }
        assert!("vax".parse::<ArchName>().is_err());
    }

    #[test]
    fn test_engine_names()
    {
        let cases = [
            ("i386:x86-64", ArchName::X86_64),
            ("i386:x86-64:intel", ArchName::X86_64),
            ("i386", ArchName::I386),
            ("i386:intel", ArchName::I386),
            ("i8086", ArchName::I8086),
            ("aarch64", ArchName::Aarch64),
            ("armv8.1-m.main", ArchName::ArmCm),
            ("arm", ArchName::Arm),
            ("mips:isa64r2", ArchName::Mips),
            ("powerpc:common64", ArchName::PowerPc),
            ("sparc:v9", ArchName::Sparc),
            ("riscv:rv64", ArchName::RiscvRv64),
            ("riscv", ArchName::Riscv),
        ];
        for (engine_name, expected) in cases {
            assert_eq!(ArchName::from_engine_name(engine_name).unwrap(), expected, "{engine_name}");
        }
        assert!(matches!(
            ArchName::from_engine_name("m68k"),
            Err(DebuggerError::UnknownArchitecture(_))
        ));
    }

    #[test]
    fn test_fixed_ptrsize()
    {
        assert_eq!(ArchName::X86_64.fixed_ptrsize(), Some(8));
        assert_eq!(ArchName::ArmCm.fixed_ptrsize(), Some(4));
        assert_eq!(ArchName::Mips.fixed_ptrsize(), None);
    }

    #[test]
    fn test_ptrmask_by_width()
    {
        assert_eq!(Arch::new(ArchName::I8086, 2, Endian::Little).ptrmask(), 0xffff);
        assert_eq!(Arch::new(ArchName::Arm, 4, Endian::Little).ptrmask(), 0xffff_ffff);
        assert_eq!(Arch::new(ArchName::X86_64, 8, Endian::Little).ptrmask(), u64::MAX);
    }

    #[test]
    fn test_pack_respects_endianness()
    {
        let le = Arch::new(ArchName::I386, 4, Endian::Little);
        let be = Arch::new(ArchName::Mips, 4, Endian::Big);

        assert_eq!(le.pack(0x1122_3344), vec![0x44, 0x33, 0x22, 0x11]);
        assert_eq!(be.pack(0x1122_3344), vec![0x11, 0x22, 0x33, 0x44]);
        assert_eq!(be.unpack(&[0x11, 0x22, 0x33, 0x44]), Some(0x1122_3344));
        // masked to pointer width
        assert_eq!(le.pack(0xdead_0000_0000_0001), vec![0x01, 0, 0, 0]);
    }

    #[test]
    fn test_decode_uint_rejects_bad_lengths()
    {
        assert_eq!(decode_uint(&[], Endian::Little), None);
        assert_eq!(decode_uint(&[0; 9], Endian::Little), None);
        assert_eq!(decode_uint(&[0xff], Endian::Big), Some(0xff));
    }

    #[test]
    fn test_thumb_bit_arm_reads_bit_five()
    {
        assert_eq!(thumb_bit(ArchName::Arm, |_| Some(1 << 5)), Some(1));
        assert_eq!(thumb_bit(ArchName::Arm, |_| Some(!(1u64 << 5))), Some(0));
        assert_eq!(thumb_bit(ArchName::Arm, |_| None), None);
    }

    #[test]
    fn test_thumb_bit_cortex_m_reads_bit_twenty_four()
    {
        assert_eq!(thumb_bit(ArchName::ArmCm, |name| (name == "xpsr").then_some(1 << 24)), Some(1));
        assert_eq!(thumb_bit(ArchName::ArmCm, |_| Some(1 << 5)), Some(0));
    }

    #[test]
    fn test_thumb_bit_not_applicable_elsewhere()
    {
        for arch in ArchName::ALL {
            if matches!(arch, ArchName::Arm | ArchName::ArmCm) {
                continue;
            }
            assert_eq!(thumb_bit(arch, |_| Some(u64::MAX)), None, "{arch}");
        }
    }

    #[test]
    fn test_thumb_mode_strings()
    {
        assert_eq!(thumb_mode(Some(1)).map(ThumbMode::as_str), Some("thumb"));
        assert_eq!(thumb_mode(Some(0)).map(ThumbMode::as_str), Some("arm"));
        assert_eq!(thumb_mode(None), None);
    }
}
