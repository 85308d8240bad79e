//! Register tables for every supported architecture.

use super::{BitFlags, Flag, RegisterSetDef};
use crate::arch::ArchName;

const X86_FLAGS: BitFlags = BitFlags::new(&[
    Flag::bit("CF", 0),
    Flag::bit("PF", 2),
    Flag::bit("AF", 4),
    Flag::bit("ZF", 6),
    Flag::bit("SF", 7),
    Flag::bit("IF", 9),
    Flag::bit("DF", 10),
    Flag::bit("OF", 11),
]);

const ARM_CPSR_FLAGS: BitFlags = BitFlags::new(&[
    Flag::bit("N", 31),
    Flag::bit("Z", 30),
    Flag::bit("C", 29),
    Flag::bit("V", 28),
    Flag::bit("Q", 27),
    Flag::bit("J", 24),
    Flag::bit("T", 5),
    Flag::bit("E", 9),
    Flag::bit("A", 8),
    Flag::bit("I", 7),
    Flag::bit("F", 6),
]);

const ARMCM_XPSR_FLAGS: BitFlags = BitFlags::new(&[
    Flag::bit("N", 31),
    Flag::bit("Z", 30),
    Flag::bit("C", 29),
    Flag::bit("V", 28),
    Flag::bit("Q", 27),
    Flag::bit("T", 24),
]);

const AARCH64_CPSR_FLAGS: BitFlags = BitFlags::new(&[
    Flag::bit("N", 31),
    Flag::bit("Z", 30),
    Flag::bit("C", 29),
    Flag::bit("V", 28),
    Flag::bit("Q", 27),
    Flag::bit("PAN", 22),
    Flag::bit("IL", 20),
    Flag::bit("D", 9),
    Flag::bit("A", 8),
    Flag::bit("I", 7),
    Flag::bit("F", 6),
    Flag::field("EL", 2, 2),
    Flag::bit("SP", 0),
]);

// cumulative floating-point exception bits
const AARCH64_FPSR_FLAGS: BitFlags = BitFlags::new(&[
    Flag::bit("QC", 27),
    Flag::bit("IDC", 7),
    Flag::bit("IXC", 4),
    Flag::bit("UFC", 3),
    Flag::bit("OFC", 2),
    Flag::bit("DZC", 1),
    Flag::bit("IOC", 0),
]);

const AMD64: RegisterSetDef = RegisterSetDef {
    pc: "rip",
    stack: "rsp",
    frame: Some("rbp"),
    retaddr: &[],
    flags: &[("eflags", X86_FLAGS)],
    extra_flags: &[],
    gpr: &[
        "rax", "rbx", "rcx", "rdx", "rdi", "rsi", "r8", "r9", "r10", "r11", "r12", "r13", "r14", "r15",
    ],
    misc: &[
        "cs", "ss", "ds", "es", "fs", "gs", "fs_base", "gs_base", "ax", "ah", "al", "bx", "bh", "bl", "cx", "ch", "cl",
        "dx", "dh", "dl", "dil", "sil", "spl", "bpl", "di", "si", "bp", "sp", "ip",
    ],
    args: &["rdi", "rsi", "rdx", "rcx", "r8", "r9"],
    retval: Some("rax"),
};

const I386: RegisterSetDef = RegisterSetDef {
    pc: "eip",
    stack: "esp",
    frame: Some("ebp"),
    retaddr: &[],
    flags: &[("eflags", X86_FLAGS)],
    extra_flags: &[],
    gpr: &["eax", "ebx", "ecx", "edx", "edi", "esi"],
    misc: &[
        "cs", "ss", "ds", "es", "fs", "gs", "fsbase", "gsbase", "ax", "ah", "al", "bx", "bh", "bl", "cx", "ch", "cl",
        "dx", "dh", "dl", "di", "si", "bp", "sp", "ip",
    ],
    args: &[],
    retval: Some("eax"),
};

const I8086: RegisterSetDef = RegisterSetDef {
    pc: "ip",
    stack: "sp",
    frame: Some("bp"),
    retaddr: &[],
    flags: &[("flags", X86_FLAGS)],
    extra_flags: &[],
    gpr: &["ax", "bx", "cx", "dx", "si", "di"],
    misc: &["cs", "ss", "ds", "es"],
    args: &[],
    retval: Some("ax"),
};

const ARM: RegisterSetDef = RegisterSetDef {
    pc: "pc",
    stack: "sp",
    frame: None,
    retaddr: &["lr"],
    flags: &[("cpsr", ARM_CPSR_FLAGS)],
    extra_flags: &[],
    gpr: &[
        "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12",
    ],
    misc: &[],
    args: &["r0", "r1", "r2", "r3"],
    retval: Some("r0"),
};

const ARMCM: RegisterSetDef = RegisterSetDef {
    pc: "pc",
    stack: "sp",
    frame: None,
    retaddr: &["lr"],
    flags: &[("xpsr", ARMCM_XPSR_FLAGS)],
    extra_flags: &[],
    gpr: &[
        "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12",
    ],
    misc: &["msp", "psp", "primask", "basepri", "faultmask", "control"],
    args: &["r0", "r1", "r2", "r3"],
    retval: Some("r0"),
};

const AARCH64: RegisterSetDef = RegisterSetDef {
    pc: "pc",
    stack: "sp",
    frame: Some("x29"),
    retaddr: &["lr"],
    flags: &[("cpsr", AARCH64_CPSR_FLAGS)],
    extra_flags: &[("fpsr", AARCH64_FPSR_FLAGS)],
    gpr: &[
        "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12", "x13", "x14", "x15", "x16",
        "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24", "x25", "x26", "x27", "x28",
    ],
    misc: &["fpcr", "tpidr_el0"],
    args: &["x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7"],
    retval: Some("x0"),
};

const MIPS: RegisterSetDef = RegisterSetDef {
    pc: "pc",
    stack: "sp",
    frame: Some("fp"),
    retaddr: &["ra"],
    flags: &[],
    extra_flags: &[],
    gpr: &[
        "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8", "t9", "s0", "s1",
        "s2", "s3", "s4", "s5", "s6", "s7",
    ],
    misc: &["gp", "at", "hi", "lo"],
    args: &["a0", "a1", "a2", "a3"],
    retval: Some("v0"),
};

const POWERPC: RegisterSetDef = RegisterSetDef {
    pc: "pc",
    stack: "r1",
    frame: None,
    retaddr: &["lr"],
    flags: &[("msr", BitFlags::EMPTY), ("xer", BitFlags::EMPTY)],
    extra_flags: &[],
    gpr: &[
        "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "r13", "r14", "r15", "r16",
        "r17", "r18", "r19", "r20", "r21", "r22", "r23", "r24", "r25", "r26", "r27", "r28", "r29", "r30", "r31",
    ],
    misc: &["cr", "lr", "ctr"],
    args: &["r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10"],
    retval: Some("r3"),
};

const SPARC: RegisterSetDef = RegisterSetDef {
    pc: "pc",
    stack: "sp",
    frame: Some("fp"),
    retaddr: &["i7"],
    flags: &[("psr", BitFlags::EMPTY)],
    extra_flags: &[],
    gpr: &[
        "g1", "g2", "g3", "g4", "g5", "g6", "g7", "o0", "o1", "o2", "o3", "o4", "o5", "o7", "l0", "l1", "l2", "l3",
        "l4", "l5", "l6", "l7", "i0", "i1", "i2", "i3", "i4", "i5",
    ],
    misc: &["g0", "npc", "y"],
    args: &["o0", "o1", "o2", "o3", "o4", "o5"],
    retval: Some("o0"),
};

const RISCV: RegisterSetDef = RegisterSetDef {
    pc: "pc",
    stack: "sp",
    frame: None,
    retaddr: &["ra"],
    flags: &[],
    extra_flags: &[],
    gpr: &[
        "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "s2", "s3", "s4",
        "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4", "t5", "t6",
    ],
    misc: &[],
    args: &["a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7"],
    retval: Some("a0"),
};

pub(super) const fn definition_for(arch: ArchName) -> RegisterSetDef
{
    match arch {
        ArchName::X86_64 => AMD64,
        ArchName::I386 => I386,
        ArchName::I8086 => I8086,
        ArchName::Aarch64 => AARCH64,
        ArchName::Mips => MIPS,
        ArchName::PowerPc => POWERPC,
        ArchName::Sparc => SPARC,
        ArchName::Arm => ARM,
        ArchName::ArmCm => ARMCM,
        ArchName::RiscvRv32 | ArchName::RiscvRv64 | ArchName::Riscv => RISCV,
    }
}
