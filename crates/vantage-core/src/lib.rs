//! # vantage-core
//!
//! Debugger-agnostic core for writing debugger extensions.
//!
//! Extension code talks to a small set of traits ([`dbg::Debugger`],
//! [`dbg::Process`], [`dbg::Thread`], [`dbg::Frame`], [`dbg::Value`],
//! [`dbg::Type`]) and never to an engine directly. On top of them this crate
//! provides:
//! - An architecture model with pointer width, endianness and the Arm Thumb
//!   bit ([`arch`])
//! - A per-architecture register catalog ([`regset`])
//! - A cached register façade with change tracking ([`registers`])
//! - Typed memory reads, string reads, probing and mapping-boundary search
//!   ([`memory`])
//! - The ELF auxiliary vector, from the engine or recovered from the stack
//!   ([`auxv`])
//!
//! ## Backends
//!
//! - **GDB**: [`backend::gdb`], over the extension API exposed by the
//!   [`backend::gdb::GdbEngine`] binding trait
//!
//! ## Why unsafe code is needed
//!
//! Two things are read straight from the host kernel rather than through the
//! debugger: the terminal size (`ioctl(TIOCGWINSZ)`) and, for local i386
//! targets, the `fs`/`gs` segment bases (`ptrace(PTRACE_ARCH_PRCTL)`). Both
//! calls live in [`platform`] behind safe wrappers.

#![allow(unsafe_code)] // ioctl and ptrace in platform/

pub mod arch;
pub mod auxv;
pub mod backend;
pub mod cache;
pub mod config;
pub mod context;
pub mod dbg;
pub mod error;
pub mod memory;
pub mod platform;
pub mod prelude;
pub mod registers;
pub mod regset;
pub mod types;

pub use arch::{Arch, ArchName, Endian};
pub use context::Context;
pub use error::{DebuggerError, Result};
pub use memory::Memory;
pub use registers::Registers;
