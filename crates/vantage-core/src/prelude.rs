//! Common module for library exports

pub use crate::arch::{Arch, ArchName, Endian, ThumbMode};
pub use crate::auxv::{Auxv, AuxvReader, AuxvValue};
pub use crate::config::{CoreConfig, SignalPolicy};
pub use crate::context::Context;
pub use crate::dbg::{
    CommandHandle, Debugger, EventHandler, EventType, Frame, HandlerId, Process, Session, Thread, Type, TypeCode,
    Value,
};
pub use crate::error::{DebuggerError, Result};
pub use crate::memory::{Memory, TypeRef};
pub use crate::registers::Registers;
pub use crate::regset::{register_set, BitFlags, Flag, RegisterSet};
pub use crate::types::{Address, MemoryPage, Permissions, Ptid};
