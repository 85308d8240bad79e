//! # Types
//!
//! Engine-agnostic value types used throughout the core.
//!
//! These types abstract away engine-specific details, allowing the register
//! façade and memory helpers to work with addresses, mappings and thread ids
//! without knowing whether GDB or LLDB produced them.

pub mod address;
pub mod memory;
pub mod thread;

// Re-export all public types
pub use address::Address;
pub use memory::{page_align, MemoryPage, Permissions, MMAP_MIN_ADDR, PAGE_SIZE};
pub use thread::Ptid;
