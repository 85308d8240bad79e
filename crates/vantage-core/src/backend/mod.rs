//! # Engine Backends
//!
//! One module per supported debugger engine, each implementing the
//! [`crate::dbg`] traits with that engine's native API:
//!
//! - **gdb**: GDB's extension API (`gdb.Frame`, `gdb.Value`, `gdb.execute`, ...)
//!   - See: [GDB Python API](https://sourceware.org/gdb/current/onlinedocs/gdb.html/Python-API.html)

pub mod gdb;
