//! # GDB Backend
//!
//! Implements the [`crate::dbg`] traits on top of GDB's extension API, which
//! is reached through the [`GdbEngine`] trait.
//!
//! ## Selection
//!
//! GDB evaluates expressions and walks stacks relative to the selected
//! thread and frame. Operations on a specific [`GdbFrame`]/[`GdbThread`]
//! select it through a guard from [`guards`] and restore the user's selection
//! on every exit path, so callers never observe a selection change.
//!
//! ## Events
//!
//! The binding layer forwards GDB's notifications to [`Gdb::notify`], which
//! dispatches them to the handlers registered through
//! [`Debugger::register_event_handler`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::rc::Rc;
//!
//! use vantage_core::backend::gdb::{Gdb, GdbEngine};
//! use vantage_core::config::CoreConfig;
//! use vantage_core::dbg::{Debugger, EventType};
//!
//! # fn bindings() -> Rc<dyn GdbEngine> { unimplemented!() }
//! let gdb = Gdb::new(bindings(), CoreConfig::from_env());
//! gdb.setup()?;
//! gdb.notify(EventType::Stop);
//! # Ok::<(), vantage_core::error::DebuggerError>(())
//! ```

pub mod engine;
pub mod guards;
mod handles;

use std::cell::Cell;
use std::rc::{Rc, Weak};

pub use engine::{
    map_type_code, Connection, GdbEngine, NativeArch, NativeCommand, NativeField, NativeFrame, NativeInferior,
    NativeThread, NativeType, NativeValue,
};
pub use handles::{GdbCommandHandle, GdbFrame, GdbProcess, GdbSession, GdbThread, GdbType, GdbValue};
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::dbg::{
    format_address, CommandHandle, CommandHandler, Debugger, EventHandler, EventRegistry, EventType, HandlerId,
    Process, Session, Value,
};
use crate::error::{DebuggerError, Result};
use crate::platform::term;

/// Engine settings applied once by [`Debugger::setup`], before the
/// configurable parts.
const PRE_COMMANDS: &[&str] = &[
    "set confirm off",
    "set verbose off",
    "set pagination off",
    "set height 0",
    "set history save on",
    "set follow-fork-mode child",
    "set backtrace past-main on",
    "set step-mode on",
    "set print pretty on",
];

/// The GDB debugger
///
/// Construct with [`Gdb::new`]; the result is shared as `Rc<Gdb>` (or
/// `Rc<dyn Debugger>`).
pub struct Gdb
{
    engine: Rc<dyn GdbEngine>,
    config: CoreConfig,
    events: EventRegistry,
    setup_done: Cell<bool>,
    this: Weak<Gdb>,
}

impl Gdb
{
    /// Wrap a GDB binding.
    pub fn new(engine: Rc<dyn GdbEngine>, config: CoreConfig) -> Rc<Self>
    {
        Rc::new_cyclic(|this| Self {
            engine,
            config,
            events: EventRegistry::new(),
            setup_done: Cell::new(false),
            this: this.clone(),
        })
    }

    /// The underlying binding.
    pub fn engine(&self) -> &Rc<dyn GdbEngine>
    {
        &self.engine
    }

    /// Configuration this backend was created with.
    pub fn config(&self) -> &CoreConfig
    {
        &self.config
    }

    /// Deliver an engine notification to the registered handlers.
    pub fn notify(&self, event: EventType)
    {
        debug!(%event, "GDB event");
        self.events.dispatch(event);
    }

    /// Whether [`Debugger::setup`] has run.
    pub fn is_setup(&self) -> bool
    {
        self.setup_done.get()
    }

    fn setup_commands(&self) -> Vec<String>
    {
        let (_, columns) = term::window_size();
        let mut commands: Vec<String> = PRE_COMMANDS.iter().map(ToString::to_string).collect();
        commands.push(format!("set width {columns}"));
        commands.extend(self.config.signals.iter().map(|policy| format!("handle {policy}")));

        // GDB 9 and older mishandle the remote search-memory packet
        let (major, _) = self.engine.version();
        if major <= 9 {
            commands.push("set remote search-memory-packet off".to_string());
        }
        commands
    }

    fn apply_pending_resize(&self)
    {
        if !term::take_resize() {
            return;
        }
        let (_, columns) = term::window_size();
        if let Err(error) = self.engine.execute(&format!("set width {columns}"), false, true) {
            warn!(%error, "Failed to apply terminal width");
        }
    }
}

/// Parse the command-window geometry out of `info win`.
///
/// ```text
/// Name       Lines Columns Focus
/// src           77     104 (has focus)
/// cmd           77     105
/// ```
pub(crate) fn parse_cmd_window(output: &str) -> (Option<u32>, Option<u32>)
{
    let tokens: Vec<&str> = output.split_whitespace().collect();
    let Some(index) = tokens.iter().position(|token| *token == "cmd") else {
        // "The TUI is not active."
        return (None, None);
    };
    match (tokens.get(index + 1), tokens.get(index + 2)) {
        (Some(lines), Some(columns)) => (lines.parse().ok(), columns.parse().ok()),
        _ => (None, None),
    }
}

/// The OS ABI in effect according to `show osabi`.
///
/// ```text
/// The current OS ABI is "auto" (currently "GNU/Linux").
/// The default OS ABI is "GNU/Linux".
/// ```
pub(crate) fn current_osabi(output: &str) -> Option<&str>
{
    // Quoted parts sit at odd indices; the last one on the first line wins
    let line = output.lines().next()?;
    line.split('"').skip(1).step_by(2).last()
}

impl Debugger for Gdb
{
    fn setup(&self) -> Result<()>
    {
        if self.setup_done.replace(true) {
            debug!("GDB backend already set up");
            return Ok(());
        }

        for command in self.setup_commands() {
            self.engine.execute(&command, false, true)?;
        }

        // Not every GDB build has a disassembler that knows the flavor
        let flavor = format!("set disassembly-flavor {}", self.config.disassembly_flavor);
        if let Err(error) = self.engine.execute(&flavor, false, true) {
            debug!(%error, "Ignoring disassembly flavor failure");
        }

        term::install_resize_handler();
        let this = self.this.clone();
        let on_prompt: EventHandler = Rc::new(move |_| {
            if let Some(gdb) = this.upgrade() {
                gdb.apply_pending_resize();
            }
        });
        self.events.subscribe(&[EventType::Prompt], on_prompt);

        let (major, minor) = self.engine.version();
        info!(gdb = format_args!("{major}.{minor}"), "GDB backend configured");
        Ok(())
    }

    fn add_command(&self, name: &str, handler: CommandHandler) -> Result<Box<dyn CommandHandle>>
    {
        let this = self.this.clone();
        let invoke: NativeCommand = Box::new(move |arguments: &str, from_tty: bool| {
            let gdb = this
                .upgrade()
                .ok_or_else(|| DebuggerError::StaleHandle("debugger was dropped".to_string()))?;
            handler(gdb.as_ref(), arguments, from_tty)
        });
        self.engine.register_command(name, invoke)?;
        debug!(command = name, "Registered command");
        Ok(Box::new(GdbCommandHandle::new(name)))
    }

    fn session(&self) -> Box<dyn Session>
    {
        Box::new(GdbSession::new(self.engine.clone()))
    }

    fn inferior(&self) -> Result<Box<dyn Process>>
    {
        let inferior = self.engine.selected_inferior().ok_or(DebuggerError::NoProcess)?;
        Ok(Box::new(GdbProcess::new(self.engine.clone(), inferior)))
    }

    fn evaluate_expression(&self, expression: &str) -> Result<Box<dyn Value>>
    {
        let value = self.engine.parse_and_eval(expression, true)?;
        Ok(Box::new(GdbValue::new(self.engine.clone(), value)))
    }

    fn addrsz(&self, address: u64) -> String
    {
        let ptrsize = self
            .inferior()
            .and_then(|inferior| inferior.arch())
            .map_or(8, |arch| arch.ptrsize);
        format_address(address, ptrsize)
    }

    fn get_cmd_window_size(&self) -> (Option<u32>, Option<u32>)
    {
        match self.engine.execute("info win", false, true) {
            Ok(output) => parse_cmd_window(&output),
            // GDB built without TUI support: `Undefined info command: "win"`
            Err(_) => (None, None),
        }
    }

    fn set_diagnostics(&self, enabled: bool) -> Result<()>
    {
        let command = if enabled {
            "set python print-stack full"
        } else {
            "set python print-stack message"
        };
        self.engine.execute(command, true, true).map(|_| ())
    }

    fn register_event_handler(&self, events: &[EventType], handler: EventHandler) -> HandlerId
    {
        self.events.subscribe(events, handler)
    }

    fn remove_event_handler(&self, id: HandlerId) -> bool
    {
        self.events.unsubscribe(id)
    }
}
