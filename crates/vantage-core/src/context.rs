//! # Debugging Context
//!
//! Binds a [`Debugger`] to the register façade, the memory helpers and the
//! auxiliary-vector reader, and wires them to the debugger's events:
//!
//! - every event clears the caches subscribed to it
//! - `Continue` and `Stop` take a register snapshot for change tracking
//!
//! Dropping the context (or calling [`Context::detach`]) removes both
//! subscriptions.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::rc::Rc;
//!
//! use vantage_core::config::CoreConfig;
//! use vantage_core::context::Context;
//! use vantage_core::dbg::Debugger;
//!
//! # fn debugger() -> Rc<dyn Debugger> { unimplemented!() }
//! let context = Context::attach(debugger(), CoreConfig::from_env())?;
//!
//! if let Some(pc) = context.registers().pc() {
//!     println!("pc = {}", context.debugger().addrsz(pc));
//! }
//! println!("changed: {:?}", context.registers().changed());
//! # Ok::<(), vantage_core::error::DebuggerError>(())
//! ```

use std::rc::Rc;

use tracing::{debug, info};

use crate::auxv::AuxvReader;
use crate::cache::CacheRegistry;
use crate::config::CoreConfig;
use crate::dbg::{Debugger, EventHandler, EventType, HandlerId};
use crate::error::Result;
use crate::memory::Memory;
use crate::registers::Registers;

/// A debugger together with its register and memory views
pub struct Context
{
    debugger: Rc<dyn Debugger>,
    config: CoreConfig,
    caches: Rc<CacheRegistry>,
    registers: Rc<Registers>,
    memory: Rc<Memory>,
    auxv: AuxvReader,
    handlers: Vec<HandlerId>,
}

impl Context
{
    /// Run the debugger's one-time setup and subscribe to its events.
    ///
    /// ## Errors
    ///
    /// Whatever [`Debugger::setup`] reports.
    pub fn attach(debugger: Rc<dyn Debugger>, config: CoreConfig) -> Result<Self>
    {
        debugger.setup()?;

        let caches = Rc::new(CacheRegistry::new());
        let registers = Rc::new(Registers::new(debugger.clone(), &caches));
        let memory = Rc::new(Memory::new(debugger.clone(), &caches, &config));
        let auxv = AuxvReader::new(debugger.clone(), registers.clone(), memory.clone(), &caches);

        // Caches go first so the snapshot below reads live values
        let registry = caches.clone();
        let invalidate: EventHandler = Rc::new(move |event| registry.on_event(event));
        let mut handlers = vec![debugger.register_event_handler(&EventType::ALL, invalidate)];

        let weak = Rc::downgrade(&registers);
        let snapshot: EventHandler = Rc::new(move |_| {
            if let Some(registers) = weak.upgrade() {
                registers.update_last();
            }
        });
        handlers.push(debugger.register_event_handler(&[EventType::Continue, EventType::Stop], snapshot));

        info!(caches = caches.len(), "Context attached");
        Ok(Self {
            debugger,
            config,
            caches,
            registers,
            memory,
            auxv,
            handlers,
        })
    }

    /// The underlying debugger.
    pub fn debugger(&self) -> &Rc<dyn Debugger>
    {
        &self.debugger
    }

    /// Configuration in effect.
    pub fn config(&self) -> &CoreConfig
    {
        &self.config
    }

    /// Register façade.
    pub fn registers(&self) -> &Registers
    {
        &self.registers
    }

    /// Memory helpers.
    pub fn memory(&self) -> &Memory
    {
        &self.memory
    }

    /// Auxiliary vector of the inferior.
    pub fn auxv(&self) -> &AuxvReader
    {
        &self.auxv
    }

    /// Clear every cache now, whatever the events say.
    pub fn invalidate(&self)
    {
        self.caches.clear_all();
    }

    /// Unsubscribe from the debugger and drop all cached state.
    pub fn detach(self)
    {
        drop(self);
    }
}

impl Drop for Context
{
    fn drop(&mut self)
    {
        for id in self.handlers.drain(..) {
            self.debugger.remove_event_handler(id);
        }
        self.caches.clear_all();
        debug!("Context detached");
    }
}
