//! Debugger lifecycle events and the handler registry.
//!
//! Engine bindings forward their native notifications (GDB's `events.stop`,
//! `events.cont`, `before_prompt`, ...) as [`EventType`] values. Subscribers
//! register one callback for a list of event kinds and are run synchronously,
//! in registration order, on the engine's command thread.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

/// Kind of lifecycle event delivered by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType
{
    /// A new inferior started running
    Start,
    /// The inferior halted (breakpoint, signal, step completion)
    Stop,
    /// The inferior is about to resume
    Continue,
    /// The inferior exited
    Exit,
    /// Target memory was modified from the debugger
    MemoryChanged,
    /// A register was modified from the debugger
    RegisterChanged,
    /// A new object file was loaded
    NewModule,
    /// Interactive control is about to return to the user
    Prompt,
}

impl EventType
{
    /// Every event kind.
    pub const ALL: [EventType; 8] = [
        EventType::Start,
        EventType::Stop,
        EventType::Continue,
        EventType::Exit,
        EventType::MemoryChanged,
        EventType::RegisterChanged,
        EventType::NewModule,
        EventType::Prompt,
    ];
}

impl fmt::Display for EventType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            EventType::Start => "start",
            EventType::Stop => "stop",
            EventType::Continue => "continue",
            EventType::Exit => "exit",
            EventType::MemoryChanged => "memory-changed",
            EventType::RegisterChanged => "register-changed",
            EventType::NewModule => "new-module",
            EventType::Prompt => "prompt",
        };
        f.write_str(name)
    }
}

/// Callback invoked for a subscribed event.
pub type EventHandler = Rc<dyn Fn(EventType)>;

/// Identifier returned by [`EventRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId
{
    /// Raw numeric id.
    pub const fn raw(self) -> u64
    {
        self.0
    }
}

struct Subscription
{
    id: HandlerId,
    events: Vec<EventType>,
    handler: EventHandler,
}

/// Ordered, single-threaded event dispatcher
///
/// Dispatch never re-enters: an event raised by a handler while another
/// event is being delivered is queued and delivered once the current one has
/// reached every subscriber. This keeps snapshot handlers from observing a
/// half-updated state.
///
/// ## Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use vantage_core::dbg::{EventRegistry, EventType};
///
/// let registry = EventRegistry::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// registry.subscribe(&[EventType::Stop], Rc::new(move |event| sink.borrow_mut().push(event)));
///
/// registry.dispatch(EventType::Continue);
/// registry.dispatch(EventType::Stop);
/// assert_eq!(*seen.borrow(), vec![EventType::Stop]);
/// ```
#[derive(Default)]
pub struct EventRegistry
{
    subscriptions: RefCell<Vec<Subscription>>,
    next_id: Cell<u64>,
    pending: RefCell<VecDeque<EventType>>,
    dispatching: Cell<bool>,
}

impl EventRegistry
{
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Subscribe `handler` to every kind in `events`.
    pub fn subscribe(&self, events: &[EventType], handler: EventHandler) -> HandlerId
    {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscriptions.borrow_mut().push(Subscription {
            id,
            events: events.to_vec(),
            handler,
        });
        debug!(handler = id.0, ?events, "Subscribed event handler");
        id
    }

    /// Remove a subscription. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: HandlerId) -> bool
    {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != id);
        before != subscriptions.len()
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize
    {
        self.subscriptions.borrow().len()
    }

    /// Whether there are no subscriptions.
    pub fn is_empty(&self) -> bool
    {
        self.subscriptions.borrow().is_empty()
    }

    /// Deliver `event` to its subscribers.
    ///
    /// Called from inside a handler, the event is queued and delivered after
    /// the current dispatch completes.
    pub fn dispatch(&self, event: EventType)
    {
        self.pending.borrow_mut().push_back(event);
        if self.dispatching.get() {
            trace!(%event, "Queued re-entrant event");
            return;
        }

        let _guard = DispatchGuard::enter(&self.dispatching);
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };

            // Snapshot the targets so handlers may subscribe or unsubscribe
            // while the event is being delivered.
            let targets: Vec<EventHandler> = self
                .subscriptions
                .borrow()
                .iter()
                .filter(|subscription| subscription.events.contains(&event))
                .map(|subscription| subscription.handler.clone())
                .collect();

            trace!(%event, handlers = targets.len(), "Dispatching event");
            for handler in targets {
                handler(event);
            }
        }
    }
}

/// Clears the dispatching flag even if a handler panics.
struct DispatchGuard<'a>
{
    flag: &'a Cell<bool>,
}

impl<'a> DispatchGuard<'a>
{
    fn enter(flag: &'a Cell<bool>) -> Self
    {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for DispatchGuard<'_>
{
    fn drop(&mut self)
    {
        self.flag.set(false);
    }
}
